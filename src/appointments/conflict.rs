// src/appointments/conflict.rs
//
// Slot conflict rule. The Postgres store enforces the same rule with the
// partial unique index `appointment_active_slot_uq`, which is what closes the
// race between two concurrent checks.

use tracing::debug;
use uuid::Uuid;

use super::model::{Appointment, Slot};
use super::store::{AppointmentTx, StoreError};

pub const ACTIVE_SLOT_INDEX: &str = "appointment_active_slot_uq";

/// Does `appointment` hold `slot` (ignoring the excluded id)?
pub fn occupies(appointment: &Appointment, slot: &Slot, exclude: Option<Uuid>) -> bool {
    appointment.status.is_active()
        && appointment.slot() == *slot
        && exclude != Some(appointment.appointment_id)
}

/// `has_conflict(doctor, date, time, exclude?)`, evaluated inside `tx`.
pub async fn has_conflict(
    tx: &mut dyn AppointmentTx,
    slot: &Slot,
    exclude: Option<Uuid>,
) -> Result<bool, StoreError> {
    let taken = tx.slot_taken(slot, exclude).await?;
    if taken {
        debug!(
            doctor_id = %slot.doctor_id,
            date = %slot.date,
            time = %slot.time,
            "slot already held by an active appointment"
        );
    }
    Ok(taken)
}
