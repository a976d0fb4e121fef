// src/appointments/store.rs

use async_trait::async_trait;
use uuid::Uuid;

use super::model::{Appointment, AppointmentFilter, AppointmentStatus, NewAppointment, Slot};
use super::scope::VisibleScope;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The active-slot uniqueness constraint rejected the write.
    #[error("an active appointment already holds this slot")]
    SlotTaken,
    #[error("db error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Data access for appointments.
///
/// Reads go straight to the backing store. Every mutation happens inside an
/// [`AppointmentTx`] obtained from [`AppointmentStore::begin`], so a conflict
/// check and the write it guards commit or roll back together.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn AppointmentTx>, StoreError>;

    async fn find(&self, scope: &VisibleScope, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Ordered by date desc, time desc.
    async fn list(&self, scope: &VisibleScope, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError>;

    /// Reads the mirror handle outside any scope; used by the calendar worker only.
    async fn calendar_ref(&self, appointment_id: Uuid) -> Result<Option<String>, StoreError>;

    async fn set_calendar_ref(&self, appointment_id: Uuid, calendar_ref: Option<&str>) -> Result<(), StoreError>;
}

/// One atomic unit of work. Dropping it without [`AppointmentTx::commit`] rolls back.
#[async_trait]
pub trait AppointmentTx: Send {
    /// True iff another active appointment holds `slot`.
    async fn slot_taken(&mut self, slot: &Slot, exclude: Option<Uuid>) -> Result<bool, StoreError>;

    /// Loads and row-locks an appointment visible in `scope`.
    async fn lock(&mut self, scope: &VisibleScope, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError>;

    async fn insert(&mut self, new: &NewAppointment) -> Result<Appointment, StoreError>;

    async fn reschedule(&mut self, appointment_id: Uuid, slot: &Slot, notes: &str) -> Result<Appointment, StoreError>;

    async fn set_status(&mut self, appointment_id: Uuid, status: AppointmentStatus) -> Result<Appointment, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
