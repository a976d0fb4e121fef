// src/appointments/lifecycle.rs

use std::sync::Arc;

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::conflict::has_conflict;
use super::error::{BookingError, FieldError};
use super::model::{
    is_past, parse_clinic_date, parse_clinic_time, Appointment, AppointmentFilter, AppointmentStatus,
    NewAppointment, Slot,
};
use super::scope::{confirm_scope, visible_scope, Caller, ConfirmPolicy, VisibleScope};
use super::store::AppointmentStore;
use super::view::{build_views, AppointmentView};
use crate::calendar::outbox::{CalendarOutbox, MirrorCommand};
use crate::catalog::Catalog;

/// Tunable booking rules.
#[derive(Debug, Clone, Copy)]
pub struct BookingPolicy {
    pub allow_past_bookings: bool,
    pub enforce_working_hours: bool,
    pub confirm_policy: ConfirmPolicy,
    pub clinic_offset: FixedOffset,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAppointment {
    pub doctor_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    /// YYYY-MM-DD
    pub appointment_date: Option<String>,
    /// HH:MM or HH:MM:SS, clinic-local
    pub appointment_time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentPatch {
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

impl AppointmentPatch {
    fn touches_schedule(&self) -> bool {
        self.appointment_date.is_some() || self.appointment_time.is_some() || self.notes.is_some()
    }
}

fn parse_date_field(raw: Option<&str>, errors: &mut Vec<FieldError>) -> Option<NaiveDate> {
    let raw = raw?;
    let parsed = parse_clinic_date(raw);
    if parsed.is_none() {
        errors.push(FieldError::new("appointment_date", "must be YYYY-MM-DD"));
    }
    parsed
}

fn parse_time_field(raw: Option<&str>, errors: &mut Vec<FieldError>) -> Option<NaiveTime> {
    let raw = raw?;
    let parsed = parse_clinic_time(raw);
    if parsed.is_none() {
        errors.push(FieldError::new("appointment_time", "must be HH:MM or HH:MM:SS"));
    }
    parsed
}

/// Role and state guard for moving `appointment` to `target`.
///
/// Callers only reach this with an appointment already inside their scope, so
/// "doctor of this appointment" is implied by the lookup.
pub fn authorize_transition(
    caller: &Caller,
    appointment: &Appointment,
    target: AppointmentStatus,
) -> Result<(), BookingError> {
    let from = appointment.status;
    match target {
        AppointmentStatus::Pending => {
            if from == AppointmentStatus::Pending {
                Ok(())
            } else {
                Err(BookingError::InvalidTransition { from, action: "reopen" })
            }
        }
        AppointmentStatus::Confirmed => {
            if !caller.is_staff() {
                return Err(BookingError::Forbidden("only doctors or admins can confirm appointments"));
            }
            if from.is_terminal() {
                return Err(BookingError::InvalidTransition { from, action: "confirm" });
            }
            Ok(())
        }
        AppointmentStatus::Cancelled => match from {
            AppointmentStatus::Cancelled => Err(BookingError::AlreadyCancelled),
            AppointmentStatus::Completed => Err(BookingError::InvalidTransition { from, action: "cancel" }),
            _ => Ok(()),
        },
        AppointmentStatus::Completed => {
            if !caller.is_staff() {
                return Err(BookingError::Forbidden("only doctors or admins can complete appointments"));
            }
            if from != AppointmentStatus::Confirmed {
                return Err(BookingError::InvalidTransition { from, action: "complete" });
            }
            Ok(())
        }
    }
}

/// Only the owner may move an appointment or edit its notes, and never once it is terminal.
fn ensure_reschedulable(caller: &Caller, appointment: &Appointment) -> Result<(), BookingError> {
    if !caller.owns(appointment) {
        return Err(BookingError::Forbidden("only the owner can change date, time or notes"));
    }
    if appointment.status.is_terminal() {
        return Err(BookingError::InvalidTransition { from: appointment.status, action: "reschedule" });
    }
    Ok(())
}

/// The appointment slot-allocation and lifecycle engine.
pub struct BookingService {
    store: Arc<dyn AppointmentStore>,
    catalog: Arc<dyn Catalog>,
    outbox: CalendarOutbox,
    policy: BookingPolicy,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        catalog: Arc<dyn Catalog>,
        outbox: CalendarOutbox,
        policy: BookingPolicy,
    ) -> Self {
        Self { store, catalog, outbox, policy }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    pub async fn create(&self, caller: &Caller, req: CreateAppointment) -> Result<Appointment, BookingError> {
        let mut errors = Vec::new();
        if req.doctor_id.is_none() {
            errors.push(FieldError::new("doctor_id", "this field is required"));
        }
        if req.appointment_date.is_none() {
            errors.push(FieldError::new("appointment_date", "this field is required"));
        }
        if req.appointment_time.is_none() {
            errors.push(FieldError::new("appointment_time", "this field is required"));
        }
        let date = parse_date_field(req.appointment_date.as_deref(), &mut errors);
        let time = parse_time_field(req.appointment_time.as_deref(), &mut errors);

        let (Some(doctor_id), Some(date), Some(time)) = (req.doctor_id, date, time) else {
            return Err(BookingError::Validation(errors));
        };
        if !errors.is_empty() {
            return Err(BookingError::Validation(errors));
        }

        let doctor = self
            .catalog
            .resolve_doctor(doctor_id)
            .await?
            .ok_or(BookingError::NotFound("doctor"))?;
        if !doctor.bookable {
            return Err(BookingError::invalid("doctor_id", "doctor is not accepting bookings"));
        }

        if let Some(service_id) = req.service_id {
            let service = self
                .catalog
                .resolve_service(service_id)
                .await?
                .ok_or(BookingError::NotFound("service"))?;
            if service.clinic_id != doctor.clinic_id {
                return Err(BookingError::invalid("service_id", "service is not offered at the doctor's clinic"));
            }
            if !service.is_available {
                return Err(BookingError::invalid("service_id", "service is not available"));
            }
        }

        let slot = Slot { doctor_id, date, time };
        self.check_slot_rules(&slot).await?;

        let new = NewAppointment {
            user_id: caller.user_id,
            service_id: req.service_id,
            slot,
            notes: req.notes.unwrap_or_default(),
        };

        let mut tx = self.store.begin().await?;
        if has_conflict(tx.as_mut(), &slot, None).await? {
            return Err(BookingError::Conflict);
        }
        let appointment = tx.insert(&new).await?;
        tx.commit().await?;

        info!(
            appointment_id = %appointment.appointment_id,
            doctor_id = %doctor_id,
            user_id = %caller.user_id,
            "appointment created"
        );
        self.outbox.emit(MirrorCommand::Created(appointment.clone()));
        Ok(appointment)
    }

    pub async fn get(&self, caller: &Caller, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.store
            .find(&visible_scope(caller), appointment_id)
            .await?
            .ok_or(BookingError::NotFound("appointment"))
    }

    pub async fn list(&self, caller: &Caller, filter: &AppointmentFilter) -> Result<Vec<Appointment>, BookingError> {
        let mut errors = Vec::new();
        if filter.limit.is_some_and(|l| l < 1) {
            errors.push(FieldError::new("limit", "must be at least 1"));
        }
        if filter.offset.is_some_and(|o| o < 0) {
            errors.push(FieldError::new("offset", "must not be negative"));
        }
        if !errors.is_empty() {
            return Err(BookingError::Validation(errors));
        }
        Ok(self.store.list(&visible_scope(caller), filter).await?)
    }

    /// Owner reschedule (date/time/notes) and/or a status change, applied atomically.
    pub async fn update(
        &self,
        caller: &Caller,
        appointment_id: Uuid,
        patch: AppointmentPatch,
    ) -> Result<Appointment, BookingError> {
        let mut errors = Vec::new();
        let new_date = parse_date_field(patch.appointment_date.as_deref(), &mut errors);
        let new_time = parse_time_field(patch.appointment_time.as_deref(), &mut errors);
        if !errors.is_empty() {
            return Err(BookingError::Validation(errors));
        }

        let scope = match patch.status {
            Some(AppointmentStatus::Confirmed) if !patch.touches_schedule() => {
                confirm_scope(caller, self.policy.confirm_policy)
            }
            _ => visible_scope(caller),
        };

        // Slot rules may call the catalog, so they run before any row is locked.
        let checked = if patch.touches_schedule() {
            let before = self
                .store
                .find(&scope, appointment_id)
                .await?
                .ok_or(BookingError::NotFound("appointment"))?;
            ensure_reschedulable(caller, &before)?;

            let slot = Slot {
                doctor_id: before.doctor_id,
                date: new_date.unwrap_or(before.appointment_date),
                time: new_time.unwrap_or(before.appointment_time),
            };
            if slot != before.slot() {
                self.check_slot_rules(&slot).await?;
            }
            Some((before, slot))
        } else {
            None
        };

        let mut tx = self.store.begin().await?;
        let current = tx
            .lock(&scope, appointment_id)
            .await?
            .ok_or(BookingError::NotFound("appointment"))?;

        let mut updated = current.clone();
        let mut rescheduled = false;

        if let Some((before, slot)) = checked {
            if current.slot() != before.slot() || current.status != before.status {
                debug!(%appointment_id, "appointment changed while the reschedule was validated");
                return Err(BookingError::Stale);
            }
            ensure_reschedulable(caller, &current)?;
            if has_conflict(tx.as_mut(), &slot, Some(appointment_id)).await? {
                return Err(BookingError::Conflict);
            }

            let notes = patch.notes.as_deref().unwrap_or(&current.notes);
            updated = tx.reschedule(appointment_id, &slot, notes).await?;
            rescheduled = true;
        }

        let mut cancelled = false;
        let mut status_changed = false;
        if let Some(target) = patch.status {
            authorize_transition(caller, &updated, target)?;
            if updated.status != target {
                updated = tx.set_status(appointment_id, target).await?;
                cancelled = target == AppointmentStatus::Cancelled;
                status_changed = !cancelled;
            }
        }

        tx.commit().await?;

        info!(
            %appointment_id,
            status = %updated.status,
            rescheduled,
            "appointment updated"
        );
        if rescheduled || status_changed {
            self.outbox.emit(MirrorCommand::Updated(updated.clone()));
        }
        if cancelled {
            self.outbox.emit(MirrorCommand::Cancelled(appointment_id));
        }
        Ok(updated)
    }

    /// Decorates rows with doctor, service and user names for display.
    pub async fn views(&self, rows: Vec<Appointment>) -> Result<Vec<AppointmentView>, BookingError> {
        Ok(build_views(self.catalog.as_ref(), rows, self.policy.clinic_offset, Utc::now()).await?)
    }

    pub async fn view(&self, appointment: Appointment) -> Result<AppointmentView, BookingError> {
        self.views(vec![appointment])
            .await?
            .pop()
            .ok_or(BookingError::NotFound("appointment"))
    }

    pub async fn cancel(&self, caller: &Caller, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        let scope = visible_scope(caller);
        let appointment = self
            .transition(caller, &scope, appointment_id, AppointmentStatus::Cancelled)
            .await?;
        self.outbox.emit(MirrorCommand::Cancelled(appointment_id));
        Ok(appointment)
    }

    pub async fn confirm(&self, caller: &Caller, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        let scope = confirm_scope(caller, self.policy.confirm_policy);
        self.transition(caller, &scope, appointment_id, AppointmentStatus::Confirmed)
            .await
    }

    pub async fn complete(&self, caller: &Caller, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        let scope = visible_scope(caller);
        self.transition(caller, &scope, appointment_id, AppointmentStatus::Completed)
            .await
    }

    async fn transition(
        &self,
        caller: &Caller,
        scope: &VisibleScope,
        appointment_id: Uuid,
        target: AppointmentStatus,
    ) -> Result<Appointment, BookingError> {
        let mut tx = self.store.begin().await?;
        let current = tx
            .lock(scope, appointment_id)
            .await?
            .ok_or(BookingError::NotFound("appointment"))?;

        if let Err(e) = authorize_transition(caller, &current, target) {
            debug!(%appointment_id, from = %current.status, to = %target, error = %e, "transition rejected");
            return Err(e);
        }
        if current.status == target {
            return Ok(current);
        }

        let updated = tx.set_status(appointment_id, target).await?;
        tx.commit().await?;

        info!(
            %appointment_id,
            from = %current.status,
            to = %updated.status,
            by = ?caller.role,
            "appointment status changed"
        );
        Ok(updated)
    }

    /// Past-date and working-hour rules for a candidate slot.
    async fn check_slot_rules(&self, slot: &Slot) -> Result<(), BookingError> {
        if !self.policy.allow_past_bookings && is_past(slot.date, slot.time, self.policy.clinic_offset, Utc::now()) {
            return Err(BookingError::invalid("appointment_date", "cannot book an appointment in the past"));
        }

        if self.policy.enforce_working_hours {
            let hours = self
                .catalog
                .working_hours(slot.doctor_id, slot.date.weekday())
                .await?;
            match hours {
                Some(h) if h.contains(slot.time) => {}
                Some(_) => {
                    return Err(BookingError::invalid("appointment_time", "outside the doctor's working hours"));
                }
                None => {
                    warn!(doctor_id = %slot.doctor_id, date = %slot.date, "booking attempted on a day off");
                    return Err(BookingError::invalid("appointment_date", "the doctor does not work on this day"));
                }
            }
        }
        Ok(())
    }
}
