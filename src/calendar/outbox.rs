// src/calendar/outbox.rs

use std::sync::Arc;

use chrono::FixedOffset;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{build_event, CalendarError, CalendarEvent, CalendarMirror};
use crate::appointments::model::Appointment;
use crate::appointments::store::{AppointmentStore, StoreError};
use crate::catalog::Catalog;

/// Emitted by the booking engine after a transition has committed.
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorCommand {
    Created(Appointment),
    Updated(Appointment),
    Cancelled(Uuid),
}

impl MirrorCommand {
    pub fn appointment_id(&self) -> Uuid {
        match self {
            MirrorCommand::Created(a) | MirrorCommand::Updated(a) => a.appointment_id,
            MirrorCommand::Cancelled(id) => *id,
        }
    }

    fn action(&self) -> &'static str {
        match self {
            MirrorCommand::Created(_) => "create",
            MirrorCommand::Updated(_) => "update",
            MirrorCommand::Cancelled(_) => "delete",
        }
    }
}

/// Non-blocking sender side. A disabled outbox drops everything silently.
#[derive(Clone, Default)]
pub struct CalendarOutbox {
    tx: Option<mpsc::Sender<MirrorCommand>>,
}

impl CalendarOutbox {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<MirrorCommand>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, cmd: MirrorCommand) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(cmd) {
            Ok(()) => {}
            Err(TrySendError::Full(cmd)) => {
                warn!(appointment_id = %cmd.appointment_id(), action = cmd.action(), "calendar outbox full, event dropped");
            }
            Err(TrySendError::Closed(cmd)) => {
                warn!(appointment_id = %cmd.appointment_id(), action = cmd.action(), "calendar worker gone, event dropped");
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum MirrorError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("doctor {0} no longer exists")]
    DoctorGone(Uuid),
}

/// Consumes the outbox and drives the calendar adapter, one command at a time.
pub struct CalendarWorker {
    mirror: Arc<dyn CalendarMirror>,
    store: Arc<dyn AppointmentStore>,
    catalog: Arc<dyn Catalog>,
    clinic_offset: FixedOffset,
}

impl CalendarWorker {
    pub fn new(
        mirror: Arc<dyn CalendarMirror>,
        store: Arc<dyn AppointmentStore>,
        catalog: Arc<dyn Catalog>,
        clinic_offset: FixedOffset,
    ) -> Self {
        Self { mirror, store, catalog, clinic_offset }
    }

    pub async fn run(self, mut rx: mpsc::Receiver<MirrorCommand>) {
        info!("calendar worker started");
        while let Some(cmd) = rx.recv().await {
            self.handle(cmd).await;
        }
        info!("calendar worker stopped");
    }

    /// Failures are logged and dropped; the appointment itself is never touched.
    pub async fn handle(&self, cmd: MirrorCommand) {
        let appointment_id = cmd.appointment_id();
        let action = cmd.action();
        match self.apply(cmd).await {
            Ok(()) => debug!(%appointment_id, action, "calendar mirror updated"),
            Err(e) => warn!(%appointment_id, action, error = %e, "calendar mirror failed"),
        }
    }

    async fn apply(&self, cmd: MirrorCommand) -> Result<(), MirrorError> {
        match cmd {
            MirrorCommand::Created(appointment) => {
                let event = self.event_for(&appointment).await?;
                let calendar_ref = self.mirror.notify_create(&event).await?;
                self.store
                    .set_calendar_ref(appointment.appointment_id, Some(&calendar_ref))
                    .await?;
            }
            MirrorCommand::Updated(appointment) => {
                // the ref is read now, so a create queued earlier has already stored it
                let Some(calendar_ref) = self.store.calendar_ref(appointment.appointment_id).await? else {
                    return Ok(());
                };
                let event = self.event_for(&appointment).await?;
                self.mirror.notify_update(&calendar_ref, &event).await?;
            }
            MirrorCommand::Cancelled(appointment_id) => {
                let Some(calendar_ref) = self.store.calendar_ref(appointment_id).await? else {
                    return Ok(());
                };
                self.mirror.notify_delete(&calendar_ref).await?;
                self.store.set_calendar_ref(appointment_id, None).await?;
            }
        }
        Ok(())
    }

    async fn event_for(&self, appointment: &Appointment) -> Result<CalendarEvent, MirrorError> {
        let doctor = self
            .catalog
            .resolve_doctor(appointment.doctor_id)
            .await?
            .ok_or(MirrorError::DoctorGone(appointment.doctor_id))?;
        let service = match appointment.service_id {
            Some(id) => self.catalog.resolve_service(id).await?,
            None => None,
        };
        Ok(build_event(appointment, &doctor, service.as_ref(), self.clinic_offset))
    }
}
