// src/calendar/mod.rs
//
// Best-effort mirror of appointments into an external calendar. The booking
// engine only ever pushes `MirrorCommand`s into the outbox after commit; the
// worker owns every call to the adapter and swallows its failures.

pub mod outbox;
pub mod webhook;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;
use uuid::Uuid;

use crate::appointments::model::{clinic_datetime, Appointment};
use crate::catalog::{DoctorProfile, ServiceInfo};

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("calendar responded with status {0}")]
    Status(u16),
    #[error("calendar response carried no event id")]
    MissingRef,
    #[error("invalid calendar base url: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Email,
    Popup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub method: ReminderMethod,
    pub minutes_before: u32,
}

/// An email a day ahead and a popup an hour ahead.
pub fn default_reminders() -> Vec<Reminder> {
    vec![
        Reminder { method: ReminderMethod::Email, minutes_before: 24 * 60 },
        Reminder { method: ReminderMethod::Popup, minutes_before: 60 },
    ]
}

/// What the external calendar stores for one appointment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub appointment_id: Uuid,
    pub summary: String,
    pub location: String,
    pub description: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub reminders: Vec<Reminder>,
}

#[async_trait]
pub trait CalendarMirror: Send + Sync {
    /// Returns the opaque handle of the created event.
    async fn notify_create(&self, event: &CalendarEvent) -> Result<String, CalendarError>;

    async fn notify_update(&self, calendar_ref: &str, event: &CalendarEvent) -> Result<(), CalendarError>;

    async fn notify_delete(&self, calendar_ref: &str) -> Result<(), CalendarError>;
}

pub fn build_event(
    appointment: &Appointment,
    doctor: &DoctorProfile,
    service: Option<&ServiceInfo>,
    clinic_offset: FixedOffset,
) -> CalendarEvent {
    let start = clinic_datetime(appointment.appointment_date, appointment.appointment_time, clinic_offset);
    let minutes = service
        .map(|s| s.duration_minutes)
        .unwrap_or(doctor.default_duration_minutes);
    let service_name = service.map(|s| s.name.as_str()).unwrap_or("Consultation");

    CalendarEvent {
        appointment_id: appointment.appointment_id,
        summary: format!("Appointment with {}", doctor.full_name),
        location: doctor.clinic_address.clone(),
        description: format!(
            "Service: {service_name}\nDoctor: {}\nClinic: {}\nNotes: {}",
            doctor.full_name, doctor.clinic_name, appointment.notes
        ),
        start,
        end: start + Duration::minutes(i64::from(minutes)),
        reminders: default_reminders(),
    }
}
