// src/appointments/model.rs

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored as smallint: 0 pending, 1 confirmed, 2 completed, 3 cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum AppointmentStatus {
    Pending = 0,
    Confirmed = 1,
    Completed = 2,
    Cancelled = 3,
}

impl AppointmentStatus {
    /// Pending and confirmed appointments occupy their slot.
    pub fn is_active(self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Human-readable form for display.
    pub fn label(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bookable (doctor, date, time) unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub appointment_id: Uuid,
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub service_id: Option<Uuid>,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: String,
    pub calendar_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn slot(&self) -> Slot {
        Slot {
            doctor_id: self.doctor_id,
            date: self.appointment_date,
            time: self.appointment_time,
        }
    }

    pub fn is_past_at(&self, clinic_offset: FixedOffset, now: DateTime<Utc>) -> bool {
        is_past(self.appointment_date, self.appointment_time, clinic_offset, now)
    }
}

/// Insert payload; status always starts as pending.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub user_id: Uuid,
    pub service_id: Option<Uuid>,
    pub slot: Slot,
    pub notes: String,
}

/// List filters plus optional paging. No `limit` means every matching row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub doctor_id: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AppointmentFilter {
    pub fn matches(&self, a: &Appointment) -> bool {
        self.status.is_none_or(|s| a.status == s)
            && self.doctor_id.is_none_or(|d| a.doctor_id == d)
            && self.appointment_date.is_none_or(|d| a.appointment_date == d)
    }

    /// Applies `offset`/`limit` to rows already filtered and ordered.
    pub fn page<T>(&self, rows: Vec<T>) -> Vec<T> {
        let offset = self.offset.unwrap_or(0).max(0) as usize;
        let limit = self.limit.map_or(usize::MAX, |l| l.max(0) as usize);
        rows.into_iter().skip(offset).take(limit).collect()
    }
}

/* -------------------------
   Date/time helpers
--------------------------*/

/// Accepts "HH:MM:SS" and "HH:MM".
pub fn parse_clinic_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

pub fn parse_clinic_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Combines date and time in clinic-local time.
pub fn clinic_datetime(date: NaiveDate, time: NaiveTime, clinic_offset: FixedOffset) -> DateTime<FixedOffset> {
    let naive = date.and_time(time);
    // a fixed offset never skips local times, the fallback is unreachable in practice
    clinic_offset
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| naive.and_utc().with_timezone(&clinic_offset))
}

/// True iff the slot start is strictly before `now`. Derived on read, never persisted.
pub fn is_past(date: NaiveDate, time: NaiveTime, clinic_offset: FixedOffset, now: DateTime<Utc>) -> bool {
    clinic_datetime(date, time, clinic_offset) < now
}
