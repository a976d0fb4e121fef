// src/catalog.rs
//
// Read-only lookups into clinics, doctors, services and schedules.

use async_trait::async_trait;
use chrono::{NaiveTime, Weekday};
use sqlx::PgPool;
use uuid::Uuid;

use crate::appointments::store::StoreError;

/// Used when an appointment has no service attached.
pub const DEFAULT_DURATION_MINUTES: i32 = 30;

#[derive(Debug, Clone)]
pub struct DoctorProfile {
    pub doctor_id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub clinic_id: Uuid,
    pub clinic_name: String,
    pub clinic_address: String,
    /// Doctor accepts bookings and the clinic is active.
    pub bookable: bool,
    pub default_duration_minutes: i32,
}

#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub service_id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub is_available: bool,
}

/// Half-open interval `[start, end)` in clinic-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkingHours {
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn resolve_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, StoreError>;

    async fn resolve_service(&self, service_id: Uuid) -> Result<Option<ServiceInfo>, StoreError>;

    /// `None` means the doctor does not work on `weekday`.
    async fn working_hours(&self, doctor_id: Uuid, weekday: Weekday) -> Result<Option<WorkingHours>, StoreError>;

    /// Login name of the booking user.
    async fn user_name(&self, user_id: Uuid) -> Result<Option<String>, StoreError>;
}

#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DoctorRow {
    doctor_id: Uuid,
    user_id: Uuid,
    first_name: String,
    last_name: String,
    is_available: bool,
    clinic_id: Uuid,
    clinic_name: String,
    clinic_address: String,
    clinic_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    service_id: Uuid,
    clinic_id: Uuid,
    name: String,
    duration_minutes: i32,
    is_available: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct HoursRow {
    start_time: NaiveTime,
    end_time: NaiveTime,
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn resolve_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, StoreError> {
        let row = sqlx::query_as::<_, DoctorRow>(
            r#"
            SELECT
              d.doctor_id,
              d.user_id,
              d.first_name,
              d.last_name,
              d.is_available,
              c.clinic_id,
              c.name      AS clinic_name,
              c.address   AS clinic_address,
              c.is_active AS clinic_active
            FROM doctor d
            JOIN clinic c ON c.clinic_id = d.clinic_id
            WHERE d.doctor_id = $1
            "#,
        )
        .bind(doctor_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| DoctorProfile {
            doctor_id: r.doctor_id,
            user_id: r.user_id,
            full_name: format!("{} {}", r.first_name, r.last_name),
            clinic_id: r.clinic_id,
            clinic_name: r.clinic_name,
            clinic_address: r.clinic_address,
            bookable: r.is_available && r.clinic_active,
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
        }))
    }

    async fn resolve_service(&self, service_id: Uuid) -> Result<Option<ServiceInfo>, StoreError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT service_id, clinic_id, name, duration_minutes, is_available
            FROM service
            WHERE service_id = $1
            "#,
        )
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ServiceInfo {
            service_id: r.service_id,
            clinic_id: r.clinic_id,
            name: r.name,
            duration_minutes: r.duration_minutes,
            is_available: r.is_available,
        }))
    }

    async fn working_hours(&self, doctor_id: Uuid, weekday: Weekday) -> Result<Option<WorkingHours>, StoreError> {
        // weekday column: 0 Monday .. 6 Sunday
        let day = weekday.num_days_from_monday() as i16;

        let scheduled = sqlx::query_as::<_, HoursRow>(
            r#"
            SELECT start_time, end_time
            FROM doctor_schedule
            WHERE doctor_id = $1
              AND weekday = $2
              AND is_active = true
            "#,
        )
        .bind(doctor_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(h) = scheduled {
            return Ok(Some(WorkingHours { start: h.start_time, end: h.end_time }));
        }

        let has_schedule: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM doctor_schedule WHERE doctor_id = $1)
            "#,
        )
        .bind(doctor_id)
        .fetch_one(&self.pool)
        .await?;

        if has_schedule {
            return Ok(None);
        }

        // No personal schedule: fall back to the clinic's opening hours.
        let clinic = sqlx::query_as::<_, HoursRow>(
            r#"
            SELECT c.working_hours_start AS start_time, c.working_hours_end AS end_time
            FROM doctor d
            JOIN clinic c ON c.clinic_id = d.clinic_id
            WHERE d.doctor_id = $1
            "#,
        )
        .bind(doctor_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(clinic.map(|h| WorkingHours { start: h.start_time, end: h.end_time }))
    }

    async fn user_name(&self, user_id: Uuid) -> Result<Option<String>, StoreError> {
        let name = sqlx::query_scalar::<_, String>(
            r#"
            SELECT username FROM app_user WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(name)
    }
}
