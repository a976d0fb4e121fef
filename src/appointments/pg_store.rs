// src/appointments/pg_store.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::conflict::ACTIVE_SLOT_INDEX;
use super::model::{Appointment, AppointmentFilter, AppointmentStatus, NewAppointment, Slot};
use super::scope::VisibleScope;
use super::store::{AppointmentStore, AppointmentTx, StoreError};

#[derive(Clone)]
pub struct PgAppointmentStore {
    pool: PgPool,
}

impl PgAppointmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct PgAppointmentTx {
    tx: Transaction<'static, Postgres>,
}

/// A write that trips the active-slot index lost the race for that slot.
fn map_write_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.constraint() == Some(ACTIVE_SLOT_INDEX) {
            return StoreError::SlotTaken;
        }
    }
    StoreError::from(e)
}

#[async_trait]
impl AppointmentStore for PgAppointmentStore {
    async fn begin(&self) -> Result<Box<dyn AppointmentTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgAppointmentTx { tx }))
    }

    async fn find(&self, scope: &VisibleScope, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let (owner, doctor) = scope.bindings();
        let row = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT
              appointment_id, user_id, doctor_id, service_id,
              appointment_date, appointment_time, status, notes,
              calendar_ref, created_at, updated_at
            FROM appointment
            WHERE appointment_id = $1
              AND ($2::uuid IS NULL OR user_id = $2)
              AND ($3::uuid IS NULL OR doctor_id = $3)
            "#,
        )
        .bind(appointment_id)
        .bind(owner)
        .bind(doctor)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list(&self, scope: &VisibleScope, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let (owner, doctor) = scope.bindings();
        let rows = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT
              appointment_id, user_id, doctor_id, service_id,
              appointment_date, appointment_time, status, notes,
              calendar_ref, created_at, updated_at
            FROM appointment
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR doctor_id = $2)
              AND ($3::smallint IS NULL OR status = $3)
              AND ($4::uuid IS NULL OR doctor_id = $4)
              AND ($5::date IS NULL OR appointment_date = $5)
            ORDER BY appointment_date DESC, appointment_time DESC, created_at DESC
            LIMIT $6::bigint OFFSET $7::bigint
            "#,
        )
        .bind(owner)
        .bind(doctor)
        .bind(filter.status)
        .bind(filter.doctor_id)
        .bind(filter.appointment_date)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn calendar_ref(&self, appointment_id: Uuid) -> Result<Option<String>, StoreError> {
        let calendar_ref: Option<Option<String>> = sqlx::query_scalar(
            r#"
            SELECT calendar_ref
            FROM appointment
            WHERE appointment_id = $1
            "#,
        )
        .bind(appointment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(calendar_ref.flatten())
    }

    async fn set_calendar_ref(&self, appointment_id: Uuid, calendar_ref: Option<&str>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE appointment
            SET calendar_ref = $2
            WHERE appointment_id = $1
            "#,
        )
        .bind(appointment_id)
        .bind(calendar_ref)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AppointmentTx for PgAppointmentTx {
    async fn slot_taken(&mut self, slot: &Slot, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
              SELECT 1
              FROM appointment
              WHERE doctor_id = $1
                AND appointment_date = $2
                AND appointment_time = $3
                AND status IN (0, 1)
                AND ($4::uuid IS NULL OR appointment_id <> $4)
            )
            "#,
        )
        .bind(slot.doctor_id)
        .bind(slot.date)
        .bind(slot.time)
        .bind(exclude)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(taken)
    }

    async fn lock(&mut self, scope: &VisibleScope, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let (owner, doctor) = scope.bindings();
        let row = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT
              appointment_id, user_id, doctor_id, service_id,
              appointment_date, appointment_time, status, notes,
              calendar_ref, created_at, updated_at
            FROM appointment
            WHERE appointment_id = $1
              AND ($2::uuid IS NULL OR user_id = $2)
              AND ($3::uuid IS NULL OR doctor_id = $3)
            FOR UPDATE
            "#,
        )
        .bind(appointment_id)
        .bind(owner)
        .bind(doctor)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn insert(&mut self, new: &NewAppointment) -> Result<Appointment, StoreError> {
        sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointment (
              user_id,
              doctor_id,
              service_id,
              appointment_date,
              appointment_time,
              status,
              notes
            )
            VALUES ($1, $2, $3, $4, $5, 0, $6)
            RETURNING
              appointment_id, user_id, doctor_id, service_id,
              appointment_date, appointment_time, status, notes,
              calendar_ref, created_at, updated_at
            "#,
        )
        .bind(new.user_id)
        .bind(new.slot.doctor_id)
        .bind(new.service_id)
        .bind(new.slot.date)
        .bind(new.slot.time)
        .bind(&new.notes)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_err)
    }

    async fn reschedule(&mut self, appointment_id: Uuid, slot: &Slot, notes: &str) -> Result<Appointment, StoreError> {
        sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointment
            SET
              appointment_date = $2,
              appointment_time = $3,
              notes = $4,
              updated_at = GREATEST(now(), updated_at)
            WHERE appointment_id = $1
            RETURNING
              appointment_id, user_id, doctor_id, service_id,
              appointment_date, appointment_time, status, notes,
              calendar_ref, created_at, updated_at
            "#,
        )
        .bind(appointment_id)
        .bind(slot.date)
        .bind(slot.time)
        .bind(notes)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_err)
    }

    async fn set_status(&mut self, appointment_id: Uuid, status: AppointmentStatus) -> Result<Appointment, StoreError> {
        sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointment
            SET
              status = $2,
              updated_at = GREATEST(now(), updated_at)
            WHERE appointment_id = $1
            RETURNING
              appointment_id, user_id, doctor_id, service_id,
              appointment_date, appointment_time, status, notes,
              calendar_ref, created_at, updated_at
            "#,
        )
        .bind(appointment_id)
        .bind(status)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_err)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        this.tx.commit().await?;
        Ok(())
    }
}
