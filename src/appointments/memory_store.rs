// src/appointments/memory_store.rs
//
// In-process store used by the engine tests. A transaction owns the table
// mutex until it commits or drops, so transactions are fully serialized, and
// writes enforce the same active-slot uniqueness as the Postgres index.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::conflict::occupies;
use super::model::{Appointment, AppointmentFilter, AppointmentStatus, NewAppointment, Slot};
use super::scope::VisibleScope;
use super::store::{AppointmentStore, AppointmentTx, StoreError};

#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Vec<Appointment>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<Appointment> {
        self.rows.lock().await.clone()
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Vec<Appointment>>,
    working: Vec<Appointment>,
}

fn active_slots_unique(rows: &[Appointment]) -> bool {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|a| a.status.is_active())
        .all(|a| seen.insert(a.slot()))
}

impl MemoryTx {
    fn position(&self, appointment_id: Uuid) -> Result<usize, StoreError> {
        self.working
            .iter()
            .position(|a| a.appointment_id == appointment_id)
            .ok_or_else(|| StoreError::Database(format!("no appointment row {appointment_id}")))
    }

    /// Applies `change` to one row, undoing it if it breaks slot uniqueness.
    fn write(&mut self, appointment_id: Uuid, change: impl FnOnce(&mut Appointment)) -> Result<Appointment, StoreError> {
        let idx = self.position(appointment_id)?;
        let before = self.working[idx].clone();
        let row = &mut self.working[idx];
        change(row);
        row.updated_at = Utc::now().max(before.updated_at);
        if !active_slots_unique(&self.working) {
            self.working[idx] = before;
            return Err(StoreError::SlotTaken);
        }
        Ok(self.working[idx].clone())
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn AppointmentTx>, StoreError> {
        let guard = self.rows.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn find(&self, scope: &VisibleScope, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .find(|a| a.appointment_id == appointment_id && scope.admits(a))
            .cloned())
    }

    async fn list(&self, scope: &VisibleScope, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let rows = self.rows.lock().await;
        let mut out: Vec<Appointment> = rows
            .iter()
            .filter(|a| scope.admits(a) && filter.matches(a))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            (b.appointment_date, b.appointment_time, b.created_at).cmp(&(a.appointment_date, a.appointment_time, a.created_at))
        });
        Ok(filter.page(out))
    }

    async fn calendar_ref(&self, appointment_id: Uuid) -> Result<Option<String>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .find(|a| a.appointment_id == appointment_id)
            .and_then(|a| a.calendar_ref.clone()))
    }

    async fn set_calendar_ref(&self, appointment_id: Uuid, calendar_ref: Option<&str>) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        if let Some(row) = rows.iter_mut().find(|a| a.appointment_id == appointment_id) {
            row.calendar_ref = calendar_ref.map(str::to_owned);
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentTx for MemoryTx {
    async fn slot_taken(&mut self, slot: &Slot, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        Ok(self.working.iter().any(|a| occupies(a, slot, exclude)))
    }

    async fn lock(&mut self, scope: &VisibleScope, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self
            .working
            .iter()
            .find(|a| a.appointment_id == appointment_id && scope.admits(a))
            .cloned())
    }

    async fn insert(&mut self, new: &NewAppointment) -> Result<Appointment, StoreError> {
        let now = Utc::now();
        let row = Appointment {
            appointment_id: Uuid::new_v4(),
            user_id: new.user_id,
            doctor_id: new.slot.doctor_id,
            service_id: new.service_id,
            appointment_date: new.slot.date,
            appointment_time: new.slot.time,
            status: AppointmentStatus::Pending,
            notes: new.notes.clone(),
            calendar_ref: None,
            created_at: now,
            updated_at: now,
        };
        self.working.push(row.clone());
        if !active_slots_unique(&self.working) {
            self.working.pop();
            return Err(StoreError::SlotTaken);
        }
        Ok(row)
    }

    async fn reschedule(&mut self, appointment_id: Uuid, slot: &Slot, notes: &str) -> Result<Appointment, StoreError> {
        self.write(appointment_id, |row| {
            row.appointment_date = slot.date;
            row.appointment_time = slot.time;
            row.notes = notes.to_owned();
        })
    }

    async fn set_status(&mut self, appointment_id: Uuid, status: AppointmentStatus) -> Result<Appointment, StoreError> {
        self.write(appointment_id, |row| row.status = status)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, NaiveTime};

    fn new_appointment(doctor_id: Uuid) -> NewAppointment {
        NewAppointment {
            user_id: Uuid::new_v4(),
            service_id: None,
            slot: Slot {
                doctor_id,
                date: NaiveDate::from_ymd_opt(2031, 2, 3).unwrap(),
                time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            },
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn uncommitted_transaction_leaves_no_trace() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert(&new_appointment(Uuid::new_v4())).await.unwrap();
        }
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn second_active_row_for_a_slot_is_rejected_by_the_store() {
        let store = MemoryStore::new();
        let doctor_id = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        tx.insert(&new_appointment(doctor_id)).await.unwrap();
        let err = tx.insert(&new_appointment(doctor_id)).await.unwrap_err();
        assert_matches!(err, StoreError::SlotTaken);
        tx.commit().await.unwrap();

        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_row_frees_the_slot_for_a_new_insert() {
        let store = MemoryStore::new();
        let doctor_id = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        let first = tx.insert(&new_appointment(doctor_id)).await.unwrap();
        tx.set_status(first.appointment_id, AppointmentStatus::Cancelled)
            .await
            .unwrap();
        tx.insert(&new_appointment(doctor_id)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn list_pages_newest_first() {
        let store = MemoryStore::new();
        let doctor_id = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        for hour in [9, 10, 11] {
            let mut new = new_appointment(doctor_id);
            new.slot.time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap();
            tx.insert(&new).await.unwrap();
        }
        tx.commit().await.unwrap();

        let filter = AppointmentFilter { limit: Some(2), offset: Some(1), ..Default::default() };
        let hours: Vec<_> = store
            .list(&VisibleScope::All, &filter)
            .await
            .unwrap()
            .iter()
            .map(|a| a.appointment_time)
            .collect();
        assert_eq!(
            hours,
            vec![NaiveTime::from_hms_opt(10, 0, 0).unwrap(), NaiveTime::from_hms_opt(9, 0, 0).unwrap()]
        );

        let everything = store.list(&VisibleScope::All, &AppointmentFilter::default()).await.unwrap();
        assert_eq!(everything.len(), 3);
    }
}
