// src/testing.rs
//
// Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, FixedOffset, NaiveDate, Utc, Weekday};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::appointments::lifecycle::{BookingPolicy, BookingService, CreateAppointment};
use crate::appointments::memory_store::MemoryStore;
use crate::appointments::scope::{Caller, ConfirmPolicy};
use crate::appointments::store::StoreError;
use crate::calendar::outbox::{CalendarOutbox, MirrorCommand};
use crate::catalog::{Catalog, DEFAULT_DURATION_MINUTES, DoctorProfile, ServiceInfo, WorkingHours};

#[derive(Default)]
pub struct StaticCatalog {
    doctors: HashMap<Uuid, DoctorProfile>,
    services: HashMap<Uuid, ServiceInfo>,
    schedules: HashMap<Uuid, HashMap<Weekday, WorkingHours>>,
    users: HashMap<Uuid, String>,
}

impl StaticCatalog {
    pub fn add_doctor(&mut self, clinic_id: Uuid, full_name: &str, bookable: bool) -> DoctorProfile {
        let doctor = DoctorProfile {
            doctor_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            full_name: full_name.to_string(),
            clinic_id,
            clinic_name: "Test Clinic".into(),
            clinic_address: "Test Street 123".into(),
            bookable,
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
        };
        self.doctors.insert(doctor.doctor_id, doctor.clone());
        doctor
    }

    pub fn add_service(&mut self, clinic_id: Uuid, name: &str, duration_minutes: i32) -> ServiceInfo {
        let service = ServiceInfo {
            service_id: Uuid::new_v4(),
            clinic_id,
            name: name.to_string(),
            duration_minutes,
            is_available: true,
        };
        self.services.insert(service.service_id, service.clone());
        service
    }

    pub fn add_user(&mut self, username: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        self.users.insert(user_id, username.to_string());
        user_id
    }

    pub fn set_hours(&mut self, doctor_id: Uuid, weekday: Weekday, hours: WorkingHours) {
        self.schedules.entry(doctor_id).or_default().insert(weekday, hours);
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn resolve_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, StoreError> {
        Ok(self.doctors.get(&doctor_id).cloned())
    }

    async fn resolve_service(&self, service_id: Uuid) -> Result<Option<ServiceInfo>, StoreError> {
        Ok(self.services.get(&service_id).cloned())
    }

    async fn working_hours(&self, doctor_id: Uuid, weekday: Weekday) -> Result<Option<WorkingHours>, StoreError> {
        Ok(self
            .schedules
            .get(&doctor_id)
            .and_then(|days| days.get(&weekday))
            .copied())
    }

    async fn user_name(&self, user_id: Uuid) -> Result<Option<String>, StoreError> {
        Ok(self.users.get(&user_id).cloned())
    }
}

pub fn clinic_offset() -> FixedOffset {
    FixedOffset::east_opt(2 * 3600).unwrap()
}

pub fn tomorrow() -> NaiveDate {
    (Utc::now() + Duration::days(1)).date_naive()
}

pub fn default_policy() -> BookingPolicy {
    BookingPolicy {
        allow_past_bookings: false,
        enforce_working_hours: false,
        confirm_policy: ConfirmPolicy::AssignedDoctor,
        clinic_offset: clinic_offset(),
    }
}

/// Two doctors at one clinic, one service, two clients and an admin.
pub struct Fixture {
    pub booking: Arc<BookingService>,
    pub store: MemoryStore,
    pub catalog: Arc<StaticCatalog>,
    pub events: mpsc::Receiver<MirrorCommand>,
    pub d1: DoctorProfile,
    pub d2: DoctorProfile,
    pub closed_doctor: DoctorProfile,
    pub service: ServiceInfo,
    pub foreign_service: ServiceInfo,
    pub c1: Caller,
    pub c2: Caller,
    pub admin: Caller,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_policy(default_policy(), |_, _| {})
    }

    pub fn with_policy(policy: BookingPolicy, tweak: impl FnOnce(&mut StaticCatalog, &DoctorProfile)) -> Self {
        let clinic_id = Uuid::new_v4();
        let mut catalog = StaticCatalog::default();
        let d1 = catalog.add_doctor(clinic_id, "John Doe", true);
        let d2 = catalog.add_doctor(clinic_id, "Jane Roe", true);
        let closed_doctor = catalog.add_doctor(clinic_id, "Away Vet", false);
        let service = catalog.add_service(clinic_id, "Consultation", 30);
        let foreign_service = catalog.add_service(Uuid::new_v4(), "Grooming", 60);
        let c1 = catalog.add_user("alice");
        let c2 = catalog.add_user("bob");
        tweak(&mut catalog, &d1);

        let catalog = Arc::new(catalog);
        let store = MemoryStore::new();
        let (outbox, events) = CalendarOutbox::channel(64);
        let booking = Arc::new(BookingService::new(
            Arc::new(store.clone()),
            catalog.clone(),
            outbox,
            policy,
        ));

        Self {
            booking,
            store,
            catalog,
            events,
            d1,
            d2,
            closed_doctor,
            service,
            foreign_service,
            c1: Caller::client(c1),
            c2: Caller::client(c2),
            admin: Caller::admin(Uuid::new_v4()),
        }
    }

    pub fn doctor_caller(doctor: &DoctorProfile) -> Caller {
        Caller::doctor(doctor.user_id, doctor.doctor_id)
    }

    pub fn request(&self, doctor: &DoctorProfile, date: NaiveDate, time: &str) -> CreateAppointment {
        CreateAppointment {
            doctor_id: Some(doctor.doctor_id),
            service_id: Some(self.service.service_id),
            appointment_date: Some(date.format("%Y-%m-%d").to_string()),
            appointment_time: Some(time.to_string()),
            notes: Some("Test appointment".into()),
        }
    }

    /// Drains everything emitted so far.
    pub fn drain_events(&mut self) -> Vec<MirrorCommand> {
        let mut out = Vec::new();
        while let Ok(cmd) = self.events.try_recv() {
            out.push(cmd);
        }
        out
    }
}
