// src/appointments/view.rs
//
// Read model handed to clients: the stored row plus the names needed to
// render it without further lookups.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::model::Appointment;
use super::store::StoreError;
use crate::catalog::{Catalog, DoctorProfile, ServiceInfo};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorSummary {
    pub doctor_id: Uuid,
    pub full_name: String,
    pub clinic_id: Uuid,
    pub clinic_name: String,
}

impl From<DoctorProfile> for DoctorSummary {
    fn from(d: DoctorProfile) -> Self {
        Self {
            doctor_id: d.doctor_id,
            full_name: d.full_name,
            clinic_id: d.clinic_id,
            clinic_name: d.clinic_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSummary {
    pub service_id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
}

impl From<ServiceInfo> for ServiceSummary {
    fn from(s: ServiceInfo) -> Self {
        Self {
            service_id: s.service_id,
            name: s.name,
            duration_minutes: s.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    /// Derived from clinic-local time when the view is built.
    pub is_past: bool,
    pub status_display: &'static str,
    pub user_name: Option<String>,
    pub doctor: Option<DoctorSummary>,
    pub service: Option<ServiceSummary>,
}

/// Per-request cache so a page of rows costs one lookup per distinct id.
#[derive(Default)]
struct Lookups {
    doctors: HashMap<Uuid, Option<DoctorSummary>>,
    services: HashMap<Uuid, Option<ServiceSummary>>,
    users: HashMap<Uuid, Option<String>>,
}

impl Lookups {
    async fn doctor(&mut self, catalog: &dyn Catalog, doctor_id: Uuid) -> Result<Option<DoctorSummary>, StoreError> {
        if let Some(hit) = self.doctors.get(&doctor_id) {
            return Ok(hit.clone());
        }
        let summary = catalog.resolve_doctor(doctor_id).await?.map(DoctorSummary::from);
        self.doctors.insert(doctor_id, summary.clone());
        Ok(summary)
    }

    async fn service(&mut self, catalog: &dyn Catalog, service_id: Uuid) -> Result<Option<ServiceSummary>, StoreError> {
        if let Some(hit) = self.services.get(&service_id) {
            return Ok(hit.clone());
        }
        let summary = catalog.resolve_service(service_id).await?.map(ServiceSummary::from);
        self.services.insert(service_id, summary.clone());
        Ok(summary)
    }

    async fn user(&mut self, catalog: &dyn Catalog, user_id: Uuid) -> Result<Option<String>, StoreError> {
        if let Some(hit) = self.users.get(&user_id) {
            return Ok(hit.clone());
        }
        let name = catalog.user_name(user_id).await?;
        self.users.insert(user_id, name.clone());
        Ok(name)
    }
}

pub async fn build_views(
    catalog: &dyn Catalog,
    rows: Vec<Appointment>,
    clinic_offset: FixedOffset,
    now: DateTime<Utc>,
) -> Result<Vec<AppointmentView>, StoreError> {
    let mut lookups = Lookups::default();
    let mut out = Vec::with_capacity(rows.len());
    for appointment in rows {
        let doctor = lookups.doctor(catalog, appointment.doctor_id).await?;
        let service = match appointment.service_id {
            Some(id) => lookups.service(catalog, id).await?,
            None => None,
        };
        let user_name = lookups.user(catalog, appointment.user_id).await?;

        out.push(AppointmentView {
            is_past: appointment.is_past_at(clinic_offset, now),
            status_display: appointment.status.label(),
            user_name,
            doctor,
            service,
            appointment,
        });
    }
    Ok(out)
}
