// src/appointments/scope.rs

use serde::Serialize;
use uuid::Uuid;

use super::model::Appointment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "doctor_id", rename_all = "lowercase")]
pub enum Role {
    Client,
    /// Carries the caller's own doctor profile id.
    Doctor(Uuid),
    Admin,
}

/// Authenticated identity handed to the booking engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn client(user_id: Uuid) -> Self {
        Self { user_id, role: Role::Client }
    }

    pub fn doctor(user_id: Uuid, doctor_id: Uuid) -> Self {
        Self { user_id, role: Role::Doctor(doctor_id) }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self { user_id, role: Role::Admin }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Doctor(_) | Role::Admin)
    }

    pub fn owns(&self, appointment: &Appointment) -> bool {
        appointment.user_id == self.user_id
    }
}

/// Who is allowed to confirm appointments outside their own doctor scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmPolicy {
    /// Doctors confirm only their own appointments.
    #[default]
    AssignedDoctor,
    /// Any doctor may confirm any appointment.
    AnyDoctor,
}

/// The subset of appointments a caller may read or mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibleScope {
    All,
    Doctor(Uuid),
    Owner(Uuid),
}

pub fn visible_scope(caller: &Caller) -> VisibleScope {
    match caller.role {
        Role::Admin => VisibleScope::All,
        Role::Doctor(doctor_id) => VisibleScope::Doctor(doctor_id),
        Role::Client => VisibleScope::Owner(caller.user_id),
    }
}

/// Scope used to look up the target of a confirm.
pub fn confirm_scope(caller: &Caller, policy: ConfirmPolicy) -> VisibleScope {
    match (caller.role, policy) {
        (Role::Doctor(_), ConfirmPolicy::AnyDoctor) => VisibleScope::All,
        _ => visible_scope(caller),
    }
}

impl VisibleScope {
    pub fn admits(&self, appointment: &Appointment) -> bool {
        match *self {
            VisibleScope::All => true,
            VisibleScope::Doctor(doctor_id) => appointment.doctor_id == doctor_id,
            VisibleScope::Owner(user_id) => appointment.user_id == user_id,
        }
    }

    /// (owner, doctor) filters for SQL: `($1::uuid IS NULL OR user_id = $1)`.
    pub fn bindings(&self) -> (Option<Uuid>, Option<Uuid>) {
        match *self {
            VisibleScope::All => (None, None),
            VisibleScope::Doctor(doctor_id) => (None, Some(doctor_id)),
            VisibleScope::Owner(user_id) => (Some(user_id), None),
        }
    }
}
