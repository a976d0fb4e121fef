// src/appointments/error.rs

use serde::Serialize;

use super::model::AppointmentStatus;
use super::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// Missing, or outside the caller's visible scope. The two are never distinguished.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("this time slot is already booked")]
    Conflict,

    #[error("appointment is already cancelled")]
    AlreadyCancelled,

    #[error("{0}")]
    Forbidden(&'static str),

    /// The row moved between validation and lock; the caller may retry.
    #[error("appointment was changed by another request, please retry")]
    Stale,

    #[error("cannot {action} an appointment that is {from}")]
    InvalidTransition {
        from: AppointmentStatus,
        action: &'static str,
    },

    #[error(transparent)]
    Store(StoreError),
}

impl BookingError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        BookingError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::SlotTaken => BookingError::Conflict,
            other => BookingError::Store(other),
        }
    }
}
