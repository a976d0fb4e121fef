// src/error.rs

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::appointments::error::{BookingError, FieldError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
    /// Per-field messages for validation failures.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<&'static str, Vec<String>>,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    Forbidden(&'static str, String),
    BadRequest(&'static str, String),
    Validation(Vec<FieldError>),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    Internal(String),
}

impl ApiError {
    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized("INVALID_CREDENTIALS", "Username or password is incorrect".into())
    }

    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(..) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(..) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(..) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(..) => StatusCode::NOT_FOUND,
            ApiError::Conflict(..) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_body(self) -> ErrorResponse {
        let (code, message, fields) = match self {
            ApiError::Unauthorized(code, msg)
            | ApiError::Forbidden(code, msg)
            | ApiError::BadRequest(code, msg)
            | ApiError::NotFound(code, msg)
            | ApiError::Conflict(code, msg) => (code, msg, BTreeMap::new()),
            ApiError::Validation(errors) => {
                let mut fields: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
                for e in errors {
                    fields.entry(e.field).or_default().push(e.message);
                }
                ("VALIDATION_ERROR", "Request validation failed".to_string(), fields)
            }
            ApiError::Internal(msg) => ("INTERNAL", msg, BTreeMap::new()),
        };

        ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message,
                fields,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.into_body())).into_response()
    }
}

impl From<BookingError> for ApiError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::Validation(fields) => ApiError::Validation(fields),
            BookingError::NotFound(what) => ApiError::NotFound("NOT_FOUND", format!("{what} not found")),
            BookingError::Conflict => ApiError::Conflict("SLOT_TAKEN", e.to_string()),
            BookingError::AlreadyCancelled => ApiError::Conflict("ALREADY_CANCELLED", e.to_string()),
            BookingError::Stale => ApiError::Conflict("APPOINTMENT_CHANGED", e.to_string()),
            BookingError::Forbidden(msg) => ApiError::Forbidden("FORBIDDEN", msg.into()),
            BookingError::InvalidTransition { .. } => ApiError::Conflict("INVALID_STATUS_TRANSITION", e.to_string()),
            BookingError::Store(inner) => {
                tracing::error!(error = %inner, "appointment store failure");
                ApiError::Internal("Internal server error".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointments::model::AppointmentStatus;
    use crate::appointments::store::StoreError;

    fn code_of(e: ApiError) -> (StatusCode, String) {
        let status = e.status();
        (status, e.into_body().error.code)
    }

    #[test]
    fn booking_errors_map_to_http() {
        assert_eq!(
            code_of(BookingError::Conflict.into()),
            (StatusCode::CONFLICT, "SLOT_TAKEN".into())
        );
        assert_eq!(
            code_of(BookingError::AlreadyCancelled.into()),
            (StatusCode::CONFLICT, "ALREADY_CANCELLED".into())
        );
        assert_eq!(
            code_of(BookingError::NotFound("appointment").into()),
            (StatusCode::NOT_FOUND, "NOT_FOUND".into())
        );
        assert_eq!(
            code_of(BookingError::Forbidden("no").into()),
            (StatusCode::FORBIDDEN, "FORBIDDEN".into())
        );
        let invalid = BookingError::InvalidTransition {
            from: AppointmentStatus::Completed,
            action: "cancel",
        };
        assert_eq!(
            code_of(invalid.into()),
            (StatusCode::CONFLICT, "INVALID_STATUS_TRANSITION".into())
        );
        assert_eq!(
            code_of(BookingError::Stale.into()),
            (StatusCode::CONFLICT, "APPOINTMENT_CHANGED".into())
        );
        assert_eq!(
            code_of(BookingError::from(StoreError::SlotTaken).into()),
            (StatusCode::CONFLICT, "SLOT_TAKEN".into())
        );
        assert_eq!(
            code_of(BookingError::Store(StoreError::Database("boom".into())).into()),
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL".into())
        );
    }

    #[test]
    fn validation_groups_messages_by_field() {
        let e: ApiError = BookingError::Validation(vec![
            FieldError::new("appointment_time", "this field is required"),
            FieldError::new("doctor_id", "this field is required"),
        ])
        .into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);

        let json = serde_json::to_value(e.into_body()).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["fields"]["appointment_time"][0], "this field is required");
        assert!(json["error"]["fields"]["doctor_id"].is_array());
    }

    #[test]
    fn plain_errors_omit_fields() {
        let json = serde_json::to_value(ApiError::session_expired().into_body()).unwrap();
        assert_eq!(json["error"]["code"], "SESSION_EXPIRED");
        assert!(json["error"].get("fields").is_none());
    }
}
