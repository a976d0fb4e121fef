use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::appointments::lifecycle::BookingService;
use crate::appointments::scope::Role;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub session_ttl_hours: i64,
    pub booking: Arc<BookingService>,
}

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub device_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponseData {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct MeResponseData {
    pub user: UserProfile,
    pub session: SessionInfo,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub role: String,
    /// Set for doctors only.
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: i16,
    pub is_active: bool,
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionTokenRow {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   Helpers
--------------------------*/

pub const ROLE_CLIENT: i16 = 0;
pub const ROLE_DOCTOR: i16 = 1;
pub const ROLE_ADMIN: i16 = 2;

/// Role mapping: 0 client, 1 doctor, 2 admin
pub fn role_to_string(role: i16) -> String {
    match role {
        ROLE_CLIENT => "client",
        ROLE_DOCTOR => "doctor",
        ROLE_ADMIN => "admin",
        _ => "unknown",
    }
    .to_string()
}

/// A doctor account must be linked to a doctor profile to act as a doctor.
pub fn resolve_role(role: i16, doctor_id: Option<Uuid>) -> Result<Role, ApiError> {
    match (role, doctor_id) {
        (ROLE_CLIENT, _) => Ok(Role::Client),
        (ROLE_ADMIN, _) => Ok(Role::Admin),
        (ROLE_DOCTOR, Some(id)) => Ok(Role::Doctor(id)),
        (ROLE_DOCTOR, None) => Err(ApiError::Forbidden(
            "NO_DOCTOR_PROFILE",
            "Doctor account has no doctor profile".into(),
        )),
        _ => Err(ApiError::Forbidden("FORBIDDEN", format!("unknown role: {role}"))),
    }
}
