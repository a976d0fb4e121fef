// src/routes/appointment_routes.rs

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    appointments::{
        lifecycle::{AppointmentPatch, CreateAppointment},
        model::AppointmentFilter,
        view::AppointmentView,
    },
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route(
            "/appointments/{appointment_id}",
            get(get_appointment).patch(patch_appointment),
        )
        .route("/appointments/{appointment_id}/cancel", post(cancel_appointment))
        .route("/appointments/{appointment_id}/confirm", post(confirm_appointment))
        .route("/appointments/{appointment_id}/complete", post(complete_appointment))
}

/* ============================================================
   GET /appointments
   ============================================================ */

pub async fn list_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<ApiOk<Vec<AppointmentView>>>, ApiError> {
    let rows = state.booking.list(&auth.caller, &filter).await?;
    Ok(Json(ApiOk { data: state.booking.views(rows).await? }))
}

/* ============================================================
   POST /appointments
   ============================================================ */

pub async fn create_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateAppointment>,
) -> Result<(StatusCode, Json<ApiOk<AppointmentView>>), ApiError> {
    let created = state.booking.create(&auth.caller, req).await?;
    Ok((StatusCode::CREATED, Json(ApiOk { data: state.booking.view(created).await? })))
}

/* ============================================================
   GET /appointments/{id}
   ============================================================ */

pub async fn get_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<AppointmentView>>, ApiError> {
    let appointment = state.booking.get(&auth.caller, appointment_id).await?;
    Ok(Json(ApiOk { data: state.booking.view(appointment).await? }))
}

/* ============================================================
   PATCH /appointments/{id}
   ============================================================ */

pub async fn patch_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(patch): Json<AppointmentPatch>,
) -> Result<Json<ApiOk<AppointmentView>>, ApiError> {
    let updated = state.booking.update(&auth.caller, appointment_id, patch).await?;
    Ok(Json(ApiOk { data: state.booking.view(updated).await? }))
}

/* ============================================================
   POST /appointments/{id}/cancel | confirm | complete
   ============================================================ */

pub async fn cancel_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<AppointmentView>>, ApiError> {
    let updated = state.booking.cancel(&auth.caller, appointment_id).await?;
    Ok(Json(ApiOk { data: state.booking.view(updated).await? }))
}

pub async fn confirm_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<AppointmentView>>, ApiError> {
    let updated = state.booking.confirm(&auth.caller, appointment_id).await?;
    Ok(Json(ApiOk { data: state.booking.view(updated).await? }))
}

pub async fn complete_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<AppointmentView>>, ApiError> {
    let updated = state.booking.complete(&auth.caller, appointment_id).await?;
    Ok(Json(ApiOk { data: state.booking.view(updated).await? }))
}
