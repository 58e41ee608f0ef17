use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{AvailabilityResponse, DoctorError, SaveAvailabilityRequest};
use crate::services::{availability::AvailabilityService, doctor::DoctorService};

const STAFF: &[UserRole] = &[UserRole::Doctor, UserRole::Receptionist, UserRole::Administrator];

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, STAFF, "list doctors")?;

    let doctors = DoctorService::new(&state).list_doctors(auth.token()).await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, STAFF, "view doctors")?;

    let doctor = DoctorService::new(&state).get_doctor(doctor_id, auth.token()).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    require_role(&user, STAFF, "view availability")?;

    let grid = AvailabilityService::new(&state)
        .get_weekly_grid(doctor_id, auth.token())
        .await?;

    Ok(Json(grid))
}

/// Replaces the caller's own weekly grid.
#[axum::debug_handler]
pub async fn replace_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SaveAvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let is_owner = user.clinic_role() == Some(UserRole::Doctor) && user.id == doctor_id.to_string();
    if !is_owner {
        return Err(DoctorError::NotOwner.into());
    }

    let config = AvailabilityService::new(&state)
        .replace_availability(doctor_id, request, auth.token())
        .await?;

    Ok(Json(AvailabilityResponse::new(doctor_id, &config)))
}
