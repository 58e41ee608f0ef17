use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
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

use crate::models::{CreateNoteRequest, CreatePatientRequest, Patient, PatientNote, PatientSearchQuery};
use crate::services::{ConsultationHistoryService, PatientNoteService, PatientService};

const STAFF: &[UserRole] = &[UserRole::Doctor, UserRole::Receptionist, UserRole::Administrator];
const FRONT_DESK: &[UserRole] = &[UserRole::Receptionist, UserRole::Administrator];
const CLINICAL: &[UserRole] = &[UserRole::Doctor, UserRole::Administrator];

/// The session user as a doctor id. Only doctors write notes.
fn doctor_id(user: &User) -> Result<Uuid, AppError> {
    require_role(user, &[UserRole::Doctor], "write patient notes")?;
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Session user id is not a UUID".to_string()))
}

// ==============================================================================
// PATIENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Patient>), AppError> {
    require_role(&user, FRONT_DESK, "register patients")?;

    let patient = PatientService::new(&state)
        .create_patient(request, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(patient)))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<PatientSearchQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, STAFF, "search patients")?;

    let patients = PatientService::new(&state)
        .search_patients(query, auth.token())
        .await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Patient>, AppError> {
    require_role(&user, STAFF, "view patients")?;

    let patient = PatientService::new(&state).get_patient(patient_id, auth.token()).await?;

    Ok(Json(patient))
}

// ==============================================================================
// HISTORY & NOTES
// ==============================================================================

#[axum::debug_handler]
pub async fn get_patient_history(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, CLINICAL, "view consultation history")?;

    let history = ConsultationHistoryService::new(&state)
        .patient_history(patient_id, auth.token())
        .await?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "consultations": history,
        "total": history.len()
    })))
}

#[axum::debug_handler]
pub async fn list_notes(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<PatientNote>>, AppError> {
    require_role(&user, CLINICAL, "view patient notes")?;

    let notes = PatientNoteService::new(&state)
        .list_notes(patient_id, auth.token())
        .await?;

    Ok(Json(notes))
}

#[axum::debug_handler]
pub async fn add_note(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<PatientNote>), AppError> {
    let doctor_id = doctor_id(&user)?;

    let note = PatientNoteService::new(&state)
        .add_note(patient_id, doctor_id, request, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(note)))
}

#[axum::debug_handler]
pub async fn delete_note(
    State(state): State<Arc<AppConfig>>,
    Path((patient_id, note_id)): Path<(Uuid, Uuid)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    let doctor_id = doctor_id(&user)?;

    PatientNoteService::new(&state)
        .delete_note(patient_id, note_id, doctor_id, auth.token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
