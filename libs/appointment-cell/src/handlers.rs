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
use shared_models::schedule::format_slot_time;
use shared_utils::extractor::require_role;

use crate::models::{
    Appointment, AppointmentError, AvailableSlotsResponse, BookAppointmentRequest, DailyQuery,
    DailyStats, RescheduleRequest, ShiftRequest, SlotsQuery, UpdateStatusRequest, ValidateQuery,
    ValidationResponse,
};
use crate::services::booking::{parse_time, AppointmentBookingService};

const STAFF: &[UserRole] = &[UserRole::Doctor, UserRole::Receptionist, UserRole::Administrator];
const FRONT_DESK: &[UserRole] = &[UserRole::Receptionist, UserRole::Administrator];

// ==============================================================================
// BOOKING & SLOTS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    require_role(&user, FRONT_DESK, "book appointments")?;

    let appointment = AppointmentBookingService::new(&state)
        .book_appointment(request, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<SlotsQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<AvailableSlotsResponse>, AppError> {
    require_role(&user, STAFF, "view available slots")?;

    let slots = AppointmentBookingService::new(&state)
        .available_slots(query.doctor_id, query.date, auth.token())
        .await?;

    Ok(Json(AvailableSlotsResponse {
        doctor_id: query.doctor_id,
        date: query.date,
        slots: slots.into_iter().map(format_slot_time).collect(),
    }))
}

/// Dry run of the commit-time check; a refused slot is a normal answer.
#[axum::debug_handler]
pub async fn validate_assignment(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<ValidateQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<ValidationResponse>, AppError> {
    require_role(&user, STAFF, "validate appointment slots")?;

    let time = parse_time(&query.time)?;
    let result = AppointmentBookingService::new(&state)
        .conflict_service()
        .validate_assignment(query.doctor_id, query.date, time, query.exclude_appointment_id, auth.token())
        .await;

    match result {
        Ok(()) => Ok(Json(ValidationResponse::ok())),
        Err(AppointmentError::Conflict(conflict)) => Ok(Json(ValidationResponse::rejected(&conflict))),
        Err(e) => Err(e.into()),
    }
}

// ==============================================================================
// DAILY VIEWS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_daily_schedule(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DailyQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, STAFF, "view the daily schedule")?;

    let appointments = AppointmentBookingService::new(&state)
        .daily_schedule(query.date, query.doctor_id, auth.token())
        .await?;

    Ok(Json(json!({
        "date": query.date,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_daily_stats(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DailyQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<DailyStats>, AppError> {
    require_role(&user, STAFF, "view appointment statistics")?;

    let stats = AppointmentBookingService::new(&state)
        .daily_stats(query.date, query.doctor_id, auth.token())
        .await?;

    Ok(Json(stats))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, STAFF, "view patient appointments")?;

    let appointments = AppointmentBookingService::new(&state)
        .patient_appointments(patient_id, auth.token())
        .await?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

// ==============================================================================
// SINGLE APPOINTMENT
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Appointment>, AppError> {
    require_role(&user, STAFF, "view appointments")?;

    let appointment = AppointmentBookingService::new(&state)
        .get_appointment(appointment_id, auth.token())
        .await?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    require_role(&user, STAFF, "change appointment status")?;

    let appointment = AppointmentBookingService::new(&state)
        .update_status(appointment_id, request.status, auth.token())
        .await?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Appointment>, AppError> {
    require_role(&user, FRONT_DESK, "reschedule appointments")?;

    let new_time = parse_time(&request.appointment_time)?;
    let appointment = AppointmentBookingService::new(&state)
        .reschedule_appointment(appointment_id, new_time, request.appointment_date, auth.token())
        .await?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn shift_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ShiftRequest>,
) -> Result<Json<Appointment>, AppError> {
    require_role(&user, FRONT_DESK, "reschedule appointments")?;

    let appointment = AppointmentBookingService::new(&state)
        .shift_appointment(appointment_id, request.direction, auth.token())
        .await?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Appointment>, AppError> {
    require_role(&user, STAFF, "cancel appointments")?;

    let appointment = AppointmentBookingService::new(&state)
        .cancel_appointment(appointment_id, auth.token())
        .await?;

    Ok(Json(appointment))
}
