use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, patch},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/slots", get(handlers::get_available_slots))
        .route("/validate", get(handlers::validate_assignment))
        .route("/daily", get(handlers::get_daily_schedule))
        .route("/stats/daily", get(handlers::get_daily_stats))
        .route("/patients/{patient_id}", get(handlers::get_patient_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_status))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/shift", post(handlers::shift_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
