use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn patient_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_patient))
        .route("/search", get(handlers::search_patients))
        .route("/{patient_id}", get(handlers::get_patient))
        .route("/{patient_id}/history", get(handlers::get_patient_history))
        .route("/{patient_id}/notes", get(handlers::list_notes).post(handlers::add_note))
        .route("/{patient_id}/notes/{note_id}", delete(handlers::delete_note))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
