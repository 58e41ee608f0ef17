use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn staff_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_staff).post(handlers::create_staff))
        .route("/{kind}/{id}", delete(handlers::delete_staff))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
