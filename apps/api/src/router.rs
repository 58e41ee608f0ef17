use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;
use staff_cell::router::staff_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/staff", staff_routes(state.clone()))
        .nest("/appointments", appointment_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use shared_utils::test_utils::TestConfig;
    use tower::ServiceExt;

    #[tokio::test]
    async fn root_answers_without_token() {
        let app = create_router(TestConfig::default().to_arc());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cells_are_mounted_behind_auth() {
        for uri in ["/doctors", "/patients/search?name=ana", "/staff", "/appointments/daily?date=2025-03-10"] {
            let app = create_router(TestConfig::default().to_arc());
            let response = app
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }
}
