use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path};

use doctor_cell::router::doctor_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn app_for(mock_server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    (doctor_routes(config.to_arc()), config)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let mock_server = MockServer::start().await;
    let (app, _) = app_for(&mock_server);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_doctors_for_receptionist() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id, "Ana Rojas", "Cardiología")
        ])))
        .mount(&mock_server)
        .await;

    let (app, config) = app_for(&mock_server);
    let token = JwtTestUtils::create_test_token(&TestUser::receptionist("desk@clinic.test"), &config.jwt_secret, None);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["doctors"][0]["name"], "Ana Rojas");
}

#[tokio::test]
async fn test_only_owning_doctor_may_replace_availability() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (app, config) = app_for(&mock_server);
    let other_doctor = TestUser::doctor("other@clinic.test");
    let token = JwtTestUtils::create_test_token(&other_doctor, &config.jwt_secret, None);

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/{}/availability", doctor_id))
                .header("authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "slots": [] }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_owning_doctor_saves_grid() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&mock_server)
        .await;

    let (app, config) = app_for(&mock_server);
    let doctor = TestUser::doctor("owner@clinic.test").with_id(&doctor_id.to_string());
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/{}/availability", doctor_id))
                .header("authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(json!({
                    "slots": [
                        { "day_of_week": 1, "time_slot": "08:00" },
                        { "day_of_week": 1, "time_slot": "08:30" }
                    ]
                }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["state"], "configured");
    assert_eq!(json["days"][0]["slots"], json!(["08:00", "08:30"]));
    assert_eq!(json["days"][1]["slots"], json!([]));
}

#[tokio::test]
async fn test_sunday_pick_is_unprocessable() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    let (app, config) = app_for(&mock_server);
    let doctor = TestUser::doctor("owner@clinic.test").with_id(&doctor_id.to_string());
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/{}/availability", doctor_id))
                .header("authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(json!({
                    "slots": [{ "day_of_week": 0, "time_slot": "08:00" }]
                }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
