use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, Path, Query, State},
    http::{Request, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::TypedHeader;
use chrono::{Datelike, Duration, Local, NaiveDate};
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use appointment_cell::handlers::*;
use appointment_cell::models::*;
use appointment_cell::router::appointment_routes;
use shared_models::{auth::User, error::AppError};
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn next_monday() -> NaiveDate {
    let today = Local::now().date_naive();
    today + Duration::days(7 - today.weekday().num_days_from_monday() as i64)
}

fn create_test_user_extension(user: TestUser) -> Extension<User> {
    Extension(user.to_user())
}

fn create_auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer(token).unwrap())
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn mount_open_doctor(mock_server: &MockServer, doctor_id: Uuid, booked: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id.to_string(), "Dr. Pérez", "Pediatría")
        ])))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(&Uuid::new_v4().to_string(), "9876543-2", "Luis", "Muñoz")
        ])))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(booked))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_doctor_cannot_book() {
    let config = TestConfig::default();
    let request = BookAppointmentRequest {
        doctor_id: Some(Uuid::new_v4()),
        ..Default::default()
    };

    let result = book_appointment(
        State(config.to_arc()),
        create_auth_header("token"),
        create_test_user_extension(TestUser::doctor("doc@clinic.test")),
        Json(request),
    ).await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_receptionist_books_open_slot() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let date = next_monday();
    mount_open_doctor(&mock_server, doctor_id, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &doctor_id.to_string(),
                &date.to_string(),
                "14:00:00",
                "pending",
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let request = BookAppointmentRequest {
        patient_id: Some(Uuid::new_v4()),
        doctor_id: Some(doctor_id),
        appointment_date: Some(date),
        appointment_time: Some("14:00".to_string()),
        consultation_type: Some("Primera vez".to_string()),
        reason: Some("Dolor de cabeza".to_string()),
    };

    let result = book_appointment(
        State(config.to_arc()),
        create_auth_header("token"),
        create_test_user_extension(TestUser::receptionist("desk@clinic.test")),
        Json(request),
    ).await;

    let (status, Json(appointment)) = result.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(appointment.doctor_id, doctor_id);
    assert_eq!(appointment.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn test_booked_slot_answers_conflict() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let date = next_monday();
    mount_open_doctor(&mock_server, doctor_id, json!([
        MockSupabaseResponses::appointment_response(
            &Uuid::new_v4().to_string(),
            &Uuid::new_v4().to_string(),
            &doctor_id.to_string(),
            &date.to_string(),
            "14:00:00",
            "confirmed",
        )
    ])).await;

    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let request = BookAppointmentRequest {
        patient_id: Some(Uuid::new_v4()),
        doctor_id: Some(doctor_id),
        appointment_date: Some(date),
        appointment_time: Some("14:00".to_string()),
        consultation_type: Some("Control".to_string()),
        reason: None,
    };

    let response = book_appointment(
        State(config.to_arc()),
        create_auth_header("token"),
        create_test_user_extension(TestUser::admin("admin@clinic.test")),
        Json(request),
    ).await.into_response();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Slot is already booked");
}

#[tokio::test]
async fn test_get_unknown_appointment_is_not_found() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let result = get_appointment(
        State(Arc::new(config.to_app_config())),
        Path(Uuid::new_v4()),
        create_auth_header("token"),
        create_test_user_extension(TestUser::doctor("doc@clinic.test")),
    ).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_slots_for_unknown_doctor_is_not_found() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let response = get_available_slots(
        State(config.to_arc()),
        Query(SlotsQuery { doctor_id: Uuid::new_v4(), date: next_monday() }),
        create_auth_header("token"),
        create_test_user_extension(TestUser::receptionist("desk@clinic.test")),
    ).await.into_response();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Doctor not found");
}

// ==============================================================================
// ROUTER
// ==============================================================================

#[tokio::test]
async fn test_routes_require_token() {
    let app = appointment_routes(TestConfig::default().to_arc());

    let response = app
        .oneshot(Request::builder().uri("/daily?date=2025-03-10").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_slots_endpoint_lists_open_times() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let date = next_monday();
    mount_open_doctor(&mock_server, doctor_id, json!([
        MockSupabaseResponses::appointment_response(
            &Uuid::new_v4().to_string(),
            &Uuid::new_v4().to_string(),
            &doctor_id.to_string(),
            &date.to_string(),
            "08:00:00",
            "pending",
        )
    ])).await;

    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&TestUser::receptionist("desk@clinic.test"), &config.jwt_secret, None);
    let app = appointment_routes(config.to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/slots?doctor_id={}&date={}", doctor_id, date))
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let slots = json["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 16);
    assert_eq!(slots[0], "08:30");
    assert!(!slots.contains(&json!("08:00")));
}

#[tokio::test]
async fn test_validate_endpoint_reports_conflict_as_value() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let holder = Uuid::new_v4();
    let date = next_monday();
    mount_open_doctor(&mock_server, doctor_id, json!([
        MockSupabaseResponses::appointment_response(
            &holder.to_string(),
            &Uuid::new_v4().to_string(),
            &doctor_id.to_string(),
            &date.to_string(),
            "08:30:00",
            "confirmed",
        )
    ])).await;

    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let token = JwtTestUtils::create_supabase_token(&TestUser::doctor("doc@clinic.test"), &config.jwt_secret);
    let app = appointment_routes(config.to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/validate?doctor_id={}&date={}&time=08:30", doctor_id, date))
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["valid"], false);
    assert_eq!(json["conflict"], "slot_already_booked");
    assert_eq!(json["conflicting_appointment_id"], holder.to_string());
}

#[tokio::test]
async fn test_invalid_transition_is_bad_request() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &appointment_id.to_string(),
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &next_monday().to_string(),
                "09:00:00",
                "cancelled",
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&TestUser::receptionist("desk@clinic.test"), &config.jwt_secret, None);
    let app = appointment_routes(config.to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/{}/status", appointment_id))
                .header("authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "status": "confirmed" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
