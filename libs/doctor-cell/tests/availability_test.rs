use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_json, method, path, query_param};

use doctor_cell::models::{
    AvailabilityConfig, AvailabilityPick, AvailabilityState, ClinicDay, DoctorError,
    SaveAvailabilityRequest,
};
use doctor_cell::services::AvailabilityService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn pick(day_of_week: i32, time_slot: &str) -> AvailabilityPick {
    AvailabilityPick {
        day_of_week,
        time_slot: time_slot.to_string(),
    }
}

async fn mount_rules(mock_server: &MockServer, doctor_id: Uuid, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_doctor_without_rows_is_unset() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    mount_rules(&mock_server, doctor_id, json!([])).await;

    let service = AvailabilityService::new(&TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let config = service.get_availability_config(doctor_id, "token").await.unwrap();

    assert_eq!(config, AvailabilityConfig::Unset);
}

#[tokio::test]
async fn test_sentinel_row_is_configured_empty() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    mount_rules(
        &mock_server,
        doctor_id,
        json!([MockSupabaseResponses::availability_sentinel(&doctor_id.to_string())]),
    ).await;

    let service = AvailabilityService::new(&TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let grid = service.get_weekly_grid(doctor_id, "token").await.unwrap();

    assert_eq!(grid.state, AvailabilityState::Empty);
    assert!(grid.days.iter().all(|d| d.slots.is_empty()));
}

#[tokio::test]
async fn test_day_rules_are_grouped_by_weekday() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let id = doctor_id.to_string();
    mount_rules(&mock_server, doctor_id, json!([
        MockSupabaseResponses::availability_row(&id, 1, "08:00:00", true),
        MockSupabaseResponses::availability_row(&id, 1, "08:30:00", true),
        MockSupabaseResponses::availability_row(&id, 4, "15:00:00", true),
    ])).await;

    let service = AvailabilityService::new(&TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let grid = service.get_weekly_grid(doctor_id, "token").await.unwrap();

    assert_eq!(grid.state, AvailabilityState::Configured);
    assert_eq!(grid.days[0].slots, vec!["08:00", "08:30"]);
    assert!(grid.days[1].slots.is_empty());
    assert_eq!(grid.days[3].day_name, "thursday");
    assert_eq!(grid.days[3].slots, vec!["15:00"]);
}

#[tokio::test]
async fn test_replace_deletes_then_inserts_rows() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_availability"))
        .and(body_json(json!([
            { "doctor_id": doctor_id, "day_of_week": 1, "time_slot": "08:00:00", "is_available": true },
            { "doctor_id": doctor_id, "day_of_week": 1, "time_slot": "08:30:00", "is_available": true },
            { "doctor_id": doctor_id, "day_of_week": 6, "time_slot": "12:30:00", "is_available": true },
        ])))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let request = SaveAvailabilityRequest {
        slots: vec![pick(6, "12:30"), pick(1, "08:30"), pick(1, "08:00"), pick(1, "08:00:00")],
    };

    let config = service.replace_availability(doctor_id, request, "token").await.unwrap();

    match config {
        AvailabilityConfig::Rules(schedule) => {
            assert_eq!(schedule.slots_for(ClinicDay::new(1).unwrap()).len(), 2);
        }
        other => panic!("expected rules, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_grid_stores_sentinel() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_availability"))
        .and(body_json(json!([
            { "doctor_id": doctor_id, "day_of_week": 0, "time_slot": "00:00:00", "is_available": false },
        ])))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let config = service
        .replace_availability(doctor_id, SaveAvailabilityRequest { slots: vec![] }, "token")
        .await
        .unwrap();

    assert_eq!(config, AvailabilityConfig::Empty);
}

#[tokio::test]
async fn test_invalid_picks_are_rejected_before_touching_the_store() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());

    let sunday = service
        .replace_availability(doctor_id, SaveAvailabilityRequest { slots: vec![pick(0, "08:00")] }, "token")
        .await;
    assert_matches!(sunday, Err(DoctorError::InvalidDay(0)));

    let off_catalogue = service
        .replace_availability(doctor_id, SaveAvailabilityRequest { slots: vec![pick(2, "13:00")] }, "token")
        .await;
    assert_matches!(off_catalogue, Err(DoctorError::SlotOutsideCatalogue(slot)) if slot == "13:00");

    let garbage = service
        .replace_availability(doctor_id, SaveAvailabilityRequest { slots: vec![pick(2, "noon")] }, "token")
        .await;
    assert_matches!(garbage, Err(DoctorError::InvalidTimeSlot(_)));
}

#[tokio::test]
async fn test_store_failure_surfaces_as_database_error() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let result = service.get_availability_config(doctor_id, "token").await;

    assert_matches!(result, Err(DoctorError::DatabaseError(_)));
}
