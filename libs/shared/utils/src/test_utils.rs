use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{default_slot_catalogue, AppConfig};
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Points the store client at a mock server.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            slot_catalogue: default_slot_catalogue(),
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("staff@clinic.test", "receptionist")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn receptionist(email: &str) -> Self {
        Self::new(email, "receptionist")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "administrator")
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    fn sign(payload: serde_json::Value, secret: &str) -> String {
        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        Self::sign(json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        }), secret)
    }

    /// Token shaped like a real Supabase session: `role` is the database
    /// role and the clinic role sits in `app_metadata`.
    pub fn create_supabase_token(user: &TestUser, secret: &str) -> String {
        let now = Utc::now();

        Self::sign(json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "app_metadata": { "role": user.role },
            "iat": now.timestamp(),
            "exp": (now + Duration::hours(1)).timestamp()
        }), secret)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_response(doctor_id: &str, name: &str, specialty: &str) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "name": name,
            "specialty": specialty,
            "email": "doctor@clinic.test",
            "phone": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn availability_row(doctor_id: &str, day_of_week: i32, time_slot: &str, is_available: bool) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "day_of_week": day_of_week,
            "time_slot": time_slot,
            "is_available": is_available,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    /// The marker a doctor leaves behind after saving an empty grid.
    pub fn availability_sentinel(doctor_id: &str) -> serde_json::Value {
        Self::availability_row(doctor_id, 0, "00:00:00", false)
    }

    pub fn appointment_response(
        appointment_id: &str,
        patient_id: &str,
        doctor_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "appointment_time": time,
            "consultation_type": "Control",
            "reason": null,
            "status": status,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_response(patient_id: &str, rut: &str, first_name: &str, last_name: &str) -> serde_json::Value {
        json!({
            "id": patient_id,
            "rut": rut,
            "first_name": first_name,
            "last_name": last_name,
            "phone": "+56912345678",
            "email": null,
            "date_of_birth": "1985-04-12",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn note_response(note_id: &str, patient_id: &str, doctor_id: &str, note: &str) -> serde_json::Value {
        json!({
            "id": note_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "note": note,
            "created_at": "2025-03-10T12:00:00Z",
            "updated_at": "2025-03-10T12:00:00Z"
        })
    }

    pub fn consultation_response(patient_id: &str, doctor_id: &str, date: &str, time: &str, diagnosis: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "consultation_date": date,
            "consultation_time": time,
            "diagnosis": diagnosis,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn unique_violation() -> serde_json::Value {
        json!({
            "code": "23505",
            "details": null,
            "hint": null,
            "message": "duplicate key value violates unique constraint \"appointments_active_slot_key\""
        })
    }

    pub fn foreign_key_violation(constraint: &str) -> serde_json::Value {
        json!({
            "code": "23503",
            "details": "Key is not present in table.",
            "hint": null,
            "message": format!("insert or update violates foreign key constraint \"{}\"", constraint)
        })
    }
}
