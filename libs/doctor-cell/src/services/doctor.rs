use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Doctor, DoctorError};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// All doctors, ordered by name for selection lists.
    pub async fn list_doctors(&self, auth_token: &str) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors");

        let doctors: Vec<Doctor> = self.supabase.request(
            Method::GET,
            "/rest/v1/doctors?select=id,name,specialty,email,phone,created_at&order=name.asc",
            Some(auth_token),
            None,
        ).await?;

        Ok(doctors)
    }

    pub async fn get_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!(
            "/rest/v1/doctors?id=eq.{}&select=id,name,specialty,email,phone,created_at",
            doctor_id
        );
        let doctors: Vec<Doctor> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        doctors.into_iter().next().ok_or(DoctorError::NotFound)
    }
}
