use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ConsultationRecord, PatientError};

pub struct ConsultationHistoryService {
    supabase: SupabaseClient,
}

impl ConsultationHistoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Past consultations, most recent first.
    pub async fn patient_history(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<ConsultationRecord>, PatientError> {
        debug!("Fetching consultation history for patient {}", patient_id);

        let path = format!(
            "/rest/v1/consultation_history?patient_id=eq.{}&order=consultation_date.desc,consultation_time.desc",
            patient_id
        );
        let records: Vec<ConsultationRecord> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(records)
    }
}
