use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{CreateNoteRequest, PatientError, PatientNote};
use crate::services::patient::PatientService;

/// Free-text notes doctors keep on a patient.
pub struct PatientNoteService {
    supabase: SupabaseClient,
    patients: PatientService,
}

impl PatientNoteService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            patients: PatientService::new(config),
        }
    }

    /// Newest first.
    pub async fn list_notes(&self, patient_id: Uuid, auth_token: &str) -> Result<Vec<PatientNote>, PatientError> {
        let path = format!(
            "/rest/v1/patient_notes?patient_id=eq.{}&order=created_at.desc",
            patient_id
        );
        let notes: Vec<PatientNote> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(notes)
    }

    pub async fn add_note(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        request: CreateNoteRequest,
        auth_token: &str,
    ) -> Result<PatientNote, PatientError> {
        let note = request.note.trim();
        if note.is_empty() {
            return Err(PatientError::ValidationError("note is required".to_string()));
        }

        self.patients.get_patient(patient_id, auth_token).await?;

        let body = json!({
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "note": note,
        });
        let created: Vec<PatientNote> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patient_notes",
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await?;

        let note = created
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Insert returned no note".to_string()))?;

        info!("Doctor {} added note {} for patient {}", doctor_id, note.id, patient_id);
        Ok(note)
    }

    /// Deletes a note written by `doctor_id`.
    pub async fn delete_note(
        &self,
        patient_id: Uuid,
        note_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<(), PatientError> {
        debug!("Fetching note {} of patient {}", note_id, patient_id);

        let path = format!("/rest/v1/patient_notes?id=eq.{}&patient_id=eq.{}", note_id, patient_id);
        let notes: Vec<PatientNote> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;
        let note = notes.into_iter().next().ok_or(PatientError::NoteNotFound)?;

        if note.doctor_id != doctor_id {
            warn!("Doctor {} tried to delete note {} written by {}", doctor_id, note_id, note.doctor_id);
            return Err(PatientError::NotNoteAuthor);
        }

        self.supabase
            .execute(Method::DELETE, &format!("/rest/v1/patient_notes?id=eq.{}", note_id), Some(auth_token), None)
            .await?;

        info!("Note {} deleted", note_id);
        Ok(())
    }
}
