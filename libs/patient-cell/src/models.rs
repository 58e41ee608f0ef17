use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::supabase::{store_error, SupabaseError};
use shared_models::error::AppError;
use shared_models::schedule::slot_time;

// ==============================================================================
// PATIENTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    /// National ID as typed at the front desk. Checked by the caller, not here.
    pub rut: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Completed years on `today`, or `None` without a birth date.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let born = self.date_of_birth?;
        let mut years = today.year() - born.year();
        if (today.month(), today.day()) < (born.month(), born.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}

/// Registration form. Optional fields so a missing one is reported as a
/// validation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub rut: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientSearchQuery {
    pub rut: Option<String>,
    pub name: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// ==============================================================================
// CLINICAL RECORDS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientNote {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub note: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    pub note: String,
}

/// One past consultation. Rows are written by the clinical side of the
/// clinic; this service only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub consultation_date: NaiveDate,
    #[serde(with = "slot_time")]
    pub consultation_time: NaiveTime,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Note not found")]
    NoteNotFound,

    #[error("A patient with this RUT is already registered")]
    DuplicateRut,

    #[error("Only the doctor who wrote a note can delete it")]
    NotNoteAuthor,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for PatientError {
    fn from(err: anyhow::Error) -> Self {
        match store_error(&err) {
            Some(SupabaseError::UniqueViolation(_)) => PatientError::DuplicateRut,
            Some(SupabaseError::ForeignKeyViolation(_)) | Some(SupabaseError::NotFound(_)) => {
                PatientError::NotFound
            }
            _ => PatientError::DatabaseError(err.to_string()),
        }
    }
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound | PatientError::NoteNotFound => AppError::NotFound(err.to_string()),
            PatientError::DuplicateRut => AppError::Conflict(err.to_string()),
            PatientError::NotNoteAuthor => AppError::Forbidden(err.to_string()),
            PatientError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            PatientError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
