use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use patient_cell::models::PatientError;
use shared_database::supabase::{is_foreign_key_violation, is_unique_violation, store_error, SupabaseError};
use shared_models::error::AppError;
use shared_models::schedule::slot_time;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    #[serde(with = "slot_time")]
    pub appointment_time: NaiveTime,
    pub consultation_type: String,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Whether this appointment holds `time` on `date`.
    pub fn occupies(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.status.is_active() && self.appointment_date == date && self.appointment_time == time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    /// Pending and confirmed appointments occupy their slot.
    pub fn is_active(self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            other => Err(AppointmentError::ValidationError(format!("Unknown status '{}'", other))),
        }
    }
}

/// Direction of a one-slot move within the clinic catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftDirection {
    Earlier,
    Later,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Booking form as filled in by the front desk. Every field except `reason`
/// is required; they are optional here so a missing one is reported as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<String>,
    pub consultation_type: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub appointment_time: String,
    pub appointment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftRequest {
    pub direction: ShiftDirection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyQuery {
    pub date: NaiveDate,
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsResponse {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub conflict: Option<String>,
    pub conflicting_appointment_id: Option<Uuid>,
    pub message: Option<String>,
}

impl ValidationResponse {
    pub fn ok() -> Self {
        Self {
            valid: true,
            conflict: None,
            conflicting_appointment_id: None,
            message: None,
        }
    }

    pub fn rejected(conflict: &SlotConflict) -> Self {
        let (code, appointment_id) = match conflict {
            SlotConflict::NotAvailable => ("slot_not_available", None),
            SlotConflict::AlreadyBooked { appointment_id } => ("slot_already_booked", Some(*appointment_id)),
        };
        Self {
            valid: false,
            conflict: Some(code.to_string()),
            conflicting_appointment_id: appointment_id,
            message: Some(conflict.to_string()),
        }
    }
}

/// Appointment counts for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub doctor_id: Option<Uuid>,
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl DailyStats {
    pub fn from_appointments(date: NaiveDate, doctor_id: Option<Uuid>, appointments: &[Appointment]) -> Self {
        let count = |status: AppointmentStatus| {
            appointments.iter().filter(|a| a.status == status).count()
        };
        Self {
            date,
            doctor_id,
            total: appointments.len(),
            pending: count(AppointmentStatus::Pending),
            confirmed: count(AppointmentStatus::Confirmed),
            completed: count(AppointmentStatus::Completed),
            cancelled: count(AppointmentStatus::Cancelled),
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Why a doctor/date/time assignment was refused. These are ordinary
/// outcomes of scheduling, not failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotConflict {
    #[error("Slot is not in the doctor's availability")]
    NotAvailable,

    #[error("Slot is already booked")]
    AlreadyBooked { appointment_id: Uuid },
}

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    /// The store rejected a write that points at a row that does not exist.
    #[error("Referenced patient or doctor does not exist")]
    UnknownReference,

    #[error(transparent)]
    Conflict(#[from] SlotConflict),

    /// The store refused the write because another active appointment took
    /// the slot after validation ran.
    #[error("Slot is already booked")]
    SlotAlreadyBooked,

    #[error("Cannot change status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("A {0} appointment cannot be rescheduled")]
    NotReschedulable(AppointmentStatus),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(err: anyhow::Error) -> Self {
        if is_unique_violation(&err) {
            return AppointmentError::SlotAlreadyBooked;
        }
        if is_foreign_key_violation(&err) {
            return AppointmentError::UnknownReference;
        }
        match store_error(&err) {
            Some(SupabaseError::NotFound(_)) => AppointmentError::NotFound,
            _ => AppointmentError::DatabaseError(err.to_string()),
        }
    }
}

impl From<DoctorError> for AppointmentError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppointmentError::DoctorNotFound,
            DoctorError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
            other => AppointmentError::ValidationError(other.to_string()),
        }
    }
}

impl From<PatientError> for AppointmentError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppointmentError::PatientNotFound,
            PatientError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
            other => AppointmentError::ValidationError(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::PatientNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::Conflict(_) | AppointmentError::SlotAlreadyBooked => {
                AppError::Conflict(err.to_string())
            }
            AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::NotReschedulable(_) => AppError::BadRequest(err.to_string()),
            AppointmentError::InvalidTime(_)
            | AppointmentError::ValidationError(_)
            | AppointmentError::UnknownReference => AppError::ValidationError(err.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_and_confirmed_are_active() {
        assert!(AppointmentStatus::Pending.is_active());
        assert!(AppointmentStatus::Confirmed.is_active());
        assert!(!AppointmentStatus::Completed.is_active());
        assert!(!AppointmentStatus::Cancelled.is_active());
    }

    #[test]
    fn status_parses_from_store_values() {
        for status in AppointmentStatus::ALL {
            assert_eq!(status.to_string().parse::<AppointmentStatus>().unwrap(), status);
        }
        assert_eq!("Canceled".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::Cancelled);
        assert!("no_show".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn appointment_reads_store_time_column() {
        let appointment: Appointment = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "doctor_id": Uuid::new_v4(),
            "appointment_date": "2025-03-10",
            "appointment_time": "08:30:00",
            "consultation_type": "Control",
            "reason": null,
            "status": "confirmed",
            "created_at": "2025-03-01T10:00:00Z",
            "updated_at": null
        })).unwrap();

        assert_eq!(appointment.appointment_time, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(appointment.status, AppointmentStatus::Confirmed);
        assert_eq!(serde_json::to_value(&appointment).unwrap()["appointment_time"], "08:30");
    }

    #[test]
    fn slot_conflicts_are_http_conflicts_with_distinct_messages() {
        let not_available: AppError = AppointmentError::from(SlotConflict::NotAvailable).into();
        let booked: AppError = AppointmentError::from(SlotConflict::AlreadyBooked {
            appointment_id: Uuid::new_v4(),
        }).into();

        match (not_available, booked) {
            (AppError::Conflict(a), AppError::Conflict(b)) => assert_ne!(a, b),
            other => panic!("unexpected mapping: {:?}", other),
        }
    }

    #[test]
    fn store_uniqueness_violation_becomes_slot_already_booked() {
        let err = anyhow::Error::from(SupabaseError::UniqueViolation("23505".to_string()));
        assert!(matches!(AppointmentError::from(err), AppointmentError::SlotAlreadyBooked));
    }

    #[test]
    fn store_foreign_key_violation_is_a_validation_error() {
        let err = anyhow::Error::from(SupabaseError::ForeignKeyViolation("23503".to_string()));
        let err = AppointmentError::from(err);
        assert!(matches!(err, AppointmentError::UnknownReference));
        assert!(matches!(AppError::from(err), AppError::ValidationError(_)));
    }

    #[test]
    fn daily_stats_count_each_status() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let make = |status| Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            appointment_date: date,
            appointment_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            consultation_type: "Control".to_string(),
            reason: None,
            status,
            created_at: None,
            updated_at: None,
        };
        let appointments = vec![
            make(AppointmentStatus::Pending),
            make(AppointmentStatus::Pending),
            make(AppointmentStatus::Cancelled),
            make(AppointmentStatus::Completed),
        ];

        let stats = DailyStats::from_appointments(date, None, &appointments);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.confirmed, 0);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.cancelled, 1);
    }
}
