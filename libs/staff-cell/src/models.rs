use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::supabase::{store_error, SupabaseError};
use shared_models::error::AppError;

/// Which directory a staff member lives in. Each kind has its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffKind {
    Doctor,
    Receptionist,
    Administrator,
}

impl StaffKind {
    pub const ALL: [StaffKind; 3] = [StaffKind::Doctor, StaffKind::Receptionist, StaffKind::Administrator];

    pub fn table(self) -> &'static str {
        match self {
            StaffKind::Doctor => "doctors",
            StaffKind::Receptionist => "receptionists",
            StaffKind::Administrator => "administrators",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StaffKind::Doctor => "doctor",
            StaffKind::Receptionist => "receptionist",
            StaffKind::Administrator => "administrator",
        }
    }
}

impl fmt::Display for StaffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaffKind {
    type Err = StaffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StaffKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StaffError::ValidationError(format!("Unknown staff kind '{}'", s)))
    }
}

/// A row of any of the three staff tables. Only doctors carry a specialty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffRow {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub kind: StaffKind,
    #[serde(flatten)]
    pub row: StaffRow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStaffRequest {
    pub kind: StaffKind,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialty: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StaffError {
    #[error("Staff member not found")]
    NotFound,

    #[error("A staff member with this email already exists")]
    DuplicateEmail,

    /// Deleting would orphan appointments, notes or availability rows.
    #[error("Staff member is still referenced by clinic records")]
    StillReferenced,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for StaffError {
    fn from(err: anyhow::Error) -> Self {
        match store_error(&err) {
            Some(SupabaseError::UniqueViolation(_)) => StaffError::DuplicateEmail,
            Some(SupabaseError::ForeignKeyViolation(_)) => StaffError::StillReferenced,
            Some(SupabaseError::NotFound(_)) => StaffError::NotFound,
            _ => StaffError::DatabaseError(err.to_string()),
        }
    }
}

impl From<StaffError> for AppError {
    fn from(err: StaffError) -> Self {
        match err {
            StaffError::NotFound => AppError::NotFound(err.to_string()),
            StaffError::DuplicateEmail | StaffError::StillReferenced => AppError::Conflict(err.to_string()),
            StaffError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            StaffError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
