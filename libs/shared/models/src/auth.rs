use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Clinic staff roles. Patients never sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Doctor,
    Receptionist,
    Administrator,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Doctor => write!(f, "doctor"),
            UserRole::Receptionist => write!(f, "receptionist"),
            UserRole::Administrator => write!(f, "administrator"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doctor" => Ok(UserRole::Doctor),
            "receptionist" => Ok(UserRole::Receptionist),
            "administrator" | "admin" => Ok(UserRole::Administrator),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The authenticated caller. Built by the auth middleware from the bearer
/// token and handed to handlers through request extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn clinic_role(&self) -> Option<UserRole> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }

    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        self.clinic_role().is_some_and(|r| roles.contains(&r))
    }
}
