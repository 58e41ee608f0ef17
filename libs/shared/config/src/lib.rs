use std::env;

use chrono::NaiveTime;
use tracing::warn;

/// Half-hour slots offered by the reference deployment: mornings until
/// 12:30 and afternoons from 14:00 to 17:00.
pub const DEFAULT_SLOT_CATALOGUE: &[&str] = &[
    "08:00", "08:30", "09:00", "09:30", "10:00", "10:30", "11:00", "11:30",
    "12:00", "12:30", "14:00", "14:30", "15:00", "15:30", "16:00", "16:30", "17:00",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub slot_catalogue: Vec<NaiveTime>,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            slot_catalogue: match env::var("CLINIC_SLOT_CATALOGUE") {
                Ok(raw) => parse_slot_catalogue(&raw).unwrap_or_else(|e| {
                    warn!("Invalid CLINIC_SLOT_CATALOGUE ({}), using default", e);
                    default_slot_catalogue()
                }),
                Err(_) => default_slot_catalogue(),
            },
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

pub fn default_slot_catalogue() -> Vec<NaiveTime> {
    DEFAULT_SLOT_CATALOGUE
        .iter()
        .filter_map(|s| NaiveTime::parse_from_str(s, "%H:%M").ok())
        .collect()
}

/// Parses a comma separated list of `HH:MM` values. The result is sorted and
/// free of duplicates; an empty list is rejected.
pub fn parse_slot_catalogue(raw: &str) -> Result<Vec<NaiveTime>, String> {
    let mut slots = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveTime::parse_from_str(s, "%H:%M")
                .map_err(|_| format!("'{}' is not an HH:MM time", s))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if slots.is_empty() {
        return Err("slot catalogue is empty".to_string());
    }

    slots.sort();
    slots.dedup();
    Ok(slots)
}
