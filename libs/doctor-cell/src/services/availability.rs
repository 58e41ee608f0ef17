use chrono::NaiveTime;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::schedule::{format_slot_time, parse_slot_time};

use crate::models::{
    AvailabilityConfig, AvailabilityResponse, AvailabilityRow, ClinicDay, DoctorError,
    SaveAvailabilityRequest, WeeklyAvailabilityRule,
};

/// Reads and replaces the weekly availability rules of doctors.
pub struct AvailabilityService {
    supabase: SupabaseClient,
    slot_catalogue: Vec<NaiveTime>,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            slot_catalogue: config.slot_catalogue.clone(),
        }
    }

    /// Current configuration of a doctor, decoded from the stored rows.
    pub async fn get_availability_config(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<AvailabilityConfig, DoctorError> {
        debug!("Fetching availability rules for doctor: {}", doctor_id);

        let path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&order=day_of_week.asc,time_slot.asc",
            doctor_id
        );
        let rows: Vec<AvailabilityRow> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let config = AvailabilityConfig::from_rows(&rows);
        debug!("Doctor {} availability state: {:?}", doctor_id, config.state());
        Ok(config)
    }

    pub async fn get_weekly_grid(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<AvailabilityResponse, DoctorError> {
        let config = self.get_availability_config(doctor_id, auth_token).await?;
        Ok(AvailabilityResponse::new(doctor_id, &config))
    }

    /// Replaces every rule of the doctor: delete all, then insert the new
    /// set. An empty pick list stores the "configured but empty" marker.
    pub async fn replace_availability(
        &self,
        doctor_id: Uuid,
        request: SaveAvailabilityRequest,
        auth_token: &str,
    ) -> Result<AvailabilityConfig, DoctorError> {
        let rules = self.validate_picks(&request)?;
        let config = AvailabilityConfig::from_rules(rules);
        let rows = config.to_rows(doctor_id);

        debug!("Replacing availability for doctor {} with {} rows", doctor_id, rows.len());

        let path = format!("/rest/v1/doctor_availability?doctor_id=eq.{}", doctor_id);
        self.supabase.execute(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if let Err(e) = self.supabase.execute(
            Method::POST,
            "/rest/v1/doctor_availability",
            Some(auth_token),
            Some(json!(rows)),
        ).await {
            warn!("Availability rows for doctor {} were deleted but not re-inserted: {}", doctor_id, e);
            return Err(e.into());
        }

        info!("Availability for doctor {} saved as {:?}", doctor_id, config.state());
        Ok(config)
    }

    fn validate_picks(
        &self,
        request: &SaveAvailabilityRequest,
    ) -> Result<Vec<WeeklyAvailabilityRule>, DoctorError> {
        request
            .slots
            .iter()
            .map(|pick| {
                let day_of_week = ClinicDay::new(pick.day_of_week)?;
                let time_slot = parse_slot_time(&pick.time_slot)
                    .ok_or_else(|| DoctorError::InvalidTimeSlot(pick.time_slot.clone()))?;

                if !self.slot_catalogue.contains(&time_slot) {
                    return Err(DoctorError::SlotOutsideCatalogue(format_slot_time(time_slot)));
                }

                Ok(WeeklyAvailabilityRule {
                    day_of_week,
                    time_slot,
                    is_available: true,
                })
            })
            .collect()
    }
}
