use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use tracing::{debug, warn};
use uuid::Uuid;

use doctor_cell::models::AvailabilityConfig;
use doctor_cell::services::{AvailabilityService, DoctorService};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError};
use crate::services::slots::AvailabilityEngine;

/// Store-backed front of [`AvailabilityEngine`]: loads a doctor's rules and
/// active appointments for a date and asks the engine.
pub struct ConflictDetectionService {
    supabase: Arc<SupabaseClient>,
    doctors: DoctorService,
    availability: AvailabilityService,
    engine: AvailabilityEngine,
}

impl ConflictDetectionService {
    pub fn new(config: &AppConfig, supabase: Arc<SupabaseClient>) -> Self {
        Self {
            supabase,
            doctors: DoctorService::new(config),
            availability: AvailabilityService::new(config),
            engine: AvailabilityEngine::new(config.slot_catalogue.clone()),
        }
    }

    pub fn engine(&self) -> &AvailabilityEngine {
        &self.engine
    }

    /// Pending and confirmed appointments of a doctor on one date.
    pub async fn active_appointments(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Fetching active appointments for doctor {} on {}", doctor_id, date);

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&status=in.(pending,confirmed)&order=appointment_time.asc",
            doctor_id, date
        );
        let appointments: Vec<Appointment> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(appointments)
    }

    /// An unknown doctor fails with [`AppointmentError::DoctorNotFound`]
    /// instead of reading as a doctor without availability.
    async fn load_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<(AvailabilityConfig, Vec<Appointment>), AppointmentError> {
        self.doctors.get_doctor(doctor_id, auth_token).await?;
        let config = self.availability.get_availability_config(doctor_id, auth_token).await?;
        let booked = self.active_appointments(doctor_id, date, auth_token).await?;
        Ok((config, booked))
    }

    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<NaiveTime>, AppointmentError> {
        let (config, booked) = self.load_day(doctor_id, date, auth_token).await?;
        let slots = self.engine.available_slots(&config, &booked, date);

        debug!("Doctor {} has {} open slots on {}", doctor_id, slots.len(), date);
        Ok(slots)
    }

    /// Fails with [`AppointmentError::Conflict`] when the slot cannot be
    /// assigned. Every write path calls this right before committing.
    pub async fn validate_assignment(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let (config, booked) = self.load_day(doctor_id, date, auth_token).await?;

        self.engine
            .validate_assignment(&config, &booked, date, time, exclude_appointment_id)
            .map_err(|conflict| {
                warn!("Slot {} on {} refused for doctor {}: {}", time, date, doctor_id, conflict);
                AppointmentError::Conflict(conflict)
            })
    }
}
