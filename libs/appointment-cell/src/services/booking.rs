use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use patient_cell::services::PatientService;
use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};
use shared_models::schedule::{format_storage_time, parse_slot_time};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, DailyStats,
    ShiftDirection,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    patients: PatientService,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            patients: PatientService::new(config),
            conflict_service: ConflictDetectionService::new(config, Arc::clone(&supabase)),
            lifecycle_service: AppointmentLifecycleService::new(),
            supabase,
        }
    }

    pub fn conflict_service(&self) -> &ConflictDetectionService {
        &self.conflict_service
    }

    // ==========================================================================
    // BOOKING
    // ==========================================================================

    /// Creates a pending appointment after re-checking the slot. A store
    /// uniqueness violation means another booking won the race and is
    /// reported as [`AppointmentError::SlotAlreadyBooked`]. Unknown patients
    /// and doctors are refused before anything is written.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let patient_id = request.patient_id.ok_or_else(|| missing("patient_id"))?;
        let doctor_id = request.doctor_id.ok_or_else(|| missing("doctor_id"))?;
        let date = request.appointment_date.ok_or_else(|| missing("appointment_date"))?;
        let raw_time = request.appointment_time.as_deref().ok_or_else(|| missing("appointment_time"))?;
        let consultation_type = request
            .consultation_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| missing("consultation_type"))?;
        let time = parse_time(raw_time)?;
        reject_past_date(date)?;

        debug!("Booking patient {} with doctor {} on {} at {}", patient_id, doctor_id, date, time);

        self.patients.get_patient(patient_id, auth_token).await?;
        self.conflict_service
            .validate_assignment(doctor_id, date, time, None, auth_token)
            .await?;

        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let body = json!({
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "appointment_time": format_storage_time(time),
            "consultation_type": consultation_type,
            "reason": reason,
            "status": AppointmentStatus::Pending,
        });

        let created: Vec<Appointment> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await.map_err(|e| {
            let err = AppointmentError::from(e);
            if matches!(err, AppointmentError::SlotAlreadyBooked) {
                warn!("Concurrent booking took doctor {} at {} {}", doctor_id, date, time);
            }
            err
        })?;

        let appointment = created
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Insert returned no appointment".to_string()))?;

        info!("Appointment {} booked for doctor {} on {} at {}",
              appointment.id, doctor_id, date, time);
        Ok(appointment)
    }

    // ==========================================================================
    // RESCHEDULING
    // ==========================================================================

    /// Moves an active appointment to `new_time`, on `new_date` when given
    /// and on its current date otherwise.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        new_time: NaiveTime,
        new_date: Option<NaiveDate>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        if let Some(date) = new_date {
            reject_past_date(date)?;
        }
        let date = new_date.unwrap_or(appointment.appointment_date);

        self.move_appointment(appointment, date, new_time, auth_token).await
    }

    /// Moves an active appointment one catalogue slot earlier or later on
    /// the same date. Appointments on past dates stay where they are.
    pub async fn shift_appointment(
        &self,
        appointment_id: Uuid,
        direction: ShiftDirection,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        reject_past_date(appointment.appointment_date)?;

        let target = self
            .conflict_service
            .engine()
            .adjacent_slot(appointment.appointment_time, direction)
            .ok_or_else(|| {
                let edge = match direction {
                    ShiftDirection::Earlier => "earliest",
                    ShiftDirection::Later => "latest",
                };
                AppointmentError::ValidationError(format!("Appointment is already in the {} slot", edge))
            })?;

        let date = appointment.appointment_date;
        self.move_appointment(appointment, date, target, auth_token).await
    }

    async fn move_appointment(
        &self,
        appointment: Appointment,
        date: NaiveDate,
        time: NaiveTime,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.lifecycle_service.validate_reschedule(appointment.status)?;

        self.conflict_service
            .validate_assignment(appointment.doctor_id, date, time, Some(appointment.id), auth_token)
            .await?;

        let body = json!({
            "appointment_date": date,
            "appointment_time": format_storage_time(time),
            "updated_at": Utc::now(),
        });
        let updated = self.patch_appointment(appointment.id, body, auth_token).await?;

        info!("Appointment {} moved from {} {} to {} {}",
              appointment.id, appointment.appointment_date, appointment.appointment_time, date, time);
        Ok(updated)
    }

    // ==========================================================================
    // STATUS LIFECYCLE
    // ==========================================================================

    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        self.lifecycle_service
            .validate_status_transition(appointment.status, new_status)?;

        if appointment.status == new_status {
            debug!("Appointment {} already {}", appointment_id, new_status);
            return Ok(appointment);
        }

        let body = json!({
            "status": new_status,
            "updated_at": Utc::now(),
        });
        let updated = self.patch_appointment(appointment_id, body, auth_token).await?;

        info!("Appointment {} status changed: {} -> {}", appointment_id, appointment.status, new_status);
        Ok(updated)
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.update_status(appointment_id, AppointmentStatus::Cancelled, auth_token).await
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let appointments: Vec<Appointment> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        appointments.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// Appointments of one day in time order, all statuses included.
    pub async fn daily_schedule(
        &self,
        date: NaiveDate,
        doctor_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut path = format!(
            "/rest/v1/appointments?appointment_date=eq.{}&order=appointment_time.asc",
            urlencoding::encode(&date.to_string())
        );
        if let Some(doctor_id) = doctor_id {
            path.push_str(&format!("&doctor_id=eq.{}", doctor_id));
        }

        let appointments: Vec<Appointment> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        debug!("Found {} appointments on {}", appointments.len(), date);
        Ok(appointments)
    }

    pub async fn daily_stats(
        &self,
        date: NaiveDate,
        doctor_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<DailyStats, AppointmentError> {
        let appointments = self.daily_schedule(date, doctor_id, auth_token).await?;
        Ok(DailyStats::from_appointments(date, doctor_id, &appointments))
    }

    /// A patient's history, most recent first.
    pub async fn patient_appointments(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=appointment_date.desc,appointment_time.desc",
            patient_id
        );
        let appointments: Vec<Appointment> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(appointments)
    }

    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<NaiveTime>, AppointmentError> {
        self.conflict_service.available_slots(doctor_id, date, auth_token).await
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        body: serde_json::Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let updated: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await?;

        updated.into_iter().next().ok_or(AppointmentError::NotFound)
    }
}

fn missing(field: &str) -> AppointmentError {
    AppointmentError::ValidationError(format!("{} is required", field))
}

pub(crate) fn parse_time(raw: &str) -> Result<NaiveTime, AppointmentError> {
    parse_slot_time(raw).ok_or_else(|| AppointmentError::InvalidTime(raw.to_string()))
}

fn reject_past_date(date: NaiveDate) -> Result<(), AppointmentError> {
    if date < Local::now().date_naive() {
        return Err(AppointmentError::ValidationError(format!(
            "Cannot schedule appointments in the past ({})", date
        )));
    }
    Ok(())
}
