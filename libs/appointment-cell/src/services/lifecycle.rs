use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed. Re-applying the
    /// current status is accepted and leaves the appointment unchanged.
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if current_status == new_status {
            return Ok(());
        }

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Only appointments still holding a slot can move to another one.
    pub fn validate_reschedule(&self, current_status: AppointmentStatus) -> Result<(), AppointmentError> {
        if current_status.is_active() {
            Ok(())
        } else {
            Err(AppointmentError::NotReschedulable(current_status))
        }
    }
}
