//! Slot availability for one doctor on one date.
//!
//! The engine combines three inputs: the clinic's slot catalogue, the
//! doctor's weekly [`AvailabilityConfig`] and the doctor's appointments. It
//! performs no I/O; callers fetch the inputs and hand them in.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use doctor_cell::models::{AvailabilityConfig, ClinicDay};

use crate::models::{Appointment, ShiftDirection, SlotConflict};

#[derive(Debug, Clone)]
pub struct AvailabilityEngine {
    catalogue: Vec<NaiveTime>,
}

impl AvailabilityEngine {
    pub fn new(mut catalogue: Vec<NaiveTime>) -> Self {
        catalogue.sort();
        catalogue.dedup();
        Self { catalogue }
    }

    pub fn catalogue(&self) -> &[NaiveTime] {
        &self.catalogue
    }

    /// Slots the doctor works on `date`, before bookings are considered.
    pub fn structural_slots(&self, config: &AvailabilityConfig, date: NaiveDate) -> Vec<NaiveTime> {
        let Some(day) = ClinicDay::from_date(date) else {
            return Vec::new();
        };

        match config {
            AvailabilityConfig::Unset => self.catalogue.clone(),
            AvailabilityConfig::Empty => Vec::new(),
            AvailabilityConfig::Rules(schedule) => self
                .catalogue
                .iter()
                .copied()
                .filter(|slot| schedule.is_available(day, *slot))
                .collect(),
        }
    }

    /// Bookable slots for `date`, ascending. `booked` may hold appointments
    /// of any status and date; only active ones on `date` take a slot away.
    pub fn available_slots(
        &self,
        config: &AvailabilityConfig,
        booked: &[Appointment],
        date: NaiveDate,
    ) -> Vec<NaiveTime> {
        let taken: BTreeSet<NaiveTime> = booked
            .iter()
            .filter(|a| a.status.is_active() && a.appointment_date == date)
            .map(|a| a.appointment_time)
            .collect();

        self.structural_slots(config, date)
            .into_iter()
            .filter(|slot| !taken.contains(slot))
            .collect()
    }

    /// Checks that `time` on `date` can be given to a new or moved
    /// appointment. Structural availability is checked before occupancy.
    /// `exclude_appointment_id` is the appointment being moved, so it never
    /// conflicts with itself.
    pub fn validate_assignment(
        &self,
        config: &AvailabilityConfig,
        booked: &[Appointment],
        date: NaiveDate,
        time: NaiveTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<(), SlotConflict> {
        if !self.structural_slots(config, date).contains(&time) {
            return Err(SlotConflict::NotAvailable);
        }

        let holder = booked
            .iter()
            .filter(|a| Some(a.id) != exclude_appointment_id)
            .find(|a| a.occupies(date, time));

        match holder {
            Some(appointment) => Err(SlotConflict::AlreadyBooked {
                appointment_id: appointment.id,
            }),
            None => Ok(()),
        }
    }

    /// The catalogue slot next to `time`, or `None` at either end.
    pub fn adjacent_slot(&self, time: NaiveTime, direction: ShiftDirection) -> Option<NaiveTime> {
        match direction {
            ShiftDirection::Earlier => self.catalogue.iter().rev().find(|slot| **slot < time).copied(),
            ShiftDirection::Later => self.catalogue.iter().find(|slot| **slot > time).copied(),
        }
    }
}
