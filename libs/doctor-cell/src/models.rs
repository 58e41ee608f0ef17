use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::schedule::{format_slot_time, format_storage_time, parse_slot_time, slot_time};

/// Row marker meaning "configured, nothing available". Stored as
/// `(day_of_week = 0, time_slot = '00:00:00', is_available = false)`.
pub const SENTINEL_DAY_OF_WEEK: i32 = 0;

// ==============================================================================
// DOCTOR DIRECTORY
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

// ==============================================================================
// WEEKLY AVAILABILITY
// ==============================================================================

/// A day the clinic can open: Monday (1) through Saturday (6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct ClinicDay(u8);

impl ClinicDay {
    pub const ALL: [ClinicDay; 6] = [
        ClinicDay(1), ClinicDay(2), ClinicDay(3),
        ClinicDay(4), ClinicDay(5), ClinicDay(6),
    ];

    pub fn new(day_of_week: i32) -> Result<Self, DoctorError> {
        match day_of_week {
            1..=6 => Ok(ClinicDay(day_of_week as u8)),
            other => Err(DoctorError::InvalidDay(other)),
        }
    }

    /// `None` on Sundays, which no rule can cover.
    pub fn from_date(date: NaiveDate) -> Option<Self> {
        match date.weekday().num_days_from_sunday() {
            0 => None,
            day => Some(ClinicDay(day as u8)),
        }
    }

    pub fn number(self) -> i32 {
        self.0 as i32
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            1 => "monday",
            2 => "tuesday",
            3 => "wednesday",
            4 => "thursday",
            5 => "friday",
            _ => "saturday",
        }
    }
}

impl TryFrom<i32> for ClinicDay {
    type Error = DoctorError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        ClinicDay::new(value)
    }
}

impl From<ClinicDay> for i32 {
    fn from(day: ClinicDay) -> Self {
        day.number()
    }
}

impl fmt::Display for ClinicDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAvailabilityRule {
    pub day_of_week: ClinicDay,
    #[serde(with = "slot_time")]
    pub time_slot: NaiveTime,
    pub is_available: bool,
}

/// Available slots per clinic day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeeklySchedule {
    days: BTreeMap<ClinicDay, BTreeSet<NaiveTime>>,
}

impl WeeklySchedule {
    /// Later rules win when two rules name the same day and slot.
    pub fn from_rules<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = WeeklyAvailabilityRule>,
    {
        let mut schedule = WeeklySchedule::default();
        for rule in rules {
            if rule.is_available {
                schedule.days.entry(rule.day_of_week).or_default().insert(rule.time_slot);
            } else if let Some(slots) = schedule.days.get_mut(&rule.day_of_week) {
                slots.remove(&rule.time_slot);
            }
        }
        schedule.days.retain(|_, slots| !slots.is_empty());
        schedule
    }

    pub fn is_available(&self, day: ClinicDay, slot: NaiveTime) -> bool {
        self.days.get(&day).is_some_and(|slots| slots.contains(&slot))
    }

    /// Ascending slots marked available on `day`.
    pub fn slots_for(&self, day: ClinicDay) -> Vec<NaiveTime> {
        self.days
            .get(&day)
            .map(|slots| slots.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn rules(&self) -> Vec<WeeklyAvailabilityRule> {
        self.days
            .iter()
            .flat_map(|(day, slots)| {
                slots.iter().map(move |slot| WeeklyAvailabilityRule {
                    day_of_week: *day,
                    time_slot: *slot,
                    is_available: true,
                })
            })
            .collect()
    }
}

/// What a doctor has told the clinic about their week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "schedule", rename_all = "snake_case")]
pub enum AvailabilityConfig {
    /// Never used the availability editor; every catalogue slot is open.
    Unset,
    /// Saved an empty grid; nothing is open on any day.
    Empty,
    /// Day-specific rules.
    Rules(WeeklySchedule),
}

impl AvailabilityConfig {
    /// Builds a configuration from editor picks. A grid with no available
    /// slot is `Empty`, never `Unset`.
    pub fn from_rules(rules: Vec<WeeklyAvailabilityRule>) -> Self {
        let schedule = WeeklySchedule::from_rules(rules);
        if schedule.is_empty() {
            AvailabilityConfig::Empty
        } else {
            AvailabilityConfig::Rules(schedule)
        }
    }

    /// Decodes the stored rows of one doctor.
    pub fn from_rows(rows: &[AvailabilityRow]) -> Self {
        if rows.is_empty() {
            return AvailabilityConfig::Unset;
        }

        let mut rules = Vec::new();
        for row in rows {
            if row.is_sentinel() {
                continue;
            }
            let Ok(day) = ClinicDay::new(row.day_of_week) else {
                warn!("Ignoring availability row with day_of_week {} for doctor {}",
                      row.day_of_week, row.doctor_id);
                continue;
            };
            let Some(time_slot) = parse_slot_time(&row.time_slot) else {
                warn!("Ignoring availability row with time_slot '{}' for doctor {}",
                      row.time_slot, row.doctor_id);
                continue;
            };
            rules.push(WeeklyAvailabilityRule {
                day_of_week: day,
                time_slot,
                is_available: row.is_available,
            });
        }

        AvailabilityConfig::from_rules(rules)
    }

    /// Rows that reproduce this configuration after a wholesale replace.
    pub fn to_rows(&self, doctor_id: Uuid) -> Vec<AvailabilityRow> {
        match self {
            AvailabilityConfig::Unset => Vec::new(),
            AvailabilityConfig::Empty => vec![AvailabilityRow::sentinel(doctor_id)],
            AvailabilityConfig::Rules(schedule) if schedule.is_empty() => {
                vec![AvailabilityRow::sentinel(doctor_id)]
            }
            AvailabilityConfig::Rules(schedule) => schedule
                .rules()
                .into_iter()
                .map(|rule| AvailabilityRow {
                    id: None,
                    doctor_id,
                    day_of_week: rule.day_of_week.number(),
                    time_slot: format_storage_time(rule.time_slot),
                    is_available: true,
                })
                .collect(),
        }
    }

    pub fn state(&self) -> AvailabilityState {
        match self {
            AvailabilityConfig::Unset => AvailabilityState::Unset,
            AvailabilityConfig::Empty => AvailabilityState::Empty,
            AvailabilityConfig::Rules(_) => AvailabilityState::Configured,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityState {
    Unset,
    Empty,
    Configured,
}

/// Storage shape of `doctor_availability`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub doctor_id: Uuid,
    pub day_of_week: i32,
    pub time_slot: String,
    pub is_available: bool,
}

impl AvailabilityRow {
    pub fn sentinel(doctor_id: Uuid) -> Self {
        Self {
            id: None,
            doctor_id,
            day_of_week: SENTINEL_DAY_OF_WEEK,
            time_slot: "00:00:00".to_string(),
            is_available: false,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.day_of_week == SENTINEL_DAY_OF_WEEK && !self.is_available
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityPick {
    pub day_of_week: i32,
    pub time_slot: String,
}

/// Full replacement of a doctor's weekly grid. Only picked slots are
/// available; an empty list blocks every day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAvailabilityRequest {
    pub slots: Vec<AvailabilityPick>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAvailability {
    pub day_of_week: i32,
    pub day_name: String,
    pub slots: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub doctor_id: Uuid,
    pub state: AvailabilityState,
    pub days: Vec<DayAvailability>,
}

impl AvailabilityResponse {
    pub fn new(doctor_id: Uuid, config: &AvailabilityConfig) -> Self {
        let days = ClinicDay::ALL
            .iter()
            .map(|day| DayAvailability {
                day_of_week: day.number(),
                day_name: day.name().to_string(),
                slots: match config {
                    AvailabilityConfig::Rules(schedule) => schedule
                        .slots_for(*day)
                        .into_iter()
                        .map(format_slot_time)
                        .collect(),
                    _ => Vec::new(),
                },
            })
            .collect();

        Self {
            doctor_id,
            state: config.state(),
            days,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Day of week must be between 1 (Monday) and 6 (Saturday), got {0}")]
    InvalidDay(i32),

    #[error("Invalid time slot '{0}', expected HH:MM")]
    InvalidTimeSlot(String),

    #[error("Time slot {0} is not part of the clinic schedule")]
    SlotOutsideCatalogue(String),

    #[error("Only the doctor can change their own availability")]
    NotOwner,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for DoctorError {
    fn from(err: anyhow::Error) -> Self {
        DoctorError::DatabaseError(err.to_string())
    }
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound(err.to_string()),
            DoctorError::InvalidDay(_)
            | DoctorError::InvalidTimeSlot(_)
            | DoctorError::SlotOutsideCatalogue(_) => AppError::ValidationError(err.to_string()),
            DoctorError::NotOwner => AppError::Forbidden(err.to_string()),
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
