//! Wall-clock slot values as they travel between the API, the store and the
//! scheduling code. The store keeps `time` columns (`HH:MM:SS`); callers use
//! `HH:MM`.

use chrono::{NaiveTime, Timelike};

pub const SLOT_FORMAT: &str = "%H:%M";
pub const STORAGE_FORMAT: &str = "%H:%M:%S";

/// Accepts `HH:MM` and `HH:MM:SS`. Seconds are dropped, slots are minute
/// granular.
pub fn parse_slot_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, STORAGE_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, SLOT_FORMAT))
        .ok()
        .and_then(|t| NaiveTime::from_hms_opt(t.hour(), t.minute(), 0))
}

pub fn format_slot_time(time: NaiveTime) -> String {
    time.format(SLOT_FORMAT).to_string()
}

pub fn format_storage_time(time: NaiveTime) -> String {
    time.format(STORAGE_FORMAT).to_string()
}

/// Serde adapter for `NaiveTime` fields holding a slot.
pub mod slot_time {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_slot_time(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_slot_time(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid slot time '{}'", raw)))
    }
}
