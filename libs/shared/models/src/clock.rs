//! Wall-clock times as the booking screens write them: "9:00", "14:30".
//! Use with `#[serde(with = "shared_models::clock")]` on a `NaiveTime` field.

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serializer};

/// Accepts `H:mm` and `HH:mm`.
pub fn parse(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

pub fn format(time: &NaiveTime) -> String {
    time.format("%-H:%M").to_string()
}

pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(time))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid clock time: {}", raw)))
}
