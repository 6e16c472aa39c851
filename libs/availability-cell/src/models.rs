use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use shared_database::StoreError;

/// An `availability/{id}` record: one bookable time for one therapist on one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub therapist_id: String,
    pub date: NaiveDate,
    #[serde(with = "shared_models::clock")]
    pub time: NaiveTime,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub id: String,
    #[serde(flatten)]
    pub slot: AvailabilitySlot,
}

impl From<AvailabilitySlot> for SlotView {
    fn from(slot: AvailabilitySlot) -> Self {
        Self {
            id: slot.id.clone(),
            slot,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetSlotRequest {
    pub date: String,
    pub time: String,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Therapist not found: {0}")]
    TherapistNotFound(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Malformed availability record: {0}")]
    Serialization(String),
}

impl From<StoreError> for AvailabilityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AvailabilityError::StoreUnavailable(msg),
            StoreError::NotFound { collection, id } => {
                AvailabilityError::StoreUnavailable(format!("{}/{} disappeared", collection, id))
            }
            StoreError::Serialization(msg) => AvailabilityError::Serialization(msg),
        }
    }
}
