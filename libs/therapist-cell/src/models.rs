use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use appointment_cell::{AppointmentError, AppointmentStatus};
use shared_database::StoreError;
use shared_models::user::UserProfile;

/// Directory entry shown to patients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistListing {
    pub id: String,
    pub display_name: String,
    pub specialties: Vec<String>,
    pub bio: Option<String>,
    pub session_types: Vec<String>,
    pub session_fee: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl From<UserProfile> for TherapistListing {
    fn from(profile: UserProfile) -> Self {
        Self {
            display_name: profile.label(),
            session_types: profile.offered_session_types(),
            id: profile.id,
            specialties: profile.specialties,
            bio: profile.bio,
            session_fee: profile.session_fee,
            photo_url: profile.photo_url,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatientStatus {
    /// Next appointment is accepted.
    Active,
    /// A single request, nothing in the past yet.
    New,
    Inactive,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRef {
    pub id: String,
    pub date: NaiveDate,
    #[serde(with = "shared_models::clock")]
    pub time: NaiveTime,
    pub status: AppointmentStatus,
}

/// One row of the therapist's patient list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub patient_id: String,
    pub name: String,
    pub email: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub appointment_count: usize,
    pub last_appointment: Option<AppointmentRef>,
    pub next_appointment: Option<AppointmentRef>,
    pub status: PatientStatus,
}

/// A `therapistNotes/{id}` record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistNote {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub therapist_id: String,
    pub patient_id: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveNoteRequest {
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryQuery {
    pub specialty: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TherapistError {
    #[error("Therapist {0} not found")]
    TherapistNotFound(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Malformed record: {0}")]
    Serialization(String),
}

impl From<StoreError> for TherapistError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => TherapistError::StoreUnavailable(msg),
            StoreError::NotFound { collection, id } => {
                TherapistError::StoreUnavailable(format!("{}/{} disappeared", collection, id))
            }
            StoreError::Serialization(msg) => TherapistError::Serialization(msg),
        }
    }
}

impl From<AppointmentError> for TherapistError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::StoreUnavailable(msg) => TherapistError::StoreUnavailable(msg),
            other => TherapistError::Serialization(other.to_string()),
        }
    }
}
