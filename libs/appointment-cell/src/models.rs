// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use shared_database::StoreError;
use shared_models::clock;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// An `appointments/{id}` record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub therapist_id: String,
    #[serde(default)]
    pub therapist_name: String,
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub patient_is_anonymous: bool,
    pub date: NaiveDate,
    #[serde(with = "shared_models::clock")]
    pub time: NaiveTime,
    #[serde(default)]
    pub session_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<CancelledBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Scheduled start as a naive local timestamp.
    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.patient_id == user_id || self.therapist_id == user_id
    }

    /// "Mar 10, 2025 at 14:00", as shown in notification text.
    pub fn describe_slot(&self) -> String {
        format!("{} at {}", self.date.format("%b %-d, %Y"), clock::format(&self.time))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Accepted => "accepted",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Rejected | AppointmentStatus::Cancelled | AppointmentStatus::Completed
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CancelledBy {
    Patient,
    Therapist,
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub therapist_id: String,
    pub date: String,
    pub time: String,
    #[serde(default = "default_session_type")]
    pub session_type: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

fn default_session_type() -> String {
    "Video".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

/// Appointment as returned to clients, id included.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    pub id: String,
    #[serde(flatten)]
    pub appointment: Appointment,
}

impl From<Appointment> for AppointmentView {
    fn from(appointment: Appointment) -> Self {
        Self {
            id: appointment.id.clone(),
            appointment,
        }
    }
}

/// The three lists on the appointments page.
#[derive(Debug, Clone, Default)]
pub struct AppointmentBuckets {
    pub upcoming: Vec<Appointment>,
    pub pending: Vec<Appointment>,
    pub past: Vec<Appointment>,
}

impl AppointmentBuckets {
    pub fn into_views(self) -> serde_json::Value {
        let views = |list: Vec<Appointment>| -> Vec<AppointmentView> {
            list.into_iter().map(Into::into).collect()
        };
        serde_json::json!({
            "upcoming": views(self.upcoming),
            "pending": views(self.pending),
            "past": views(self.past),
        })
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment was modified concurrently")]
    ConcurrentModification,

    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Therapist not found")]
    TherapistNotFound,

    #[error("Invalid appointment date: {0}")]
    InvalidDate(String),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Appointment has not taken place yet")]
    NotYetDue,

    #[error("Pending appointments cannot be deleted")]
    DeletePending,

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Malformed appointment record: {0}")]
    Serialization(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppointmentError::StoreUnavailable(msg),
            StoreError::NotFound { .. } => AppointmentError::NotFound,
            StoreError::Serialization(msg) => AppointmentError::Serialization(msg),
        }
    }
}
