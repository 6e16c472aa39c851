use serde::{Deserialize, Serialize};

use shared_database::StoreError;
use shared_models::user::UserProfile;

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: String,
    #[serde(flatten)]
    pub profile: UserProfile,
}

impl From<UserProfile> for ProfileView {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            profile,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
}

/// Directory fields a therapist edits. Absent fields are left as stored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub specialties: Option<Vec<String>>,
    pub session_types: Option<Vec<String>>,
    pub session_fee: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Only therapists can edit directory details")]
    NotTherapist,

    #[error("Invalid {0}")]
    InvalidField(&'static str),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Malformed profile record: {0}")]
    Serialization(String),
}

impl From<StoreError> for ProfileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ProfileError::StoreUnavailable(msg),
            StoreError::NotFound { id, .. } => ProfileError::NotFound(id),
            StoreError::Serialization(msg) => ProfileError::Serialization(msg),
        }
    }
}
