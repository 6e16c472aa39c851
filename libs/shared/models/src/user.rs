use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Patient,
    Therapist,
    Guest,
    Anonymous,
    /// Any role string this backend does not know about.
    #[serde(other)]
    Unknown,
}

impl UserRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "patient" => Some(UserRole::Patient),
            "therapist" => Some(UserRole::Therapist),
            "guest" => Some(UserRole::Guest),
            "anonymous" => Some(UserRole::Anonymous),
            _ => None,
        }
    }
}

/// A `users/{id}` record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    #[serde(skip_serializing)]
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub specialties: Vec<String>,
    pub bio: Option<String>,
    pub session_types: Vec<String>,
    pub session_fee: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub unread_notifications: i64,
    pub is_anonymous: bool,
}

impl UserProfile {
    pub fn is_therapist(&self) -> bool {
        self.role == Some(UserRole::Therapist)
    }

    pub fn label(&self) -> String {
        if self.is_anonymous {
            return "Anonymous User".to_string();
        }
        if !self.display_name.is_empty() {
            return self.display_name.clone();
        }
        self.email.clone().unwrap_or_else(|| "Unknown User".to_string())
    }

    /// Session types offered, with the booking form's defaults when none are listed.
    pub fn offered_session_types(&self) -> Vec<String> {
        if self.session_types.is_empty() {
            vec!["Video".to_string(), "Phone".to_string(), "In-person".to_string()]
        } else {
            self.session_types.clone()
        }
    }
}
