use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserRole;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub name: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// The caller of a request, as established by the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub display_name: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn user_role(&self) -> Option<UserRole> {
        self.role.as_deref().and_then(UserRole::parse)
    }

    pub fn is_therapist(&self) -> bool {
        self.user_role() == Some(UserRole::Therapist)
    }

    /// Name shown to other users; falls back to the email like the signup flow does.
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| "Anonymous User".to_string())
    }
}
