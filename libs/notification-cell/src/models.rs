use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use shared_database::StoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationType {
    Message,
    Appointment,
    VideoCall,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationType::Message => write!(f, "message"),
            NotificationType::Appointment => write!(f, "appointment"),
            NotificationType::VideoCall => write!(f, "video-call"),
        }
    }
}

/// The `type` field together with the auxiliary field that type carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NotificationData {
    #[serde(rename_all = "camelCase")]
    Message { sender_id: String },
    #[serde(rename_all = "camelCase")]
    Appointment { appointment_id: String },
    #[serde(rename_all = "camelCase")]
    VideoCall { call_id: String },
}

impl NotificationData {
    pub fn kind(&self) -> NotificationType {
        match self {
            NotificationData::Message { .. } => NotificationType::Message,
            NotificationData::Appointment { .. } => NotificationType::Appointment,
            NotificationData::VideoCall { .. } => NotificationType::VideoCall,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub user_id: String,
    pub message: String,
    #[serde(flatten)]
    pub data: NotificationData,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn kind(&self) -> NotificationType {
        self.data.kind()
    }
}

/// Notification as returned to clients, id included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    #[serde(flatten)]
    pub notification: Notification,
}

impl From<Notification> for NotificationView {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id.clone(),
            notification,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotificationError {
    #[error("Recipient {0} does not exist")]
    RecipientNotFound(String),

    #[error("Notification {0} not found")]
    NotFound(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Malformed notification record: {0}")]
    Serialization(String),
}

impl From<StoreError> for NotificationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => NotificationError::StoreUnavailable(msg),
            StoreError::NotFound { id, .. } => NotificationError::NotFound(id),
            StoreError::Serialization(msg) => NotificationError::Serialization(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_wire_format() {
        let notification = Notification {
            id: "n1".to_string(),
            user_id: "t1".to_string(),
            message: "New appointment request".to_string(),
            data: NotificationData::Appointment { appointment_id: "a1".to_string() },
            read: false,
            created_at: "2025-03-10T14:00:00Z".parse().unwrap(),
        };

        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["type"], "appointment");
        assert_eq!(value["appointmentId"], "a1");
        assert_eq!(value["userId"], "t1");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_video_call_type_is_kebab_case() {
        let parsed: Notification = serde_json::from_value(json!({
            "userId": "u1",
            "message": "Dr. A is inviting you to a video call",
            "type": "video-call",
            "callId": "c1",
            "createdAt": "2025-03-10T14:00:00Z"
        }))
        .unwrap();

        assert_eq!(parsed.kind(), NotificationType::VideoCall);
        assert!(!parsed.read);
        assert_eq!(parsed.data, NotificationData::VideoCall { call_id: "c1".to_string() });
    }
}
