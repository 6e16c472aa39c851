use serde::{Deserialize, Serialize};

use notification_cell::NotificationError;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoCallInvite {
    pub call_id: String,
    pub callee_id: String,
    pub join_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub callee_id: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VideoCallError {
    #[error("Recipient {0} does not exist")]
    RecipientNotFound(String),

    #[error("Cannot start a video call with yourself")]
    SelfCall,

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Malformed record: {0}")]
    Serialization(String),
}

impl From<NotificationError> for VideoCallError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::RecipientNotFound(id) => VideoCallError::RecipientNotFound(id),
            NotificationError::StoreUnavailable(msg) => VideoCallError::StoreUnavailable(msg),
            NotificationError::NotFound(id) => VideoCallError::RecipientNotFound(id),
            NotificationError::Serialization(msg) => VideoCallError::Serialization(msg),
        }
    }
}
