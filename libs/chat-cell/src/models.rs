use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_database::StoreError;

pub const MAX_MESSAGE_CHARS: usize = 500;

/// A `chats/{id}` record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub participants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// The participant that is not `user_id`.
    pub fn partner_of(&self, user_id: &str) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.as_str() != user_id)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: String,
    pub receiver_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: String,
    #[serde(flatten)]
    pub message: ChatMessage,
}

impl From<ChatMessage> for MessageView {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id.clone(),
            message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: String,
    pub partner_id: Option<String>,
    #[serde(flatten)]
    pub conversation: Conversation,
}

impl ConversationView {
    pub fn for_user(conversation: Conversation, user_id: &str) -> Self {
        Self {
            id: conversation.id.clone(),
            partner_id: conversation.partner_of(user_id).map(str::to_string),
            conversation,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChatError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Message is {0} characters, the limit is {max}", max = MAX_MESSAGE_CHARS)]
    MessageTooLong(usize),

    #[error("User {0} is not a participant in this conversation")]
    NotParticipant(String),

    #[error("Invalid conversation: {0}")]
    InvalidConversation(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Malformed chat record: {0}")]
    Serialization(String),
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ChatError::StoreUnavailable(msg),
            StoreError::NotFound { collection, id } => {
                ChatError::InvalidConversation(format!("{}/{} not found", collection, id))
            }
            StoreError::Serialization(msg) => ChatError::Serialization(msg),
        }
    }
}
