//! # Chat Cell
//!
//! One conversation per pair of users, identified by the two user ids sorted
//! and joined with `_`. Messages are appended to `chatMessages`, the
//! conversation record carries the latest message for inbox listings, and
//! live readers follow a conversation through the change feed.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{ChatError, ChatMessage, Conversation, MAX_MESSAGE_CHARS};
pub use router::chat_routes;
pub use services::registry::{conversation_id, ChatService};
