use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::{future, stream, stream::BoxStream, StreamExt};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use notification_cell::NotificationService;
use shared_database::{
    collections, to_fields, ChangeFeed, Document, DocumentStore, Query, SortOrder,
};
use shared_utils::AppState;

use crate::models::{ChatError, ChatMessage, Conversation, MAX_MESSAGE_CHARS};

const PREVIEW_CHARS: usize = 50;

/// Both orders of the same pair give the same id.
pub fn conversation_id(a: &str, b: &str) -> String {
    let mut pair = [a, b];
    pair.sort_unstable();
    pair.join("_")
}

pub fn chat_topic(conversation_id: &str) -> String {
    format!("chat:{}", conversation_id)
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

fn validate_text(text: &str) -> Result<(), ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    let length = text.chars().count();
    if length > MAX_MESSAGE_CHARS {
        return Err(ChatError::MessageTooLong(length));
    }
    Ok(())
}

fn parse_event(event: Value) -> Option<ChatMessage> {
    match Document::from_row(event).and_then(|doc| doc.parse::<ChatMessage>()) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("Dropping malformed chat event: {}", e);
            None
        }
    }
}

pub struct ChatService {
    store: Arc<dyn DocumentStore>,
    feed: ChangeFeed,
    notifications: NotificationService,
}

impl ChatService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            feed: state.feed.clone(),
            notifications: NotificationService::new(state),
        }
    }

    /// Create the conversation record if needed and refresh `updatedAt`.
    pub async fn ensure_conversation(&self, a: &str, b: &str) -> Result<Conversation, ChatError> {
        if a == b {
            return Err(ChatError::InvalidConversation(
                "a conversation needs two different users".to_string(),
            ));
        }

        let id = conversation_id(a, b);
        let now = Utc::now();

        let doc = match self.store.get(collections::CHATS, &id).await? {
            Some(_) => {
                self.store
                    .update(collections::CHATS, &id, json!({ "updatedAt": now }))
                    .await?
            }
            None => {
                let mut participants = vec![a.to_string(), b.to_string()];
                participants.sort();
                let conversation = Conversation {
                    id: String::new(),
                    participants,
                    last_message: None,
                    last_message_time: None,
                    updated_at: now,
                };
                debug!("Opening conversation {}", id);
                self.store
                    .upsert(collections::CHATS, &id, to_fields(&conversation)?)
                    .await?
            }
        };

        Ok(doc.parse()?)
    }

    /// The two users a conversation id belongs to.
    pub async fn participants(&self, conversation_id: &str) -> Result<[String; 2], ChatError> {
        if let Some(doc) = self.store.get(collections::CHATS, conversation_id).await? {
            let conversation: Conversation = doc.parse()?;
            if let [a, b] = conversation.participants.as_slice() {
                return Ok([a.clone(), b.clone()]);
            }
        }

        // No record yet: fall back to reading the id itself.
        match conversation_id.split_once('_') {
            Some((a, b)) if !a.is_empty() && !b.is_empty() && self::conversation_id(a, b) == conversation_id => {
                Ok([a.to_string(), b.to_string()])
            }
            _ => Err(ChatError::InvalidConversation(conversation_id.to_string())),
        }
    }

    /// Returns the caller's partner in the conversation.
    pub async fn partner_in(&self, conversation_id: &str, user_id: &str) -> Result<String, ChatError> {
        let [a, b] = self.participants(conversation_id).await?;
        if a == user_id {
            Ok(b)
        } else if b == user_id {
            Ok(a)
        } else {
            Err(ChatError::NotParticipant(user_id.to_string()))
        }
    }

    pub async fn send_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        sender_name: &str,
        receiver_id: &str,
        text: &str,
    ) -> Result<ChatMessage, ChatError> {
        validate_text(text)?;

        if self::conversation_id(sender_id, receiver_id) != conversation_id || sender_id == receiver_id {
            warn!("{} tried to post to {} addressed to {}", sender_id, conversation_id, receiver_id);
            return Err(ChatError::NotParticipant(sender_id.to_string()));
        }

        let now = Utc::now();
        let mut message = ChatMessage {
            id: String::new(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: sender_name.to_string(),
            receiver_id: receiver_id.to_string(),
            text: text.to_string(),
            timestamp: now,
            read: false,
        };

        let doc = self
            .store
            .insert(collections::CHAT_MESSAGES, to_fields(&message)?)
            .await?;
        message.id = doc.id.clone();

        let mut participants = vec![sender_id.to_string(), receiver_id.to_string()];
        participants.sort();
        let conversation = Conversation {
            id: String::new(),
            participants,
            last_message: Some(text.to_string()),
            last_message_time: Some(now),
            updated_at: now,
        };
        self.store
            .upsert(collections::CHATS, conversation_id, to_fields(&conversation)?)
            .await?;

        let mut event = doc.data;
        event["id"] = json!(&message.id);
        let listeners = self.feed.publish(&chat_topic(conversation_id), event);
        info!("Message {} posted to {} ({} live listeners)", message.id, conversation_id, listeners);

        if let Err(e) = self
            .notifications
            .notify_new_message(receiver_id, sender_id, sender_name, &preview(text))
            .await
        {
            warn!("Message notification to {} failed: {}", receiver_id, e);
        }

        Ok(message)
    }

    /// Oldest first.
    pub async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, ChatError> {
        let docs = self
            .store
            .query(
                collections::CHAT_MESSAGES,
                &Query::new()
                    .eq("conversationId", conversation_id)
                    .order_by("timestamp", SortOrder::Asc),
            )
            .await?;

        Ok(docs
            .iter()
            .map(|doc| doc.parse::<ChatMessage>())
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Current messages followed by every message posted afterwards. The feed
    /// subscription lives inside the stream and ends when it is dropped.
    pub async fn stream_messages(
        &self,
        conversation_id: &str,
    ) -> Result<BoxStream<'static, ChatMessage>, ChatError> {
        // Subscribe before reading so nothing posted in between is missed.
        let subscription = self.feed.subscribe(&chat_topic(conversation_id));
        let snapshot = self.list_messages(conversation_id).await?;
        debug!("Streaming {} with {} existing messages", conversation_id, snapshot.len());

        let seen: HashSet<String> = snapshot.iter().map(|m| m.id.clone()).collect();
        let live = subscription.into_stream().filter_map(move |event| {
            future::ready(parse_event(event).filter(|message| !seen.contains(&message.id)))
        });

        Ok(stream::iter(snapshot).chain(live).boxed())
    }

    /// Mark the messages `viewer_id` received as read. Returns how many changed.
    pub async fn mark_incoming_read(&self, conversation_id: &str, viewer_id: &str) -> Result<usize, ChatError> {
        let unread = self
            .store
            .query(
                collections::CHAT_MESSAGES,
                &Query::new()
                    .eq("conversationId", conversation_id)
                    .eq("receiverId", viewer_id)
                    .eq("read", false),
            )
            .await?;

        for doc in &unread {
            self.store
                .update(collections::CHAT_MESSAGES, &doc.id, json!({ "read": true }))
                .await?;
        }

        debug!("Marked {} messages read in {}", unread.len(), conversation_id);
        Ok(unread.len())
    }

    /// Conversations `user_id` takes part in, most recently active first.
    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ChatError> {
        let docs = self
            .store
            .query(collections::CHATS, &Query::new())
            .await?;

        let mut conversations = Vec::new();
        for doc in &docs {
            let conversation: Conversation = doc.parse()?;
            if conversation.participants.iter().any(|p| p == user_id) {
                conversations.push(conversation);
            }
        }

        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }
}
