use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_database::{
    collections, to_fields, ChangeFeed, DocumentStore, Query, SortOrder, Subscription,
};
use shared_utils::AppState;

use crate::models::{Notification, NotificationData, NotificationError};

const UNREAD_FIELD: &str = "unreadNotifications";

pub fn notification_topic(user_id: &str) -> String {
    format!("notifications:{}", user_id)
}

pub struct NotificationService {
    store: Arc<dyn DocumentStore>,
    feed: ChangeFeed,
}

impl NotificationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            feed: state.feed.clone(),
        }
    }

    /// Create a notification for an existing user and bump their unread counter.
    pub async fn notify(
        &self,
        user_id: &str,
        message: &str,
        data: NotificationData,
    ) -> Result<String, NotificationError> {
        debug!("Sending {} notification to {}", data.kind(), user_id);

        if self.store.get(collections::USERS, user_id).await?.is_none() {
            warn!("Notification recipient does not exist: {}", user_id);
            return Err(NotificationError::RecipientNotFound(user_id.to_string()));
        }

        let notification = Notification {
            id: String::new(),
            user_id: user_id.to_string(),
            message: message.to_string(),
            data,
            read: false,
            created_at: Utc::now(),
        };

        let doc = self
            .store
            .insert(collections::NOTIFICATIONS, to_fields(&notification)?)
            .await?;

        // The record exists from here on. A failed bump is repaired by the
        // next mark-read recount.
        match self
            .store
            .increment(collections::USERS, user_id, UNREAD_FIELD, 1)
            .await
        {
            Ok(unread) => info!("Notification {} created for {} (unread: {})", doc.id, user_id, unread),
            Err(e) => warn!("Notification {} created but counter for {} not bumped: {}", doc.id, user_id, e),
        }

        let mut event = doc.data.clone();
        event["id"] = json!(&doc.id);
        self.feed.publish(&notification_topic(user_id), event);

        Ok(doc.id)
    }

    pub async fn notify_new_message(
        &self,
        recipient_id: &str,
        sender_id: &str,
        sender_name: &str,
        preview: &str,
    ) -> Result<String, NotificationError> {
        let message = format!("{}: {}", sender_name, preview);
        self.notify(
            recipient_id,
            &message,
            NotificationData::Message { sender_id: sender_id.to_string() },
        )
        .await
    }

    pub async fn notify_appointment(
        &self,
        user_id: &str,
        appointment_id: &str,
        message: &str,
    ) -> Result<String, NotificationError> {
        self.notify(
            user_id,
            message,
            NotificationData::Appointment { appointment_id: appointment_id.to_string() },
        )
        .await
    }

    pub async fn notify_video_call(
        &self,
        user_id: &str,
        call_id: &str,
        caller_name: &str,
    ) -> Result<String, NotificationError> {
        let message = format!("{} is inviting you to a video call", caller_name);
        self.notify(
            user_id,
            &message,
            NotificationData::VideoCall { call_id: call_id.to_string() },
        )
        .await
    }

    pub async fn get_notification(&self, notification_id: &str) -> Result<Notification, NotificationError> {
        let doc = self
            .store
            .get(collections::NOTIFICATIONS, notification_id)
            .await?
            .ok_or_else(|| NotificationError::NotFound(notification_id.to_string()))?;
        Ok(doc.parse()?)
    }

    /// Newest first.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Notification>, NotificationError> {
        let docs = self
            .store
            .query(
                collections::NOTIFICATIONS,
                &Query::new().eq("userId", user_id),
            )
            .await?;

        let mut notifications = docs
            .iter()
            .map(|doc| doc.parse::<Notification>())
            .collect::<Result<Vec<_>, _>>()?;

        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            notifications.truncate(limit);
        }

        Ok(notifications)
    }

    pub async fn mark_read(&self, notification_id: &str) -> Result<i64, NotificationError> {
        let notification = self.get_notification(notification_id).await?;

        if !notification.read {
            self.store
                .update(collections::NOTIFICATIONS, notification_id, json!({ "read": true }))
                .await?;
        }

        self.recount_unread(&notification.user_id).await
    }

    /// Returns how many notifications changed and the recounted unread total.
    pub async fn mark_all_read(&self, user_id: &str) -> Result<(usize, i64), NotificationError> {
        let unread = self.unread_documents(user_id).await?;

        for doc in &unread {
            self.store
                .update(collections::NOTIFICATIONS, &doc.id, json!({ "read": true }))
                .await?;
        }

        let remaining = self.recount_unread(user_id).await?;
        info!("Marked {} notifications read for {}", unread.len(), user_id);
        Ok((unread.len(), remaining))
    }

    /// The stored counter, which may briefly run ahead of the read flags.
    pub async fn unread_count(&self, user_id: &str) -> Result<i64, NotificationError> {
        let doc = self
            .store
            .get(collections::USERS, user_id)
            .await?
            .ok_or_else(|| NotificationError::RecipientNotFound(user_id.to_string()))?;

        Ok(doc.field(UNREAD_FIELD).and_then(|v| v.as_i64()).unwrap_or(0))
    }

    /// Reset the counter to the number of unread notification records.
    pub async fn recount_unread(&self, user_id: &str) -> Result<i64, NotificationError> {
        let count = self.unread_documents(user_id).await?.len() as i64;

        match self
            .store
            .update(collections::USERS, user_id, json!({ UNREAD_FIELD: count }))
            .await
        {
            Ok(_) => Ok(count),
            Err(shared_database::StoreError::NotFound { .. }) => {
                Err(NotificationError::RecipientNotFound(user_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn subscribe(&self, user_id: &str) -> Subscription {
        self.feed.subscribe(&notification_topic(user_id))
    }

    async fn unread_documents(
        &self,
        user_id: &str,
    ) -> Result<Vec<shared_database::Document>, NotificationError> {
        Ok(self
            .store
            .query(
                collections::NOTIFICATIONS,
                &Query::new()
                    .eq("userId", user_id)
                    .eq("read", false)
                    .order_by("createdAt", SortOrder::Asc),
            )
            .await?)
    }
}
