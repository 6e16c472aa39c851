use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use futures::stream::{self, Stream};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

type Channels = Arc<RwLock<HashMap<String, broadcast::Sender<Value>>>>;

/// Topic-keyed change notifications. Writers publish after a successful store
/// write; readers hold a [`Subscription`] for as long as they want updates.
#[derive(Clone)]
pub struct ChangeFeed {
    channels: Channels,
    capacity: usize,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, topic: &str, event: Value) -> usize {
        let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
        match channels.get(topic) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    pub fn subscribe(&self, topic: &str) -> Subscription {
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        let receiver = match channels.get(topic) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(self.capacity);
                channels.insert(topic.to_string(), sender);
                receiver
            }
        };

        debug!("Subscribed to topic {}", topic);
        Subscription {
            topic: topic.to_string(),
            receiver: Some(receiver),
            channels: Arc::clone(&self.channels),
        }
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.channels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(topic)
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.channels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(topic)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

/// A live listener on one topic. Dropping it releases the listener, and the
/// topic's channel goes away with its last subscriber.
pub struct Subscription {
    topic: String,
    receiver: Option<broadcast::Receiver<Value>>,
    channels: Channels,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next event, or `None` once the topic is closed.
    pub async fn recv(&mut self) -> Option<Value> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber on {} lagged, skipped {} events", self.topic, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Value> + Send {
        stream::unfold(self, |mut subscription| async move {
            subscription.recv().await.map(|event| (event, subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        drop(self.receiver.take());

        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        let idle = channels
            .get(&self.topic)
            .map(|sender| sender.receiver_count() == 0)
            .unwrap_or(false);
        if idle {
            channels.remove(&self.topic);
            debug!("Released topic {}", self.topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let feed = ChangeFeed::new();
        let mut sub = feed.subscribe("chat:a_b");

        assert_eq!(feed.publish("chat:a_b", json!({ "text": "hi" })), 1);
        assert_eq!(sub.recv().await, Some(json!({ "text": "hi" })));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let feed = ChangeFeed::new();
        assert_eq!(feed.publish("nobody", json!(1)), 0);
        assert!(!feed.has_topic("nobody"));
    }

    #[tokio::test]
    async fn test_dropping_last_subscription_releases_topic() {
        let feed = ChangeFeed::new();
        let first = feed.subscribe("t");
        let second = feed.subscribe("t");
        assert_eq!(feed.subscriber_count("t"), 2);

        drop(first);
        assert!(feed.has_topic("t"));

        drop(second);
        assert!(!feed.has_topic("t"));
    }

    #[tokio::test]
    async fn test_stream_drop_releases_topic() {
        let feed = ChangeFeed::new();
        let mut stream = Box::pin(feed.subscribe("t").into_stream());
        feed.publish("t", json!(7));
        assert_eq!(stream.next().await, Some(json!(7)));

        drop(stream);
        assert!(!feed.has_topic("t"));
    }
}
