use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{compare_values, ensure_object, merge_patch, Document, DocumentStore, Query, SortOrder};

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    data: Value,
}

/// In-process document store. Every operation holds the collection lock for its
/// whole read-modify-write, so `update_if` and `increment` are atomic.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Entry>>>,
    next_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, data: Value) -> Result<Document, StoreError> {
        let data = Value::Object(ensure_object(data)?);
        let id = Uuid::new_v4().to_string();
        let entry = Entry { seq: self.seq(), data: data.clone() };

        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), entry);

        debug!("Inserted {}/{}", collection, id);
        Ok(Document::new(id, data))
    }

    async fn upsert(&self, collection: &str, id: &str, data: Value) -> Result<Document, StoreError> {
        let data = Value::Object(ensure_object(data)?);
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        let seq = match docs.get(id) {
            Some(existing) => existing.seq,
            None => self.seq(),
        };
        docs.insert(id.to_string(), Entry { seq, data: data.clone() });

        debug!("Upserted {}/{}", collection, id);
        Ok(Document::new(id, data))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|entry| Document::new(id, entry.data.clone())))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<(&String, &Entry)> = docs
            .iter()
            .filter(|(_, entry)| query.matches(&entry.data))
            .collect();

        // Insertion order first so ties in `order_by` stay stable.
        matched.sort_by_key(|(_, entry)| entry.seq);
        if let Some((field, order)) = &query.order_by {
            matched.sort_by(|(_, a), (_, b)| {
                let ord = compare_values(a.data.get(field), b.data.get(field));
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(matched
            .into_iter()
            .take(limit)
            .map(|(id, entry)| Document::new(id.clone(), entry.data.clone()))
            .collect())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Document, StoreError> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        merge_patch(&mut entry.data, patch)?;
        Ok(Document::new(id, entry.data.clone()))
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        patch: Value,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        if entry.data.get(field).unwrap_or(&Value::Null) != expected {
            debug!("Conditional update of {}/{} skipped: {} changed", collection, id, field);
            return Ok(None);
        }

        merge_patch(&mut entry.data, patch)?;
        Ok(Some(Document::new(id, entry.data.clone())))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn increment(&self, collection: &str, id: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        let current = entry.data.get(field).and_then(Value::as_i64).unwrap_or(0);
        let updated = current + delta;
        merge_patch(&mut entry.data, serde_json::json!({ field: updated }))?;
        Ok(updated)
    }
}
