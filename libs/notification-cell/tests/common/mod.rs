use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use shared_database::{collections, Document, DocumentStore, MemoryStore, Query, StoreError};

/// Memory store that can be told to fail selected operations.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    pub fail_increment: bool,
    pub fail_user_reads: bool,
}

impl FlakyStore {
    pub fn failing_increment() -> Arc<Self> {
        Arc::new(Self { fail_increment: true, ..Self::default() })
    }

    pub fn failing_user_reads() -> Arc<Self> {
        Arc::new(Self { fail_user_reads: true, ..Self::default() })
    }
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn insert(&self, collection: &str, data: Value) -> Result<Document, StoreError> {
        self.inner.insert(collection, data).await
    }

    async fn upsert(&self, collection: &str, id: &str, data: Value) -> Result<Document, StoreError> {
        self.inner.upsert(collection, id, data).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        if self.fail_user_reads && collection == collections::USERS {
            return Err(unavailable());
        }
        self.inner.get(collection, id).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.inner.query(collection, query).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Document, StoreError> {
        self.inner.update(collection, id, patch).await
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        patch: Value,
    ) -> Result<Option<Document>, StoreError> {
        self.inner.update_if(collection, id, field, expected, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    async fn increment(&self, collection: &str, id: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        if self.fail_increment {
            return Err(unavailable());
        }
        self.inner.increment(collection, id, field, delta).await
    }
}
