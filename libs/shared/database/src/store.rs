use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// A stored document: the store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self { id: id.into(), data }
    }

    /// Split a backend row that carries its id inline.
    pub fn from_row(mut row: Value) -> Result<Self, StoreError> {
        let id = match row.as_object_mut().and_then(|obj| obj.remove("id")) {
            Some(Value::String(id)) => id,
            Some(other) => other.to_string(),
            None => return Err(StoreError::Serialization("row has no id column".to_string())),
        };
        Ok(Self { id, data: row })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Parse into a typed record. The document id is exposed to the record as `id`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut data = self.data.clone();
        if let Some(obj) = data.as_object_mut() {
            obj.insert("id".to_string(), Value::String(self.id.clone()));
        }
        Ok(serde_json::from_value(data)?)
    }
}

/// Serialize a typed record into document fields.
pub fn to_fields<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    let mut value = serde_json::to_value(record)?;
    match value.as_object_mut() {
        Some(obj) => {
            obj.remove("id");
            Ok(value)
        }
        None => Err(StoreError::Serialization("record did not serialize to an object".to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Equality filters with optional ordering and limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by = Some((field.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, data: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| data.get(field).unwrap_or(&Value::Null) == expected)
    }
}

/// Create/read/update/delete on named collections keyed by opaque ids.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert with a store-assigned id.
    async fn insert(&self, collection: &str, data: Value) -> Result<Document, StoreError>;

    /// Create or fully replace the document with the given id.
    async fn upsert(&self, collection: &str, id: &str, data: Value) -> Result<Document, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Shallow-merge `patch` into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Document, StoreError>;

    /// Apply `patch` only while `field` still equals `expected`.
    /// Returns `Ok(None)` when the stored value differs.
    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        patch: Value,
    ) -> Result<Option<Document>, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Atomically add `delta` to an integer field, treating a missing field as 0.
    async fn increment(&self, collection: &str, id: &str, field: &str, delta: i64) -> Result<i64, StoreError>;
}

pub(crate) fn merge_patch(target: &mut Value, patch: Value) -> Result<(), StoreError> {
    let Value::Object(patch) = patch else {
        return Err(StoreError::Serialization("patch must be an object".to_string()));
    };
    let target = target
        .as_object_mut()
        .ok_or_else(|| StoreError::Serialization("document is not an object".to_string()))?;
    for (key, value) in patch {
        target.insert(key, value);
    }
    Ok(())
}

pub(crate) fn ensure_object(data: Value) -> Result<Map<String, Value>, StoreError> {
    match data {
        Value::Object(obj) => Ok(obj),
        _ => Err(StoreError::Serialization("document must be an object".to_string())),
    }
}

/// Ordering used for `order_by`: timestamps chronologically, numbers numerically,
/// everything else by its string form. Missing values sort first.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        #[serde(default, skip_serializing)]
        id: String,
        name: String,
    }

    #[test]
    fn test_parse_exposes_document_id() {
        let doc = Document::new("abc", json!({ "name": "x" }));
        let record: Record = doc.parse().unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(record.name, "x");
    }

    #[test]
    fn test_to_fields_drops_id() {
        let fields = to_fields(&Record { id: "abc".into(), name: "x".into() }).unwrap();
        assert_eq!(fields, json!({ "name": "x" }));
    }

    #[test]
    fn test_timestamps_compare_chronologically() {
        let earlier = json!("2025-03-10T14:00:00.500Z");
        let later = json!("2025-03-10T14:00:01Z");
        assert_eq!(compare_values(Some(&earlier), Some(&later)), Ordering::Less);
    }

    #[test]
    fn test_query_matches_all_filters() {
        let query = Query::new().eq("therapistId", "t1").eq("date", "2025-03-10");
        assert!(query.matches(&json!({ "therapistId": "t1", "date": "2025-03-10" })));
        assert!(!query.matches(&json!({ "therapistId": "t1" })));
    }
}
