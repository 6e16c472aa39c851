use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::StoreError;
use crate::store::{ensure_object, Document, DocumentStore, Query, SortOrder};

/// PostgREST-backed store. Each collection is a table with a text `id` column.
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, prefer: Option<&'static str>) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();

        let key = HeaderValue::from_str(&self.anon_key)
            .map_err(|_| StoreError::Unavailable("Supabase anon key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.anon_key))
            .map_err(|_| StoreError::Unavailable("Supabase anon key is not a valid header value".to_string()))?;

        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(prefer) = prefer {
            headers.insert("Prefer", HeaderValue::from_static(prefer));
        }

        Ok(headers)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        prefer: Option<&'static str>,
    ) -> Result<Value, StoreError> {
        if self.base_url.is_empty() {
            return Err(StoreError::Unavailable("SUPABASE_URL is not configured".to_string()));
        }

        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self.client.request(method, &url).headers(self.get_headers(prefer)?);
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    StoreError::Unavailable(format!("Authentication error: {}", error_text))
                }
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    StoreError::Serialization(error_text)
                }
                _ => StoreError::Unavailable(format!("API error ({}): {}", status, error_text)),
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Array(Vec::new()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn rows(value: Value) -> Result<Vec<Document>, StoreError> {
        match value {
            Value::Array(rows) => rows.into_iter().map(Document::from_row).collect(),
            other => Ok(vec![Document::from_row(other)?]),
        }
    }

    fn first_row(value: Value) -> Result<Option<Document>, StoreError> {
        Ok(Self::rows(value)?.into_iter().next())
    }

    fn table_path(collection: &str) -> String {
        format!("/rest/v1/{}", collection)
    }

    fn id_filter(collection: &str, id: &str) -> String {
        format!("{}?id=eq.{}", Self::table_path(collection), urlencoding::encode(id))
    }

    fn filter_value(value: &Value) -> String {
        let raw = match value {
            Value::String(s) => s.clone(),
            Value::Null => return "is.null".to_string(),
            other => other.to_string(),
        };
        format!("eq.{}", urlencoding::encode(&raw))
    }

    fn with_id(id: &str, data: Value) -> Result<Value, StoreError> {
        let mut row = ensure_object(data)?;
        row.insert("id".to_string(), Value::String(id.to_string()));
        Ok(Value::Object(row))
    }
}

#[async_trait]
impl DocumentStore for SupabaseStore {
    async fn insert(&self, collection: &str, data: Value) -> Result<Document, StoreError> {
        let id = Uuid::new_v4().to_string();
        let row = Self::with_id(&id, data)?;

        let result = self
            .request(Method::POST, &Self::table_path(collection), Some(row), Some("return=representation"))
            .await?;

        Self::first_row(result)?
            .ok_or_else(|| StoreError::Serialization(format!("insert into {} returned no rows", collection)))
    }

    async fn upsert(&self, collection: &str, id: &str, data: Value) -> Result<Document, StoreError> {
        let row = Self::with_id(id, data)?;

        let result = self
            .request(
                Method::POST,
                &Self::table_path(collection),
                Some(row),
                Some("resolution=merge-duplicates,return=representation"),
            )
            .await?;

        Self::first_row(result)?
            .ok_or_else(|| StoreError::Serialization(format!("upsert into {} returned no rows", collection)))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let result = self
            .request(Method::GET, &Self::id_filter(collection, id), None, None)
            .await?;
        Self::first_row(result)
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let mut query_parts: Vec<String> = query
            .filters
            .iter()
            .map(|(field, value)| format!("{}={}", field, Self::filter_value(value)))
            .collect();

        if let Some((field, order)) = &query.order_by {
            let direction = match order {
                SortOrder::Asc => "asc",
                SortOrder::Desc => "desc",
            };
            query_parts.push(format!("order={}.{}", field, direction));
        }
        if let Some(limit) = query.limit {
            query_parts.push(format!("limit={}", limit));
        }

        let path = if query_parts.is_empty() {
            Self::table_path(collection)
        } else {
            format!("{}?{}", Self::table_path(collection), query_parts.join("&"))
        };

        let result = self.request(Method::GET, &path, None, None).await?;
        Self::rows(result)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Document, StoreError> {
        let result = self
            .request(
                Method::PATCH,
                &Self::id_filter(collection, id),
                Some(patch),
                Some("return=representation"),
            )
            .await?;

        Self::first_row(result)?.ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        patch: Value,
    ) -> Result<Option<Document>, StoreError> {
        let path = format!(
            "{}&{}={}",
            Self::id_filter(collection, id),
            field,
            Self::filter_value(expected)
        );

        let result = self
            .request(Method::PATCH, &path, Some(patch), Some("return=representation"))
            .await?;

        match Self::first_row(result)? {
            Some(doc) => Ok(Some(doc)),
            // Zero rows: either the document is gone or the guard field moved on.
            None => match self.get(collection, id).await? {
                Some(_) => Ok(None),
                None => Err(StoreError::not_found(collection, id)),
            },
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let result = self
            .request(
                Method::DELETE,
                &Self::id_filter(collection, id),
                None,
                Some("return=representation"),
            )
            .await?;

        match Self::first_row(result)? {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(collection, id)),
        }
    }

    async fn increment(&self, collection: &str, id: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        // `increment_field` is a SQL function doing `update ... set f = coalesce(f, 0) + delta returning f`.
        let result = self
            .request(
                Method::POST,
                "/rest/v1/rpc/increment_field",
                Some(json!({
                    "table_name": collection,
                    "row_id": id,
                    "field_name": field,
                    "delta": delta,
                })),
                None,
            )
            .await?;

        match result {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| StoreError::Serialization("counter is not an integer".to_string())),
            Value::Null => Err(StoreError::not_found(collection, id)),
            other => Err(StoreError::Serialization(format!("unexpected increment result: {}", other))),
        }
    }
}
