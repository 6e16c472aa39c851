use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::{AppConfig, StoreBackend};
use shared_database::{DocumentStore, Query, SortOrder, StoreError, SupabaseStore};

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "test-secret".to_string(),
        store_backend: StoreBackend::Supabase,
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_get_parses_row_and_strips_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.apt-1"))
        .and(header("apikey", "test-anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "apt-1", "status": "pending" }
        ])))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    let doc = store.get("appointments", "apt-1").await.unwrap().unwrap();

    assert_eq!(doc.id, "apt-1");
    assert_eq!(doc.data, json!({ "status": "pending" }));
}

#[tokio::test]
async fn test_get_missing_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    assert!(store.get("users", "ghost-id").await.unwrap().is_none());
}

#[tokio::test]
async fn test_query_builds_postgrest_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability"))
        .and(query_param("therapistId", "eq.t1"))
        .and(query_param("date", "eq.2025-03-10"))
        .and(query_param("order", "time.asc"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "s1", "time": "09:00" },
            { "id": "s2", "time": "09:30" }
        ])))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    let docs = store
        .query(
            "availability",
            &Query::new()
                .eq("therapistId", "t1")
                .eq("date", "2025-03-10")
                .order_by("time", SortOrder::Asc)
                .limit(5),
        )
        .await
        .unwrap();

    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1].id, "s2");
}

#[tokio::test]
async fn test_insert_sends_generated_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({ "userId": "t1" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": "n-1", "userId": "t1", "read": false }
        ])))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    let doc = store
        .insert("notifications", json!({ "userId": "t1", "read": false }))
        .await
        .unwrap();

    assert_eq!(doc.id, "n-1");
}

#[tokio::test]
async fn test_update_if_reports_stale_guard() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "apt-1", "status": "accepted" }
        ])))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    let result = store
        .update_if("appointments", "apt-1", "status", &json!("pending"), json!({ "status": "rejected" }))
        .await
        .unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn test_increment_uses_rpc() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/increment_field"))
        .and(body_partial_json(json!({ "table_name": "users", "row_id": "u1", "delta": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(4)))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    let count = store.increment("users", "u1", "unreadNotifications", 1).await.unwrap();
    assert_eq!(count, 4);
}

#[tokio::test]
async fn test_auth_failure_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config_for(&server));
    assert_matches!(store.get("users", "u1").await, Err(StoreError::Unavailable(_)));
}

#[tokio::test]
async fn test_unconfigured_url_is_unavailable() {
    let store = SupabaseStore::new(&AppConfig::default());
    assert_matches!(store.get("users", "u1").await, Err(StoreError::Unavailable(_)));
}
