use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use chat_cell::{chat_routes, conversation_id};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

#[tokio::test]
async fn test_post_and_list_messages() {
    let config = TestConfig::default();
    let state = config.to_state();
    let patient = TestUser::patient("p1@example.com");
    let therapist = TestUser::therapist("t1@example.com");
    patient.seed(state.store.as_ref()).await.unwrap();
    therapist.seed(state.store.as_ref()).await.unwrap();
    let chat_id = conversation_id(&patient.id, &therapist.id);
    let app = chat_routes(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{}/messages", chat_id))
                .header("Authorization", JwtTestUtils::bearer(&patient, &config))
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "text": "Hi, can we talk?" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/{}/messages", chat_id))
                .header("Authorization", JwtTestUtils::bearer(&therapist, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["messages"][0]["text"], "Hi, can we talk?");
    assert_eq!(body["messages"][0]["receiverId"], therapist.id.as_str());
    assert_eq!(body["messages"][0]["senderName"], patient.name.as_str());
}

#[tokio::test]
async fn test_outsider_gets_forbidden() {
    let config = TestConfig::default();
    let state = config.to_state();
    let outsider = TestUser::patient("eve@example.com");

    let response = chat_routes(state)
        .oneshot(
            Request::builder()
                .uri(format!("/{}/messages", conversation_id("u1", "u2")))
                .header("Authorization", JwtTestUtils::bearer(&outsider, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_empty_message_is_bad_request() {
    let config = TestConfig::default();
    let state = config.to_state();
    let patient = TestUser::patient("p1@example.com");

    let response = chat_routes(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{}/messages", conversation_id(&patient.id, "t1")))
                .header("Authorization", JwtTestUtils::bearer(&patient, &config))
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "text": "" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
