use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};
use wellness_api::router::create_router;

async fn send(app: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", token);
    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_root_and_health_are_public() {
    let app = create_router(TestConfig::default().to_state());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for cell in ["appointments", "notifications", "chat", "availability", "therapists", "users", "video-calls"] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/{}/health", cell))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{} health", cell);
    }
}

#[tokio::test]
async fn test_book_accept_and_chat_across_cells() {
    let config = TestConfig::default();
    let state = config.to_state();
    let patient = TestUser::patient("p1@example.com");
    let therapist = TestUser::therapist("t1@example.com");

    let app = create_router(state);
    let patient_token = JwtTestUtils::bearer(&patient, &config);
    let therapist_token = JwtTestUtils::bearer(&therapist, &config);

    // Neither user has a record yet; the therapist lists themself first.
    let (status, listed) = send(
        &app,
        "PUT",
        "/users/me/therapist",
        &therapist_token,
        Some(json!({ "specialties": ["Anxiety"], "sessionTypes": ["Video"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["role"], "therapist");

    let (status, directory) = send(&app, "GET", "/therapists", &patient_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(directory["therapists"][0]["id"], therapist.id.as_str());

    let (status, slots) = send(
        &app,
        "GET",
        &format!("/availability/{}/2030-05-02", therapist.id),
        &patient_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(slots["slots"].as_array().unwrap().len(), 16);

    let (status, booked) = send(
        &app,
        "POST",
        "/appointments",
        &patient_token,
        Some(json!({ "therapistId": therapist.id, "date": "2030-05-02", "time": "9:30" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let appointment_id = booked["appointment"]["id"].as_str().unwrap().to_string();

    let (status, inbox) = send(&app, "GET", "/notifications", &therapist_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox["unreadCount"], 1);

    let (status, accepted) = send(
        &app,
        "POST",
        &format!("/appointments/{}/accept", appointment_id),
        &therapist_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");

    let (_, mine) = send(&app, "GET", "/appointments/mine", &patient_token, None).await;
    assert_eq!(mine["upcoming"][0]["id"], appointment_id.as_str());

    let (_, me) = send(&app, "GET", "/users/me", &patient_token, None).await;
    assert_eq!(me["role"], "patient");
    assert_eq!(me["unreadNotifications"], 1);

    let (status, conversation) = send(
        &app,
        "POST",
        &format!("/chat/conversations/{}", therapist.id),
        &patient_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let conversation_id = conversation["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/chat/{}/messages", conversation_id),
        &patient_token,
        Some(json!({ "text": "See you on the 2nd" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, inbox) = send(&app, "GET", "/notifications", &therapist_token, None).await;
    assert_eq!(inbox["unreadCount"], 2);
    assert_eq!(inbox["notifications"][0]["type"], "message");
}

#[tokio::test]
async fn test_protected_routes_reject_bad_tokens() {
    let config = TestConfig::default();
    let app = create_router(config.to_state());
    let patient = TestUser::patient("p1@example.com");

    let (status, _) = send(
        &app,
        "GET",
        "/therapists",
        &format!("Bearer {}", JwtTestUtils::create_invalid_signature_token(&patient)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
