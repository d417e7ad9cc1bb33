//! API endpoint integration tests

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use image_description_bot::api::ApiState;
use image_description_bot::pipeline::format::{DOWNLOADING, NO_IMAGE_PROMPT, PROCESSING};
use image_description_bot::{ActivityRouter, WELCOME_MESSAGE};
use tower::ServiceExt;

mod common;
use common::{FakeFetcher, FakeVision, RecordingChannel, pipeline};

/// Build a test API router around a recording channel
fn build_test_router(channel: Arc<RecordingChannel>) -> axum::Router {
    let pipeline = pipeline(
        Arc::new(FakeVision::new(&[("a cat", 0.5)], Vec::new())),
        Arc::new(FakeFetcher::default()),
    );

    let state = Arc::new(ApiState {
        router: ActivityRouter::new(Arc::new(pipeline)),
        channel,
        vision_endpoint: "https://vision.example/vision/v1.0".to_string(),
        authenticated: false,
    });

    image_description_bot::api::router(state)
}

fn post_activity(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/messages")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_test_router(Arc::new(RecordingChannel::new()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_status_endpoint_has_no_secrets() {
    let app = build_test_router(Arc::new(RecordingChannel::new()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["vision_endpoint"], "https://vision.example/vision/v1.0");
    assert_eq!(json["authenticated"], false);
    assert!(json.get("api_key").is_none());
}

#[tokio::test]
async fn test_message_without_image_is_accepted() {
    let channel = Arc::new(RecordingChannel::new());
    let app = build_test_router(channel.clone());

    let response = app
        .oneshot(post_activity(
            r#"{
                "type": "message",
                "id": "1",
                "channelId": "emulator",
                "serviceUrl": "http://localhost:50000",
                "from": {"id": "user-1"},
                "recipient": {"id": "bot-1"},
                "conversation": {"id": "conv-1"},
                "text": "hello"
            }"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(channel.sent().await, vec![NO_IMAGE_PROMPT]);
}

#[tokio::test]
async fn test_image_message_streams_replies() {
    let channel = Arc::new(RecordingChannel::new());
    let app = build_test_router(channel.clone());

    let response = app
        .oneshot(post_activity(
            r#"{
                "type": "message",
                "id": "2",
                "channelId": "emulator",
                "serviceUrl": "http://localhost:50000",
                "from": {"id": "user-1"},
                "recipient": {"id": "bot-1"},
                "conversation": {"id": "conv-1"},
                "attachments": [
                    {"contentType": "image/png", "contentUrl": "http://localhost:50000/cat.png"}
                ]
            }"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(
        channel.sent().await,
        vec![
            DOWNLOADING,
            PROCESSING,
            "#### My best guesses are:\n\na cat (50.00%)",
        ]
    );
}

#[tokio::test]
async fn test_conversation_update_welcomes() {
    let channel = Arc::new(RecordingChannel::new());
    let app = build_test_router(channel.clone());

    let response = app
        .oneshot(post_activity(
            r#"{
                "type": "conversationUpdate",
                "serviceUrl": "http://localhost:50000",
                "recipient": {"id": "bot-1"},
                "conversation": {"id": "conv-1"},
                "membersAdded": [{"id": "bot-1"}]
            }"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(channel.sent().await, vec![WELCOME_MESSAGE]);
}

#[tokio::test]
async fn test_unknown_activity_type_is_accepted() {
    let channel = Arc::new(RecordingChannel::new());
    let app = build_test_router(channel.clone());

    let response = app
        .oneshot(post_activity(
            r#"{"type": "somethingNew", "conversation": {"id": "conv-1"}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(channel.sent().await.is_empty());
}

#[tokio::test]
async fn test_failed_reply_still_accepted() {
    let channel = Arc::new(RecordingChannel::failing_at(0));
    let app = build_test_router(channel.clone());

    let response = app
        .oneshot(post_activity(
            r#"{"type": "message", "conversation": {"id": "conv-1"}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(channel.sent().await.is_empty());
}

#[tokio::test]
async fn test_null_attachments_read_as_none() {
    let channel = Arc::new(RecordingChannel::new());
    let app = build_test_router(channel.clone());

    let response = app
        .oneshot(post_activity(
            r#"{
                "type": "message",
                "conversation": {"id": "conv-1"},
                "attachments": null,
                "membersAdded": null
            }"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(channel.sent().await, vec![NO_IMAGE_PROMPT]);
}

#[tokio::test]
async fn test_malformed_activity_is_rejected() {
    let app = build_test_router(Arc::new(RecordingChannel::new()));

    let response = app.oneshot(post_activity("{not json")).await.unwrap();

    assert!(response.status().is_client_error());
}
