//! DiscordClient against a local stand-in for the Discord REST API

use acars::TrackerError;
use acars::discord::{DiscordClient, Embed, MessageSink, OutgoingMessage};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// Users that refuse DM channels outright
const BLOCKED_USER: &str = "blocked";
/// Users whose DM channel opens but rejects messages
const CLOSED_USER: &str = "closed";

#[derive(Debug, Clone)]
struct Posted {
    channel_id: String,
    authorization: String,
    body: Value,
}

#[derive(Clone, Default)]
struct FakeDiscord {
    opened: Arc<Mutex<Vec<String>>>,
    posted: Arc<Mutex<Vec<Posted>>>,
}

fn cannot_message_user() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"code": 50007, "message": "Cannot send messages to this user"})),
    )
        .into_response()
}

async fn open_dm(State(fake): State<FakeDiscord>, Json(body): Json<Value>) -> Response {
    let user_id = body["recipient_id"].as_str().unwrap_or_default().to_string();
    fake.opened.lock().unwrap().push(user_id.clone());
    if user_id == BLOCKED_USER {
        return cannot_message_user();
    }
    Json(json!({"id": format!("dm-{}", user_id), "type": 1})).into_response()
}

async fn create_message(
    State(fake): State<FakeDiscord>,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if channel_id == format!("dm-{}", CLOSED_USER) {
        return cannot_message_user();
    }
    if channel_id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"code": 10003, "message": "Unknown Channel"})),
        )
            .into_response();
    }

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    fake.posted.lock().unwrap().push(Posted {
        channel_id,
        authorization,
        body,
    });
    Json(json!({"id": "1"})).into_response()
}

async fn start_fake_discord() -> (DiscordClient, FakeDiscord) {
    let fake = FakeDiscord::default();
    let app = Router::new()
        .route("/users/@me/channels", post(open_dm))
        .route("/channels/{channel_id}/messages", post(create_message))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = DiscordClient::new(reqwest::Client::new(), "secret-token")
        .with_base_url(format!("http://{}/", addr));
    (client, fake)
}

fn message() -> OutgoingMessage {
    OutgoingMessage::embed(Embed::new("Hello").description("from the tower"))
}

#[tokio::test]
async fn test_channel_message_is_posted_with_bot_auth() {
    let (client, fake) = start_fake_discord().await;

    client.send_channel_message("123", &message()).await.unwrap();

    let posted = fake.posted.lock().unwrap().clone();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].channel_id, "123");
    assert_eq!(posted[0].authorization, "Bot secret-token");
    assert_eq!(posted[0].body["embeds"][0]["title"], "Hello");
    assert!(fake.opened.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_direct_message_opens_channel_then_posts() {
    let (client, fake) = start_fake_discord().await;

    client.send_direct_message("42", &message()).await.unwrap();

    assert_eq!(*fake.opened.lock().unwrap(), vec!["42".to_string()]);
    let posted = fake.posted.lock().unwrap().clone();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].channel_id, "dm-42");
}

#[tokio::test]
async fn test_refused_dm_channel_is_dms_disabled() {
    let (client, fake) = start_fake_discord().await;

    let err = client
        .send_direct_message(BLOCKED_USER, &message())
        .await
        .unwrap_err();

    assert!(matches!(err, TrackerError::DirectMessagesDisabled(ref user) if user == BLOCKED_USER));
    assert!(fake.posted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_dm_message_is_dms_disabled() {
    let (client, _fake) = start_fake_discord().await;

    let err = client
        .send_direct_message(CLOSED_USER, &message())
        .await
        .unwrap_err();

    assert!(matches!(err, TrackerError::DirectMessagesDisabled(ref user) if user == CLOSED_USER));
}

#[tokio::test]
async fn test_unknown_channel_is_delivery_failure() {
    let (client, _fake) = start_fake_discord().await;

    let err = client
        .send_channel_message("missing", &message())
        .await
        .unwrap_err();

    match err {
        TrackerError::DeliveryFailure(reason) => assert!(reason.contains("Unknown Channel"), "{}", reason),
        other => panic!("expected a delivery failure, got {:?}", other),
    }
}
