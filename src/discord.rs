use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::TrackerError;

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Discord's "Cannot send messages to this user"
const CANNOT_MESSAGE_USER: u64 = 50007;

/// Default embed colour (Discord blurple)
pub const BLURPLE: u32 = 0x5865F2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub inline: bool,
}

/// The subset of a Discord embed the bot uses
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

/// Body of a create-message request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutgoingMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl OutgoingMessage {
    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embeds: vec![embed],
        }
    }
}

/// Outbound message delivery
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send_channel_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
    ) -> Result<(), TrackerError>;

    async fn send_direct_message(
        &self,
        user_id: &str,
        message: &OutgoingMessage,
    ) -> Result<(), TrackerError>;
}

#[derive(Debug, Deserialize)]
struct DiscordApiError {
    #[serde(default)]
    code: u64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct DmChannel {
    id: String,
}

/// Discord REST client authenticated as a bot
#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
    token: String,
    base_url: String,
}

impl DiscordClient {
    pub fn new(client: Client, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
            base_url: DISCORD_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, TrackerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        self.client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .timeout(REQUEST_TIMEOUT)
            .json(body)
            .send()
            .await
            .map_err(|e| TrackerError::DeliveryFailure(format!("request to {} failed: {}", path, e)))
    }

    async fn open_dm_channel(&self, user_id: &str) -> Result<String, TrackerError> {
        let response = self
            .post("/users/@me/channels", &serde_json::json!({ "recipient_id": user_id }))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body, Some(user_id)));
        }

        let channel: DmChannel = response.json().await.map_err(|e| {
            TrackerError::DeliveryFailure(format!("unexpected DM channel response: {}", e))
        })?;
        Ok(channel.id)
    }

    async fn create_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
        recipient: Option<&str>,
    ) -> Result<(), TrackerError> {
        let response = self
            .post(&format!("/channels/{}/messages", channel_id), message)
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(api_error(status, &body, recipient))
    }
}

#[async_trait]
impl MessageSink for DiscordClient {
    async fn send_channel_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
    ) -> Result<(), TrackerError> {
        self.create_message(channel_id, message, None).await
    }

    async fn send_direct_message(
        &self,
        user_id: &str,
        message: &OutgoingMessage,
    ) -> Result<(), TrackerError> {
        let channel_id = self.open_dm_channel(user_id).await?;
        self.create_message(&channel_id, message, Some(user_id)).await
    }
}

/// Map a failed Discord response onto the tracker's error taxonomy.
/// `recipient` is set for DM deliveries so 50007 can name the user.
fn api_error(status: StatusCode, body: &str, recipient: Option<&str>) -> TrackerError {
    let parsed = serde_json::from_str::<DiscordApiError>(body).ok();

    if let (Some(err), Some(user_id)) = (&parsed, recipient)
        && err.code == CANNOT_MESSAGE_USER
    {
        return TrackerError::DirectMessagesDisabled(user_id.to_string());
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!("Rate limited by Discord");
    }

    match parsed {
        Some(err) if !err.message.is_empty() => TrackerError::DeliveryFailure(format!(
            "Discord API error {} (code {}): {}",
            status, err.code, err.message
        )),
        _ => TrackerError::DeliveryFailure(format!("Discord API error {}: {}", status, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_serialization_skips_empty_parts() {
        let message = OutgoingMessage::embed(Embed::new("Hello").color(BLURPLE).footer("ACARS Bot"));
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "embeds": [{
                    "title": "Hello",
                    "color": 0x5865F2,
                    "footer": {"text": "ACARS Bot"}
                }]
            })
        );
    }

    #[test]
    fn test_embed_fields_serialize_inline_only_when_set() {
        let embed = Embed::new("x")
            .field("Engine Info", "Type: Jet", false)
            .field("Altitude", "35000 ft", true);
        let json = serde_json::to_value(&embed).unwrap();

        assert_eq!(json["fields"][0], serde_json::json!({"name": "Engine Info", "value": "Type: Jet"}));
        assert_eq!(json["fields"][1]["inline"], serde_json::json!(true));
    }

    #[test]
    fn test_dm_refusal_maps_to_dms_disabled() {
        let err = api_error(
            StatusCode::FORBIDDEN,
            r#"{"message": "Cannot send messages to this user", "code": 50007}"#,
            Some("1234"),
        );
        assert!(matches!(err, TrackerError::DirectMessagesDisabled(ref id) if id == "1234"));
    }

    #[test]
    fn test_channel_error_is_delivery_failure() {
        let err = api_error(
            StatusCode::FORBIDDEN,
            r#"{"message": "Missing Access", "code": 50001}"#,
            None,
        );
        match err {
            TrackerError::DeliveryFailure(msg) => assert!(msg.contains("Missing Access")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_non_json_error_body() {
        let err = api_error(StatusCode::BAD_GATEWAY, "upstream down", None);
        match err {
            TrackerError::DeliveryFailure(msg) => assert!(msg.contains("upstream down")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_base_url_override_trims_slash() {
        let client = DiscordClient::new(Client::new(), "token").with_base_url("http://localhost:9999/api/");
        assert_eq!(client.base_url, "http://localhost:9999/api");
    }
}
