use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::AppState;
use super::auth::bearer_token;

/// Colour as sent by the website: a hex string or a plain number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    Text(String),
    Number(u32),
}

impl ColorValue {
    fn as_hex(&self) -> String {
        match self {
            ColorValue::Text(s) => s.clone(),
            ColorValue::Number(n) => format!("{:06X}", n),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    pub color: Option<ColorValue>,
    pub channel_id: Option<String>,
    pub password: Option<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[tracing::instrument(skip_all)]
pub(super) async fn announce(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnnounceRequest>,
) -> Response {
    // Bearer token first, password as the fallback
    let mut user = None;
    if let Some(verifier) = &state.verifier {
        let auth_header = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if let Some(token) = bearer_token(auth_header) {
            user = verifier.verify(token).await;
        }
    }

    if user.is_none() && request.password.as_deref() != Some(state.admin_password.as_str()) {
        warn!("Rejected announcement with invalid authentication");
        metrics::counter!("api.announce.unauthorized_total").increment(1);
        return error_response(StatusCode::UNAUTHORIZED, "Invalid authentication");
    }

    let (Some(title), Some(message)) = (non_blank(&request.title), non_blank(&request.message))
    else {
        return error_response(StatusCode::BAD_REQUEST, "Title and message are required");
    };

    let Some(channel_id) = non_blank(&request.channel_id)
        .or_else(|| state.default_channel_id.as_deref())
        .map(str::to_string)
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Channel ID is required (either in request or ANNOUNCEMENT_CHANNEL_ID env var)",
        );
    };

    let color = request.color.as_ref().map(ColorValue::as_hex);
    if let Err(e) = state
        .announcements
        .send_announcement(&channel_id, title, message, color.as_deref())
        .await
    {
        error!("Error sending announcement: {}", e);
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to send announcement: {}", e),
        );
    }

    let auth_method = if user.is_some() { "Supabase" } else { "Password" };
    info!("Announcement sent: \"{}\" by {} auth", title, auth_method);

    Json(json!({ "success": true, "message": "Announcement sent successfully" })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case_channel() {
        let request: AnnounceRequest = serde_json::from_value(json!({
            "title": "t",
            "message": "m",
            "channelId": "123",
            "color": 16711680,
        }))
        .unwrap();
        assert_eq!(request.channel_id.as_deref(), Some("123"));
        assert_eq!(request.color.unwrap().as_hex(), "FF0000");
    }

    #[test]
    fn test_string_color_passes_through() {
        let request: AnnounceRequest =
            serde_json::from_value(json!({"color": "#00FF00"})).unwrap();
        assert_eq!(request.color.unwrap().as_hex(), "#00FF00");
    }
}
