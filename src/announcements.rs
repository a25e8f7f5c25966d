use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::discord::{BLURPLE, Embed, MessageSink, OutgoingMessage};
use crate::error::TrackerError;

pub const ANNOUNCEMENT_FOOTER: &str = "ACARS Bot Announcement";

/// Parse an embed colour given as `0x5865F2`, `#5865F2` or `5865F2`.
/// Anything unparseable, or outside 24 bits, falls back to blurple.
pub fn parse_color(color: Option<&str>) -> u32 {
    let Some(raw) = color.map(str::trim).filter(|c| !c.is_empty()) else {
        return BLURPLE;
    };

    let hex = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .or_else(|| raw.strip_prefix('#'))
        .unwrap_or(raw);

    u32::from_str_radix(hex, 16)
        .ok()
        .filter(|c| *c <= 0xFFFFFF)
        .unwrap_or(BLURPLE)
}

/// Posts announcement embeds to a channel
#[derive(Clone)]
pub struct AnnouncementService {
    sink: Arc<dyn MessageSink>,
}

impl AnnouncementService {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self { sink }
    }

    pub async fn send_announcement(
        &self,
        channel_id: &str,
        title: &str,
        message: &str,
        color: Option<&str>,
    ) -> Result<(), TrackerError> {
        if channel_id.trim().is_empty() {
            return Err(TrackerError::DeliveryFailure("Channel ID is required".to_string()));
        }
        if title.trim().is_empty() || message.trim().is_empty() {
            return Err(TrackerError::DeliveryFailure(
                "Title and message are required".to_string(),
            ));
        }

        let embed = Embed::new(title)
            .description(message)
            .color(parse_color(color))
            .timestamp(Utc::now())
            .footer(ANNOUNCEMENT_FOOTER);

        self.sink
            .send_channel_message(channel_id, &OutgoingMessage::embed(embed))
            .await?;

        info!("Announcement sent: \"{}\" to channel {}", title, channel_id);
        metrics::counter!("announcements.sent_total").increment(1);
        Ok(())
    }
}
