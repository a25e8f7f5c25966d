use acars::announcements::AnnouncementService;
use acars::config::AppConfig;
use anyhow::{Context, Result};
use std::sync::Arc;

use super::{discord_client, http_client};

pub async fn handle_announce(
    config: AppConfig,
    title: String,
    message: String,
    channel: Option<String>,
    color: Option<String>,
) -> Result<()> {
    let channel_id = channel
        .or_else(|| config.announcement_channel_id.clone())
        .context("No channel given and ANNOUNCEMENT_CHANNEL_ID is not set")?;

    let http = http_client()?;
    let service = AnnouncementService::new(Arc::new(discord_client(&config, &http)?));

    service
        .send_announcement(&channel_id, &title, &message, color.as_deref())
        .await
        .context("Failed to send announcement")?;
    Ok(())
}
