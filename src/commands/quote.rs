use acars::config::AppConfig;
use acars::quotes::QuoteService;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use super::{discord_client, http_client};

pub async fn handle_quote(config: AppConfig, user_id: String) -> Result<()> {
    let http = http_client()?;
    let service = QuoteService::new(Arc::new(discord_client(&config, &http)?));

    let quote = service
        .send_quote(&user_id)
        .await
        .with_context(|| format!("Failed to send quote to user {}", user_id))?;
    info!("Sent \"{}\" ({})", quote.text, quote.author);
    Ok(())
}
