pub mod announce;
pub mod quote;
pub mod run;
pub mod test_flight;

pub use announce::handle_announce;
pub use quote::handle_quote;
pub use run::handle_run;
pub use test_flight::handle_test_flight;

use acars::config::AppConfig;
use acars::discord::DiscordClient;
use anyhow::{Context, Result};
use std::time::Duration;

/// Shared HTTP client for Supabase and Discord
pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("acars/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")
}

pub(crate) fn discord_client(config: &AppConfig, http: &reqwest::Client) -> Result<DiscordClient> {
    let token = config.require_discord_token()?;
    Ok(DiscordClient::new(http.clone(), token))
}
