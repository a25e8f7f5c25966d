use acars::config::AppConfig;
use acars::discord::{MessageSink, OutgoingMessage};
use acars::notifier::render_flight_status;
use acars::telemetry_source::{SupabaseFlightSource, TelemetrySource};
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info};

use super::{discord_client, http_client};

/// Fetch every active flight once and post a status card for each
pub async fn handle_test_flight(config: AppConfig) -> Result<()> {
    let supabase = config.supabase.as_ref().context(
        "Supabase is not configured. Set SUPABASE_URL and SUPABASE_ANON_KEY in your environment",
    )?;
    let channel_id = config
        .flight_status_channel_id
        .as_deref()
        .context("FLIGHT_STATUS_CHANNEL_ID is not set")?;

    let http = http_client()?;
    let discord = discord_client(&config, &http)?;
    let source = SupabaseFlightSource::new(http, supabase);

    let flights = source
        .fetch_active_flights()
        .await
        .context("Failed to fetch active flights")?;

    if flights.is_empty() {
        info!("No active flights found in Supabase");
        return Ok(());
    }

    let now = Utc::now();
    let mut sent = 0usize;
    let mut failed = 0usize;
    for flight in &flights {
        let message = OutgoingMessage::embed(render_flight_status(flight, now));
        match discord.send_channel_message(channel_id, &message).await {
            Ok(()) => sent += 1,
            Err(e) => {
                error!("Failed to send status for flight {}: {}", flight.display_name(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        info!(
            "Sent {} flight status update(s) to channel {} ({} failed)",
            sent, channel_id, failed
        );
    } else {
        info!("Sent {} flight status update(s) to channel {}", sent, channel_id);
    }
    Ok(())
}
