use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SupabaseConfig;
use crate::error::TrackerError;
use crate::flight_tracker::FlightSnapshot;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Where flight snapshots come from.
///
/// A fetch either returns the complete set of currently active flights or
/// fails as a whole with [`TrackerError::SourceUnavailable`].
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_active_flights(&self) -> Result<Vec<FlightSnapshot>, TrackerError>;
}

/// Reads the `active_flights` table through the Supabase REST API
#[derive(Clone)]
pub struct SupabaseFlightSource {
    client: Client,
    url: String,
    anon_key: String,
}

impl SupabaseFlightSource {
    pub fn new(client: Client, config: &SupabaseConfig) -> Self {
        Self {
            client,
            url: format!("{}/rest/v1/active_flights", config.url.trim_end_matches('/')),
            anon_key: config.anon_key.clone(),
        }
    }
}

#[async_trait]
impl TelemetrySource for SupabaseFlightSource {
    async fn fetch_active_flights(&self) -> Result<Vec<FlightSnapshot>, TrackerError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("select", "*")])
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| TrackerError::SourceUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::SourceUnavailable(format!(
                "Supabase returned {}: {}",
                status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TrackerError::SourceUnavailable(format!("invalid JSON body: {}", e)))?;

        parse_active_flights(&body)
    }
}

/// Turn the feed body into snapshots.
///
/// The body must be a JSON array. Individual rows that cannot be used are
/// logged and skipped; they never fail the whole fetch.
pub fn parse_active_flights(body: &Value) -> Result<Vec<FlightSnapshot>, TrackerError> {
    let rows = body.as_array().ok_or_else(|| {
        TrackerError::SourceUnavailable("expected a JSON array of active flights".to_string())
    })?;

    let mut snapshots = Vec::with_capacity(rows.len());
    for row in rows {
        match FlightSnapshot::from_record(row) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                warn!("Skipping flight record: {}", e);
                metrics::counter!("telemetry.malformed_records_total").increment(1);
            }
        }
    }

    debug!(
        rows = rows.len(),
        usable = snapshots.len(),
        "Fetched active flights"
    );
    Ok(snapshots)
}
