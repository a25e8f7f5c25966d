mod crash;
mod detector;
mod events;
mod flight_state;
pub(crate) mod geometry;
mod snapshot;
pub(crate) mod utils;

pub use crash::CrashAssessment;
pub use detector::FlightDetector;
pub use events::{FlightEvent, FlightEventKind, UpdateReason};
pub use flight_state::{AltitudeSample, FlightPhase, FlightState, FlightStateStore, VerticalPhase};
pub use snapshot::{FlightDetails, FlightSnapshot};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::notifier::Notifier;
use crate::scheduler::Job;
use crate::telemetry_source::TelemetrySource;

/// Name of the flight poll timer
pub const FLIGHT_POLL_TIMER: &str = "flight_poll";

/// Outcome of one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Usable records returned by the source
    pub flights_seen: usize,
    pub events_emitted: usize,
    pub delivery_failures: usize,
}

/// Polls the telemetry source and notifies on flight events.
///
/// Owns the state store outright: one cycle is fetch, detect, deliver, and
/// nothing else touches the store in between.
pub struct FlightTracker {
    source: Arc<dyn TelemetrySource>,
    notifier: Arc<dyn Notifier>,
    detector: FlightDetector,
    store: FlightStateStore,
}

impl FlightTracker {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        notifier: Arc<dyn Notifier>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            source,
            notifier,
            detector: FlightDetector::new(config),
            store: FlightStateStore::new(),
        }
    }

    pub fn store(&self) -> &FlightStateStore {
        &self.store
    }

    pub fn config(&self) -> &TrackerConfig {
        self.detector.config()
    }

    pub async fn poll_once(&mut self) -> Result<CycleSummary, TrackerError> {
        self.poll_at(Utc::now()).await
    }

    /// Run one cycle as of `now`.
    ///
    /// A source failure aborts the cycle before the store is touched.
    /// Delivery failures are logged and counted but do not fail the cycle.
    #[tracing::instrument(skip(self), fields(tracked = self.store.len()))]
    pub async fn poll_at(&mut self, now: DateTime<Utc>) -> Result<CycleSummary, TrackerError> {
        metrics::counter!("flight_tracker.cycles_total").increment(1);

        let snapshots = match self.source.fetch_active_flights().await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                warn!("Skipping poll cycle: {}", e);
                metrics::counter!("flight_tracker.source_failures_total").increment(1);
                utils::update_flight_tracker_metrics(&self.store, now);
                return Err(e);
            }
        };

        let mut summary = CycleSummary {
            flights_seen: snapshots.len(),
            ..CycleSummary::default()
        };

        let events = self.detector.process(&mut self.store, snapshots, now);
        summary.events_emitted = events.len();

        for event in &events {
            metrics::counter!("flight_tracker.events_total", "kind" => event.kind.label())
                .increment(1);

            if let Err(e) = self.notifier.notify(event).await {
                error!(
                    "Failed to deliver {} for flight {}: {}",
                    event.kind.label(),
                    event.flight_id,
                    e
                );
                metrics::counter!("flight_tracker.delivery_failures_total").increment(1);
                summary.delivery_failures += 1;
            }
        }

        utils::update_flight_tracker_metrics(&self.store, now);

        if summary.events_emitted > 0 {
            info!(
                "Poll cycle complete: {} flights, {} events, {} delivery failures",
                summary.flights_seen, summary.events_emitted, summary.delivery_failures
            );
        } else {
            debug!("Poll cycle complete: {} flights, no events", summary.flights_seen);
        }

        Ok(summary)
    }
}

#[async_trait]
impl Job for FlightTracker {
    fn name(&self) -> &str {
        FLIGHT_POLL_TIMER
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        self.poll_once().await?;
        Ok(())
    }
}
