use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder.
/// Returns a handle the API server renders at `/metrics`.
pub fn init_metrics() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        // Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        )
        .context("failed to set buckets for http_request_duration_seconds")?
        .set_buckets_for_metric(
            Matcher::Full("scheduler.cycle_duration_seconds".to_string()),
            &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
        )
        .context("failed to set buckets for scheduler.cycle_duration_seconds")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register tracker metrics at zero so dashboards see them before the first event
pub fn initialize_tracker_metrics() {
    metrics::counter!("flight_tracker.cycles_total").absolute(0);
    metrics::counter!("flight_tracker.source_failures_total").absolute(0);
    metrics::counter!("flight_tracker.delivery_failures_total").absolute(0);
    metrics::counter!("flight_tracker.flights_removed_total").absolute(0);
    metrics::counter!("telemetry.malformed_records_total").absolute(0);

    for kind in ["entered_tracking", "takeoff", "landing", "crash", "update"] {
        metrics::counter!("flight_tracker.events_total", "kind" => kind).absolute(0);
    }

    metrics::gauge!("flight_tracker.tracked_flights").set(0.0);
    metrics::gauge!("flight_tracker.airborne_flights").set(0.0);
    metrics::gauge!("flight_tracker.crash_flagged_flights").set(0.0);
    metrics::gauge!("flight_tracker.stale_flights").set(0.0);
    metrics::gauge!("flight_tracker.consecutive_empty_polls").set(0.0);
}

/// Register messaging metrics at zero
pub fn initialize_messaging_metrics() {
    metrics::counter!("announcements.sent_total").absolute(0);
    metrics::counter!("api.announce.unauthorized_total").absolute(0);
    metrics::counter!("quotes.sent_total").absolute(0);
    metrics::counter!("quotes.delivery_failures_total").absolute(0);
}
