use chrono::{DateTime, Utc};
use metrics::gauge;

use super::flight_state::{FlightPhase, FlightStateStore};

/// Flights not seen for this long are reported as stale
const STALE_AFTER_SECS: i64 = 600;

/// Update flight tracker gauges from the current store.
/// Called at the end of every poll cycle, including failed ones.
pub(crate) fn update_flight_tracker_metrics(store: &FlightStateStore, now: DateTime<Utc>) {
    let stale_threshold = chrono::Duration::seconds(STALE_AFTER_SECS);

    let mut airborne = 0usize;
    let mut crashed = 0usize;
    let mut stale = 0usize;
    for (_, state) in store.iter() {
        if state.phase == FlightPhase::Airborne {
            airborne += 1;
        }
        if state.crash_detected {
            crashed += 1;
        }
        if now.signed_duration_since(state.last_poll_at) > stale_threshold {
            stale += 1;
        }
    }

    gauge!("flight_tracker.tracked_flights").set(store.len() as f64);
    gauge!("flight_tracker.airborne_flights").set(airborne as f64);
    gauge!("flight_tracker.crash_flagged_flights").set(crashed as f64);
    gauge!("flight_tracker.stale_flights").set(stale as f64);
    gauge!("flight_tracker.consecutive_empty_polls").set(store.consecutive_empty_polls as f64);
}
