use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use super::snapshot::FlightSnapshot;
use crate::config::TrackerConfig;

/// Coarse ground/airborne classification from altitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightPhase {
    Ground,
    Airborne,
}

impl FlightPhase {
    /// Airborne iff altitude is above the threshold; unknown altitude reads as 0
    pub fn from_altitude(altitude_ft: Option<f64>, airborne_threshold_ft: f64) -> Self {
        if altitude_ft.unwrap_or(0.0) > airborne_threshold_ft {
            FlightPhase::Airborne
        } else {
            FlightPhase::Ground
        }
    }
}

impl std::fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlightPhase::Ground => write!(f, "ground"),
            FlightPhase::Airborne => write!(f, "airborne"),
        }
    }
}

/// Climb/cruise/descent classification from vertical speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalPhase {
    /// Vertical speed above +threshold
    Climb,
    /// |vertical speed| within the cruise band
    Cruise,
    /// Vertical speed below -threshold
    Descent,
    /// No vertical speed seen yet
    Unknown,
}

impl VerticalPhase {
    /// Classify with hysteresis: between the cruise band and the climb/descent
    /// threshold the previous classification is kept, as it is when the
    /// vertical speed is unknown.
    pub fn classify(previous: VerticalPhase, vertical_speed_fpm: Option<i32>, config: &TrackerConfig) -> Self {
        let Some(vs) = vertical_speed_fpm else {
            return previous;
        };

        if vs > config.vertical_phase_threshold_fpm {
            VerticalPhase::Climb
        } else if vs < -config.vertical_phase_threshold_fpm {
            VerticalPhase::Descent
        } else if vs.abs() <= config.cruise_band_fpm {
            VerticalPhase::Cruise
        } else {
            previous
        }
    }
}

impl std::fmt::Display for VerticalPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerticalPhase::Climb => write!(f, "climb"),
            VerticalPhase::Cruise => write!(f, "cruise"),
            VerticalPhase::Descent => write!(f, "descent"),
            VerticalPhase::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltitudeSample {
    pub altitude_ft: f64,
    pub timestamp: DateTime<Utc>,
}

/// Last known state of one tracked flight
///
/// The `last_*` fields are sticky: a snapshot that reports a value as unknown
/// leaves the previous value in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightState {
    pub callsign: Option<String>,
    pub last_altitude_ft: Option<f64>,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
    pub last_speed_kts: Option<f64>,
    pub last_heading_deg: Option<f64>,

    pub phase: FlightPhase,
    pub vertical_phase: VerticalPhase,

    /// Most recent poll that saw this flight
    pub last_poll_at: DateTime<Utc>,
    /// Most recent poll that emitted an event for this flight
    pub last_notified_at: DateTime<Utc>,

    /// Altitude samples inside the retention window, oldest first.
    /// Only crash detection reads this.
    pub altitude_history: VecDeque<AltitudeSample>,

    /// Once set, no further events are emitted until the flight is evicted
    pub crash_detected: bool,
}

impl FlightState {
    /// State for a flight seen for the first time
    pub fn new(snapshot: &FlightSnapshot, now: DateTime<Utc>, config: &TrackerConfig) -> Self {
        let mut state = Self {
            callsign: snapshot.callsign.clone(),
            last_altitude_ft: snapshot.altitude_ft,
            last_latitude: snapshot.latitude,
            last_longitude: snapshot.longitude,
            last_speed_kts: snapshot.speed_kts,
            last_heading_deg: snapshot.heading_deg,
            phase: FlightPhase::from_altitude(snapshot.altitude_ft, config.airborne_altitude_ft),
            vertical_phase: VerticalPhase::classify(
                VerticalPhase::Unknown,
                snapshot.vertical_speed_fpm,
                config,
            ),
            last_poll_at: now,
            last_notified_at: now,
            altitude_history: VecDeque::new(),
            crash_detected: false,
        };
        if let Some(altitude_ft) = snapshot.altitude_ft {
            state.record_altitude(altitude_ft, now, config.altitude_history_window());
        }
        state
    }

    /// Overwrite sticky fields with whatever the snapshot actually reports
    pub fn merge_sticky(&mut self, snapshot: &FlightSnapshot) {
        if snapshot.callsign.is_some() {
            self.callsign = snapshot.callsign.clone();
        }
        if snapshot.altitude_ft.is_some() {
            self.last_altitude_ft = snapshot.altitude_ft;
        }
        if snapshot.latitude.is_some() {
            self.last_latitude = snapshot.latitude;
        }
        if snapshot.longitude.is_some() {
            self.last_longitude = snapshot.longitude;
        }
        if snapshot.speed_kts.is_some() {
            self.last_speed_kts = snapshot.speed_kts;
        }
        if snapshot.heading_deg.is_some() {
            self.last_heading_deg = snapshot.heading_deg;
        }
    }

    /// Append an altitude sample and evict everything older than `window`.
    /// Samples older than the newest one already held are ignored so the
    /// history stays ordered.
    pub fn record_altitude(
        &mut self,
        altitude_ft: f64,
        timestamp: DateTime<Utc>,
        window: chrono::Duration,
    ) {
        let in_order = self
            .altitude_history
            .back()
            .map(|last| timestamp >= last.timestamp)
            .unwrap_or(true);
        if in_order {
            self.altitude_history.push_back(AltitudeSample {
                altitude_ft,
                timestamp,
            });
        }

        let cutoff = timestamp - window;
        while self
            .altitude_history
            .front()
            .is_some_and(|sample| sample.timestamp < cutoff)
        {
            self.altitude_history.pop_front();
        }
    }

    /// Get the last known position (lat, lng)
    pub fn last_position(&self) -> Option<(f64, f64)> {
        Some((self.last_latitude?, self.last_longitude?))
    }

    /// Vertical speed for a new snapshot: the reported value if present,
    /// otherwise derived from the altitude change since the last poll that
    /// actually reported an altitude.
    pub fn vertical_speed_for(&self, snapshot: &FlightSnapshot, now: DateTime<Utc>) -> Option<i32> {
        if snapshot.vertical_speed_fpm.is_some() {
            return snapshot.vertical_speed_fpm;
        }

        let current = snapshot.altitude_ft?;
        let previous = self.altitude_history.back()?;
        let elapsed_ms = (now - previous.timestamp).num_milliseconds();
        if elapsed_ms <= 0 {
            return None;
        }

        let elapsed_seconds = elapsed_ms as f64 / 1000.0;
        let fpm = (current - previous.altitude_ft) / elapsed_seconds * 60.0;
        Some(fpm.round() as i32)
    }
}

/// All tracked flights, keyed by identity. Owned by a single tracker.
#[derive(Debug, Default)]
pub struct FlightStateStore {
    flights: HashMap<String, FlightState>,
    /// Consecutive polls that returned no usable records
    pub(crate) consecutive_empty_polls: u32,
}

impl FlightStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&FlightState> {
        self.flights.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.flights.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FlightState)> {
        self.flights.iter()
    }

    pub(crate) fn insert(&mut self, id: String, state: FlightState) {
        self.flights.insert(id, state);
    }

    pub(crate) fn clear(&mut self) {
        self.flights.clear();
    }

    /// Drop every flight the predicate rejects, returning the dropped ids
    pub(crate) fn retain_ids(&mut self, mut keep: impl FnMut(&str) -> bool) -> Vec<String> {
        let mut removed = Vec::new();
        self.flights.retain(|id, _| {
            if keep(id) {
                true
            } else {
                removed.push(id.clone());
                false
            }
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn snapshot_at(altitude: Option<f64>) -> FlightSnapshot {
        FlightSnapshot {
            altitude_ft: altitude,
            ..FlightSnapshot::new("f-1")
        }
    }

    #[test]
    fn test_phase_from_altitude() {
        assert_eq!(FlightPhase::from_altitude(Some(1000.0), 500.0), FlightPhase::Airborne);
        assert_eq!(FlightPhase::from_altitude(Some(500.0), 500.0), FlightPhase::Ground);
        assert_eq!(FlightPhase::from_altitude(None, 500.0), FlightPhase::Ground);
    }

    #[test]
    fn test_vertical_phase_hysteresis() {
        let config = TrackerConfig::default();
        use VerticalPhase::*;

        assert_eq!(VerticalPhase::classify(Unknown, Some(501), &config), Climb);
        assert_eq!(VerticalPhase::classify(Unknown, Some(-501), &config), Descent);
        assert_eq!(VerticalPhase::classify(Climb, Some(150), &config), Cruise);
        assert_eq!(VerticalPhase::classify(Climb, Some(-200), &config), Cruise);
        // Inside the 200-500 band nothing changes
        assert_eq!(VerticalPhase::classify(Climb, Some(350), &config), Climb);
        assert_eq!(VerticalPhase::classify(Descent, Some(-400), &config), Descent);
        assert_eq!(VerticalPhase::classify(Cruise, Some(500), &config), Cruise);
        assert_eq!(VerticalPhase::classify(Unknown, Some(300), &config), Unknown);
        assert_eq!(VerticalPhase::classify(Descent, None, &config), Descent);
    }

    #[test]
    fn test_merge_sticky_keeps_known_values() {
        let config = TrackerConfig::default();
        let first = FlightSnapshot {
            latitude: Some(40.0),
            longitude: Some(-74.0),
            speed_kts: Some(250.0),
            ..snapshot_at(Some(10_000.0))
        };
        let mut state = FlightState::new(&first, base_time(), &config);

        let sparse = FlightSnapshot {
            speed_kts: Some(260.0),
            ..snapshot_at(None)
        };
        state.merge_sticky(&sparse);

        assert_eq!(state.last_altitude_ft, Some(10_000.0));
        assert_eq!(state.last_position(), Some((40.0, -74.0)));
        assert_eq!(state.last_speed_kts, Some(260.0));
    }

    #[test]
    fn test_altitude_history_prunes_outside_window() {
        let config = TrackerConfig::default();
        let t0 = base_time();
        let mut state = FlightState::new(&snapshot_at(Some(1000.0)), t0, &config);
        let window = config.altitude_history_window();

        state.record_altitude(2000.0, t0 + chrono::Duration::seconds(60), window);
        state.record_altitude(3000.0, t0 + chrono::Duration::seconds(120), window);
        assert_eq!(state.altitude_history.len(), 3);

        state.record_altitude(4000.0, t0 + chrono::Duration::seconds(121), window);
        assert_eq!(state.altitude_history.len(), 3);
        assert_eq!(state.altitude_history.front().unwrap().altitude_ft, 2000.0);
    }

    #[test]
    fn test_altitude_history_ignores_out_of_order_samples() {
        let config = TrackerConfig::default();
        let t0 = base_time();
        let mut state = FlightState::new(&snapshot_at(Some(1000.0)), t0, &config);

        state.record_altitude(900.0, t0 - chrono::Duration::seconds(5), config.altitude_history_window());
        assert_eq!(state.altitude_history.len(), 1);
    }

    #[test]
    fn test_first_sighting_without_altitude_has_empty_history() {
        let config = TrackerConfig::default();
        let state = FlightState::new(&snapshot_at(None), base_time(), &config);
        assert!(state.altitude_history.is_empty());
        assert_eq!(state.phase, FlightPhase::Ground);
        assert_eq!(state.vertical_phase, VerticalPhase::Unknown);
    }

    #[test]
    fn test_vertical_speed_prefers_reported_value() {
        let config = TrackerConfig::default();
        let t0 = base_time();
        let state = FlightState::new(&snapshot_at(Some(1000.0)), t0, &config);

        let reported = FlightSnapshot {
            vertical_speed_fpm: Some(-800),
            ..snapshot_at(Some(5000.0))
        };
        assert_eq!(
            state.vertical_speed_for(&reported, t0 + chrono::Duration::seconds(60)),
            Some(-800)
        );
    }

    #[test]
    fn test_vertical_speed_derived_from_altitude_change() {
        let config = TrackerConfig::default();
        let t0 = base_time();
        let state = FlightState::new(&snapshot_at(Some(1000.0)), t0, &config);

        // 1000 ft -> 1600 ft over 60s
        let next = snapshot_at(Some(1600.0));
        assert_eq!(
            state.vertical_speed_for(&next, t0 + chrono::Duration::seconds(60)),
            Some(600)
        );
        // 1000 ft -> 900 ft over 45s = -133.33 fpm
        let next = snapshot_at(Some(900.0));
        assert_eq!(
            state.vertical_speed_for(&next, t0 + chrono::Duration::seconds(45)),
            Some(-133)
        );
    }

    #[test]
    fn test_vertical_speed_undefined_without_elapsed_time_or_altitude() {
        let config = TrackerConfig::default();
        let t0 = base_time();
        let state = FlightState::new(&snapshot_at(Some(1000.0)), t0, &config);

        assert_eq!(state.vertical_speed_for(&snapshot_at(Some(2000.0)), t0), None);
        assert_eq!(
            state.vertical_speed_for(&snapshot_at(None), t0 + chrono::Duration::seconds(60)),
            None
        );

        let no_altitude = FlightState::new(&snapshot_at(None), t0, &config);
        assert_eq!(
            no_altitude.vertical_speed_for(&snapshot_at(Some(2000.0)), t0 + chrono::Duration::seconds(60)),
            None
        );
    }

    #[test]
    fn test_vertical_speed_spans_polls_without_altitude() {
        let config = TrackerConfig::default();
        let t0 = base_time();
        let mut state = FlightState::new(&snapshot_at(Some(10_000.0)), t0, &config);

        // A poll at t0+60 reported no altitude
        state.merge_sticky(&snapshot_at(None));
        state.last_poll_at = t0 + chrono::Duration::seconds(60);

        // 1000 ft over the 120 s since the altitude was last seen
        let next = snapshot_at(Some(11_000.0));
        assert_eq!(
            state.vertical_speed_for(&next, t0 + chrono::Duration::seconds(120)),
            Some(500)
        );
    }

    #[test]
    fn test_store_retain_reports_removed_ids() {
        let config = TrackerConfig::default();
        let mut store = FlightStateStore::new();
        for id in ["a", "b", "c"] {
            store.insert(
                id.to_string(),
                FlightState::new(&FlightSnapshot::new(id), base_time(), &config),
            );
        }

        let mut removed = store.retain_ids(|id| id == "b");
        removed.sort();
        assert_eq!(removed, vec!["a".to_string(), "c".to_string()]);
        assert!(store.contains("b"));
        assert_eq!(store.len(), 1);
    }
}
