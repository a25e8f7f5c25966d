use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, trace, warn};

use super::crash::assess_crash;
use super::events::{FlightEvent, FlightEventKind, UpdateReason};
use super::flight_state::{FlightPhase, FlightState, FlightStateStore, VerticalPhase};
use super::geometry::haversine_distance_nm;
use super::snapshot::FlightSnapshot;
use crate::config::TrackerConfig;

/// Turns one poll of active flights into events and an updated state store.
///
/// Pure with respect to I/O: the caller fetches the snapshot and delivers the
/// events. The store is only written per flight, after that flight's
/// evaluation has completed.
#[derive(Debug, Clone)]
pub struct FlightDetector {
    config: TrackerConfig,
}

impl FlightDetector {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Process one poll. Returns at most one event per flight.
    pub fn process(
        &self,
        store: &mut FlightStateStore,
        snapshots: Vec<FlightSnapshot>,
        now: DateTime<Utc>,
    ) -> Vec<FlightEvent> {
        let mut seen: HashSet<String> = HashSet::with_capacity(snapshots.len());
        let snapshots: Vec<FlightSnapshot> = snapshots
            .into_iter()
            .filter(|s| {
                if s.id.trim().is_empty() {
                    debug!("Dropping snapshot without identity");
                    return false;
                }
                if !seen.insert(s.id.clone()) {
                    warn!("Duplicate flight {} in snapshot, keeping first record", s.id);
                    return false;
                }
                true
            })
            .collect();

        if snapshots.is_empty() {
            self.handle_empty_poll(store);
            return Vec::new();
        }
        store.consecutive_empty_polls = 0;

        let mut events = Vec::new();
        for snapshot in snapshots {
            let (state, event) = match store.get(&snapshot.id) {
                None => self.first_sighting(&snapshot, now),
                Some(previous) => self.evaluate_returning(previous, &snapshot, now),
            };
            store.insert(snapshot.id.clone(), state);
            if let Some(event) = event {
                events.push(event);
            }
        }

        let removed = store.retain_ids(|id| seen.contains(id));
        for id in &removed {
            info!("Flight {} no longer active, removed from tracking", id);
        }
        if !removed.is_empty() {
            metrics::counter!("flight_tracker.flights_removed_total").increment(removed.len() as u64);
        }

        events
    }

    /// Empty polls reset tracking once `empty_polls_before_reset` of them
    /// have been seen in a row.
    fn handle_empty_poll(&self, store: &mut FlightStateStore) {
        store.consecutive_empty_polls = store.consecutive_empty_polls.saturating_add(1);

        if store.consecutive_empty_polls < self.config.empty_polls_before_reset {
            debug!(
                "Empty poll {}/{}, keeping {} tracked flights",
                store.consecutive_empty_polls,
                self.config.empty_polls_before_reset,
                store.len()
            );
            return;
        }

        if !store.is_empty() {
            info!(
                "No active flights reported, clearing {} tracked flights",
                store.len()
            );
            metrics::counter!("flight_tracker.flights_removed_total").increment(store.len() as u64);
            store.clear();
        }
    }

    fn first_sighting(
        &self,
        snapshot: &FlightSnapshot,
        now: DateTime<Utc>,
    ) -> (FlightState, Option<FlightEvent>) {
        let state = FlightState::new(snapshot, now, &self.config);
        info!(
            "Now tracking flight {} ({}) at {:?} ft, {}",
            snapshot.id,
            snapshot.display_name(),
            snapshot.altitude_ft,
            state.phase
        );

        let event = FlightEvent {
            kind: FlightEventKind::EnteredTracking,
            flight_id: snapshot.id.clone(),
            timestamp: now,
            snapshot: snapshot.clone(),
            phase: state.phase,
            vertical_phase: state.vertical_phase,
            vertical_speed_fpm: snapshot.vertical_speed_fpm,
            reasons: Vec::new(),
        };
        (state, Some(event))
    }

    fn evaluate_returning(
        &self,
        previous: &FlightState,
        snapshot: &FlightSnapshot,
        now: DateTime<Utc>,
    ) -> (FlightState, Option<FlightEvent>) {
        let config = &self.config;
        let mut state = previous.clone();

        let vertical_speed = previous.vertical_speed_for(snapshot, now);
        if let Some(altitude_ft) = snapshot.altitude_ft {
            state.record_altitude(altitude_ft, now, config.altitude_history_window());
        }

        state.merge_sticky(snapshot);
        state.phase = FlightPhase::from_altitude(snapshot.altitude_ft, config.airborne_altitude_ft);
        state.vertical_phase =
            VerticalPhase::classify(previous.vertical_phase, vertical_speed, config);
        state.last_poll_at = now;

        if previous.crash_detected {
            trace!("Flight {} already flagged as crashed, suppressing events", snapshot.id);
            return (state, None);
        }

        // Crash pre-empts every other trigger
        if let Some(altitude_ft) = snapshot.altitude_ft
            && let Some(crash) = assess_crash(
                &state.altitude_history,
                altitude_ft,
                now,
                config.crash_window(),
                config.crash_descent_ft,
            )
        {
            warn!(
                "Possible crash for flight {}: lost {:.0} ft from {:.0} ft ({} fpm)",
                snapshot.id, crash.descent_ft, crash.peak_altitude_ft, crash.rate_fpm
            );
            state.crash_detected = true;
            state.last_notified_at = now;
            let event = self.event(
                FlightEventKind::Crash {
                    descent_ft: crash.descent_ft,
                    rate_fpm: crash.rate_fpm,
                },
                snapshot,
                &state,
                vertical_speed,
                now,
                Vec::new(),
            );
            return (state, Some(event));
        }

        let transition = match (previous.phase, state.phase) {
            (FlightPhase::Ground, FlightPhase::Airborne) => Some(FlightEventKind::Takeoff),
            (FlightPhase::Airborne, FlightPhase::Ground) => Some(FlightEventKind::Landing),
            _ => None,
        };

        let mut reasons = self.update_reasons(previous, &state, snapshot, now);
        if transition.is_some() {
            // The transition itself is the notification
            reasons.retain(|r| *r != UpdateReason::Heartbeat);
        }

        let kind = match transition {
            Some(kind) => {
                info!(
                    "Flight {} {} at {:?} ft",
                    snapshot.id,
                    kind.label(),
                    state.last_altitude_ft
                );
                Some(kind)
            }
            None if state.phase == FlightPhase::Airborne && !reasons.is_empty() => {
                debug!("Flight {} update triggered by {:?}", snapshot.id, reasons);
                Some(FlightEventKind::Update)
            }
            None => None,
        };

        let event = kind.map(|kind| {
            state.last_notified_at = now;
            self.event(kind, snapshot, &state, vertical_speed, now, reasons)
        });
        (state, event)
    }

    /// Independent update triggers; any one of them is enough
    fn update_reasons(
        &self,
        previous: &FlightState,
        state: &FlightState,
        snapshot: &FlightSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<UpdateReason> {
        let config = &self.config;
        let mut reasons = Vec::new();

        if state.phase == FlightPhase::Airborne
            && now - previous.last_notified_at >= config.heartbeat_interval()
        {
            reasons.push(UpdateReason::Heartbeat);
        }

        if let (Some(current), Some(last)) = (snapshot.altitude_ft, previous.last_altitude_ft) {
            let delta_ft = current - last;
            if delta_ft.abs() >= config.altitude_change_ft {
                reasons.push(if delta_ft > 0.0 {
                    UpdateReason::Climbed { delta_ft }
                } else {
                    UpdateReason::Descended { delta_ft: -delta_ft }
                });
            }
        }

        if let (Some(current), Some(last)) = (snapshot.speed_kts, previous.last_speed_kts) {
            let delta_kts = current - last;
            if delta_kts.abs() >= config.speed_change_kts {
                reasons.push(if delta_kts > 0.0 {
                    UpdateReason::Accelerated { delta_kts }
                } else {
                    UpdateReason::Decelerated { delta_kts: -delta_kts }
                });
            }
        }

        if let (Some((lat, lon)), Some((last_lat, last_lon))) =
            (snapshot.position(), previous.last_position())
        {
            let distance_nm = haversine_distance_nm(last_lat, last_lon, lat, lon);
            if distance_nm >= config.position_change_nm {
                reasons.push(UpdateReason::Moved { distance_nm });
            }
        }

        if state.phase == FlightPhase::Airborne
            && state.vertical_phase != previous.vertical_phase
        {
            reasons.push(UpdateReason::VerticalPhaseChanged {
                from: previous.vertical_phase,
                to: state.vertical_phase,
            });
        }

        reasons
    }

    fn event(
        &self,
        kind: FlightEventKind,
        snapshot: &FlightSnapshot,
        state: &FlightState,
        vertical_speed_fpm: Option<i32>,
        now: DateTime<Utc>,
        reasons: Vec<UpdateReason>,
    ) -> FlightEvent {
        FlightEvent {
            kind,
            flight_id: snapshot.id.clone(),
            timestamp: now,
            snapshot: snapshot.clone(),
            phase: state.phase,
            vertical_phase: state.vertical_phase,
            vertical_speed_fpm,
            reasons,
        }
    }
}
