use chrono::{DateTime, Utc};
use serde::Serialize;

use super::flight_state::{FlightPhase, VerticalPhase};
use super::snapshot::FlightSnapshot;

/// What happened to a flight this poll
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum FlightEventKind {
    /// First poll that saw this identity
    EnteredTracking,
    Takeoff,
    Landing,
    /// Rapid descent inside the crash window
    Crash { descent_ft: f64, rate_fpm: i32 },
    /// One or more update triggers fired while airborne
    Update,
}

impl FlightEventKind {
    /// Stable label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            FlightEventKind::EnteredTracking => "entered_tracking",
            FlightEventKind::Takeoff => "takeoff",
            FlightEventKind::Landing => "landing",
            FlightEventKind::Crash { .. } => "crash",
            FlightEventKind::Update => "update",
        }
    }
}

/// Why an update was sent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum UpdateReason {
    Heartbeat,
    Climbed { delta_ft: f64 },
    Descended { delta_ft: f64 },
    Accelerated { delta_kts: f64 },
    Decelerated { delta_kts: f64 },
    Moved { distance_nm: f64 },
    VerticalPhaseChanged { from: VerticalPhase, to: VerticalPhase },
}

impl std::fmt::Display for UpdateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateReason::Heartbeat => write!(f, "periodic update"),
            UpdateReason::Climbed { delta_ft } => write!(f, "climbed {:.0} ft", delta_ft),
            UpdateReason::Descended { delta_ft } => write!(f, "descended {:.0} ft", delta_ft),
            UpdateReason::Accelerated { delta_kts } => write!(f, "accelerated {:.0} kts", delta_kts),
            UpdateReason::Decelerated { delta_kts } => write!(f, "decelerated {:.0} kts", delta_kts),
            UpdateReason::Moved { distance_nm } => write!(f, "moved {:.1} nm", distance_nm),
            UpdateReason::VerticalPhaseChanged { from, to } => write!(f, "{} -> {}", from, to),
        }
    }
}

/// One notification-worthy event for one flight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightEvent {
    pub kind: FlightEventKind,
    pub flight_id: String,
    pub timestamp: DateTime<Utc>,
    /// The snapshot that produced the event, for rendering
    pub snapshot: FlightSnapshot,
    pub phase: FlightPhase,
    pub vertical_phase: VerticalPhase,
    pub vertical_speed_fpm: Option<i32>,
    pub reasons: Vec<UpdateReason>,
}

impl FlightEvent {
    pub fn has_reason(&self, predicate: impl Fn(&UpdateReason) -> bool) -> bool {
        self.reasons.iter().any(predicate)
    }
}
