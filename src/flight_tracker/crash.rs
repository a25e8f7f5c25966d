use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use super::flight_state::AltitudeSample;

/// A descent steep enough to be treated as a crash
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrashAssessment {
    /// Highest altitude inside the window
    pub peak_altitude_ft: f64,
    /// Feet lost between the peak and the current sample
    pub descent_ft: f64,
    /// Implied descent rate from the peak to now
    pub rate_fpm: i32,
}

/// Look for a rapid descent in the trailing `window`.
///
/// Compares the current altitude against the highest sample recorded within
/// the window. `history` is expected to already contain the current sample.
pub(crate) fn assess_crash(
    history: &VecDeque<AltitudeSample>,
    current_altitude_ft: f64,
    now: DateTime<Utc>,
    window: chrono::Duration,
    descent_threshold_ft: f64,
) -> Option<CrashAssessment> {
    let window_start = now - window;

    let peak = history
        .iter()
        .filter(|s| s.timestamp >= window_start && s.timestamp <= now)
        .max_by(|a, b| a.altitude_ft.total_cmp(&b.altitude_ft))?;

    let descent_ft = peak.altitude_ft - current_altitude_ft;
    if descent_ft < descent_threshold_ft {
        return None;
    }

    let elapsed_ms = (now - peak.timestamp).num_milliseconds();
    let rate_fpm = if elapsed_ms > 0 {
        (descent_ft / (elapsed_ms as f64 / 60_000.0)).round() as i32
    } else {
        descent_ft.round() as i32
    };

    Some(CrashAssessment {
        peak_altitude_ft: peak.altitude_ft,
        descent_ft,
        rate_fpm,
    })
}
