//! ACARS - flight status bot for Discord
//!
//! Polls a Supabase `active_flights` feed, tracks each flight across polls
//! and posts takeoff, landing, crash and progress updates to a channel.
//! Also serves a small announcement API and sends scheduled quote DMs.

pub mod announcements;
pub mod api;
pub mod config;
pub mod discord;
pub mod error;
pub mod flight_tracker;
pub mod log_format;
pub mod metrics;
pub mod notifier;
pub mod quotes;
pub mod scheduler;
pub mod telemetry_source;

pub use error::TrackerError;
pub use flight_tracker::{FlightDetector, FlightEvent, FlightEventKind, FlightSnapshot, FlightTracker};
pub use scheduler::{Job, Scheduler};
