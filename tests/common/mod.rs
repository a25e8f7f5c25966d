//! In-memory collaborators shared by the integration tests
#![allow(dead_code)]

use acars::TrackerError;
use acars::discord::{MessageSink, OutgoingMessage};
use acars::flight_tracker::{FlightEvent, FlightSnapshot};
use acars::notifier::Notifier;
use acars::telemetry_source::TelemetrySource;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays a scripted sequence of fetch results, one per call
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Vec<FlightSnapshot>, TrackerError>>>,
}

impl ScriptedSource {
    pub fn push(&self, flights: Vec<FlightSnapshot>) {
        self.responses.lock().unwrap().push_back(Ok(flights));
    }

    pub fn push_failure(&self, reason: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(TrackerError::SourceUnavailable(reason.to_string())));
    }
}

#[async_trait]
impl TelemetrySource for ScriptedSource {
    async fn fetch_active_flights(&self) -> Result<Vec<FlightSnapshot>, TrackerError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TrackerError::SourceUnavailable("script exhausted".to_string())))
    }
}

/// Records every event; optionally fails each delivery
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<FlightEvent>>,
    pub fail: std::sync::atomic::AtomicBool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: std::sync::atomic::AtomicBool::new(true),
        }
    }

    pub fn take(&self) -> Vec<FlightEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &FlightEvent) -> Result<(), TrackerError> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(TrackerError::DeliveryFailure("channel unavailable".to_string()));
        }
        Ok(())
    }
}

/// A message captured by [`RecordingSink`]
#[derive(Debug, Clone)]
pub enum Sent {
    Channel(String, OutgoingMessage),
    Direct(String, OutgoingMessage),
}

/// Captures outgoing Discord messages. Users listed in `dms_disabled`
/// refuse direct messages; `fail_channels` makes every channel send fail.
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<Sent>>,
    pub dms_disabled: Vec<String>,
    pub fail_channels: bool,
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send_channel_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
    ) -> Result<(), TrackerError> {
        if self.fail_channels {
            return Err(TrackerError::DeliveryFailure("Missing Access".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Channel(channel_id.to_string(), message.clone()));
        Ok(())
    }

    async fn send_direct_message(
        &self,
        user_id: &str,
        message: &OutgoingMessage,
    ) -> Result<(), TrackerError> {
        if self.dms_disabled.iter().any(|u| u == user_id) {
            return Err(TrackerError::DirectMessagesDisabled(user_id.to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Direct(user_id.to_string(), message.clone()));
        Ok(())
    }
}

/// A level-flight record at `altitude_ft`
pub fn flight(id: &str, altitude_ft: f64) -> FlightSnapshot {
    FlightSnapshot {
        callsign: Some(format!("ACA{}", id)),
        altitude_ft: Some(altitude_ft),
        latitude: Some(40.0),
        longitude: Some(-74.0),
        speed_kts: Some(250.0),
        vertical_speed_fpm: Some(0),
        ..FlightSnapshot::new(id)
    }
}
