use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::discord::{Embed, MessageSink, OutgoingMessage};
use crate::error::TrackerError;
use crate::flight_tracker::{FlightEvent, FlightEventKind, FlightSnapshot};

pub const FLIGHT_STATUS_FOOTER: &str = "ACARS Bot Flight Status";

const COLOR_ENTERED: u32 = 0x3498DB;
const COLOR_TAKEOFF: u32 = 0x2ECC71;
const COLOR_LANDING: u32 = 0xF1C40F;
const COLOR_CRASH: u32 = 0xE74C3C;
const COLOR_UPDATE: u32 = 0x5865F2;

/// Delivers flight events somewhere humans will see them.
///
/// Failures are reported to the caller, which logs them; events are never
/// retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &FlightEvent) -> Result<(), TrackerError>;
}

/// Posts every event as an embed to one fixed channel
pub struct DiscordNotifier {
    sink: Arc<dyn MessageSink>,
    channel_id: String,
}

impl DiscordNotifier {
    pub fn new(sink: Arc<dyn MessageSink>, channel_id: impl Into<String>) -> Self {
        Self {
            sink,
            channel_id: channel_id.into(),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, event: &FlightEvent) -> Result<(), TrackerError> {
        debug!(
            "Posting {} for flight {} to channel {}",
            event.kind.label(),
            event.flight_id,
            self.channel_id
        );
        let message = OutgoingMessage::embed(render_event(event));
        self.sink
            .send_channel_message(&self.channel_id, &message)
            .await
    }
}

pub fn render_event(event: &FlightEvent) -> Embed {
    let name = event.snapshot.display_name();
    let (title, color) = match event.kind {
        FlightEventKind::EnteredTracking => (format!("📡 Now tracking {}", name), COLOR_ENTERED),
        FlightEventKind::Takeoff => (format!("🛫 {} has departed", name), COLOR_TAKEOFF),
        FlightEventKind::Landing => (format!("🛬 {} has landed", name), COLOR_LANDING),
        FlightEventKind::Crash { .. } => (format!("🚨 {} possible crash", name), COLOR_CRASH),
        FlightEventKind::Update => (format!("✈️ Flight update - {}", name), COLOR_UPDATE),
    };

    let mut description = describe_snapshot(&event.snapshot, event.vertical_speed_fpm);
    description.push_str(&format!(
        "\n**Phase:** {} ({})",
        event.phase, event.vertical_phase
    ));

    if let FlightEventKind::Crash {
        descent_ft,
        rate_fpm,
    } = event.kind
    {
        description.push_str(&format!(
            "\n**Descent:** {:.0} ft at {} fpm",
            descent_ft, rate_fpm
        ));
    }

    let mut embed = Embed::new(title)
        .description(description)
        .color(color)
        .timestamp(event.timestamp)
        .footer(FLIGHT_STATUS_FOOTER);

    if let Some(engines) = engine_info(&event.snapshot) {
        embed = embed.field("Engine Info", engines, false);
    }
    if !event.reasons.is_empty() {
        let reasons: Vec<String> = event.reasons.iter().map(|r| r.to_string()).collect();
        embed = embed.field("Reason", reasons.join(", "), false);
    }
    embed
}

/// Status card for a raw snapshot, outside of any tracking event
pub fn render_flight_status(snapshot: &FlightSnapshot, now: chrono::DateTime<chrono::Utc>) -> Embed {
    let mut description = describe_snapshot(snapshot, snapshot.vertical_speed_fpm);
    description.push_str("\n**Status:** Active flight status");

    let mut embed = Embed::new(format!("✈️ Flight update - {}", snapshot.display_name()))
        .description(description)
        .color(COLOR_UPDATE)
        .timestamp(now)
        .footer(FLIGHT_STATUS_FOOTER);

    if let Some(engines) = engine_info(snapshot) {
        embed = embed.field("Engine Info", engines, false);
    }
    embed
}

fn describe_snapshot(snapshot: &FlightSnapshot, vertical_speed_fpm: Option<i32>) -> String {
    let details = &snapshot.details;
    let unknown = "Unknown";

    let mut description = format!(
        "**Aircraft:** {}\n**Route:** {} ➝ {}\n**Altitude:** {}",
        details.aircraft_type.as_deref().unwrap_or(unknown),
        details.origin.as_deref().unwrap_or(unknown),
        details.destination.as_deref().unwrap_or(unknown),
        snapshot
            .altitude_ft
            .map(|a| format!("{:.0} ft", a))
            .unwrap_or_else(|| "N/A".to_string()),
    );
    if let Some(agl) = details.altitude_agl_ft {
        description.push_str(&format!(" ({:.0} ft AGL)", agl));
    }
    if let Some(speed) = snapshot.speed_kts {
        description.push_str(&format!("\n**Speed:** {:.0} kts", speed));
    }
    if let Some(vs) = vertical_speed_fpm {
        description.push_str(&format!("\n**Vertical Speed:** {} fpm", vs));
    }
    if let Some((lat, lon)) = snapshot.position() {
        description.push_str(&format!("\n**Position:** {:.4}, {:.4}", lat, lon));
    }
    description
}

fn engine_info(snapshot: &FlightSnapshot) -> Option<String> {
    let details = &snapshot.details;
    let parts: Vec<String> = [
        ("Type", &details.engine_type),
        ("Model", &details.engine_model),
        ("Count", &details.engine_count),
        ("Info", &details.engines),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}: {}", label, v)))
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}
