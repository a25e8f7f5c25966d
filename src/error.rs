use thiserror::Error;

/// Failures at the seams of the flight tracker.
///
/// None of these are fatal to the process: the scheduler logs them and the
/// next tick starts from a consistent state.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The telemetry fetch failed or returned a payload we cannot read.
    /// The current cycle is aborted before any state is touched.
    #[error("telemetry source unavailable: {0}")]
    SourceUnavailable(String),

    /// A single snapshot entry could not be used (no identity, not an object).
    #[error("malformed flight record: {0}")]
    MalformedRecord(String),

    /// A notification or message could not be delivered.
    #[error("delivery failed: {0}")]
    DeliveryFailure(String),

    /// Discord refused to open or deliver to a DM channel (error code 50007).
    #[error("cannot send DM to user {0}, they may have DMs disabled or have blocked the bot")]
    DirectMessagesDisabled(String),

    #[error("configuration error: {0}")]
    Config(String),
}

