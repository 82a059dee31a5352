//! Error types for the notification layer.
//!
//! Everything below the CLI reports failures through [`NotifyError`]. The
//! public senders convert these into a boolean plus a log line, so callers
//! on the notification path never see them unless they use the `try_`
//! variants.

use thiserror::Error;

/// Errors raised while building or delivering a Discord message.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Neither a webhook URL nor a channel id was configured.
    #[error("No notification destination configured")]
    NoDestination,

    /// The caller passed no balance records at all.
    #[error("No balance data provided")]
    NoData,

    /// A bot destination was requested but no bot client is available.
    #[error("Discord bot is not available")]
    BotUnavailable,

    /// The bot client accepted the request but failed to deliver it.
    #[error("Bot delivery failed: {0}")]
    Bot(String),

    /// The HTTP request could not be completed (connect, timeout, ...).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a status we don't treat as delivered.
    #[error("Unexpected HTTP status {status}")]
    UnexpectedStatus { status: u16 },

    /// A destination id could not be used (e.g. zero or malformed).
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    /// The payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for the notification layer.
pub type NotifyResult<T> = std::result::Result<T, NotifyError>;
