//! Data models for the tax notifier.
//!
//! This module contains the balance records fed into the reporter and the
//! Discord rich-message structures sent to webhooks and the bot API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default embed color for plain notifications (blue).
pub const COLOR_INFO: u32 = 0x3498db;

/// Embed color for the corp summary (red).
pub const COLOR_ALERT: u32 = 0xe74c3c;

/// Embed color for "taxes due" reminders (orange).
pub const COLOR_WARNING: u32 = 0xf39c12;

/// Outstanding tax balance for a single user.
///
/// Every field is optional on input; missing values are rendered with
/// placeholders rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// Auth username.
    #[serde(default)]
    pub username: Option<String>,
    /// Main character display name.
    #[serde(default)]
    pub main_character: Option<String>,
    /// Outstanding balance in millions.
    #[serde(default)]
    pub balance: Option<f64>,
    /// Character names belonging to the user. Not rendered yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters: Option<Vec<String>>,
}

impl BalanceRecord {
    /// Create a record with all display fields set.
    #[allow(dead_code)] // Convenience constructor for records built in code
    pub fn new(username: &str, main_character: &str, balance: f64) -> Self {
        Self {
            username: Some(username.to_string()),
            main_character: Some(main_character.to_string()),
            balance: Some(balance),
            characters: None,
        }
    }

    /// Username, or `"Unknown"` when absent.
    pub fn display_username(&self) -> &str {
        self.username.as_deref().unwrap_or("Unknown")
    }

    /// Main character, or `"N/A"` when absent.
    pub fn display_main_character(&self) -> &str {
        self.main_character.as_deref().unwrap_or("N/A")
    }

    /// Balance in millions; absent counts as zero.
    pub fn balance(&self) -> f64 {
        self.balance.unwrap_or(0.0)
    }

    /// Whether this user owes anything.
    pub fn is_outstanding(&self) -> bool {
        self.balance() > 0.0
    }
}

/// A field inside a rich message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Footer line of a rich message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Discord rich message ("embed").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Embed {
    /// Start an embed with a title and the default color.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            color: COLOR_INFO,
            fields: Vec::new(),
            footer: None,
            timestamp: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn with_field(mut self, field: EmbedField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Body of a webhook execution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Display name the webhook posts as.
    pub username: String,
    pub embeds: Vec<Embed>,
}

impl WebhookPayload {
    /// Wrap a single embed.
    pub fn single(username: impl Into<String>, embed: Embed) -> Self {
        Self {
            username: username.into(),
            embeds: vec![embed],
        }
    }
}

/// Where the bot should deliver a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// A guild text channel.
    Channel(u64),
    /// A direct message to a user.
    User(u64),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Channel(id) => write!(f, "channel {}", id),
            Destination::User(id) => write!(f, "user {}", id),
        }
    }
}
