//! Bot-based delivery.
//!
//! The bot can post to any channel it can see and can DM users directly,
//! without a pre-shared webhook URL. It is optional: callers decide at
//! startup whether a bot is configured and pass a [`BotCapability`] around,
//! so senders never probe for it at call time.

use crate::error::{NotifyError, NotifyResult};
use crate::models::{Destination, Embed, COLOR_INFO};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default Discord REST API base.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const DM_FOOTER: &str = "MiningTaxes - Private Notification";

/// Something that can deliver a rich message to a channel or user.
#[async_trait]
pub trait BotClient: Send + Sync {
    async fn send_message(&self, destination: Destination, embed: &Embed) -> NotifyResult<()>;
}

/// Whether a bot client is available.
#[derive(Clone)]
pub enum BotCapability {
    Available(Arc<dyn BotClient>),
    Unavailable,
}

impl BotCapability {
    /// Build the capability from an optional bot token.
    ///
    /// No token (or an empty one) means the bot is unavailable.
    pub fn from_token(
        token: Option<&str>,
        api_base: &str,
        timeout_seconds: u64,
    ) -> NotifyResult<Self> {
        match token.filter(|t| !t.trim().is_empty()) {
            Some(token) => {
                let client = DiscordBotClient::new(token, api_base, timeout_seconds)?;
                Ok(BotCapability::Available(Arc::new(client)))
            }
            None => Ok(BotCapability::Unavailable),
        }
    }

    /// The client, if one is available.
    pub fn client(&self) -> Option<&dyn BotClient> {
        match self {
            BotCapability::Available(client) => Some(client.as_ref()),
            BotCapability::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, BotCapability::Available(_))
    }
}

impl std::fmt::Debug for BotCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotCapability::Available(_) => write!(f, "BotCapability::Available"),
            BotCapability::Unavailable => write!(f, "BotCapability::Unavailable"),
        }
    }
}

/// Message creation body for the Discord REST API.
#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
    embeds: [&'a Embed; 1],
}

/// DM channel creation body.
#[derive(Debug, Serialize)]
struct CreateDmChannel {
    recipient_id: String,
}

/// The subset of a channel object we need.
#[derive(Debug, Deserialize)]
struct ChannelResponse {
    id: String,
}

/// Bot client talking to the Discord REST API with a bot token.
pub struct DiscordBotClient {
    http_client: reqwest::Client,
    api_base: String,
    token: String,
}

impl DiscordBotClient {
    pub fn new(token: &str, api_base: &str, timeout_seconds: u64) -> NotifyResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self::with_client(http_client, token, api_base))
    }

    pub fn with_client(http_client: reqwest::Client, token: &str, api_base: &str) -> Self {
        Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Open (or reuse) the DM channel with a user and return its id.
    async fn open_dm_channel(&self, user_id: u64) -> NotifyResult<u64> {
        let url = format!("{}/users/@me/channels", self.api_base);

        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .json(&CreateDmChannel {
                recipient_id: user_id.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Bot(format!(
                "Failed to open DM channel with user {}: {} {}",
                user_id, status, body
            )));
        }

        let channel: ChannelResponse = response.json().await?;
        channel
            .id
            .parse::<u64>()
            .map_err(|_| NotifyError::InvalidDestination(format!("channel id '{}'", channel.id)))
    }

    async fn post_to_channel(&self, channel_id: u64, embed: &Embed) -> NotifyResult<()> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);

        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .json(&CreateMessage {
                content: "",
                embeds: [embed],
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Bot(format!(
                "Discord API error {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl BotClient for DiscordBotClient {
    async fn send_message(&self, destination: Destination, embed: &Embed) -> NotifyResult<()> {
        let channel_id = match destination {
            Destination::Channel(0) | Destination::User(0) => {
                return Err(NotifyError::InvalidDestination(destination.to_string()));
            }
            Destination::Channel(id) => id,
            Destination::User(id) => self.open_dm_channel(id).await?,
        };

        debug!("Posting message to {} via channel {}", destination, channel_id);
        self.post_to_channel(channel_id, embed).await
    }
}

/// Build the embed used for private notifications.
pub fn dm_embed(title: &str, message: &str, color: u32) -> Embed {
    Embed::new(title)
        .with_description(message)
        .with_color(color)
        .with_footer(DM_FOOTER)
}

/// Deliver a private message to a Discord user.
pub async fn try_send_dm(
    bot: &BotCapability,
    user_id: u64,
    title: &str,
    message: &str,
    color: u32,
) -> NotifyResult<()> {
    let client = bot.client().ok_or(NotifyError::BotUnavailable)?;
    client
        .send_message(Destination::User(user_id), &dm_embed(title, message, color))
        .await
}

/// Send a private message, logging instead of failing.
///
/// `color` defaults to blue when `None`. Returns `false` when the user has
/// no Discord id, the bot is not configured, or delivery fails.
pub async fn send_dm(
    bot: &BotCapability,
    user_id: Option<u64>,
    title: &str,
    message: &str,
    color: Option<u32>,
) -> bool {
    let user_id = match user_id.filter(|id| *id != 0) {
        Some(id) => id,
        None => return false,
    };

    match try_send_dm(bot, user_id, title, message, color.unwrap_or(COLOR_INFO)).await {
        Ok(()) => {
            debug!("Successfully sent DM to Discord user {}", user_id);
            true
        }
        Err(NotifyError::BotUnavailable) => {
            warn!("Discord bot not available. Set a bot token to enable Discord DMs.");
            false
        }
        Err(e) => {
            error!("Error sending Discord DM: {}", e);
            false
        }
    }
}
