//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.corptax.toml` files.

use crate::cli::{Args, Command};
use crate::discord::bot::DEFAULT_API_BASE;
use crate::discord::webhook::{DEFAULT_TIMEOUT_SECONDS, DEFAULT_USERNAME};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".corptax.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Discord destinations and credentials.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Auth username to Discord user id.
    #[serde(default)]
    pub identities: HashMap<String, u64>,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Currency label used in summaries and reminders.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            verbose: false,
        }
    }
}

fn default_currency() -> String {
    "ISK".to_string()
}

/// Discord settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Webhook for single notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Webhook for the corp summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corp_webhook_url: Option<String>,

    /// Channel the bot posts the corp summary to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corp_channel_id: Option<u64>,

    /// Bot token. Without it, channel posts fall back to the webhook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Discord REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Name single notifications post as.
    #[serde(default = "default_notification_username")]
    pub notification_username: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            corp_webhook_url: None,
            corp_channel_id: None,
            bot_token: None,
            api_base: default_api_base(),
            notification_username: default_notification_username(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_notification_username() -> String {
    DEFAULT_USERNAME.to_string()
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.corptax.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment variables) take precedence over
    /// config file settings, but only when they were actually provided.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref token) = args.bot_token {
            self.discord.bot_token = Some(token.clone());
        }

        if let Some(timeout) = args.timeout {
            self.http.timeout_seconds = timeout;
        }

        if args.verbose {
            self.general.verbose = true;
        }

        match &args.command {
            Command::Summary(summary) => {
                if let Some(ref url) = summary.webhook_url {
                    self.discord.corp_webhook_url = Some(url.clone());
                }
                if let Some(channel_id) = summary.channel_id {
                    self.discord.corp_channel_id = Some(channel_id);
                }
                if let Some(ref currency) = summary.currency {
                    self.general.currency = currency.clone();
                }
            }
            Command::Notify(notify) => {
                if let Some(ref url) = notify.webhook_url {
                    self.discord.webhook_url = Some(url.clone());
                }
                if let Some(ref username) = notify.username {
                    self.discord.notification_username = username.clone();
                }
            }
            Command::NotifyDues(dues) => {
                if let Some(ref currency) = dues.currency {
                    self.general.currency = currency.clone();
                }
            }
            Command::Dm(_) | Command::InitConfig => {}
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        let body = toml::to_string_pretty(&config).unwrap_or_else(|_| String::new());

        format!(
            "# corptax configuration\n\
             #\n\
             # Optional [discord] keys:\n\
             #   webhook_url      = \"https://discord.com/api/webhooks/...\"\n\
             #   corp_webhook_url = \"https://discord.com/api/webhooks/...\"\n\
             #   corp_channel_id  = 1234567890\n\
             #   bot_token        = \"...\"\n\
             #\n\
             # Link auth users to Discord accounts under [identities]:\n\
             #   john_doe = 123456789012345678\n\n{}",
            body
        )
    }
}
