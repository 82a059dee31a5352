//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// corptax - Discord notifications for outstanding mining taxes
///
/// Post corp-wide tax summaries, one-off channel notifications and
/// private reminders to Discord via webhooks or a bot.
///
/// Examples:
///   corptax summary --input balances.json --webhook-url https://discord.com/api/webhooks/...
///   corptax summary --input balances.json --channel-id 1234567890
///   corptax notify --title "Taxes Due" --message "Pay by Friday" --color 0xf39c12
///   corptax dm --user john_doe --title "Taxes Due!" --message "Please pay"
///   corptax notify-dues --input balances.json
///   corptax init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .corptax.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Discord bot token (enables channel posts and DMs)
    #[arg(
        long,
        value_name = "TOKEN",
        env = "MININGTAXES_DISCORD_BOT_TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub bot_token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Post the outstanding-balance summary to the corp channel
    Summary(SummaryArgs),

    /// Send a single notification to a webhook
    Notify(NotifyArgs),

    /// Send a private message to one user via the bot
    Dm(DmArgs),

    /// DM every user with an outstanding balance
    NotifyDues(DuesArgs),

    /// Generate a default .corptax.toml configuration file
    InitConfig,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SummaryArgs {
    /// JSON file with balance records ("-" for stdin)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Corp webhook URL (used when no channel is given, or as bot fallback)
    #[arg(long, value_name = "URL", env = "MININGTAXES_DISCORD_CORP_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Corp channel id to post to via the bot
    #[arg(long, value_name = "ID", env = "MININGTAXES_DISCORD_CORP_CHANNEL_ID")]
    pub channel_id: Option<u64>,

    /// Currency label shown in the summary
    #[arg(long, value_name = "LABEL")]
    pub currency: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct NotifyArgs {
    /// Notification title
    #[arg(short, long)]
    pub title: String,

    /// Notification body
    #[arg(short, long)]
    pub message: String,

    /// Embed color, e.g. 0xf39c12 or #f39c12
    #[arg(long, value_name = "HEX", value_parser = parse_color)]
    pub color: Option<u32>,

    /// Name the webhook posts as
    #[arg(long, value_name = "NAME")]
    pub username: Option<String>,

    /// Webhook URL
    #[arg(long, value_name = "URL", env = "MININGTAXES_DISCORD_WEBHOOK_URL")]
    pub webhook_url: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DmArgs {
    /// Auth username, resolved through the [identities] config table
    #[arg(long, value_name = "USERNAME", required_unless_present = "discord_id")]
    pub user: Option<String>,

    /// Discord user id to message directly
    #[arg(long, value_name = "ID", conflicts_with = "user")]
    pub discord_id: Option<u64>,

    /// Message title
    #[arg(short, long)]
    pub title: String,

    /// Message body
    #[arg(short, long)]
    pub message: String,

    /// Embed color, e.g. 0xf39c12 or #f39c12
    #[arg(long, value_name = "HEX", value_parser = parse_color)]
    pub color: Option<u32>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DuesArgs {
    /// JSON file with balance records ("-" for stdin)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Currency label shown in the reminders
    #[arg(long, value_name = "LABEL")]
    pub currency: Option<String>,
}

/// Parse an embed color given as hex (`0x`, `#` or bare).
pub fn parse_color(s: &str) -> Result<u32, String> {
    let hex = s
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .trim_start_matches('#');

    let color =
        u32::from_str_radix(hex, 16).map_err(|_| format!("Invalid color '{}': expected hex", s))?;

    if color > 0xFF_FF_FF {
        return Err(format!("Invalid color '{}': must be at most 0xFFFFFF", s));
    }

    Ok(color)
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        match &self.command {
            Command::Summary(summary) => {
                validate_webhook_url(summary.webhook_url.as_deref())?;
                validate_input(&summary.input)?;
            }
            Command::Notify(notify) => {
                validate_webhook_url(notify.webhook_url.as_deref())?;
            }
            Command::NotifyDues(dues) => {
                validate_input(&dues.input)?;
            }
            Command::Dm(_) | Command::InitConfig => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn validate_webhook_url(url: Option<&str>) -> Result<(), String> {
    match url {
        Some(url) if !url.is_empty() => {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err("Webhook URL must start with 'https://' or 'http://'".to_string());
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn validate_input(path: &std::path::Path) -> Result<(), String> {
    if path.as_os_str() == "-" {
        return Ok(());
    }
    if !path.is_file() {
        return Err(format!("Input file does not exist: {}", path.display()));
    }
    Ok(())
}
