//! corptax - Discord notifications for outstanding mining taxes
//!
//! A CLI that posts corp tax summaries, one-off notifications and private
//! reminders to Discord via webhooks or a bot.
//!
//! Exit codes:
//!   0 - Success (delivered, or nothing to report)
//!   1 - Runtime error (config, input file, client setup, etc.)
//!   2 - Delivery failed

mod cli;
mod config;
mod discord;
mod dues;
mod error;
mod models;
mod report;
mod summary;

use anyhow::{Context, Result};
use cli::{Args, Command, DmArgs, DuesArgs, NotifyArgs, SummaryArgs};
use config::{Config, CONFIG_FILE_NAME};
use discord::{BotCapability, ConfigIdentities, HttpWebhookClient, IdentityLookup, Notification};
use indicatif::{ProgressBar, ProgressStyle};
use models::BalanceRecord;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use summary::TaxSummaryReporter;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const EXIT_DELIVERY_FAILED: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    info!("corptax v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args.command);

    match run(&args, &config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .corptax.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Add your webhook URLs, channel id and bot token to enable delivery.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let filter = EnvFilter::try_from_env("CORPTAX_LOG")
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}", CONFIG_FILE_NAME, e);
            Ok(Config::default())
        }
    }
}

/// Dispatch the selected subcommand. Returns the process exit code.
async fn run(args: &Args, config: &Config) -> Result<i32> {
    match &args.command {
        Command::Summary(summary) => run_summary(args, config, summary).await,
        Command::Notify(notify) => run_notify(args, config, notify).await,
        Command::Dm(dm) => run_dm(args, config, dm).await,
        Command::NotifyDues(dues) => run_notify_dues(args, config, dues).await,
        Command::InitConfig => Ok(0),
    }
}

async fn run_summary(args: &Args, config: &Config, summary: &SummaryArgs) -> Result<i32> {
    let balances = load_balances(&summary.input)?;
    info!("Loaded {} balance records", balances.len());

    let webhook = HttpWebhookClient::new(config.http.timeout_seconds)
        .context("Failed to create HTTP client")?;
    let bot = bot_capability(config)?;

    let reporter = TaxSummaryReporter::new(Arc::new(webhook), bot)
        .with_currency(config.general.currency.clone())
        .with_span(tracing::info_span!(
            "corp_summary",
            tag = "MiningTaxes-Discord",
            input = %summary.input.display()
        ));

    let spinner = spinner(args.quiet, "Sending corp tax summary...");
    let sent = reporter
        .report(
            &balances,
            config.discord.corp_webhook_url.as_deref(),
            config.discord.corp_channel_id,
        )
        .await;
    finish_spinner(spinner);

    Ok(outcome_exit_code(sent, "Corp tax summary"))
}

async fn run_notify(args: &Args, config: &Config, notify: &NotifyArgs) -> Result<i32> {
    if config.discord.webhook_url.is_none() {
        warn!("No webhook URL configured for notifications");
    }

    let webhook = HttpWebhookClient::new(config.http.timeout_seconds)
        .context("Failed to create HTTP client")?;

    let mut notification = Notification::new(notify.title.clone(), notify.message.clone())
        .with_username(config.discord.notification_username.clone());
    if let Some(color) = notify.color {
        notification = notification.with_color(color);
    }

    let spinner = spinner(args.quiet, "Sending notification...");
    let sent = discord::send_notification(
        &webhook,
        config.discord.webhook_url.as_deref(),
        &notification,
    )
    .await;
    finish_spinner(spinner);

    Ok(outcome_exit_code(sent, "Notification"))
}

async fn run_dm(args: &Args, config: &Config, dm: &DmArgs) -> Result<i32> {
    let user_id = match (&dm.user, dm.discord_id) {
        (_, Some(id)) => Some(id),
        (Some(username), None) => {
            ConfigIdentities::new(config.identities.clone()).discord_id(username)
        }
        (None, None) => None,
    };

    if user_id.is_none() {
        warn!("No Discord account linked for this recipient");
    }

    let bot = bot_capability(config)?;

    let spinner = spinner(args.quiet, "Sending direct message...");
    let sent = discord::send_dm(&bot, user_id, &dm.title, &dm.message, dm.color).await;
    finish_spinner(spinner);

    Ok(outcome_exit_code(sent, "Direct message"))
}

async fn run_notify_dues(args: &Args, config: &Config, dues: &DuesArgs) -> Result<i32> {
    let balances = load_balances(&dues.input)?;
    let identities = ConfigIdentities::new(config.identities.clone());
    let bot = bot_capability(config)?;

    if identities.is_empty() {
        warn!("No [identities] configured; every user will be skipped");
    }

    let spinner = spinner(args.quiet, "Sending taxes due reminders...");
    let result = dues::notify_dues(&bot, &identities, &balances, &config.general.currency).await;
    finish_spinner(spinner);

    match result {
        Ok(outcome) => {
            println!("\n📊 Reminder Summary:");
            println!("   Sent: {}", outcome.sent);
            println!("   Skipped (no linked Discord account): {}", outcome.skipped);
            println!("   Failed: {}", outcome.failed);

            Ok(outcome_exit_code(outcome.is_success(), "Taxes due reminders"))
        }
        Err(e) => {
            error!("Cannot send taxes due reminders: {}", e);
            Ok(EXIT_DELIVERY_FAILED)
        }
    }
}

/// Build the bot capability from config.
fn bot_capability(config: &Config) -> Result<BotCapability> {
    let bot = BotCapability::from_token(
        config.discord.bot_token.as_deref(),
        &config.discord.api_base,
        config.http.timeout_seconds,
    )
    .context("Failed to create Discord bot client")?;

    debug!("Bot capability: {:?}", bot);
    Ok(bot)
}

/// Read balance records from a JSON file, or stdin for "-".
fn load_balances(path: &Path) -> Result<Vec<BalanceRecord>> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read balances from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read balances file: {}", path.display()))?
    };

    parse_balances(&content)
        .with_context(|| format!("Failed to parse balances from {}", path.display()))
}

fn parse_balances(content: &str) -> Result<Vec<BalanceRecord>> {
    Ok(serde_json::from_str(content)?)
}

fn outcome_exit_code(success: bool, what: &str) -> i32 {
    if success {
        println!("✅ {} done.", what);
        0
    } else {
        eprintln!("⛔ {} was not delivered. See the log for details.", what);
        EXIT_DELIVERY_FAILED
    }
}

fn spinner(quiet: bool, message: &str) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn finish_spinner(spinner: Option<ProgressBar>) {
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_balances() {
        let balances = parse_balances(
            r#"[
                {"username": "john_doe", "main_character": "John Doe", "balance": 125.5},
                {"username": "jane_smith", "main_character": "Jane Smith", "balance": 89.23}
            ]"#,
        )
        .unwrap();

        assert_eq!(balances.len(), 2);
        assert_eq!(balances[1].display_username(), "jane_smith");
    }

    #[test]
    fn test_parse_balances_rejects_garbage() {
        assert!(parse_balances("{not json").is_err());
        assert!(parse_balances(r#"{"username": "not a list"}"#).is_err());
    }

    #[test]
    fn test_load_balances_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balances.json");
        std::fs::write(&path, r#"[{"username": "a", "balance": 1}]"#).unwrap();

        let balances = load_balances(&path).unwrap();
        assert_eq!(balances.len(), 1);
        assert!(balances[0].is_outstanding());

        assert!(load_balances(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_outcome_exit_code() {
        assert_eq!(outcome_exit_code(true, "Test"), 0);
        assert_eq!(outcome_exit_code(false, "Test"), EXIT_DELIVERY_FAILED);
    }

    #[test]
    fn test_bot_capability_from_config() {
        let mut config = Config::default();
        assert!(!bot_capability(&config).unwrap().is_available());

        config.discord.bot_token = Some("token".to_string());
        assert!(bot_capability(&config).unwrap().is_available());
    }
}
