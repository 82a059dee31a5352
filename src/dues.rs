//! Private "taxes due" reminders.
//!
//! DMs every user with an outstanding balance, one at a time. Users without
//! a linked Discord account are skipped.

use crate::discord::bot::try_send_dm;
use crate::discord::{BotCapability, IdentityLookup};
use crate::error::{NotifyError, NotifyResult};
use crate::models::{BalanceRecord, COLOR_WARNING};
use crate::report::{format_amount, outstanding_sorted};
use tracing::{info, warn};

const DUES_TITLE: &str = "Taxes Due!";

/// Counts from a reminder run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuesOutcome {
    pub sent: usize,
    /// No linked Discord account.
    pub skipped: usize,
    pub failed: usize,
}

impl DuesOutcome {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Reminder text for a single balance.
pub fn dues_message(balance: f64, currency: &str) -> String {
    format!(
        "Please pay {}M {} or you will be charged interest!",
        format_amount(balance),
        currency
    )
}

/// Send a reminder DM to every user who owes taxes.
///
/// Fails up front only when the bot is unavailable; per-user failures are
/// counted and logged.
pub async fn notify_dues(
    bot: &BotCapability,
    identities: &dyn IdentityLookup,
    balances: &[BalanceRecord],
    currency: &str,
) -> NotifyResult<DuesOutcome> {
    if !bot.is_available() {
        return Err(NotifyError::BotUnavailable);
    }

    let mut outcome = DuesOutcome::default();

    for record in outstanding_sorted(balances) {
        let username = record.display_username();

        let user_id = match record
            .username
            .as_deref()
            .and_then(|name| identities.discord_id(name))
        {
            Some(id) => id,
            None => {
                outcome.skipped += 1;
                continue;
            }
        };

        let message = dues_message(record.balance(), currency);
        match try_send_dm(bot, user_id, DUES_TITLE, &message, COLOR_WARNING).await {
            Ok(()) => outcome.sent += 1,
            Err(e) => {
                warn!("Failed to send taxes due DM to {}: {}", username, e);
                outcome.failed += 1;
            }
        }
    }

    info!(
        "Taxes due reminders: {} sent, {} skipped, {} failed",
        outcome.sent, outcome.skipped, outcome.failed
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::test_support::RecordingBot;
    use crate::discord::ConfigIdentities;
    use crate::models::Destination;
    use std::sync::Arc;

    fn identities() -> ConfigIdentities {
        ConfigIdentities::new(
            [("john_doe".to_string(), 111_u64), ("jane_smith".to_string(), 222_u64)]
                .into_iter()
                .collect(),
        )
    }

    #[test]
    fn test_dues_message() {
        assert_eq!(
            dues_message(1234.5, "ISK"),
            "Please pay 1,234.50M ISK or you will be charged interest!"
        );
    }

    #[tokio::test]
    async fn test_notify_dues() {
        let bot = Arc::new(RecordingBot::new());
        let capability = BotCapability::Available(bot.clone());

        let balances = vec![
            BalanceRecord::new("john_doe", "John Doe", 10.0),
            BalanceRecord::new("jane_smith", "Jane Smith", 0.0),
            BalanceRecord::new("unlinked", "Unlinked", 5.0),
            BalanceRecord {
                balance: Some(3.0),
                ..Default::default()
            },
        ];

        let outcome = notify_dues(&capability, &identities(), &balances, "ISK")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DuesOutcome {
                sent: 1,
                skipped: 2,
                failed: 0
            }
        );
        assert!(outcome.is_success());

        let calls = bot.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Destination::User(111));
        assert_eq!(calls[0].1.title, DUES_TITLE);
        assert_eq!(calls[0].1.color, COLOR_WARNING);
    }

    #[tokio::test]
    async fn test_notify_dues_counts_failures() {
        let capability = BotCapability::Available(Arc::new(RecordingBot::failing()));
        let balances = vec![
            BalanceRecord::new("john_doe", "John Doe", 10.0),
            BalanceRecord::new("jane_smith", "Jane Smith", 20.0),
        ];

        let outcome = notify_dues(&capability, &identities(), &balances, "ISK")
            .await
            .unwrap();

        assert_eq!(outcome.failed, 2);
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_notify_dues_requires_bot() {
        let result = notify_dues(&BotCapability::Unavailable, &identities(), &[], "ISK").await;
        assert!(matches!(result, Err(NotifyError::BotUnavailable)));
    }
}
