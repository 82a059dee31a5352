//! Corp tax summary dispatch.
//!
//! Renders the outstanding-balance report and delivers it through the bot
//! (when a channel is given) or a webhook. Delivery order:
//!
//! 1. `channel_id` set and bot available: post via the bot, never the webhook.
//! 2. `channel_id` set, bot unavailable: fall back to the webhook if one is set.
//! 3. Otherwise: POST to the webhook.
//!
//! A bot that is available but fails does not fall back.

use crate::discord::webhook::deliver;
use crate::discord::{BotCapability, WebhookClient};
use crate::error::{NotifyError, NotifyResult};
use crate::models::{BalanceRecord, Destination, WebhookPayload};
use crate::report::{format_amount, render_summary, SUMMARY_WEBHOOK_USERNAME};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument, Span};

/// How a summary call ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    /// Nobody owes anything; nothing was sent.
    NothingToReport,
    /// Delivered through the bot to a channel.
    SentViaBot { users: usize, total: f64 },
    /// Delivered through the webhook.
    SentViaWebhook { users: usize, total: f64 },
}

/// Renders and delivers the corp tax summary.
pub struct TaxSummaryReporter {
    webhook: Arc<dyn WebhookClient>,
    bot: BotCapability,
    currency: String,
    span: Span,
}

impl TaxSummaryReporter {
    pub fn new(webhook: Arc<dyn WebhookClient>, bot: BotCapability) -> Self {
        Self {
            webhook,
            bot,
            currency: "ISK".to_string(),
            span: tracing::info_span!("discord", tag = "MiningTaxes-Discord"),
        }
    }

    /// Currency label used in the summary fields.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Span all log lines from this reporter are recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Send the summary, returning whether it succeeded.
    ///
    /// `true` covers both "delivered" and "nothing to report". Every
    /// failure is logged here and reported as `false`.
    pub async fn report(
        &self,
        balances: &[BalanceRecord],
        webhook_url: Option<&str>,
        channel_id: Option<u64>,
    ) -> bool {
        let span = self.span.clone();

        async {
            match self.try_report(balances, webhook_url, channel_id).await {
                Ok(SummaryOutcome::NothingToReport) => {
                    debug!("No outstanding balances, skipping corp tax summary");
                    true
                }
                Ok(SummaryOutcome::SentViaBot { users, total }) => {
                    info!(
                        "Successfully queued corp tax summary via bot: {} users, {}M {}",
                        users,
                        format_amount(total),
                        self.currency
                    );
                    true
                }
                Ok(SummaryOutcome::SentViaWebhook { users, total }) => {
                    info!(
                        "Successfully sent corp tax summary: {} users, {}M {}",
                        users,
                        format_amount(total),
                        self.currency
                    );
                    true
                }
                Err(NotifyError::NoDestination) => {
                    error!("No webhook URL or channel id configured for corp tax summary");
                    false
                }
                Err(NotifyError::NoData) => {
                    warn!("No balance data provided for corp tax summary");
                    false
                }
                Err(NotifyError::BotUnavailable) => {
                    error!("Discord bot not available and no webhook URL provided for fallback");
                    false
                }
                Err(NotifyError::UnexpectedStatus { status }) => {
                    warn!("Failed to send corp tax summary. Status: {}", status);
                    false
                }
                Err(e) => {
                    error!("Error sending corp tax summary: {}", e);
                    false
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Send the summary, returning the outcome or the reason it failed.
    pub async fn try_report(
        &self,
        balances: &[BalanceRecord],
        webhook_url: Option<&str>,
        channel_id: Option<u64>,
    ) -> NotifyResult<SummaryOutcome> {
        let webhook_url = webhook_url.filter(|u| !u.is_empty());
        let channel_id = channel_id.filter(|id| *id != 0);

        if webhook_url.is_none() && channel_id.is_none() {
            return Err(NotifyError::NoDestination);
        }
        // An empty list is a caller mistake, unlike a list where nobody owes.
        if balances.is_empty() {
            return Err(NotifyError::NoData);
        }

        let rendered = match render_summary(balances, &self.currency) {
            Some(rendered) => rendered,
            None => return Ok(SummaryOutcome::NothingToReport),
        };

        let embed = rendered.to_embed(Utc::now());
        let users = rendered.total_users;
        let total = rendered.total_outstanding;

        if let Some(channel_id) = channel_id {
            match self.bot.client() {
                Some(bot) => {
                    bot.send_message(Destination::Channel(channel_id), &embed)
                        .await?;
                    return Ok(SummaryOutcome::SentViaBot { users, total });
                }
                None if webhook_url.is_some() => {
                    debug!("Discord bot not available, falling back to webhook");
                }
                None => return Err(NotifyError::BotUnavailable),
            }
        }

        let url = webhook_url.ok_or(NotifyError::NoDestination)?;
        let payload = WebhookPayload::single(SUMMARY_WEBHOOK_USERNAME, embed);
        deliver(self.webhook.as_ref(), url, &payload).await?;

        Ok(SummaryOutcome::SentViaWebhook { users, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::test_support::{RecordingBot, RecordingWebhook};
    use crate::discord::HttpWebhookClient;
    use crate::models::COLOR_ALERT;
    use crate::report::SUMMARY_TITLE;
    use std::time::Duration;
    use tokio::net::TcpListener;

    const URL: &str = "https://discord.test/api/webhooks/1/abc";

    fn example_balances() -> Vec<BalanceRecord> {
        vec![
            BalanceRecord::new("john_doe", "John Doe", 125.5),
            BalanceRecord::new("jane_smith", "Jane Smith", 89.23),
        ]
    }

    fn reporter(
        webhook: &Arc<RecordingWebhook>,
        bot: Option<&Arc<RecordingBot>>,
    ) -> TaxSummaryReporter {
        let capability = match bot {
            Some(bot) => BotCapability::Available(bot.clone()),
            None => BotCapability::Unavailable,
        };
        TaxSummaryReporter::new(webhook.clone(), capability)
    }

    fn http_reporter(timeout: Duration) -> TaxSummaryReporter {
        let http_client = reqwest::Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .unwrap();
        TaxSummaryReporter::new(
            Arc::new(HttpWebhookClient::with_client(http_client)),
            BotCapability::Unavailable,
        )
    }

    #[tokio::test]
    async fn test_example_via_webhook() {
        let webhook = Arc::new(RecordingWebhook::with_status(204));
        let reporter = reporter(&webhook, None);

        assert!(reporter.report(&example_balances(), Some(URL), None).await);

        let calls = webhook.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, URL);

        let payload = &calls[0].1;
        assert_eq!(payload.username, SUMMARY_WEBHOOK_USERNAME);

        let embed = &payload.embeds[0];
        assert_eq!(embed.title, SUMMARY_TITLE);
        assert_eq!(embed.color, COLOR_ALERT);
        assert!(embed.description.as_deref().unwrap().contains("214.73M"));
        assert_eq!(embed.fields.len(), 1);
        assert_eq!(
            embed.fields[0].value,
            "**2** users owe taxes\n**214.73 M ISK** total outstanding"
        );
        assert!(embed.timestamp.is_some());
    }

    #[tokio::test]
    async fn test_webhook_status_handling() {
        for (status, expected) in [(200, true), (204, true), (201, false), (500, false)] {
            let webhook = Arc::new(RecordingWebhook::with_status(status));
            let reporter = reporter(&webhook, None);

            assert_eq!(
                reporter.report(&example_balances(), Some(URL), None).await,
                expected,
                "status {}",
                status
            );
        }
    }

    #[tokio::test]
    async fn test_webhook_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        drop(listener);

        let reporter = http_reporter(Duration::from_secs(5));

        let result = reporter.try_report(&example_balances(), Some(&url), None).await;
        assert!(matches!(result, Err(NotifyError::Transport(_))));
        assert!(!reporter.report(&example_balances(), Some(&url), None).await);
    }

    #[tokio::test]
    async fn test_webhook_timeout() {
        // Accept connections and never answer.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let stalled = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let reporter = http_reporter(Duration::from_secs(1));

        let result = reporter.try_report(&example_balances(), Some(&url), None).await;
        assert!(matches!(result, Err(NotifyError::Transport(ref e)) if e.is_timeout()));
        assert!(!reporter.report(&example_balances(), Some(&url), None).await);

        stalled.abort();
    }

    #[tokio::test]
    async fn test_no_destination() {
        let webhook = Arc::new(RecordingWebhook::with_status(204));
        let bot = Arc::new(RecordingBot::new());
        let reporter = reporter(&webhook, Some(&bot));

        assert!(!reporter.report(&example_balances(), None, None).await);
        assert!(!reporter.report(&example_balances(), Some(""), Some(0)).await);

        // Even when nobody owes anything.
        let paid = vec![BalanceRecord::new("paid", "Paid", 0.0)];
        assert!(!reporter.report(&paid, None, None).await);

        assert_eq!(webhook.call_count(), 0);
        assert_eq!(bot.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_balances() {
        let webhook = Arc::new(RecordingWebhook::with_status(204));
        let reporter = reporter(&webhook, None);

        assert!(matches!(
            reporter.try_report(&[], Some(URL), None).await,
            Err(NotifyError::NoData)
        ));
        assert!(!reporter.report(&[], Some(URL), None).await);
        assert_eq!(webhook.call_count(), 0);
    }

    #[tokio::test]
    async fn test_nothing_to_report() {
        let webhook = Arc::new(RecordingWebhook::with_status(204));
        let bot = Arc::new(RecordingBot::new());
        let reporter = reporter(&webhook, Some(&bot));

        let balances = vec![
            BalanceRecord::new("paid", "Paid", 0.0),
            BalanceRecord::new("credit", "Credit", -10.0),
            BalanceRecord::default(),
        ];

        assert_eq!(
            reporter.try_report(&balances, Some(URL), Some(99)).await.unwrap(),
            SummaryOutcome::NothingToReport
        );
        assert!(reporter.report(&balances, Some(URL), Some(99)).await);
        assert_eq!(webhook.call_count(), 0);
        assert_eq!(bot.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bot_preferred_over_webhook() {
        let webhook = Arc::new(RecordingWebhook::with_status(204));
        let bot = Arc::new(RecordingBot::new());
        let reporter = reporter(&webhook, Some(&bot));

        let outcome = reporter
            .try_report(&example_balances(), Some(URL), Some(1234567890))
            .await
            .unwrap();

        assert!(matches!(outcome, SummaryOutcome::SentViaBot { users: 2, .. }));
        assert_eq!(webhook.call_count(), 0);

        let calls = bot.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Destination::Channel(1234567890));

        let embed = &calls[0].1;
        assert_eq!(embed.title, SUMMARY_TITLE);
        assert_eq!(embed.color, COLOR_ALERT);

        let table = embed.description.as_deref().unwrap();
        assert!(table.starts_with("```\n"));
        assert!(table.contains("john_doe"));
        assert!(table.contains("214.73M"));

        assert_eq!(embed.fields.len(), 1);
        assert_eq!(embed.fields[0].name, "📊 Summary");
        assert_eq!(
            embed.fields[0].value,
            "**2** users owe taxes\n**214.73 M ISK** total outstanding"
        );
        assert_eq!(
            embed.footer.as_ref().map(|f| f.text.as_str()),
            Some("MiningTaxes Corp Summary • 2 users with outstanding taxes")
        );
        assert!(embed.timestamp.is_some());
    }

    #[tokio::test]
    async fn test_bot_unavailable_falls_back_to_webhook() {
        let webhook = Arc::new(RecordingWebhook::with_status(204));
        let reporter = reporter(&webhook, None);

        let outcome = reporter
            .try_report(&example_balances(), Some(URL), Some(1234567890))
            .await
            .unwrap();

        assert!(matches!(outcome, SummaryOutcome::SentViaWebhook { users: 2, .. }));
        assert_eq!(webhook.call_count(), 1);
    }

    #[tokio::test]
    async fn test_bot_unavailable_without_fallback() {
        let webhook = Arc::new(RecordingWebhook::with_status(204));
        let reporter = reporter(&webhook, None);

        let result = reporter
            .try_report(&example_balances(), None, Some(1234567890))
            .await;
        assert!(matches!(result, Err(NotifyError::BotUnavailable)));
        assert!(!reporter.report(&example_balances(), None, Some(1234567890)).await);
        assert_eq!(webhook.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bot_failure_does_not_fall_back() {
        let webhook = Arc::new(RecordingWebhook::with_status(204));
        let bot = Arc::new(RecordingBot::failing());
        let reporter = reporter(&webhook, Some(&bot));

        assert!(!reporter.report(&example_balances(), Some(URL), Some(1)).await);
        assert_eq!(bot.call_count(), 1);
        assert_eq!(webhook.call_count(), 0);
    }

    #[tokio::test]
    async fn test_top_debtors_and_currency_in_dispatch() {
        let webhook = Arc::new(RecordingWebhook::with_status(200));
        let reporter = reporter(&webhook, None).with_currency("credits");

        let mut balances = example_balances();
        balances.push(BalanceRecord::new("big_spender", "Big Spender", 1500.0));

        assert!(reporter.report(&balances, Some(URL), None).await);

        let embed = &webhook.calls()[0].1.embeds[0];
        assert_eq!(embed.fields.len(), 2);
        assert!(embed.fields[0].value.contains("M credits"));
        assert!(embed.fields[1]
            .value
            .starts_with("1. **big_spender** - 1,500.00M credits"));
    }

    #[test]
    fn test_report_blocking() {
        let webhook = Arc::new(RecordingWebhook::with_status(204));
        let reporter = reporter(&webhook, None).with_span(tracing::info_span!("test"));

        assert!(tokio_test::block_on(reporter.report(
            &example_balances(),
            Some(URL),
            None
        )));
    }
}
