//! Discord delivery channels.
//!
//! Webhooks for pre-shared channel URLs, the bot client for direct channel
//! and user delivery, and the lookup from auth users to Discord ids.

pub mod bot;
pub mod identity;
pub mod webhook;

pub use bot::{send_dm, BotCapability};
pub use identity::{ConfigIdentities, IdentityLookup};
pub use webhook::{send_notification, HttpWebhookClient, Notification, WebhookClient};
