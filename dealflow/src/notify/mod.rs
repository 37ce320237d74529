//! Best-effort status notifications.
//!
//! [`Notifier::notify`] has no error channel: implementations log their own
//! delivery failures so a broken notifier can never mask the report it was
//! asked to deliver.

use async_trait::async_trait;
use std::fmt::Debug;
use tracing::{info, warn};

use crate::config::Credentials;

/// Delivers a human-readable status message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    /// Sends `text`. Never fails.
    async fn notify(&self, text: &str);
}

/// Telegram bot notifier.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    const API_BASE: &'static str = "https://api.telegram.org";

    /// Creates a notifier for `chat_id` using bot `token`.
    #[must_use]
    pub fn new(client: reqwest::Client, token: &str, chat_id: impl Into<String>) -> Self {
        Self::with_base_url(client, Self::API_BASE, token, chat_id)
    }

    /// Creates a notifier against a custom API base.
    #[must_use]
    pub fn with_base_url(
        client: reqwest::Client,
        base_url: &str,
        token: &str,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/bot{token}/sendMessage", base_url.trim_end_matches('/')),
            chat_id: chat_id.into(),
        }
    }

    async fn send(&self, text: &str) -> crate::errors::Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(crate::errors::DealflowError::api(
                "Telegram",
                format!("{status}: {body}"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) {
        match self.send(text).await {
            Ok(()) => info!(chat_id = %self.chat_id, "Notification sent"),
            Err(e) => warn!(error = %e, "Notification delivery failed"),
        }
    }
}

/// Notifier that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, text: &str) {
        info!(message = text, "Notification (no messenger configured)");
    }
}

/// Picks the Telegram notifier when both its credentials are present.
#[must_use]
pub fn notifier_from_credentials(
    client: reqwest::Client,
    credentials: &Credentials,
) -> Box<dyn Notifier> {
    match (
        credentials.telegram_bot_token.as_deref(),
        credentials.telegram_chat_id.as_deref(),
    ) {
        (Some(token), Some(chat_id)) => Box::new(TelegramNotifier::new(client, token, chat_id)),
        _ => {
            warn!("Telegram credentials missing, notifications go to the log only");
            Box::new(LogNotifier)
        }
    }
}
