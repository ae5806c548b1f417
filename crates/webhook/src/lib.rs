//! Best-effort Discord webhook notifier.
//!
//! Notifications are advisory: nothing in the watcher's correctness depends
//! on one arriving, so [`Notifier::send`] logs failures and moves on instead
//! of propagating them. [`Notifier::try_send`] exposes the outcome for the
//! few callers that want to report delivery themselves.

use std::time::Duration;

/// Timeout for a single delivery attempt.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from a single webhook delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {0}")]
    Status(u16),
}

/// Posts plain-text messages to a Discord webhook URL.
pub struct Notifier {
    http: reqwest::Client,
    url: String,
}

impl Notifier {
    /// Creates a notifier for the given webhook URL.
    pub fn new(url: impl Into<String>) -> Result<Self, WebhookError> {
        let http = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// Attempts one delivery and reports the outcome.
    ///
    /// Discord answers a successful webhook post with 204 No Content; any
    /// non-2xx status is treated as a failed delivery.
    pub async fn try_send(&self, content: &str) -> Result<(), WebhookError> {
        let payload = serde_json::json!({ "content": content });
        let resp = self.http.post(&self.url).json(&payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(WebhookError::Status(status.as_u16()));
        }
        Ok(())
    }

    /// Fire-and-forget delivery: failures are logged, never propagated.
    pub async fn send(&self, content: &str) {
        match self.try_send(content).await {
            Ok(()) => tracing::debug!(content, "webhook delivered"),
            Err(e) => tracing::warn!(error = %e, "webhook delivery failed"),
        }
    }
}
