//! Update poll loop.
//!
//! Each cycle fetches the app's current change number, compares it against
//! the persisted baseline and, on drift, announces the update and invokes
//! the restart action exactly once before resuming. Fetch failures skip the
//! cycle without touching the baseline, so a flaky API can delay detection
//! but never fake or swallow an update.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use hugin_webhook::Notifier;
use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::state::UpdateState;

/// Future returned by the restart action.
pub type RestartFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Restart action invoked when an update is detected.
pub type RestartFn = Box<dyn Fn() -> RestartFuture + Send + Sync + 'static>;

/// Default pause between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// Announcement posted when a change-number drift is detected.
const UPDATE_MESSAGE: &str = "SYSTEM is updating & restarting, kindly update your clients";

/// Watches one app's change number and reacts to drift.
pub struct UpdatePoller {
    client: Client,
    app_id: String,
    state_path: PathBuf,
    state: UpdateState,
    notifier: Arc<Notifier>,
    restart: RestartFn,
    interval: Duration,
}

impl UpdatePoller {
    /// Creates a poller, loading the persisted baseline from `state_path`.
    pub fn new(
        client: Client,
        app_id: impl Into<String>,
        state_path: PathBuf,
        notifier: Arc<Notifier>,
        restart: RestartFn,
    ) -> Self {
        let state = UpdateState::load(&state_path);
        Self {
            client,
            app_id: app_id.into(),
            state_path,
            state,
            notifier,
            restart,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the pause between poll cycles.
    ///
    /// Minimum is one second; zero falls back to the default.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = if interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            interval.max(Duration::from_secs(1))
        };
        self
    }

    /// Runs poll cycles until cancelled. The first cycle runs immediately.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            app_id = %self.app_id,
            baseline = ?self.state.change_number,
            interval_secs = self.interval.as_secs(),
            "update poller started"
        );

        loop {
            self.cycle().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(app_id = %self.app_id, "update poller stopped");
    }

    /// One poll cycle: fetch, compare, react, persist.
    async fn cycle(&mut self) {
        let observed = match self.client.change_number(&self.app_id).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(app_id = %self.app_id, error = %e, "update check failed, skipping cycle");
                return;
            }
        };

        match self.state.change_number {
            Some(last) if last != observed => {
                tracing::info!(app_id = %self.app_id, last, observed, "update detected");
                self.notifier.send(UPDATE_MESSAGE).await;
                (self.restart)().await;
            }
            Some(_) => {
                tracing::debug!(app_id = %self.app_id, observed, "change number unchanged");
            }
            None => {
                tracing::info!(app_id = %self.app_id, observed, "first observation, storing baseline");
            }
        }

        self.state.change_number = Some(observed);
        if let Err(e) = self.state.store(&self.state_path) {
            tracing::warn!(path = %self.state_path.display(), error = %e, "failed to persist update state");
        }
    }
}
