//! Daemon orchestration: wires the chosen tailer, the notifier and the
//! optional update poller together, then runs until shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use hugin_appwatch::{Client as AppInfoClient, UpdatePoller};
use hugin_pattern::{LinePattern, MatchEvent, MatchKind};
use hugin_tail::{FileTailer, OnMatchFn, ProcessTailer, TailError};
use hugin_webhook::Notifier;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::restart;

/// Renders the webhook text for one match event.
fn announce(event: &MatchEvent) -> String {
    match event.kind {
        MatchKind::Login => format!("Player {} is online!", event.subject),
        MatchKind::Logout => format!("Player {} logged off!", event.subject),
    }
}

/// Runs the watcher until a shutdown signal arrives or the tailed source
/// goes away.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let webhook_url = config.webhook_url().context("webhook URL missing")?;
    let notifier = Arc::new(Notifier::new(webhook_url)?);
    let login = LinePattern::new(&config.pattern)?;

    // -- Announcements --
    // Match events funnel through one channel so messages go out in the
    // order the lines arrived, however bursty the log gets.
    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel::<MatchEvent>();
    let notify_task: JoinHandle<()> = {
        let notifier = Arc::clone(&notifier);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events_rx.recv() => match event {
                        Some(event) => notifier.send(&announce(&event)).await,
                        None => break,
                    }
                }
            }
        })
    };
    let on_match: OnMatchFn = Box::new(move |event| {
        let _ = events_tx.send(event);
    });

    // -- Tailing strategy --
    let mut tail_task: JoinHandle<Result<(), TailError>> =
        match (&config.log_file, &config.journalctl) {
            (Some(path), None) => {
                tracing::info!(path = %path.display(), "tailing log file");
                let tailer = FileTailer::new(path.clone(), login, on_match)?;
                tokio::spawn(tailer.run(cancel.clone()))
            }
            (None, Some(service)) => {
                tracing::info!(service = %service, "tailing service journal");
                let logout = config
                    .logout_pattern
                    .as_deref()
                    .map(LinePattern::new)
                    .transpose()?;
                let tailer = ProcessTailer::journalctl(service, login, logout, on_match);
                tokio::spawn(tailer.run(cancel.clone()))
            }
            _ => anyhow::bail!("exactly one of log_file or journalctl must be configured"),
        };

    // -- Update poller --
    let poll_task = match (&config.app_id, &config.appinfo_file_new) {
        (Some(app_id), Some(state_path)) => {
            let unit = config
                .restart_unit()
                .context("no unit to restart on update")?
                .to_string();
            let action = restart::restart_action(
                unit,
                config.stale_artifacts.clone(),
                Arc::clone(&notifier),
            );
            let poller = UpdatePoller::new(
                AppInfoClient::new()?,
                app_id.clone(),
                state_path.clone(),
                Arc::clone(&notifier),
                action,
            )
            .with_interval(Duration::from_secs(config.update_interval_secs));
            Some(tokio::spawn(poller.run(cancel.clone())))
        }
        _ => {
            tracing::info!("update polling not configured");
            None
        }
    };

    tracing::info!("hugin ready");

    // -- Main loop: wait for shutdown or the tailer ending on its own --
    let mut sigterm = signal(SignalKind::terminate())?;
    let ended = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, shutting down");
            None
        }
        _ = sigterm.recv() => {
            tracing::info!("SIGTERM received, shutting down");
            None
        }
        res = &mut tail_task => Some(res),
    };

    if ended.is_some() {
        tracing::warn!("tailing source ended, shutting down");
    }

    // -- Graceful shutdown --
    cancel.cancel();
    let tail_result = match ended {
        Some(res) => res,
        None => tail_task.await,
    };
    if let Some(task) = poll_task {
        let _ = task.await;
    }
    let _ = notify_task.await;

    match tail_result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.into()),
        Err(e) => Err(anyhow::anyhow!("tail task failed: {e}")),
    }
}
