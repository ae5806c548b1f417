//! The `stats` subcommand: a one-shot player activity report.

use std::path::PathBuf;

use anyhow::Context;
use hugin_pattern::LinePattern;
use hugin_webhook::Notifier;

use crate::config::Config;

/// Scans a historical log, prints the report and posts it to the webhook.
pub async fn run(config: Config, log_file: Option<PathBuf>, min_trend: f64) -> anyhow::Result<()> {
    let path = log_file
        .or_else(|| config.log_file.clone())
        .context("no log to analyze: pass --log-file or configure log_file")?;
    let pattern = LinePattern::new(&config.pattern)?;

    let events = hugin_stats::scan_log(&path, &pattern)?;
    tracing::info!(path = %path.display(), logins = events.len(), "scanned log");

    let totals = hugin_stats::totals_digest(&events);
    let trending = hugin_stats::trending_digest(&hugin_stats::analyze_trends(&events), min_trend);

    println!("{totals}");
    println!("{trending}");

    let webhook_url = config.webhook_url().context("webhook URL missing")?;
    let notifier = Notifier::new(webhook_url)?;
    notifier.send(&totals).await;
    notifier.send(&trending).await;

    Ok(())
}
