//! The restart action run when an update is detected.
//!
//! Removes any configured stale artifacts first (manifest files a stopped
//! server would otherwise trust over the updated reality), then asks
//! systemd to restart the unit. A failed restart escalates to the webhook:
//! at that point the server may be down and silence would be worse.

use std::path::PathBuf;
use std::sync::Arc;

use hugin_appwatch::RestartFn;
use hugin_webhook::Notifier;

/// Builds the action handed to the update poller.
pub fn restart_action(
    unit: String,
    stale_artifacts: Vec<PathBuf>,
    notifier: Arc<Notifier>,
) -> RestartFn {
    Box::new(move || {
        let unit = unit.clone();
        let artifacts = stale_artifacts.clone();
        let notifier = Arc::clone(&notifier);
        Box::pin(async move {
            remove_stale_artifacts(&artifacts);

            tracing::info!(unit = %unit, "restarting unit for update");
            if let Err(e) = systemctl_restart(&unit).await {
                tracing::error!(unit = %unit, error = %e, "unit restart failed");
                notifier
                    .send(&format!(
                        "SYSTEM SEVERE: failed to restart {unit}. Someone should ping an admin."
                    ))
                    .await;
            }
        })
    })
}

/// Removes known stale files; absence is fine, anything else is logged.
fn remove_stale_artifacts(paths: &[PathBuf]) {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::info!(path = %path.display(), "removed stale artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "stale artifact already absent");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove stale artifact");
            }
        }
    }
}

/// Asks systemd to restart the unit.
async fn systemctl_restart(unit: &str) -> std::io::Result<()> {
    let output = tokio::process::Command::new("systemctl")
        .args(["restart", unit])
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(std::io::Error::other(format!(
            "systemctl restart {unit} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}
