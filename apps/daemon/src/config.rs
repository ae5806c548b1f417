//! Daemon configuration.
//!
//! One TOML document, selected on the command line. Exactly one of
//! `log_file` and `journalctl` picks the tailing strategy; update polling
//! is optional and switched on by configuring `app_id` together with
//! `appinfo_file_new`. Validation happens at load so a bad config stops the
//! daemon before anything else starts.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::Deserialize;

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Login pattern; its first capture group is the player name.
    pub pattern: String,

    /// Logout pattern, applied only when tailing a journal.
    pub logout_pattern: Option<String>,

    /// Discord webhook URL.
    pub discord_webhook: Option<String>,

    /// Older spelling of `discord_webhook`, still accepted.
    pub discord_webhook_url: Option<String>,

    /// Log file to tail.
    pub log_file: Option<PathBuf>,

    /// systemd unit whose journal to tail instead.
    pub journalctl: Option<String>,

    /// Steam app id whose change number is watched for updates.
    #[serde(default, deserialize_with = "app_id_string_or_int")]
    pub app_id: Option<String>,

    /// File persisting the last seen change number between runs.
    pub appinfo_file_new: Option<PathBuf>,

    /// Seconds between update polls.
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,

    /// Unit restarted when an update lands; defaults to `journalctl`.
    pub restart_service: Option<String>,

    /// Files removed best-effort before an update restart.
    #[serde(default)]
    pub stale_artifacts: Vec<PathBuf>,
}

fn default_update_interval() -> u64 {
    300
}

/// Steam app ids circulate both quoted and bare in configs; accept either.
fn app_id_string_or_int<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Int(n) => n.to_string(),
        Raw::Str(s) => s,
    }))
}

impl Config {
    /// Loads and validates the configuration at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        match (&self.log_file, &self.journalctl) {
            (Some(_), Some(_)) => bail!("log_file and journalctl are mutually exclusive"),
            (None, None) => bail!("one of log_file or journalctl is required"),
            _ => {}
        }
        if self.webhook_url().is_none() {
            bail!("discord_webhook (or discord_webhook_url) is required");
        }
        if self.app_id.is_some() != self.appinfo_file_new.is_some() {
            bail!("app_id and appinfo_file_new must be configured together");
        }
        if self.update_polling() && self.restart_unit().is_none() {
            bail!("restart_service is required for update polling when tailing a log file");
        }
        Ok(())
    }

    /// The webhook URL, under either config key.
    pub fn webhook_url(&self) -> Option<&str> {
        self.discord_webhook
            .as_deref()
            .or(self.discord_webhook_url.as_deref())
    }

    /// The unit restarted on updates; a journal-tailed service doubles as
    /// the default.
    pub fn restart_unit(&self) -> Option<&str> {
        self.restart_service
            .as_deref()
            .or(self.journalctl.as_deref())
    }

    /// Whether update polling is configured.
    pub fn update_polling(&self) -> bool {
        self.app_id.is_some() && self.appinfo_file_new.is_some()
    }
}
