//! Player activity reports from a historical login log.
//!
//! Where the tailers watch lines arrive live, this crate reads a whole log
//! after the fact and answers two questions: how often has each player
//! logged in at all, and who has been unusually active lately. "Lately"
//! means the last seven days measured against the weeks before; a player
//! whose recent daily average clearly outgrows their older one is trending.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use hugin_pattern::LinePattern;

/// Timestamp layout at the front of each log line.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Trend percentage below which a player is not worth reporting.
pub const DEFAULT_MIN_TREND_PERCENTAGE: f64 = 10.0;

/// Errors from reading a log for analysis.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("failed to read log {}: {}", .path.display(), .source)]
    ReadLog {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One login parsed out of the log.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginEvent {
    pub player: String,
    pub at: NaiveDateTime,
}

/// Activity split for one player: the last seven days against the stretch
/// before them.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerTrend {
    pub last_7_days_total: u64,
    pub previous_total: u64,
    pub daily_avg_last_7_days: f64,
    pub daily_avg_previous: f64,
    /// Growth of the recent daily average over the previous one, in
    /// percent. Infinite for a player with no previous activity at all.
    pub trend_percentage: f64,
}

/// Scans `path` for lines matching `pattern`.
///
/// Lines that match but do not start with a `TIMESTAMP_FORMAT` stamp
/// followed by ": " are skipped; a historical report is only as good as the
/// timestamps in it.
pub fn scan_log(path: &Path, pattern: &LinePattern) -> Result<Vec<LoginEvent>, StatsError> {
    let raw = std::fs::read_to_string(path).map_err(|source| StatsError::ReadLog {
        path: path.to_path_buf(),
        source,
    })?;

    let mut events = Vec::new();
    for line in raw.lines() {
        let Some(player) = pattern.capture(line) else {
            continue;
        };
        let Some((stamp, _)) = line.split_once(": ") else {
            continue;
        };
        let Ok(at) = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT) else {
            continue;
        };
        events.push(LoginEvent {
            player: player.to_string(),
            at,
        });
    }

    Ok(events)
}

/// Counts total logins per player, sorted by name.
pub fn login_totals(events: &[LoginEvent]) -> BTreeMap<String, u64> {
    let mut totals = BTreeMap::new();
    for event in events {
        *totals.entry(event.player.clone()).or_insert(0) += 1;
    }
    totals
}

/// Renders the per-player totals as a message.
pub fn totals_digest(events: &[LoginEvent]) -> String {
    let mut message = String::from("Player ZDOID Stats:\n");
    for (player, count) in login_totals(events) {
        message.push_str(&format!("{player}: {count} entries\n"));
    }
    message
}

/// Splits each player's activity around the seven-day mark and computes the
/// trend between the two daily averages.
///
/// The previous window is normalized to the span between thirty and seven
/// days before the most recent event, so one old burst does not drown in an
/// arbitrarily long log.
pub fn analyze_trends(events: &[LoginEvent]) -> HashMap<String, PlayerTrend> {
    let Some(most_recent) = events.iter().map(|e| e.at).max() else {
        return HashMap::new();
    };
    let seven_days_ago = most_recent - Duration::days(7);
    let days_in_previous = (seven_days_ago - (most_recent - Duration::days(30)))
        .num_days()
        .max(1);

    let mut counts: HashMap<&str, (u64, u64)> = HashMap::new();
    for event in events {
        let entry = counts.entry(&event.player).or_insert((0, 0));
        if event.at >= seven_days_ago {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    counts
        .into_iter()
        .map(|(player, (last7, previous))| {
            let daily_avg_last_7_days = last7 as f64 / 7.0;
            let daily_avg_previous = previous as f64 / days_in_previous as f64;
            let trend_percentage = if daily_avg_previous > 0.0 {
                (daily_avg_last_7_days - daily_avg_previous) / daily_avg_previous * 100.0
            } else {
                f64::INFINITY
            };

            (
                player.to_string(),
                PlayerTrend {
                    last_7_days_total: last7,
                    previous_total: previous,
                    daily_avg_last_7_days,
                    daily_avg_previous,
                    trend_percentage,
                },
            )
        })
        .collect()
}

/// Renders the players trending at or above `min_trend_percentage`, most
/// trending first.
pub fn trending_digest(trends: &HashMap<String, PlayerTrend>, min_trend_percentage: f64) -> String {
    let mut message = String::from("\n\nTrending Users Analysis:\n");
    message.push_str(&"-".repeat(80));

    let mut trending: Vec<(&String, &PlayerTrend)> = trends
        .iter()
        .filter(|(_, t)| t.trend_percentage >= min_trend_percentage && t.last_7_days_total > 0)
        .collect();

    if trending.is_empty() {
        message.push_str("No users showing significant trending activity.");
        return message;
    }

    trending.sort_by(|a, b| {
        b.1.trend_percentage
            .partial_cmp(&a.1.trend_percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    for (player, trend) in trending {
        message.push_str(&format!("\nUser: {player}\n"));
        message.push_str(&format!(
            "Last 7 days activity: {} events\n",
            trend.last_7_days_total
        ));
        message.push_str(&format!(
            "Previous daily average: {:.2} events\n",
            trend.daily_avg_previous
        ));
        message.push_str(&format!(
            "Recent daily average: {:.2} events\n",
            trend.daily_avg_last_7_days
        ));
        message.push_str(&format!("Trend: {:.1}% increase\n", trend.trend_percentage));
    }

    message
}
