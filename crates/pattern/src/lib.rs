//! Line patterns and the match events they produce.
//!
//! Both tailers reduce a stream of log lines to [`MatchEvent`]s by running
//! each line through a [`LinePattern`]. A pattern is a case-insensitive
//! regex whose first capture group names the player the line is about; a
//! pattern without a capture group is rejected at compile time so a
//! misconfiguration fails at startup instead of silently matching nothing.

use regex::{Regex, RegexBuilder};

/// Errors from compiling a line pattern.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("pattern has no capture group for the player name: {0}")]
    MissingCaptureGroup(String),
}

/// What a matched line means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Login,
    Logout,
}

/// One login or logout extracted from a line of log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEvent {
    pub kind: MatchKind,
    /// Player name captured by the pattern's first group.
    pub subject: String,
}

impl MatchEvent {
    pub fn login(subject: impl Into<String>) -> Self {
        Self {
            kind: MatchKind::Login,
            subject: subject.into(),
        }
    }

    pub fn logout(subject: impl Into<String>) -> Self {
        Self {
            kind: MatchKind::Logout,
            subject: subject.into(),
        }
    }
}

/// A compiled, case-insensitive line pattern.
#[derive(Debug, Clone)]
pub struct LinePattern {
    regex: Regex,
}

impl LinePattern {
    /// Compiles `pattern` case-insensitively.
    ///
    /// The pattern must contain at least one capture group; the first group
    /// is what [`capture`](Self::capture) extracts.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        // captures_len counts the implicit whole-match group 0.
        if regex.captures_len() < 2 {
            return Err(PatternError::MissingCaptureGroup(pattern.to_string()));
        }
        Ok(Self { regex })
    }

    /// Returns the first capture group if `line` matches anywhere.
    pub fn capture<'l>(&self, line: &'l str) -> Option<&'l str> {
        self.regex
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// The source text the pattern was compiled from.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_first_group() {
        let pattern = LinePattern::new(r"player '(\w+)' joined").unwrap();
        assert_eq!(pattern.capture("12:00 player 'Alice' joined"), Some("Alice"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let pattern = LinePattern::new(r"PLAYER '(\w+)' JOINED").unwrap();
        assert_eq!(pattern.capture("player 'bob' joined"), Some("bob"));
    }

    #[test]
    fn captures_zdoid_style_line() {
        let pattern = LinePattern::new(r"Got character ZDOID from (\S+) :").unwrap();
        let line = "03/19/2025 22:10:05: Got character ZDOID from Alice : 12345:1";
        assert_eq!(pattern.capture(line), Some("Alice"));
    }

    #[test]
    fn no_match_returns_none() {
        let pattern = LinePattern::new(r"player '(\w+)' joined").unwrap();
        assert_eq!(pattern.capture("server heartbeat ok"), None);
    }

    #[test]
    fn pattern_without_capture_group_is_rejected() {
        let err = LinePattern::new(r"player joined").unwrap_err();
        assert!(matches!(err, PatternError::MissingCaptureGroup(_)));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let err = LinePattern::new(r"player '(\w+' joined").unwrap_err();
        assert!(matches!(err, PatternError::Regex(_)));
    }

    #[test]
    fn match_event_constructors() {
        assert_eq!(
            MatchEvent::login("Alice"),
            MatchEvent {
                kind: MatchKind::Login,
                subject: "Alice".into(),
            }
        );
        assert_eq!(MatchEvent::logout("Bob").kind, MatchKind::Logout);
    }
}
