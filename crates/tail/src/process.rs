//! Process tailer: stream a long-running command's stdout line by line.
//!
//! Built for `journalctl -f`, but any command that prints log lines works.
//! Unlike the file tailer this one sees leave lines too, so both a login
//! and an optional logout pattern run against every line.

use std::process::Stdio;

use hugin_pattern::{LinePattern, MatchEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::{OnMatchFn, TailError};

/// Tails the stdout of a log-streaming command.
pub struct ProcessTailer {
    program: String,
    args: Vec<String>,
    login: LinePattern,
    logout: Option<LinePattern>,
    on_match: OnMatchFn,
}

impl ProcessTailer {
    /// Creates a tailer for an arbitrary command.
    ///
    /// Spawning is deferred to [`run`](Self::run), so constructing a tailer
    /// for a command that does not exist is not itself an error.
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        login: LinePattern,
        logout: Option<LinePattern>,
        on_match: OnMatchFn,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            login,
            logout,
            on_match,
        }
    }

    /// Creates a tailer following a systemd unit's journal.
    ///
    /// `-n 0` keeps history out of the stream: only lines logged after
    /// attach are seen, mirroring the file tailer starting at end of file.
    pub fn journalctl(
        service: &str,
        login: LinePattern,
        logout: Option<LinePattern>,
        on_match: OnMatchFn,
    ) -> Self {
        let args = ["-u", service, "-f", "-n", "0"]
            .into_iter()
            .map(str::to_string)
            .collect();
        Self::new("journalctl", args, login, logout, on_match)
    }

    /// Runs until the command exits or `cancel` fires.
    ///
    /// A spawn failure is fatal: with no stream to tail the watcher has
    /// nothing to do. The child exiting on its own ends the tailer cleanly;
    /// on cancellation the child is killed rather than left behind.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), TailError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TailError::Spawn {
                command: self.program.clone(),
                source: e,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TailError::Io(std::io::Error::other("child stdout not captured")))?;
        let mut lines = BufReader::new(stdout).lines();

        tracing::info!(
            command = %self.program,
            args = ?self.args,
            "process tailer attached"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(command = %self.program, "process tailer cancelled");
                    break;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => self.scan_line(line.trim()),
                    Ok(None) => {
                        tracing::warn!(command = %self.program, "tailed process ended its output stream");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(command = %self.program, error = %e, "error reading tailed process output");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    fn scan_line(&self, line: &str) {
        if let Some(name) = self.login.capture(line) {
            tracing::info!(player = name, "login detected");
            (self.on_match)(MatchEvent::login(name));
        }
        if let Some(pattern) = &self.logout {
            if let Some(name) = pattern.capture(line) {
                tracing::info!(player = name, "logout detected");
                (self.on_match)(MatchEvent::logout(name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn login_pattern() -> LinePattern {
        LinePattern::new(r"joined: (\w+)").unwrap()
    }

    fn logout_pattern() -> LinePattern {
        LinePattern::new(r"left: (\w+)").unwrap()
    }

    fn collector() -> (Arc<Mutex<Vec<MatchEvent>>>, OnMatchFn) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let on_match: OnMatchFn = Box::new(move |event| sink.lock().unwrap().push(event));
        (events, on_match)
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn captures_login_and_logout_lines() {
        let (events, on_match) = collector();
        let tailer = ProcessTailer::new(
            "sh",
            sh("printf 'joined: Alice\\nnoise line\\nleft: Bob\\n'"),
            login_pattern(),
            Some(logout_pattern()),
            on_match,
        );

        tailer.run(CancellationToken::new()).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![MatchEvent::login("Alice"), MatchEvent::logout("Bob")]
        );
    }

    #[tokio::test]
    async fn without_logout_pattern_leave_lines_are_noise() {
        let (events, on_match) = collector();
        let tailer = ProcessTailer::new(
            "sh",
            sh("printf 'joined: Alice\\nleft: Bob\\n'"),
            login_pattern(),
            None,
            on_match,
        );

        tailer.run(CancellationToken::new()).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(*events, vec![MatchEvent::login("Alice")]);
    }

    #[tokio::test]
    async fn one_line_can_match_both_patterns() {
        let (events, on_match) = collector();
        let tailer = ProcessTailer::new(
            "sh",
            sh("printf 'session: Alice\\n'"),
            LinePattern::new(r"session: (\w+)").unwrap(),
            Some(LinePattern::new(r"session: (\w+)").unwrap()),
            on_match,
        );

        tailer.run(CancellationToken::new()).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![MatchEvent::login("Alice"), MatchEvent::logout("Alice")]
        );
    }

    #[tokio::test]
    async fn spawn_failure_is_an_error() {
        let tailer = ProcessTailer::new(
            "/definitely/not/a/binary",
            vec![],
            login_pattern(),
            None,
            Box::new(|_| {}),
        );

        let err = tailer.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, TailError::Spawn { .. }));
    }

    #[tokio::test]
    async fn cancel_stops_a_long_running_process() {
        let (events, on_match) = collector();
        let tailer = ProcessTailer::new(
            "sh",
            sh("echo 'joined: Alice'; sleep 30"),
            login_pattern(),
            None,
            on_match,
        );

        let cancel = CancellationToken::new();
        let task = tokio::spawn(tailer.run(cancel.clone()));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while events.lock().unwrap().is_empty() {
            assert!(tokio::time::Instant::now() < deadline, "never saw the login");
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        cancel.cancel();
        // Joining must not wait out the child's sleep.
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[test]
    fn journalctl_follows_without_history() {
        let tailer = ProcessTailer::journalctl(
            "valheim.service",
            login_pattern(),
            None,
            Box::new(|_| {}),
        );
        assert_eq!(tailer.program, "journalctl");
        assert_eq!(tailer.args, ["-u", "valheim.service", "-f", "-n", "0"]);
    }
}
