//! Log file tailer with a rotation-aware read cursor.
//!
//! The file's parent directory is watched with `notify`; raw filesystem
//! events are reduced to three transitions on a single read cursor. An
//! append reads from the cursor to the new end of file, a recreation resets
//! the cursor and reads from the top, and a rename or removal resets the
//! cursor and waits for the path to come back. The cursor starts at the
//! current end of file so lines from before startup are never replayed.

use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use hugin_pattern::{LinePattern, MatchEvent};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio_util::sync::CancellationToken;

use crate::{OnMatchFn, TailError};

/// Cursor transition derived from one filesystem event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FsTransition {
    /// Bytes may have been appended; read from the stored cursor.
    Append,
    /// The path exists again with fresh content; reset and read at once.
    Recreate,
    /// The path was moved away or removed; reset and wait.
    Renamed,
}

/// Tails one log file and emits a [`MatchEvent`] per matching appended line.
///
/// Only the login pattern applies here: the file tailers in the wild watch
/// logs that record joins, while leave lines live in the service journal.
pub struct FileTailer {
    path: PathBuf,
    watch_dir: PathBuf,
    pattern: LinePattern,
    on_match: OnMatchFn,
    cursor: u64,
    /// Trailing bytes of the last read that were not yet newline-terminated.
    partial: String,
}

impl FileTailer {
    /// Creates a tailer for `path`.
    ///
    /// The file itself may not exist yet, but its parent directory must:
    /// that is what gets watched, and a typo in the configured path should
    /// fail at startup rather than wait forever for a directory nobody will
    /// create.
    pub fn new(path: PathBuf, pattern: LinePattern, on_match: OnMatchFn) -> Result<Self, TailError> {
        let path = std::path::absolute(&path)?;
        let watch_dir = match path.parent() {
            Some(dir) if dir.is_dir() => dir.to_path_buf(),
            Some(dir) => return Err(TailError::MissingWatchDir(dir.to_path_buf())),
            None => return Err(TailError::MissingWatchDir(path.clone())),
        };

        // Start at the current end of file; historic lines are old news.
        let cursor = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            path,
            watch_dir,
            pattern,
            on_match,
            cursor,
            partial: String::new(),
        })
    }

    /// Runs the tailer until cancelled.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), TailError> {
        // The watcher delivers events on its own thread; the unbounded
        // channel carries them into the async world without dropping any.
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })
        .map_err(|e| TailError::Watch {
            path: self.watch_dir.clone(),
            source: e,
        })?;
        watcher
            .watch(&self.watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| TailError::Watch {
                path: self.watch_dir.clone(),
                source: e,
            })?;

        tracing::info!(
            path = %self.path.display(),
            cursor = self.cursor,
            pattern = %self.pattern.as_str(),
            "file tailer started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = rx.recv() => match event {
                    Some(Ok(event)) => {
                        if let Some(transition) = classify(&event, &self.path) {
                            self.apply(transition);
                        }
                    }
                    Some(Err(e)) => tracing::warn!(error = %e, "filesystem watch error"),
                    None => break,
                }
            }
        }

        tracing::info!(path = %self.path.display(), "file tailer stopped");
        Ok(())
    }

    fn apply(&mut self, transition: FsTransition) {
        match transition {
            FsTransition::Append => self.read_cycle(),
            FsTransition::Recreate => {
                tracing::debug!(path = %self.path.display(), "log file recreated, reading from the top");
                self.cursor = 0;
                self.partial.clear();
                self.read_cycle();
            }
            FsTransition::Renamed => {
                tracing::debug!(path = %self.path.display(), "log file moved away, waiting for recreation");
                self.cursor = 0;
                self.partial.clear();
            }
        }
    }

    fn read_cycle(&mut self) {
        if let Err(e) = self.read_new_lines() {
            // Reading can race a rotation; the rename or remove event that
            // follows resets the cursor, so a vanished file is not news.
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "error reading log file");
            }
        }
    }

    /// Reads from the cursor to the current end of file and scans each newly
    /// completed line against the pattern.
    ///
    /// A line can arrive in more than one write, so the trailing bytes of a
    /// read that lack their newline are held back and prepended to the next
    /// read instead of being scanned as a torn fragment.
    fn read_new_lines(&mut self) -> io::Result<()> {
        let len = std::fs::metadata(&self.path)?.len();

        // A shrink means the file was truncated in place: the next bytes
        // belong to a fresh log, not the tail of the old one.
        if len < self.cursor {
            tracing::debug!(
                path = %self.path.display(),
                len,
                cursor = self.cursor,
                "log file shrank, resetting cursor"
            );
            self.cursor = 0;
            self.partial.clear();
        }
        if len == self.cursor {
            return Ok(());
        }

        let mut file = std::fs::File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.cursor))?;
        let mut chunk = Vec::new();
        let read = file.read_to_end(&mut chunk)?;
        self.cursor += read as u64;

        self.partial.push_str(&String::from_utf8_lossy(&chunk));
        let Some(end) = self.partial.rfind('\n') else {
            return Ok(());
        };
        let complete: String = self.partial.drain(..=end).collect();

        for line in complete.lines() {
            if let Some(name) = self.pattern.capture(line) {
                tracing::info!(player = name, "login detected");
                (self.on_match)(MatchEvent::login(name));
            }
        }

        Ok(())
    }
}

/// Reduces one filesystem event to a cursor transition, if it concerns the
/// tailed path at all.
fn classify(event: &Event, path: &Path) -> Option<FsTransition> {
    if !event.paths.iter().any(|p| p == path) {
        return None;
    }

    match &event.kind {
        EventKind::Create(_) => Some(FsTransition::Recreate),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => Some(FsTransition::Renamed),
            RenameMode::To => Some(FsTransition::Recreate),
            RenameMode::Both => {
                // Paths are [from, to]; the tailed file can be either side.
                if event.paths.first().is_some_and(|p| p == path) {
                    Some(FsTransition::Renamed)
                } else {
                    Some(FsTransition::Recreate)
                }
            }
            _ => Some(FsTransition::Renamed),
        },
        EventKind::Modify(_) => Some(FsTransition::Append),
        EventKind::Remove(_) => Some(FsTransition::Renamed),
        // Reads are driven by the cursor, so treating an unclassified event
        // as an append can never double-report a line.
        EventKind::Any => Some(FsTransition::Append),
        EventKind::Access(_) | EventKind::Other => None,
    }
}
