//! Tailing strategies for the server activity stream.
//!
//! Exactly one tailer runs at a time: [`FileTailer`] watches a log file on
//! disk and survives rotation, [`ProcessTailer`] attaches to the stdout of a
//! long-running log-streaming command such as `journalctl -f`. Both reduce
//! their line stream to [`MatchEvent`]s and hand them to a callback; what
//! happens to an event afterwards is the caller's business.

use std::path::PathBuf;

use hugin_pattern::MatchEvent;

mod file;
mod process;

pub use file::FileTailer;
pub use process::ProcessTailer;

/// Callback invoked with each match event.
pub type OnMatchFn = Box<dyn Fn(MatchEvent) + Send + Sync + 'static>;

/// Errors from constructing or running a tailer.
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    #[error("watch directory does not exist: {}", .0.display())]
    MissingWatchDir(PathBuf),

    #[error("failed to watch {}: {}", .path.display(), .source)]
    Watch {
        path: PathBuf,
        source: notify::Error,
    },

    #[error("failed to launch {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
