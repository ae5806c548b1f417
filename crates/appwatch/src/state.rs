//! Persisted update-poll state.
//!
//! One small JSON file holding the last change number seen for the watched
//! app. A missing or unreadable file is not an error: it means "no previous
//! value", and the poller then re-primes its baseline instead of firing a
//! spurious update notification on first boot.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Last observed change number, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateState {
    pub change_number: Option<i64>,
}

impl UpdateState {
    /// Loads the state from `path`.
    ///
    /// Absence yields the default "unknown" state; corruption does too, with
    /// a warning, so a half-written file never wedges the poller.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable state file, starting fresh");
                return Self::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt state file, starting fresh");
                Self::default()
            }
        }
    }

    /// Persists the state to `path`, overwriting any previous record.
    pub fn store(&self, path: &Path) -> io::Result<()> {
        let raw = serde_json::to_string(self)?;
        std::fs::write(path, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let state = UpdateState::load(&dir.path().join("nope.json"));
        assert_eq!(state.change_number, None);
    }

    #[test]
    fn corrupt_file_loads_as_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{definitely not json").unwrap();

        let state = UpdateState::load(&path);
        assert_eq!(state.change_number, None);
    }

    #[test]
    fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let state = UpdateState {
            change_number: Some(31964045),
        };
        state.store(&path).unwrap();

        assert_eq!(UpdateState::load(&path), state);
    }

    #[test]
    fn stored_shape_is_a_change_number_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        UpdateState {
            change_number: Some(7),
        }
        .store(&path)
        .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"{"change_number":7}"#);
    }

    #[test]
    fn store_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        UpdateState {
            change_number: Some(7),
        }
        .store(&path)
        .unwrap();
        UpdateState {
            change_number: Some(9),
        }
        .store(&path)
        .unwrap();

        assert_eq!(UpdateState::load(&path).change_number, Some(9));
    }
}
