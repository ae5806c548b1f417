//! Steam package-update watching.
//!
//! The [`UpdatePoller`] periodically asks the SteamCMD appinfo API for an
//! app's current change number and compares it against the last value it
//! persisted. Publishing a new build bumps the change number, so a drift
//! between the two means the installed server is now behind: the poller
//! announces the update and invokes a restart action, then carries on
//! polling with the new number as its baseline.

mod client;
mod poller;
mod state;

pub use client::{Client, Error};
pub use poller::{DEFAULT_POLL_INTERVAL, RestartFn, RestartFuture, UpdatePoller};
pub use state::UpdateState;
