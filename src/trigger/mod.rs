//! The loop deciding when discovery runs and whether its result is written.
//!
//! Timer ticks and operator signals feed one channel of [`Trigger`]s. The
//! [`TriggerLoop`] consumes it strictly in order, so cycles never overlap:
//!
//! ```text
//! Idle -> Discovering -> Writing | Skipping -> Idle
//!   \-> Stopped (shutdown)
//! ```
mod runner;
mod sources;

pub use runner::TriggerLoop;
pub use sources::{shutdown_signal, spawn_signal_listener, spawn_ticker};

use std::time::Duration;

use crate::{discovery, target};

/// Why a cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The discovery interval elapsed.
    Scheduled,
    /// An operator asked for a refresh; the result is written even if unchanged.
    Forced,
}

impl Trigger {
    pub fn is_forced(self) -> bool {
        matches!(self, Trigger::Forced)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Discovering,
    Writing,
    Skipping,
    Stopped,
}

/// How a successful cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Written,
    /// Nothing changed since the last write.
    Skipped,
}

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("could not discover targets: {0}")]
    Discovery(#[from] discovery::Error),
    #[error("discovery did not finish within {0:?}")]
    Timeout(Duration),
    #[error("could not write targets: {0}")]
    Write(#[from] target::Error),
    #[error("write task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
