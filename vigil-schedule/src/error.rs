//! Scheduler errors.

use thiserror::Error;
use vigil_core::StateError;

/// Errors from the scheduler.
///
/// Execution failures are not errors here: they are recorded on the
/// entry and retried.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Reading or writing the persisted table failed.
    #[error("state error: {0}")]
    State(#[from] StateError),
    /// Impossible configuration.
    #[error("fatal config error: {0}")]
    Config(String),
}
