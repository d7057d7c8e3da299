//! Process-level errors.

use thiserror::Error;
use vigil_agent::AgentError;
use vigil_core::{ExecError, LedgerError, SourceError, StateError};
use vigil_dispatch::DispatchError;
use vigil_schedule::ScheduleError;

/// Errors surfaced by the runtime and its loops.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum VigilError {
    /// The configuration cannot be used.
    #[error("config error: {0}")]
    Config(String),

    /// Filesystem or process I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A dispatcher failed to open or tick.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The scheduler failed to open.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// An agent failed.
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    /// The executor rejected its setup.
    #[error("executor error: {0}")]
    Exec(#[from] ExecError),

    /// The event source failed outside a tick.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// A ledger call failed outside a tick.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Persistent state failed.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// A loop stopped on a fatal error.
    #[error("loop {name} halted: {reason}")]
    Halted {
        /// Loop name.
        name: String,
        /// The fatal error.
        reason: String,
    },
}

impl VigilError {
    /// Whether a loop returning this error must halt.
    pub fn is_fatal(&self) -> bool {
        match self {
            VigilError::Config(_) | VigilError::Halted { .. } => true,
            VigilError::Dispatch(e) => e.is_fatal(),
            VigilError::Schedule(e) => matches!(e, ScheduleError::Config(_)),
            VigilError::Agent(e) => e.is_fatal(),
            VigilError::Exec(e) => matches!(e, ExecError::FatalConfig(_)),
            VigilError::Source(e) => e.is_fatal(),
            VigilError::Ledger(e) => matches!(e, LedgerError::FatalConfig(_)),
            VigilError::Io(_) | VigilError::State(_) => false,
        }
    }
}
