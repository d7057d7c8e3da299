//! Dispatcher errors.

use thiserror::Error;
use vigil_core::{SourceError, StateError};

/// Errors from a dispatch tick or from opening a dispatcher.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Fetching failed. Transient fetch errors leave the cursor untouched.
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    /// Loading or persisting the cursor failed.
    #[error("state error: {0}")]
    State(#[from] StateError),
    /// The dispatcher was configured with impossible values.
    #[error("fatal config error: {0}")]
    Config(String),
}

impl DispatchError {
    /// Whether the owning loop must stop.
    pub fn is_fatal(&self) -> bool {
        match self {
            DispatchError::Source(e) => e.is_fatal(),
            DispatchError::Config(_) => true,
            DispatchError::State(_) => false,
        }
    }
}
