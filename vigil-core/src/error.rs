//! Error types for each protocol boundary.

use crate::duration::DurationMs;
use thiserror::Error;

/// Errors from an [`EventSource`](crate::source::EventSource).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or remote hiccup. The caller retries on its next tick;
    /// nothing has been consumed.
    #[error("transient fetch error: {0}")]
    Transient(String),

    /// The stream filter itself is invalid (bad package id, unknown
    /// module). Retrying cannot help; the affected loop must stop.
    #[error("fatal config error: {0}")]
    FatalConfig(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl SourceError {
    /// Whether the operator must intervene before the loop can continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::FatalConfig(_))
    }
}

impl From<LedgerError> for SourceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::FatalConfig(msg) => SourceError::FatalConfig(msg),
            other => SourceError::Transient(other.to_string()),
        }
    }
}

/// Errors from the remote ledger client.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Network failure, 5xx, or rate limiting.
    #[error("transient ledger error: {0}")]
    Transient(String),

    /// The call did not complete within its deadline.
    #[error("ledger call timed out after {0}")]
    Timeout(DurationMs),

    /// The remote system refused the request (bad arguments, aborted
    /// transaction, insufficient gas).
    #[error("rejected: {0}")]
    Rejected(String),

    /// Invalid identifiers in configuration (package, object, address).
    #[error("fatal config error: {0}")]
    FatalConfig(String),

    /// The response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The transaction was sent but its fate is unknown: the call timed
    /// out or the connection failed after sending. It may still execute,
    /// so look it up by `digest` before sending it again.
    #[error("transaction {digest} sent, outcome unknown: {reason}")]
    Unconfirmed {
        /// Digest of the transaction that was sent.
        digest: String,
        /// What interrupted the call.
        reason: String,
    },

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Whether retrying the same call later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transient(_) | LedgerError::Timeout(_))
    }
}

/// Errors from a [`Signer`](crate::signer::Signer).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SignerError {
    /// The signing backend could not be reached or is not configured.
    #[error("signer unavailable: {0}")]
    Unavailable(String),

    /// The backend refused or failed to sign.
    #[error("signing failed: {0}")]
    Failed(String),
}

/// Errors from an [`ActionExecutor`](crate::action::ActionExecutor).
///
/// A returned error means no transaction was accepted by the remote
/// system; the caller may retry without risking a double submission.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ExecError {
    /// The action could not be turned into a transaction or the ledger
    /// refused it.
    #[error("execution failure: {0}")]
    Failure(String),

    /// The action references configuration that does not exist.
    #[error("fatal config error: {0}")]
    FatalConfig(String),

    /// Ledger error while preparing or submitting.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Signing failed.
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),
}

/// Errors from a pluggable [`DecisionFn`](crate::decision::DecisionFn).
/// Callers fall back to a deterministic heuristic on any of these.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DecisionError {
    /// The decision backend is not configured.
    #[error("decision function unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with something that is not a valid decision.
    #[error("malformed decision: {0}")]
    Malformed(String),

    /// The backend did not answer in time.
    #[error("decision timed out after {0}")]
    Timeout(DurationMs),

    /// Transport or HTTP failure talking to the backend.
    #[error("decision transport error: {0}")]
    Transport(String),
}

/// State errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StateError {
    /// Key not found in the given scope.
    #[error("not found: {scope}/{key}")]
    NotFound {
        /// The scope that was searched.
        scope: String,
        /// The key that was not found.
        key: String,
    },

    /// A write operation failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors returned by event handlers. These are logged by the dispatcher
/// and never abort a dispatch tick.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler failed.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The event payload did not have the expected shape.
    #[error("unexpected payload: {0}")]
    Payload(String),

    /// The handler could not record derived state.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
