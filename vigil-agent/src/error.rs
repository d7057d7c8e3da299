//! Agent errors and HTTP error mapping for chat-completion backends.

use thiserror::Error;
use vigil_core::{DecisionError, ExecError, LedgerError};

/// Errors that end a decision cycle early.
///
/// Decision function failures never show up here: the loop falls back
/// to the heuristic instead.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent is configured with impossible values.
    #[error("fatal config error: {0}")]
    FatalConfig(String),

    /// Reading the battlefield failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The executor refused the action outright.
    #[error("execution error: {0}")]
    Exec(#[from] ExecError),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl AgentError {
    /// Whether the owning loop must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AgentError::FatalConfig(_)
                | AgentError::Ledger(LedgerError::FatalConfig(_))
                | AgentError::Exec(ExecError::FatalConfig(_))
        )
    }
}

/// Map a non-success HTTP status from a chat backend to a [`DecisionError`].
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> DecisionError {
    match status.as_u16() {
        401 | 403 => DecisionError::Unavailable(format!("authentication failed: {body}")),
        404 => DecisionError::Unavailable(format!("model not found: {body}")),
        429 => DecisionError::Transport(format!("rate limited: {body}")),
        500 | 502 | 503 => DecisionError::Transport(format!("service unavailable: {body}")),
        _ => DecisionError::Transport(format!("HTTP {status}: {body}")),
    }
}

/// Map a [`reqwest::Error`] to a [`DecisionError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> DecisionError {
    if err.is_timeout() {
        DecisionError::Transport(format!("request timed out: {err}"))
    } else {
        DecisionError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_401_to_unavailable() {
        let err = map_http_status(reqwest::StatusCode::UNAUTHORIZED, "Invalid API key");
        assert!(matches!(err, DecisionError::Unavailable(_)));
    }

    #[test]
    fn map_404_to_unavailable() {
        let err = map_http_status(reqwest::StatusCode::NOT_FOUND, "no such endpoint");
        assert!(matches!(err, DecisionError::Unavailable(_)));
    }

    #[test]
    fn map_429_to_transport() {
        let err = map_http_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, DecisionError::Transport(_)));
    }

    #[test]
    fn map_unknown_status_keeps_body() {
        let err = map_http_status(reqwest::StatusCode::IM_A_TEAPOT, "teapot");
        assert!(err.to_string().contains("teapot"));
    }

    #[test]
    fn fatal_errors_are_recognized() {
        assert!(AgentError::FatalConfig("x".into()).is_fatal());
        assert!(AgentError::Exec(ExecError::FatalConfig("no arena".into())).is_fatal());
        assert!(!AgentError::Ledger(LedgerError::Transient("reset".into())).is_fatal());
    }
}
