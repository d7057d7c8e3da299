//! Mapping of transport, HTTP and JSON-RPC failures to [`LedgerError`].

use vigil_core::{DurationMs, LedgerError, SignerError};

/// Map a non-success HTTP status from the full node.
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> LedgerError {
    match status.as_u16() {
        401 | 403 => LedgerError::FatalConfig(format!("access denied by rpc node: {body}")),
        404 => LedgerError::FatalConfig(format!("rpc endpoint not found: {body}")),
        408 | 429 => LedgerError::Transient(format!("HTTP {status}: {body}")),
        500..=599 => LedgerError::Transient(format!("HTTP {status}: {body}")),
        _ => LedgerError::Rejected(format!("HTTP {status}: {body}")),
    }
}

/// Map a [`reqwest::Error`].
pub(crate) fn map_reqwest_error(err: reqwest::Error, timeout: DurationMs) -> LedgerError {
    if err.is_timeout() {
        LedgerError::Timeout(timeout)
    } else if err.is_decode() {
        LedgerError::Decode(err.to_string())
    } else {
        LedgerError::Transient(err.to_string())
    }
}

/// Map a JSON-RPC error object.
///
/// Reference: <https://docs.sui.io/references/sui-api> and JSON-RPC 2.0.
pub fn map_rpc_error(code: i64, message: &str) -> LedgerError {
    match code {
        -32700 | -32600 | -32601 | -32602 => {
            LedgerError::FatalConfig(format!("rpc error {code}: {message}"))
        }
        // Transaction input errors and execution refusals.
        -32002 | -32003 => LedgerError::Rejected(format!("rpc error {code}: {message}")),
        _ => LedgerError::Transient(format!("rpc error {code}: {message}")),
    }
}

/// Whether a failed execute call may still have reached the node.
///
/// Refusals and configuration errors come back before anything executes.
/// Everything else (timeouts, dropped connections, 5xx, unreadable
/// replies) leaves the outcome open.
pub(crate) fn outcome_unknown(err: &LedgerError) -> bool {
    !matches!(err, LedgerError::Rejected(_) | LedgerError::FatalConfig(_))
}

/// Map a signer failure raised while submitting.
pub(crate) fn map_signer_error(err: SignerError) -> LedgerError {
    match err {
        SignerError::Unavailable(msg) => LedgerError::FatalConfig(format!("signer unavailable: {msg}")),
        SignerError::Failed(msg) => LedgerError::Rejected(format!("signing failed: {msg}")),
        other => LedgerError::Other(Box::new(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_and_transport_failures_leave_the_outcome_open() {
        assert!(outcome_unknown(&LedgerError::Timeout(DurationMs::from_secs(15))));
        assert!(outcome_unknown(&LedgerError::Transient("connection reset".into())));
        assert!(outcome_unknown(&LedgerError::Decode("truncated body".into())));
        assert!(!outcome_unknown(&LedgerError::Rejected("rpc error -32002".into())));
        assert!(!outcome_unknown(&LedgerError::FatalConfig("HTTP 401".into())));
    }

    #[test]
    fn map_503_to_transient() {
        let err = map_http_status(reqwest::StatusCode::SERVICE_UNAVAILABLE, "busy");
        assert!(err.is_transient());
    }

    #[test]
    fn map_429_to_transient() {
        let err = map_http_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(err.is_transient());
    }

    #[test]
    fn map_404_to_fatal_config() {
        let err = map_http_status(reqwest::StatusCode::NOT_FOUND, "");
        assert!(matches!(err, LedgerError::FatalConfig(_)));
    }

    #[test]
    fn invalid_params_are_fatal() {
        let err = map_rpc_error(-32602, "Invalid params");
        assert!(matches!(err, LedgerError::FatalConfig(_)));
    }

    #[test]
    fn input_errors_are_rejections() {
        let err = map_rpc_error(-32002, "Transaction validator signing failed");
        assert!(matches!(err, LedgerError::Rejected(_)));
    }

    #[test]
    fn internal_errors_are_transient() {
        assert!(map_rpc_error(-32603, "Internal error").is_transient());
        assert!(map_rpc_error(-32050, "Server busy").is_transient());
    }

    #[test]
    fn signer_unavailable_is_fatal() {
        let err = map_signer_error(SignerError::Unavailable("sui not on PATH".into()));
        assert!(matches!(err, LedgerError::FatalConfig(_)));
    }
}
