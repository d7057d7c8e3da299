//! Normalization of heterogeneous transaction responses.
//!
//! Remote API versions disagree on where the execution status lives:
//!
//! | Shape | Status | Error |
//! |-------|--------|-------|
//! | current | `effects.status.status` | `effects.status.error` |
//! | versioned | `effects.V1.status.status` | `effects.V1.status.error` |
//! | flat | `status` | `error` |
//!
//! Status values are `"success"` or `"failure"` in any case.

use serde_json::Value;
use vigil_core::{Confirmation, ExecutionOutcome, TxResponse};

const STATUS_PATHS: [&str; 3] = ["/effects/status", "/effects/V1/status", ""];

/// Execution status found in a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executed {
    /// Committed.
    Success,
    /// Aborted, with the remote error text when given.
    Failure(Option<String>),
}

/// Find the execution status, trying each known shape in turn.
pub fn execution_status(raw: &Value) -> Option<Executed> {
    for path in STATUS_PATHS {
        let Some(node) = raw.pointer(path) else {
            continue;
        };
        let Some(status) = node.get("status").and_then(Value::as_str) else {
            continue;
        };
        let error = node.get("error").and_then(error_text);
        return Some(if status.eq_ignore_ascii_case("success") {
            Executed::Success
        } else {
            Executed::Failure(error)
        });
    }
    None
}

fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Parsed payloads of the emitted events, in emission order, paired with
/// their type.
pub fn emitted_events(raw: &Value) -> Vec<(&str, &Value)> {
    raw.get("events")
        .and_then(Value::as_array)
        .map(|events| {
            events
                .iter()
                .filter_map(|e| {
                    let payload = e.get("parsedJson")?;
                    let ty = e.get("type").and_then(Value::as_str).unwrap_or_default();
                    Some((ty, payload))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The payload of the first event whose type ends in `::<short_type>`,
/// or of the first event at all when `short_type` is `None`.
pub fn effect(raw: &Value, short_type: Option<&str>) -> Option<Value> {
    emitted_events(raw)
        .into_iter()
        .find(|(ty, _)| match short_type {
            Some(short) => ty.rsplit("::").next() == Some(short),
            None => true,
        })
        .map(|(_, payload)| payload.clone())
}

/// Normalize a submission response.
pub fn outcome(resp: &TxResponse, effect_type: Option<&str>) -> ExecutionOutcome {
    let digest = resp.digest().map(str::to_owned);
    match execution_status(&resp.raw) {
        Some(Executed::Success) => {
            ExecutionOutcome::succeeded(digest, effect(&resp.raw, effect_type))
        }
        Some(Executed::Failure(error)) => ExecutionOutcome::failed(
            digest,
            error.unwrap_or_else(|| "transaction failed".to_owned()),
        ),
        None => match digest {
            Some(digest) => ExecutionOutcome::pending(digest),
            None => ExecutionOutcome::failed(None, "response has neither digest nor status"),
        },
    }
}

/// Normalize a status lookup of a pending submission.
pub fn confirmation(resp: Option<&TxResponse>, effect_type: Option<&str>) -> Confirmation {
    let Some(resp) = resp else {
        return Confirmation::Unknown;
    };
    match execution_status(&resp.raw) {
        Some(Executed::Success) => Confirmation::Succeeded(effect(&resp.raw, effect_type)),
        Some(Executed::Failure(error)) => {
            Confirmation::Failed(error.unwrap_or_else(|| "transaction failed".to_owned()))
        }
        None => Confirmation::Unknown,
    }
}
