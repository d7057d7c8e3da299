//! Minimal JSON-RPC 2.0 transport over HTTP.

use crate::error::{map_http_status, map_reqwest_error, map_rpc_error};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use vigil_core::{DurationMs, LedgerError};

/// A JSON-RPC error returned by the node, before classification.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RpcFault {
    pub(crate) code: i64,
    pub(crate) message: String,
}

impl RpcFault {
    pub(crate) fn into_ledger_error(self) -> LedgerError {
        map_rpc_error(self.code, &self.message)
    }
}

/// Outcome of one call: a result, an RPC-level fault, or a transport error.
pub(crate) type RpcResult = Result<Result<Value, RpcFault>, LedgerError>;

pub(crate) struct RpcTransport {
    url: String,
    client: reqwest::Client,
    timeout: DurationMs,
    next_id: AtomicU64,
}

impl RpcTransport {
    pub(crate) fn new(url: String, client: reqwest::Client, timeout: DurationMs) -> Self {
        Self {
            url,
            client,
            timeout,
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    /// Call `method`, keeping RPC faults separate so callers can treat
    /// some of them as data (for example "transaction not found").
    pub(crate) async fn call_raw(&self, method: &str, params: Value) -> RpcResult {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(url = %self.url, method, id, "rpc call");

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout.to_std())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;
        if !status.is_success() {
            return Err(map_http_status(status, &text));
        }

        let mut envelope: Value = serde_json::from_str(&text)
            .map_err(|e| LedgerError::Decode(format!("invalid JSON-RPC response: {e}")))?;
        Ok(split_envelope(&mut envelope))
    }

    /// Call `method` and classify any RPC fault as a [`LedgerError`].
    pub(crate) async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        self.call_raw(method, params)
            .await?
            .map_err(RpcFault::into_ledger_error)
    }
}

fn split_envelope(envelope: &mut Value) -> Result<Value, RpcFault> {
    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        return Err(RpcFault {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(-32603),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown rpc error")
                .to_owned(),
        });
    }
    Ok(envelope
        .get_mut("result")
        .map(Value::take)
        .unwrap_or(Value::Null))
}
