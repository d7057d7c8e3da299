//! The Ledger protocol: reads and writes against the remote chain.

use crate::error::LedgerError;
use crate::event::{EventFilter, EventPage, SortOrder, json_u64};
use crate::id::{EventId, ObjectId};
use crate::signer::Signer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An opaque remote ledger client.
///
/// The trait is transport-agnostic: implementations may speak JSON-RPC,
/// gRPC, or be an in-memory double for tests.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Query emitted events matching `filter`, continuing after `after`.
    async fn query_events(
        &self,
        filter: &EventFilter,
        after: Option<&EventId>,
        order: SortOrder,
        limit: usize,
    ) -> Result<EventPage, LedgerError>;

    /// Current state snapshot of an object. `None` if it does not exist.
    async fn get_object(&self, id: &ObjectId) -> Result<Option<ObjectSnapshot>, LedgerError>;

    /// Total balance of `address` in base units.
    async fn get_balance(&self, address: &str) -> Result<u128, LedgerError>;

    /// Build, sign with `signer`, and submit a transaction made of
    /// `calls` executed in order. Returns the raw remote response.
    ///
    /// A failure after the signed transaction left the process must be
    /// reported as [`LedgerError::Unconfirmed`] with its digest. Any other
    /// error means nothing was sent.
    async fn submit_transaction(
        &self,
        signer: &dyn Signer,
        calls: &[Call],
    ) -> Result<TxResponse, LedgerError>;

    /// Look up a previously submitted transaction by digest. `None` if
    /// the remote does not (yet) know it.
    async fn transaction_status(&self, digest: &str) -> Result<Option<TxResponse>, LedgerError>;
}

/// One step of a transaction.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Call {
    /// Invoke a contract function, `package::module::function`.
    Move {
        /// Fully qualified function name.
        target: String,
        /// Arguments in declaration order.
        args: Vec<CallArg>,
    },
    /// Transfer native coin to an address.
    Transfer {
        /// Receiving address.
        recipient: String,
        /// Amount in base units.
        amount: u64,
    },
}

impl Call {
    /// Shorthand for a contract call.
    pub fn move_call(target: impl Into<String>, args: Vec<CallArg>) -> Self {
        Call::Move {
            target: target.into(),
            args,
        }
    }
}

/// A contract call argument.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CallArg {
    /// A reference to an existing object.
    Object(ObjectId),
    /// A plain value (string, number, bool).
    Pure(serde_json::Value),
    /// A fresh coin of exactly `amount` base units split from the
    /// signer's funds.
    Coin(u64),
}

/// Current state of a ledger object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    /// Object id.
    pub id: ObjectId,
    /// Fully qualified type, when reported.
    pub type_name: Option<String>,
    /// Object fields.
    pub fields: serde_json::Value,
}

impl ObjectSnapshot {
    /// Create a snapshot.
    pub fn new(id: impl Into<ObjectId>, fields: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            type_name: None,
            fields,
        }
    }

    /// A string field.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }

    /// An unsigned integer field (number or decimal string).
    pub fn field_u64(&self, name: &str) -> Option<u64> {
        json_u64(self.fields.get(name)?)
    }

    /// A boolean field.
    pub fn field_bool(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(|v| v.as_bool())
    }
}

/// Raw response of a transaction submission or lookup.
///
/// Different remote API versions nest the execution status under
/// different paths; normalization is the executor's job, so this type
/// keeps the response untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxResponse {
    /// The response body.
    pub raw: serde_json::Value,
}

impl TxResponse {
    /// Wrap a raw response.
    pub fn new(raw: serde_json::Value) -> Self {
        Self { raw }
    }

    /// The transaction digest, when present.
    pub fn digest(&self) -> Option<&str> {
        self.raw.get("digest").and_then(|v| v.as_str())
    }
}
