#![deny(missing_docs)]
//! Sui bindings for vigil.
//!
//! - [`SuiClient`]: a [`Ledger`](vigil_core::Ledger) over the Sui JSON-RPC API
//! - [`KeytoolSigner`]: a [`Signer`](vigil_core::Signer) backed by `sui keytool`
//!
//! The [`wire`] module holds the pure conversions between vigil types and
//! the node's JSON shapes.

pub mod client;
pub mod error;
pub mod keytool;
mod rpc;
pub mod wire;

pub use client::{DEFAULT_CALL_TIMEOUT, DEFAULT_GAS_BUDGET, SuiClient};
pub use error::map_rpc_error;
pub use keytool::{KeytoolSigner, signature_scheme};
