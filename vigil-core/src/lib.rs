//! # vigil-core: Protocol traits for off-chain ledger event coordination
//!
//! This crate defines the boundaries between the parts of an event
//! coordination process: something that watches an append-only,
//! eventually-consistent ledger for domain events, derives state from
//! them exactly once, and schedules follow-up transactions back onto the
//! ledger.
//!
//! ## The Protocols
//!
//! | Protocol | Trait | What it does |
//! |----------|-------|-------------|
//! | Source | [`EventSource`] | Poll new events since a cursor |
//! | Ledger | [`Ledger`] | Remote reads and transaction submission |
//! | Signer | [`Signer`] | Opaque transaction signing |
//! | Execution | [`ActionExecutor`] | Logical action to normalized outcome |
//! | Decision | [`DecisionFn`] | Pluggable next-action choice |
//! | State | [`StateStore`] | Persistence of cursors and schedules |
//!
//! ## Delivery model
//!
//! The remote feed delivers at least once and in no guaranteed order.
//! Implementations of [`EventSource`] pass duplicates through; the
//! dispatcher (in `vigil-dispatch`) converts the feed into at-most-once
//! handler invocation using [`EventId`] identity.

#![deny(missing_docs)]

pub mod action;
pub mod clock;
pub mod decision;
pub mod duration;
pub mod error;
pub mod event;
pub mod handler;
pub mod id;
pub mod ledger;
pub mod signer;
pub mod source;
pub mod state;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use action::{Action, ActionExecutor, Confirmation, ExecutionOutcome, OutcomeStatus};
pub use clock::{Clock, SystemClock};
pub use decision::{Decision, DecisionAction, DecisionFn, DecisionInput, Target};
pub use duration::DurationMs;
pub use error::{
    DecisionError, ExecError, HandlerError, LedgerError, SignerError, SourceError, StateError,
};
pub use event::{Cursor, Event, EventFilter, EventPage, FetchBatch, SortOrder};
pub use handler::EventHandler;
pub use id::{ActionKey, AgentId, EventId, ObjectId, StreamId};
pub use ledger::{Call, CallArg, Ledger, ObjectSnapshot, TxResponse};
pub use signer::Signer;
pub use source::EventSource;
pub use state::{Scope, StateStore};

/// Base units per whole coin (9 decimal places).
pub const BASE_UNITS_PER_COIN: u64 = 1_000_000_000;

/// Convert base units to whole coin units exactly.
pub fn to_coin_units(base_units: u128) -> rust_decimal::Decimal {
    let capped = i128::try_from(base_units).unwrap_or(i128::MAX);
    rust_decimal::Decimal::try_from_i128_with_scale(capped, 9)
        .unwrap_or(rust_decimal::Decimal::MAX)
}

/// Convert whole coin units to base units, truncating sub-unit dust.
pub fn to_base_units(coins: rust_decimal::Decimal) -> u64 {
    use rust_decimal::prelude::ToPrimitive;
    (coins * rust_decimal::Decimal::from(BASE_UNITS_PER_COIN))
        .trunc()
        .to_u64()
        .unwrap_or_default()
}
