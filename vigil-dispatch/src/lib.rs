#![deny(missing_docs)]
//! Exactly-once event dispatch for vigil.
//!
//! The remote feed delivers at least once, may reorder across pages, and
//! may return events from before the cursor. This crate turns it into
//! at-most-once handler invocation per event id:
//!
//! - [`LedgerSource`] wraps a [`Ledger`](vigil_core::Ledger) query as an
//!   [`EventSource`](vigil_core::EventSource).
//! - [`CursorStore`] keeps the per-stream [`Cursor`](vigil_core::Cursor)
//!   and a bounded [`DedupSet`], persisted through a
//!   [`StateStore`](vigil_core::StateStore).
//! - [`HandlerRegistry`] routes events by short type name.
//! - [`Dispatcher`] ties them together, one tick at a time.
//!
//! Handlers must still be idempotent: a crash between running a handler
//! and persisting the cursor redelivers that event after restart.

pub mod cursor;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod seen;
pub mod source;

pub use cursor::CursorStore;
pub use dispatcher::{
    DEFAULT_DEDUP_CAPACITY, DEFAULT_FETCH_TIMEOUT, DEFAULT_LATE_WINDOW, DispatchState, Dispatcher,
    DispatcherConfig, TickReport,
};
pub use error::DispatchError;
pub use registry::{HandlerRegistry, Routed};
pub use seen::{DedupSet, SeenEntry};
pub use source::{DEFAULT_MAX_PAGES, DEFAULT_PAGE_LIMIT, LedgerSource};
