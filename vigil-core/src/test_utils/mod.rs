//! In-memory implementations for testing.
//!
//! Available behind the `test-utils` feature flag. These are minimal
//! implementations that make the protocol traits scriptable in tests.

mod in_memory_store;
mod manual_clock;
mod mock_ledger;
mod recording_handler;
mod scripted_decision;
mod scripted_executor;
mod scripted_source;
mod static_signer;

pub use in_memory_store::InMemoryStore;
pub use manual_clock::ManualClock;
pub use mock_ledger::{MockLedger, Submission};
pub use recording_handler::RecordingHandler;
pub use scripted_decision::ScriptedDecision;
pub use scripted_executor::ScriptedExecutor;
pub use scripted_source::ScriptedSource;
pub use static_signer::StaticSigner;

use crate::event::Event;
use crate::id::EventId;

/// Build a fully qualified test event.
pub fn event(digest: &str, seq: u64, short_type: &str, ts: u64, payload: serde_json::Value) -> Event {
    Event::new(
        EventId::new(digest, seq),
        format!("0xpkg::boss_battle::{short_type}"),
        ts,
        payload,
    )
}
