#![deny(missing_docs)]
//! Autonomous agents for vigil.
//!
//! One [`DecisionLoop`] runs one persona described by an [`AgentConfig`].
//! A cycle is triggered by a heartbeat and by every combat event
//! ([`CycleTrigger`]); both paths share the same busy guard, so a cycle
//! requested while another runs is dropped.
//!
//! Decision functions implement [`DecisionFn`](vigil_core::DecisionFn):
//!
//! - [`HeuristicDecision`]: fixed rule, also the fallback for the others
//! - [`ChatDecision`]: OpenAI-compatible chat completion over HTTP

pub mod chat;
pub mod config;
pub mod cycle;
pub mod error;
pub mod heuristic;
pub mod session;
pub mod view;

pub use chat::ChatDecision;
pub use config::{AgentConfig, DEFAULT_DECISION_TIMEOUT, DEFAULT_HEARTBEAT, WithdrawPolicy};
pub use cycle::{COMBAT_EVENT, CycleReport, CycleTrigger, DecisionLoop};
pub use error::AgentError;
pub use heuristic::HeuristicDecision;
pub use session::AgentSession;
pub use view::{LedgerView, TargetTracker, open_target};
