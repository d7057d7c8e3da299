#![deny(missing_docs)]
//! The vigil process: configuration, logging, tick loops and the wiring
//! of the indexer, the respawn oracle and the agents.
//!
//! The `vigil` binary is a thin CLI over [`Runtime`]. Everything it builds
//! is also reachable here so processes can be assembled over other ledgers
//! and signers, which is how the tests run them.

pub mod combat_log;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod tick;

pub use combat_log::CombatLog;
pub use config::{StartFrom, VigilConfig};
pub use error::VigilError;
pub use logging::init_tracing;
pub use runtime::{Mode, Oracle, Runtime, Services};
pub use tick::{LoopExit, LoopHandle, TickLoop};
