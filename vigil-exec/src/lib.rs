#![deny(missing_docs)]
//! Action execution for vigil.
//!
//! [`LedgerExecutor`] implements
//! [`ActionExecutor`](vigil_core::ActionExecutor) for the arena contract:
//!
//! | Action | Call |
//! |--------|------|
//! | `Respawn` | `create_boss(admin_cap, name, description, skill, difficulty, max_hp, attack_cost)` cloned from the dead object |
//! | `Attack` | `attack_boss(arena, boss, coin(attack_cost), random, clock)` |
//! | `Withdraw` | native transfer |
//! | `Register` | `register_agent(arena, name)`; `AlreadyRegistered` counts as success |
//!
//! [`normalize`] turns raw responses into
//! [`ExecutionOutcome`](vigil_core::ExecutionOutcome)s.

pub mod executor;
pub mod layout;
pub mod normalize;

pub use executor::LedgerExecutor;
pub use layout::ContractLayout;
