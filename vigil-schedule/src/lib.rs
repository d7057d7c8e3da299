#![deny(missing_docs)]
//! Delayed action scheduling for vigil.
//!
//! [`Scheduler`] keeps a persistent table of [`ScheduledAction`]s keyed by
//! [`ActionKey`](vigil_core::ActionKey). Each [`tick`](Scheduler::tick)
//! attempts the due entries through an
//! [`ActionExecutor`](vigil_core::ActionExecutor):
//!
//! | Outcome | Entry |
//! |---------|-------|
//! | succeeded | removed |
//! | failed / executor error | kept, `next_retry_at` pushed out by [`Backoff`] |
//! | accepted, status unknown | kept with `awaiting` digest; later ticks confirm instead of resubmitting |
//!
//! [`RespawnTrigger`] is the handler that schedules a respawn per kill.

pub mod backoff;
pub mod entry;
pub mod error;
pub mod scheduler;
pub mod trigger;

pub use backoff::Backoff;
pub use entry::ScheduledAction;
pub use error::ScheduleError;
pub use scheduler::{DEFAULT_CONFIRM_LIMIT, ScheduleReport, Scheduler};
pub use trigger::{COMBAT_EVENT, DEFAULT_RESPAWN_DELAY, RespawnTrigger};
