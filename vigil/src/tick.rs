//! Periodic loops with cooperative shutdown.

use crate::error::VigilError;
use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use vigil_core::DurationMs;

/// Why a loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// [`LoopHandle::stop`] was called.
    Stopped,
    /// A tick returned a fatal error, or the task panicked.
    Halted(String),
}

/// A named loop that runs a tick on a fixed interval.
///
/// Ticks never overlap: a slow tick delays the next one and missed
/// instants are skipped rather than replayed in a burst. A non-fatal tick
/// error is logged and the loop continues; a fatal one halts it.
pub struct TickLoop {
    name: String,
    interval: DurationMs,
}

impl TickLoop {
    /// A loop named `name` ticking every `interval`.
    pub fn new(name: impl Into<String>, interval: DurationMs) -> Self {
        Self {
            name: name.into(),
            interval,
        }
    }

    /// Start the loop on the current runtime. The first tick runs
    /// immediately.
    pub fn spawn<F, Fut>(self, mut tick: F) -> LoopHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), VigilError>> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let name = self.name.clone();
        let period = self.interval.to_std();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(loop_name = %name, interval_ms = period.as_millis() as u64, "loop started");
            loop {
                tokio::select! {
                    biased;
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            tracing::info!(loop_name = %name, "loop stopped");
                            return LoopExit::Stopped;
                        }
                    }
                    _ = ticker.tick() => {
                        match tick().await {
                            Ok(()) => {}
                            Err(err) if err.is_fatal() => {
                                tracing::error!(loop_name = %name, error = %err, "loop halted");
                                return LoopExit::Halted(err.to_string());
                            }
                            Err(err) => {
                                tracing::warn!(loop_name = %name, error = %err, "tick failed");
                            }
                        }
                    }
                }
            }
        });

        LoopHandle {
            name: self.name,
            stop: stop_tx,
            task,
        }
    }
}

/// Handle to a running [`TickLoop`]. Dropping it stops the loop.
pub struct LoopHandle {
    name: String,
    stop: watch::Sender<bool>,
    task: JoinHandle<LoopExit>,
}

impl LoopHandle {
    /// The loop name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the loop task has ended on its own.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Request shutdown and wait for the current tick to finish.
    pub async fn stop(self) -> LoopExit {
        self.stop.send_replace(true);
        match self.task.await {
            Ok(exit) => exit,
            Err(err) => LoopExit::Halted(format!("loop task failed: {err}")),
        }
    }
}
