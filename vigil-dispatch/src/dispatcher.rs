//! The event dispatcher: poll, filter, order, dispatch, advance.

use crate::cursor::CursorStore;
use crate::error::DispatchError;
use crate::registry::HandlerRegistry;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tokio::sync::Mutex;
use vigil_core::{
    Clock, Cursor, DurationMs, Event, EventFilter, EventSource, SourceError, StateStore, StreamId,
    SystemClock,
};

/// Default dedup capacity.
pub const DEFAULT_DEDUP_CAPACITY: usize = 1024;

/// Default deadline for one fetch.
pub const DEFAULT_FETCH_TIMEOUT: DurationMs = DurationMs::from_secs(15);

/// Default tolerance for events older than the watermark.
pub const DEFAULT_LATE_WINDOW: DurationMs = DurationMs::from_secs(60);

/// Static configuration of one dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Name of the stream; scopes the persisted cursor.
    pub stream: StreamId,
    /// Which events to fetch.
    pub filter: EventFilter,
    /// Dedup set capacity. Must be positive.
    pub dedup_capacity: usize,
    /// Deadline for one fetch; a timeout counts as a transient failure.
    pub fetch_timeout: DurationMs,
    /// Events older than `watermark - late_window` are dropped as stale.
    pub late_window: DurationMs,
    /// Cursor used when nothing has been persisted for the stream.
    pub start: Cursor,
}

impl DispatcherConfig {
    /// Configuration with default limits, starting from the beginning.
    pub fn new(stream: impl Into<StreamId>, filter: EventFilter) -> Self {
        Self {
            stream: stream.into(),
            filter,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            late_window: DEFAULT_LATE_WINDOW,
            start: Cursor::default(),
        }
    }

    fn validate(&self) -> Result<(), DispatchError> {
        if self.dedup_capacity == 0 {
            return Err(DispatchError::Config("dedup capacity must be positive".into()));
        }
        if self.fetch_timeout.is_zero() {
            return Err(DispatchError::Config("fetch timeout must be positive".into()));
        }
        self.filter.validate()?;
        Ok(())
    }
}

/// Where a dispatcher is in its tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Between ticks.
    Idle,
    /// Waiting on the source.
    Polling,
    /// Running handlers.
    Dispatching,
}

impl DispatchState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => DispatchState::Polling,
            2 => DispatchState::Dispatching,
            _ => DispatchState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            DispatchState::Idle => 0,
            DispatchState::Polling => 1,
            DispatchState::Dispatching => 2,
        }
    }
}

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// True when the tick was dropped because another was in flight.
    pub skipped: bool,
    /// Events returned by the source.
    pub fetched: usize,
    /// Events already in the dedup set (or repeated within the batch).
    pub duplicates: usize,
    /// Events older than the late window.
    pub stale: usize,
    /// Events handed to the handler registry.
    pub dispatched: usize,
    /// Handler invocations that returned an error.
    pub handler_failures: usize,
    /// Whether the persisted cursor moved.
    pub advanced: bool,
}

/// Polls one stream and routes each new event to its handlers once.
///
/// Each [`tick`](Dispatcher::tick):
/// 1. fetches events after the cursor (with a deadline),
/// 2. drops ids already seen and events older than the late window,
/// 3. sorts the rest by `(timestamp, id)`,
/// 4. marks each seen, then runs its handlers,
/// 5. persists the dedup set and advances the cursor.
///
/// A failed fetch changes nothing. Overlapping ticks are dropped.
pub struct Dispatcher {
    config: DispatcherConfig,
    source: Arc<dyn EventSource>,
    handlers: HandlerRegistry,
    cursors: Mutex<CursorStore>,
    clock: Arc<dyn Clock>,
    state: AtomicU8,
    in_flight: AtomicBool,
}

impl Dispatcher {
    /// Validate the configuration and load the stream's cursor.
    pub async fn open(
        config: DispatcherConfig,
        source: Arc<dyn EventSource>,
        handlers: HandlerRegistry,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, DispatchError> {
        config.validate()?;
        let cursors = CursorStore::load(
            config.stream.clone(),
            store,
            config.dedup_capacity,
            config.start.clone(),
        )
        .await?;
        Ok(Self {
            config,
            source,
            handlers,
            cursors: Mutex::new(cursors),
            clock: Arc::new(SystemClock),
            state: AtomicU8::new(DispatchState::Idle.as_u8()),
            in_flight: AtomicBool::new(false),
        })
    }

    /// Use `clock` for dedup timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The stream name.
    pub fn stream(&self) -> &StreamId {
        &self.config.stream
    }

    /// Current phase.
    pub fn state(&self) -> DispatchState {
        DispatchState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// The persisted cursor.
    pub async fn cursor(&self) -> Cursor {
        self.cursors.lock().await.cursor().clone()
    }

    fn set_state(&self, state: DispatchState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Run one poll-and-dispatch cycle.
    ///
    /// Transient fetch failures come back as non-fatal errors with the
    /// cursor untouched; check [`DispatchError::is_fatal`] to decide
    /// whether to keep ticking.
    pub async fn tick(&self) -> Result<TickReport, DispatchError> {
        let Some(_guard) = TickGuard::acquire(self) else {
            tracing::debug!(stream = %self.config.stream, "tick still in flight, skipping");
            return Ok(TickReport {
                skipped: true,
                ..TickReport::default()
            });
        };
        let mut cursors = self.cursors.lock().await;
        let cursor = cursors.cursor().clone();

        self.set_state(DispatchState::Polling);
        let deadline = self.config.fetch_timeout;
        let batch = match tokio::time::timeout(
            deadline.to_std(),
            self.source.fetch(&self.config.filter, &cursor),
        )
        .await
        {
            Ok(Ok(batch)) => batch,
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => {
                return Err(SourceError::Transient(format!("fetch timed out after {deadline}")).into());
            }
        };

        let mut report = TickReport {
            fetched: batch.events.len(),
            ..TickReport::default()
        };
        let floor = cursor
            .watermark_ms
            .saturating_sub(self.config.late_window.as_millis());
        let mut in_batch = HashSet::new();
        let mut fresh: Vec<Event> = Vec::with_capacity(batch.events.len());
        for event in batch.events {
            if cursors.has_seen(&event.id) || !in_batch.insert(event.id.clone()) {
                report.duplicates += 1;
                continue;
            }
            if event.timestamp_ms < floor {
                tracing::debug!(
                    stream = %self.config.stream,
                    event_id = %event.id,
                    timestamp_ms = event.timestamp_ms,
                    watermark_ms = cursor.watermark_ms,
                    "dropping out-of-window event"
                );
                report.stale += 1;
                continue;
            }
            fresh.push(event);
        }
        fresh.sort_by(|a, b| {
            a.timestamp_ms
                .cmp(&b.timestamp_ms)
                .then_with(|| a.id.cmp(&b.id))
        });

        self.set_state(DispatchState::Dispatching);
        let mut watermark = cursor.watermark_ms;
        for event in &fresh {
            cursors.mark_seen(event.id.clone(), self.clock.now_ms());
            let routed = self.handlers.dispatch(event).await;
            report.dispatched += 1;
            report.handler_failures += routed.failed;
            watermark = watermark.max(event.timestamp_ms);
            tracing::debug!(
                stream = %self.config.stream,
                event_id = %event.id,
                event_type = event.short_type(),
                handlers = routed.invoked,
                "event dispatched"
            );
        }

        let next = Cursor {
            position: batch.cursor.position.or(cursor.position),
            watermark_ms: watermark,
        };
        report.advanced = cursors.advance(next).await?;

        if report.dispatched > 0 || report.stale > 0 {
            tracing::info!(
                stream = %self.config.stream,
                fetched = report.fetched,
                dispatched = report.dispatched,
                duplicates = report.duplicates,
                stale = report.stale,
                handler_failures = report.handler_failures,
                watermark_ms = cursors.cursor().watermark_ms,
                "dispatch tick"
            );
        }
        Ok(report)
    }
}

/// Holds the in-flight flag for one tick and resets the phase on drop,
/// including on early return.
struct TickGuard<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> TickGuard<'a> {
    fn acquire(dispatcher: &'a Dispatcher) -> Option<Self> {
        dispatcher
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { dispatcher })
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.dispatcher.set_state(DispatchState::Idle);
        self.dispatcher.in_flight.store(false, Ordering::SeqCst);
    }
}
