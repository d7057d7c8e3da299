//! An [`EventSource`] over any [`Ledger`].

use async_trait::async_trait;
use std::sync::Arc;
use vigil_core::{
    Cursor, EventFilter, EventId, EventSource, FetchBatch, Ledger, SortOrder, SourceError,
};

/// Default events per remote query.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Default maximum pages read per fetch.
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Polls a [`Ledger`]'s event query, ascending from the cursor position.
///
/// Reads up to `max_pages` pages per fetch so a backlog drains over
/// several ticks instead of one unbounded call. Duplicates and
/// out-of-window events are passed through untouched.
pub struct LedgerSource<L: ?Sized> {
    ledger: Arc<L>,
    page_limit: usize,
    max_pages: usize,
}

impl<L: Ledger + ?Sized> LedgerSource<L> {
    /// Create a source with default paging.
    pub fn new(ledger: Arc<L>) -> Self {
        Self {
            ledger,
            page_limit: DEFAULT_PAGE_LIMIT,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Events requested per page.
    #[must_use]
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    /// Pages read per fetch.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Id of the newest event currently matching `filter`, used to start a
    /// stream at "now" instead of replaying history.
    pub async fn latest_position(&self, filter: &EventFilter) -> Result<Option<EventId>, SourceError> {
        filter.validate()?;
        let page = self
            .ledger
            .query_events(filter, None, SortOrder::Descending, 1)
            .await?;
        Ok(page.data.into_iter().next().map(|e| e.id))
    }
}

#[async_trait]
impl<L: Ledger + ?Sized> EventSource for LedgerSource<L> {
    async fn fetch(&self, filter: &EventFilter, cursor: &Cursor) -> Result<FetchBatch, SourceError> {
        filter.validate()?;
        if self.page_limit == 0 || self.max_pages == 0 {
            return Err(SourceError::FatalConfig(
                "page limit and max pages must be positive".into(),
            ));
        }

        let mut events = Vec::new();
        let mut position = cursor.position.clone();
        for _ in 0..self.max_pages {
            let page = self
                .ledger
                .query_events(filter, position.as_ref(), SortOrder::Ascending, self.page_limit)
                .await?;
            let received = page.data.len();
            events.extend(page.data);
            if let Some(next) = page.next_cursor {
                position = Some(next);
            }
            if !page.has_next_page || received == 0 {
                break;
            }
        }

        tracing::trace!(events = events.len(), "ledger source fetched");
        Ok(FetchBatch {
            events,
            cursor: Cursor {
                position,
                watermark_ms: cursor.watermark_ms,
            },
        })
    }
}
