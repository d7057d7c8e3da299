//! MockLedger: an in-memory ledger with scriptable responses.

use crate::error::LedgerError;
use crate::event::{Event, EventFilter, EventPage, SortOrder};
use crate::id::{EventId, ObjectId};
use crate::ledger::{Call, Ledger, ObjectSnapshot, TxResponse};
use crate::signer::Signer;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// A transaction the mock received.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Signer address.
    pub signer: String,
    /// Calls in order.
    pub calls: Vec<Call>,
}

/// In-memory ledger.
///
/// Events are kept in emission order. Submissions succeed with a
/// generated digest unless a response has been queued with
/// [`MockLedger::push_response`].
pub struct MockLedger {
    events: Mutex<Vec<Event>>,
    objects: Mutex<HashMap<String, ObjectSnapshot>>,
    balances: Mutex<HashMap<String, u128>>,
    submissions: Mutex<Vec<Submission>>,
    responses: Mutex<VecDeque<Result<TxResponse, LedgerError>>>,
    statuses: Mutex<HashMap<String, TxResponse>>,
    query_errors: Mutex<VecDeque<LedgerError>>,
    delay: Option<Duration>,
}

impl MockLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            objects: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(HashMap::new()),
            query_errors: Mutex::new(VecDeque::new()),
            delay: None,
        }
    }

    /// Sleep before answering any call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Append an emitted event.
    pub fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    /// Insert or replace an object.
    pub fn put_object(&self, id: &str, fields: serde_json::Value) {
        self.objects
            .lock()
            .unwrap()
            .insert(id.to_owned(), ObjectSnapshot::new(id, fields));
    }

    /// Set an address balance in base units.
    pub fn set_balance(&self, address: &str, amount: u128) {
        self.balances.lock().unwrap().insert(address.to_owned(), amount);
    }

    /// Queue the response for the next submission. The submission is
    /// recorded either way, so an [`LedgerError::Unconfirmed`] models a
    /// transaction that was sent and whose reply was lost.
    pub fn push_response(&self, response: Result<TxResponse, LedgerError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Queue a failure for the next event query.
    pub fn push_query_error(&self, err: LedgerError) {
        self.query_errors.lock().unwrap().push_back(err);
    }

    /// Make `transaction_status(digest)` return `response`.
    pub fn set_status(&self, digest: &str, response: TxResponse) {
        self.statuses.lock().unwrap().insert(digest.to_owned(), response);
    }

    /// Submissions received so far.
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn matches(filter: &EventFilter, event: &Event) -> bool {
    let mut prefix = format!("{}::", filter.package);
    if let Some(module) = &filter.module {
        prefix.push_str(module);
        prefix.push_str("::");
    }
    if !event.event_type.starts_with(&prefix) {
        return false;
    }
    filter
        .event_type
        .as_deref()
        .is_none_or(|ty| event.short_type() == ty)
}

#[async_trait]
impl Ledger for MockLedger {
    async fn query_events(
        &self,
        filter: &EventFilter,
        after: Option<&EventId>,
        order: SortOrder,
        limit: usize,
    ) -> Result<EventPage, LedgerError> {
        self.pause().await;
        if let Some(err) = self.query_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        let mut selected: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches(filter, e))
            .cloned()
            .collect();
        if order == SortOrder::Descending {
            selected.reverse();
        }
        let start = match after {
            Some(id) => selected
                .iter()
                .position(|e| &e.id == id)
                .map(|i| i + 1)
                .unwrap_or(0),
            None => 0,
        };
        let remaining = &selected[start.min(selected.len())..];
        let data: Vec<Event> = remaining.iter().take(limit).cloned().collect();
        let next_cursor = data.last().map(|e| e.id.clone()).or_else(|| after.cloned());
        Ok(EventPage {
            has_next_page: remaining.len() > data.len(),
            data,
            next_cursor,
        })
    }

    async fn get_object(&self, id: &ObjectId) -> Result<Option<ObjectSnapshot>, LedgerError> {
        self.pause().await;
        Ok(self.objects.lock().unwrap().get(id.as_str()).cloned())
    }

    async fn get_balance(&self, address: &str) -> Result<u128, LedgerError> {
        self.pause().await;
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or_default())
    }

    async fn submit_transaction(
        &self,
        signer: &dyn Signer,
        calls: &[Call],
    ) -> Result<TxResponse, LedgerError> {
        self.pause().await;
        let n = {
            let mut subs = self.submissions.lock().unwrap();
            subs.push(Submission {
                signer: signer.address().to_owned(),
                calls: calls.to_vec(),
            });
            subs.len()
        };
        let scripted = self.responses.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(TxResponse::new(json!({
                "digest": format!("tx-{n}"),
                "effects": { "status": { "status": "success" } },
                "events": []
            })))
        })
    }

    async fn transaction_status(&self, digest: &str) -> Result<Option<TxResponse>, LedgerError> {
        self.pause().await;
        Ok(self.statuses.lock().unwrap().get(digest).cloned())
    }
}
