//! Event Sink Adapters
//!
//! `InMemoryEventLog` records committed events for inspection;
//! `TracingEventSink` emits them as structured log records.

use crate::events::{LoanEvent, LoanTopic};
use crate::ports::outbound::EventSink;
use parking_lot::RwLock;
use tracing::info;

/// Append-only in-memory event log.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<LoanEvent>>,
}

impl InMemoryEventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<LoanEvent> {
        self.events.read().clone()
    }

    /// Events on a single topic.
    #[must_use]
    pub fn by_topic(&self, topic: LoanTopic) -> Vec<LoanEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.topic() == topic)
            .cloned()
            .collect()
    }

    /// Most recent event.
    #[must_use]
    pub fn last(&self) -> Option<LoanEvent> {
        self.events.read().last().cloned()
    }

    /// Number of events published.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl EventSink for InMemoryEventLog {
    fn publish(&self, event: &LoanEvent) {
        self.events.write().push(event.clone());
    }
}

/// Emits each event as an `info!` record with its JSON payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: &LoanEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        info!(
            topic = event.topic().as_str(),
            loan_id = event.loan_id().get(),
            payload = %payload,
            "[qc-18] Event published"
        );
    }
}
