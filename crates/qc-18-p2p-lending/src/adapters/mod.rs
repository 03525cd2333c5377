//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound port traits: clocks, value transfer, event sinks.

mod bank;
mod clock;
mod event_log;

pub use bank::{InMemoryBank, RecipientHook};
pub use clock::{ManualClock, SystemClock};
pub use event_log::{InMemoryEventLog, TracingEventSink};
