use chrono::Utc;
use tracing::debug;

use ifl_types::{EventPayload, LedgerEvent};

/// Append-only audit trail of domain events.
///
/// `publish` stamps each payload with a monotonic sequence number and the
/// current wall-clock time. Events are never mutated or deleted; there is
/// no compaction and no size bound — bounding, if any, belongs to the
/// display layer.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
    next_seq: u64,
}

impl EventLog {
    /// Append an event, assigning its sequence number and timestamp.
    /// Returns the assigned sequence number.
    pub fn publish(&mut self, payload: EventPayload) -> u64 {
        self.next_seq += 1;
        let event = LedgerEvent {
            seq: self.next_seq,
            ts: Utc::now(),
            payload,
        };
        debug!(seq = event.seq, kind = %event.kind(), "event published");
        self.events.push(event);
        self.next_seq
    }

    /// The full log in insertion order.
    pub fn all(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// The most recent `n` events, in insertion order.
    pub fn recent(&self, n: usize) -> &[LedgerEvent] {
        let start = self.events.len().saturating_sub(n);
        &self.events[start..]
    }

    /// Iterate newest-first, for "latest activity" displays.
    pub fn latest_first(&self) -> impl Iterator<Item = &LedgerEvent> {
        self.events.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
