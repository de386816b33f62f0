//! Contest Notifications
//!
//! Emitted once per successful contest. Delivery is fire-and-forget: the
//! engine never waits on or retries a sink.

use std::sync::Mutex;

use serde::{Serialize, Deserialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::core::account::{AccountId, Balance, Timestamp};

/// A transfer was contested successfully.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestStarted {
    /// Paying account (now locked).
    pub from: AccountId,
    /// Receiving account.
    pub to: AccountId,
    /// Amount moved.
    pub value: Balance,
    /// Window start.
    pub t0: Timestamp,
    /// Window end.
    pub t1: Timestamp,
}

/// Receiver of contest notifications.
pub trait NotificationSink {
    /// Deliver an event. Must not block.
    fn notify(&self, event: &ContestStarted);
}

/// Discards all events.
impl NotificationSink for () {
    fn notify(&self, _event: &ContestStarted) {}
}

/// Fans events out over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<ContestStarted>,
}

impl BroadcastSink {
    /// Create a sink with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ContestStarted> {
        self.tx.subscribe()
    }
}

impl NotificationSink for BroadcastSink {
    fn notify(&self, event: &ContestStarted) {
        // No subscribers is not an error.
        if self.tx.send(*event).is_err() {
            trace!("ContestStarted for {} had no subscribers", event.from.short());
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ContestStarted>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<ContestStarted> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: &ContestStarted) {
        match self.events.lock() {
            Ok(mut events) => events.push(*event),
            Err(poisoned) => poisoned.into_inner().push(*event),
        }
    }
}

impl<S: NotificationSink + ?Sized> NotificationSink for std::sync::Arc<S> {
    fn notify(&self, event: &ContestStarted) {
        (**self).notify(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> ContestStarted {
        ContestStarted {
            from: AccountId::new([1; 20]),
            to: AccountId::new([2; 20]),
            value: 10,
            t0: 100,
            t1: 220,
        }
    }

    #[test]
    fn test_broadcast_delivers_to_subscribers() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();

        sink.notify(&event());
        assert_eq!(rx.try_recv().unwrap(), event());
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let sink = BroadcastSink::new(8);
        sink.notify(&event());
    }

    #[test]
    fn test_recording_sink() {
        let sink = std::sync::Arc::new(RecordingSink::new());
        sink.notify(&event());
        sink.notify(&event());

        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_event_json_uses_hex_accounts() {
        let json = serde_json::to_string(&event()).unwrap();
        assert!(json.contains(&AccountId::new([1; 20]).to_string()));
    }
}
