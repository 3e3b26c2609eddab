//! Event emission system.
//!
//! Committed pool changes are pushed from the daemon to subscribers as
//! JSON-RPC notifications. Each subscriber has an independent buffer of
//! `advanced.event_buffer` events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use yousplit_types::events::PoolEvent;
use yousplit_types::Address;

/// An event emitted by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic per-process sequence number.
    pub sequence: u64,
    /// Unix timestamp.
    pub timestamp: u64,
    #[serde(flatten)]
    pub event: PoolEvent,
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Wire `event_type` tags, e.g. `"withdrawn"`. `None` = all.
    #[serde(default)]
    pub event_types: Option<Vec<String>>,
    /// Only events concerning this beneficiary. Pool-wide events
    /// (deposits, onramps) always pass.
    #[serde(default)]
    pub beneficiary: Option<Address>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: PoolEvent) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(sequence, event = event.name(), "event emitted");
        // No subscribers is fine.
        let _ = self.sender.send(Event {
            sequence,
            timestamp: now_secs(),
            event,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref names) = self.event_types {
            if !names.iter().any(|n| n == event.event.name()) {
                return false;
            }
        }

        if let (Some(wanted), Some(concerned)) = (self.beneficiary, event.event.beneficiary()) {
            if wanted != concerned {
                return false;
            }
        }

        true
    }
}

pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
