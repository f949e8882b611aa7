//! Notifications emitted on successful ledger writes.
//!
//! Every write operation emits zero or more [`LedgerEvent`]s to the sinks
//! registered on the ledger, strictly after its transaction commits. A
//! failed write emits nothing. Sinks are consumed by external observers
//! (indexers, UIs); the core only defines the seam and a buffering
//! implementation used by tests and the CLI.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::hash::{self, Hash};

/// A notification emitted by a successful write operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// An owner created its first genesis branch.
    OwnerRegistered {
        /// The newly registered owner identity.
        owner: String,
    },

    /// A branch was allocated (genesis or fork).
    BranchCreated {
        /// The id assigned to the new branch.
        branch_id: u64,
        /// The branch owner.
        owner: String,
        /// True for a genesis branch, false for a fork.
        is_genesis: bool,
    },

    /// A block was written (branch root or append).
    BlockCreated {
        /// The branch the block belongs to.
        branch_id: u64,
        /// The branch owner.
        owner: String,
        /// The caller-supplied content hash of the block.
        #[serde(serialize_with = "hash::serialize_hex")]
        content_hash: Hash,
        /// The hash this block chains after (zero for a genesis root).
        #[serde(serialize_with = "hash::serialize_hex")]
        prev_hash: Hash,
    },
}

/// Observer seam for ledger notifications.
///
/// Implementations must not assume delivery order across ledgers, but
/// events from a single ledger arrive in emission order.
pub trait EventSink: Send + Sync {
    /// Receives one emitted event.
    fn emit(&self, event: &LedgerEvent);
}

/// An [`EventSink`] that buffers events in memory.
///
/// Used by tests to assert on the notification contract and by the CLI to
/// echo events after each write.
#[derive(Debug, Default)]
pub struct EventBuffer {
    inner: Mutex<Vec<LedgerEvent>>,
}

impl EventBuffer {
    /// Creates a new shared buffer.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a copy of all buffered events in emission order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LedgerEvent> {
        self.inner.lock().unwrap().clone()
    }

    /// Removes and returns all buffered events.
    #[must_use]
    pub fn drain(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut *self.inner.lock().unwrap())
    }

    /// Number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// True if no events are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for EventBuffer {
    fn emit(&self, event: &LedgerEvent) {
        self.inner.lock().unwrap().push(event.clone());
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_buffer_preserves_order() {
        let buffer = EventBuffer::shared();

        buffer.emit(&LedgerEvent::OwnerRegistered {
            owner: "alice".to_string(),
        });
        buffer.emit(&LedgerEvent::BranchCreated {
            branch_id: 0,
            owner: "alice".to_string(),
            is_genesis: true,
        });

        let events = buffer.snapshot();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], LedgerEvent::OwnerRegistered { .. }));
        assert!(matches!(
            events[1],
            LedgerEvent::BranchCreated {
                branch_id: 0,
                is_genesis: true,
                ..
            }
        ));
    }

    #[test]
    fn test_buffer_drain_empties() {
        let buffer = EventBuffer::shared();
        buffer.emit(&LedgerEvent::OwnerRegistered {
            owner: "alice".to_string(),
        });

        let drained = buffer.drain();
        assert_eq!(drained.len(), 1);
        assert!(buffer.is_empty());
    }
}
