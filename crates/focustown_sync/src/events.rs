//! # Store Events
//!
//! Change notifications emitted by the local store.
//!
//! The store never blocks on observers: events go through a bounded
//! crossbeam channel with `try_send`, and are dropped if nobody drains it.
//!
//! ```text
//! LocalStore ──try_send──> [bounded channel] ──receiver()──> UI / tests
//! ```

use focustown_core::RejectReason;

use crate::queue::QueueStatus;

/// Something observable changed in the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// A command was enqueued.
    Enqueued {
        /// Command id.
        id: String,
        /// `Pending` if it applied locally, `Rejected` otherwise.
        status: QueueStatus,
        /// Local rejection reason.
        reason: Option<RejectReason>,
    },

    /// The current state changed.
    StateChanged {
        /// New state version.
        version: u64,
    },

    /// A server snapshot was adopted and pending commands replayed on it.
    Reconciled {
        /// Version after replay.
        version: u64,
        /// Pending commands that applied on the snapshot.
        replayed: usize,
        /// Pending commands that no longer applied and were skipped.
        skipped: usize,
    },

    /// Commands were confirmed and removed from the queue.
    Acked {
        /// Removed ids.
        ids: Vec<String>,
    },

    /// Commands were refused by the server.
    Rejected {
        /// Refused ids.
        ids: Vec<String>,
    },

    /// The store was reset to the starter town.
    Reset,

    /// Writing to the journal failed; in-memory state is unaffected.
    PersistenceFailed {
        /// Rendered error.
        error: String,
    },
}

/// Channel for store events.
/// Uses crossbeam for lock-free communication.
pub struct EventChannel<T> {
    sender: crossbeam_channel::Sender<T>,
    receiver: crossbeam_channel::Receiver<T>,
}

impl<T> EventChannel<T> {
    /// Creates a new bounded event channel.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self { sender, receiver }
    }

    /// Tries to send an event (returns immediately).
    ///
    /// # Errors
    ///
    /// Returns the event back if the channel is full.
    pub fn try_send(&self, event: T) -> Result<(), crossbeam_channel::TrySendError<T>> {
        self.sender.try_send(event)
    }

    /// Gets a clone of the receiver for another thread.
    #[must_use]
    pub fn receiver(&self) -> crossbeam_channel::Receiver<T> {
        self.receiver.clone()
    }
}
