//! # Sync Service
//!
//! Pushes pending commands to a [`ServerAdapter`] and folds the answer back
//! into the [`LocalStore`].
//!
//! ## One Sync Round
//!
//! ```text
//! pending ──push──> server
//!                     │
//!        acked ───────┤──> dropped from the queue
//!        rejected ────┤──> marked rejected (state kept)
//!        unanswered ──┤──> retry_count + 1
//!        new_state ───┘──> set_authoritative_state (replay the rest)
//! ```
//!
//! Queue updates land before the snapshot, so acknowledged commands are not
//! replayed on a state that already contains them. With nothing pending the
//! round is a plain fetch. A failed call leaves queue and state untouched.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use focustown_core::{
    now_millis, ApplyMessage, Command, CommandFactory, RejectReason, Timestamp, TownState,
};

use crate::adapter::ServerAdapter;
use crate::error::{SyncError, SyncResult};
use crate::queue::QueuedCommand;
use crate::store::{LocalStore, ReconcileReport};

/// Where the service stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncStatus {
    /// No sync running; the last one succeeded or none ran yet.
    #[default]
    Idle,
    /// A sync is in flight.
    Syncing,
    /// The last sync failed.
    Error,
}

/// What one [`SyncService::sync_now`] call did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Commands sent.
    pub pushed: usize,
    /// Commands the server applied.
    pub acked: usize,
    /// Commands the server refused.
    pub rejected: usize,
    /// Replay result, when the server sent a state.
    pub report: Option<ReconcileReport>,
}

/// Clears the in-flight flag when a sync ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Client-side sync driver.
pub struct SyncService<A: ServerAdapter> {
    store: Arc<LocalStore>,
    adapter: A,
    commands: CommandFactory,
    clock: fn() -> Timestamp,
    in_flight: AtomicBool,
    status: Mutex<SyncStatus>,
    last_synced_at: Mutex<Option<Timestamp>>,
}

impl<A: ServerAdapter> std::fmt::Debug for SyncService<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("store", &self.store)
            .field("status", &*self.status.lock())
            .field("last_synced_at", &*self.last_synced_at.lock())
            .finish_non_exhaustive()
    }
}

impl<A: ServerAdapter> SyncService<A> {
    /// Drives `store` against `adapter`.
    pub fn new(store: Arc<LocalStore>, adapter: A) -> Self {
        Self::with_clock(store, adapter, now_millis)
    }

    /// Like [`SyncService::new`]; `clock` stamps commands and sync times.
    pub fn with_clock(store: Arc<LocalStore>, adapter: A, clock: fn() -> Timestamp) -> Self {
        Self {
            store,
            adapter,
            commands: CommandFactory::with_clock(clock),
            clock,
            in_flight: AtomicBool::new(false),
            status: Mutex::new(SyncStatus::Idle),
            last_synced_at: Mutex::new(None),
        }
    }

    /// The local store.
    #[must_use]
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// The server adapter.
    #[must_use]
    pub const fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Command constructors stamped with this service's clock.
    #[must_use]
    pub const fn commands(&self) -> &CommandFactory {
        &self.commands
    }

    /// Copy of the current town.
    #[must_use]
    pub fn town(&self) -> TownState {
        self.store.town()
    }

    /// Copy of the queue.
    #[must_use]
    pub fn queue(&self) -> Vec<QueuedCommand> {
        self.store.queue()
    }

    /// Applies and queues a command. See [`LocalStore::enqueue`].
    ///
    /// # Errors
    ///
    /// Returns the local rejection reason.
    pub fn enqueue(&self, command: Command) -> Result<Option<ApplyMessage>, RejectReason> {
        self.store.enqueue(command)
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        *self.status.lock()
    }

    /// When the last successful sync finished.
    #[must_use]
    pub fn last_synced_at(&self) -> Option<Timestamp> {
        *self.last_synced_at.lock()
    }

    fn set_status(&self, status: SyncStatus) {
        *self.status.lock() = status;
    }

    fn fail(&self, err: SyncError) -> SyncError {
        tracing::error!(error = %err, "sync failed");
        self.set_status(SyncStatus::Error);
        err
    }

    /// Loads the authoritative state and replays anything still pending.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadySyncing`] while a sync runs, or the adapter
    /// error.
    pub async fn bootstrap(&self) -> SyncResult<ReconcileReport> {
        let _guard = InFlight::acquire(&self.in_flight).ok_or(SyncError::AlreadySyncing)?;
        self.set_status(SyncStatus::Syncing);

        let snapshot = self.adapter.fetch_state().await.map_err(|e| self.fail(e))?;
        let report = self.store.set_authoritative_state(snapshot);

        *self.last_synced_at.lock() = Some((self.clock)());
        self.set_status(SyncStatus::Idle);
        tracing::info!(version = report.version, "bootstrapped from server");
        Ok(report)
    }

    /// Runs one sync round.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadySyncing`] while another round runs, or the
    /// adapter error. On error nothing local changes.
    pub async fn sync_now(&self) -> SyncResult<SyncSummary> {
        let _guard = InFlight::acquire(&self.in_flight).ok_or(SyncError::AlreadySyncing)?;
        self.set_status(SyncStatus::Syncing);

        let pending = self.store.pending_commands();
        tracing::info!(pending = pending.len(), "sync started");

        let mut summary = SyncSummary {
            pushed: pending.len(),
            ..SyncSummary::default()
        };

        if pending.is_empty() {
            let snapshot = self.adapter.fetch_state().await.map_err(|e| self.fail(e))?;
            summary.report = Some(self.store.set_authoritative_state(snapshot));
        } else {
            let outcome = self
                .adapter
                .push_commands(&pending)
                .await
                .map_err(|e| self.fail(e))?;

            summary.acked = self.store.mark_acked(&outcome.acked);
            summary.rejected = self.store.mark_rejected(&outcome.rejected);

            let answered: HashSet<&str> = outcome
                .acked
                .iter()
                .map(String::as_str)
                .chain(outcome.rejected.iter().map(|r| r.id.as_str()))
                .collect();
            let unanswered: Vec<String> = pending
                .iter()
                .filter(|c| !answered.contains(c.id.as_str()))
                .map(|c| c.id.clone())
                .collect();
            self.store.bump_retries(&unanswered);

            if let Some(snapshot) = outcome.new_state {
                summary.report = Some(self.store.set_authoritative_state(snapshot));
            }
        }

        *self.last_synced_at.lock() = Some((self.clock)());
        self.set_status(SyncStatus::Idle);
        tracing::info!(
            pushed = summary.pushed,
            acked = summary.acked,
            rejected = summary.rejected,
            "sync finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::InProcessServer;

    fn clock() -> Timestamp {
        5_000
    }

    fn service() -> SyncService<InProcessServer> {
        SyncService::with_clock(
            LocalStore::with_clock(clock).shared(),
            InProcessServer::new(TownState::initial(0)),
            clock,
        )
    }

    #[tokio::test]
    async fn test_empty_queue_fetches() {
        let service = service();
        let mut remote = TownState::initial(0);
        remote.version = 9;
        service.adapter().set_snapshot(remote.clone());

        let summary = service.sync_now().await.unwrap();
        assert_eq!(summary.pushed, 0);
        assert_eq!(summary.report.map(|r| r.version), Some(9));
        assert_eq!(service.town(), remote);
        assert_eq!(service.status(), SyncStatus::Idle);
        assert_eq!(service.last_synced_at(), Some(5_000));
    }

    #[tokio::test]
    async fn test_failure_sets_error_status() {
        let service = service();
        let claim = service.commands().claim_production("farm-1");
        service.enqueue(claim).unwrap();
        let before = service.town();

        service.adapter().set_offline(true);
        assert!(matches!(service.sync_now().await, Err(SyncError::Adapter(_))));
        assert_eq!(service.status(), SyncStatus::Error);
        assert_eq!(service.last_synced_at(), None);
        assert_eq!(service.town(), before);
        assert_eq!(service.queue()[0].retry_count, 0);

        // The guard is released after a failure.
        service.adapter().set_offline(false);
        assert_eq!(service.sync_now().await.unwrap().acked, 1);
        assert_eq!(service.status(), SyncStatus::Idle);
    }

    #[test]
    fn test_in_flight_guard() {
        let flag = AtomicBool::new(false);
        let first = InFlight::acquire(&flag);
        assert!(first.is_some());
        assert!(InFlight::acquire(&flag).is_none());
        drop(first);
        assert!(InFlight::acquire(&flag).is_some());
    }
}
