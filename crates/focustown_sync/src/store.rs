//! # Local Store
//!
//! The client's current town and its pending-command queue.
//!
//! ## How It Works
//!
//! 1. A command is applied locally the moment it is enqueued
//! 2. It waits in the queue as `pending` until the server answers
//! 3. When an authoritative snapshot arrives it replaces the local state and
//!    every still-pending command is replayed on top of it
//!
//! ```text
//! Queue:     [c1] [c2] [c3] [c4]
//!              │    │
//! Server:    ack  ack
//!              │    │
//! Reconcile: drop c1, c2 ── snapshot S ── replay c3, c4 on S
//! ```
//!
//! A pending command that no longer applies on the snapshot is skipped: the
//! state moves on without it but the entry stays `pending` until the server
//! resolves it. [`ReconcileReport::skipped`] lists those entries.
//!
//! Every command is applied at its own `client_created_at`, so a replay
//! reproduces the enqueue-time outcome whenever the base state allows it.

use std::sync::Arc;

use parking_lot::Mutex;

use focustown_core::{
    apply_command, now_millis, ApplyMessage, Command, RejectReason, Timestamp, TownState,
};

use crate::config::SyncConfig;
use crate::error::{JournalError, SyncResult};
use crate::events::{EventChannel, StoreEvent};
use crate::journal::{EconomyEntry, Journal};
use crate::queue::{CommandQueue, QueueStatus, QueuedCommand, Rejection};

/// A pending command that did not apply during replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedReplay {
    /// Command id.
    pub id: String,
    /// Why it did not apply.
    pub reason: RejectReason,
}

/// Result of adopting an authoritative snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Version after replay.
    pub version: u64,
    /// Number of pending commands that applied.
    pub replayed: usize,
    /// Pending commands that no longer applied, in queue order.
    pub skipped: Vec<SkippedReplay>,
}

struct StoreInner {
    town: TownState,
    queue: CommandQueue,
    journal: Option<Journal>,
}

/// Owner of the current town and the command queue.
///
/// All mutation goes through `&self` methods; the store is shared as
/// `Arc<LocalStore>`.
pub struct LocalStore {
    inner: Mutex<StoreInner>,
    events: EventChannel<StoreEvent>,
    clock: fn() -> Timestamp,
    checkpoint_every: u32,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LocalStore")
            .field("version", &inner.town.version)
            .field("queued", &inner.queue.len())
            .field("journal", &inner.journal.as_ref().map(Journal::path))
            .finish_non_exhaustive()
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore {
    /// An in-memory store holding the starter town.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(now_millis)
    }

    /// An in-memory store using `clock` for fresh towns and journal stamps.
    #[must_use]
    pub fn with_clock(clock: fn() -> Timestamp) -> Self {
        let defaults = SyncConfig::default();
        Self {
            inner: Mutex::new(StoreInner {
                town: TownState::initial(clock()),
                queue: CommandQueue::new(),
                journal: None,
            }),
            events: EventChannel::new(defaults.event_capacity),
            clock,
            checkpoint_every: defaults.checkpoint_every,
        }
    }

    /// Opens a store as described by `config`, restoring from its journal.
    ///
    /// # Errors
    ///
    /// Fails if the journal cannot be opened or recovered.
    pub fn open(config: &SyncConfig) -> SyncResult<Self> {
        Self::open_with_clock(config, now_millis)
    }

    /// Like [`LocalStore::open`], with a custom clock.
    ///
    /// # Errors
    ///
    /// Fails if the journal cannot be opened or recovered.
    pub fn open_with_clock(config: &SyncConfig, clock: fn() -> Timestamp) -> SyncResult<Self> {
        let mut town = TownState::initial(clock());
        let mut queue = CommandQueue::new();
        let mut journal = None;

        if let Some(path) = &config.journal_path {
            let (opened, recovered) = Journal::open(path)?;
            if let Some(row) = recovered.snapshot {
                town = row.town;
            }
            queue = CommandQueue::from_entries(recovered.queue);
            tracing::info!(
                version = town.version,
                pending = queue.pending_count(),
                sessions = recovered.sessions.len(),
                economy = recovered.economy.len(),
                "store restored"
            );
            journal = Some(opened);
        }

        Ok(Self {
            inner: Mutex::new(StoreInner {
                town,
                queue,
                journal,
            }),
            events: EventChannel::new(config.event_capacity),
            clock,
            checkpoint_every: config.checkpoint_every,
        })
    }

    /// Wraps the store for sharing.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Copy of the current town.
    #[must_use]
    pub fn town(&self) -> TownState {
        self.inner.lock().town.clone()
    }

    /// Current state version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.lock().town.version
    }

    /// Copy of the queue, in enqueue order.
    #[must_use]
    pub fn queue(&self) -> Vec<QueuedCommand> {
        self.inner.lock().queue.entries().to_vec()
    }

    /// Pending commands, in enqueue order.
    #[must_use]
    pub fn pending_commands(&self) -> Vec<Command> {
        self.inner.lock().queue.pending_commands()
    }

    /// Receiver for store events.
    #[must_use]
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<StoreEvent> {
        self.events.receiver()
    }

    fn emit(&self, event: StoreEvent) {
        if self.events.try_send(event).is_err() {
            tracing::trace!("store event dropped, channel full");
        }
    }

    /// Runs `write` against the journal, if any, reporting failures as events.
    fn persist(
        &self,
        inner: &mut StoreInner,
        write: impl FnOnce(&mut Journal) -> Result<(), JournalError>,
    ) {
        let Some(journal) = inner.journal.as_mut() else {
            return;
        };
        let mut result = write(journal);
        if result.is_ok() && journal.records_since_checkpoint() >= self.checkpoint_every {
            result = journal.checkpoint(&inner.town, (self.clock)(), inner.queue.entries());
        }
        if let Err(err) = result {
            tracing::error!(error = %err, "journal write failed");
            self.emit(StoreEvent::PersistenceFailed {
                error: err.to_string(),
            });
        }
    }

    /// Applies `command` optimistically and queues it.
    ///
    /// On success the new state replaces the current one and the command is
    /// queued as `pending`. On rejection the state is untouched and the
    /// command is queued as `rejected` with the reason.
    ///
    /// # Errors
    ///
    /// Returns the local rejection reason.
    pub fn enqueue(&self, command: Command) -> Result<Option<ApplyMessage>, RejectReason> {
        let mut inner = self.inner.lock();
        let id = command.id.clone();
        let kind = command.type_name();

        match apply_command(&inner.town, &command, command.client_created_at) {
            Ok(applied) => {
                let delta = applied.state.resources.delta_from(&inner.town.resources);
                let finished = (applied.state.session_log.len() > inner.town.session_log.len())
                    .then(|| applied.state.session_log.last().cloned())
                    .flatten();
                let economy = (!delta.is_zero()).then(|| EconomyEntry {
                    created_at: command.client_created_at,
                    kind: kind.to_string(),
                    delta,
                    note: Some(id.clone()),
                });

                inner.town = applied.state;
                let entry = QueuedCommand::pending(command);
                inner.queue.push(entry.clone());

                let stamp = (self.clock)();
                let town = inner.town.clone();
                self.persist(&mut inner, |journal| {
                    journal.append_queue(&entry)?;
                    if let Some(economy) = &economy {
                        journal.append_economy(economy)?;
                    }
                    if let Some(session) = &finished {
                        journal.append_session(session)?;
                    }
                    journal.append_snapshot(&town, stamp)?;
                    Ok(())
                });

                let version = inner.town.version;
                drop(inner);

                tracing::debug!(%id, kind, version, "command applied");
                self.emit(StoreEvent::Enqueued {
                    id,
                    status: QueueStatus::Pending,
                    reason: None,
                });
                self.emit(StoreEvent::StateChanged { version });
                Ok(applied.message)
            }
            Err(reason) => {
                let entry = QueuedCommand::rejected(command, reason.code());
                inner.queue.push(entry.clone());
                self.persist(&mut inner, |journal| journal.append_queue(&entry).map(|_| ()));
                drop(inner);

                tracing::debug!(%id, kind, %reason, "command rejected locally");
                self.emit(StoreEvent::Enqueued {
                    id,
                    status: QueueStatus::Rejected,
                    reason: Some(reason),
                });
                Err(reason)
            }
        }
    }

    /// Replaces the state with `snapshot` and replays every pending command.
    ///
    /// Replay failures are skipped; those entries stay `pending`.
    pub fn set_authoritative_state(&self, snapshot: TownState) -> ReconcileReport {
        let mut inner = self.inner.lock();
        let mut town = snapshot;
        let mut report = ReconcileReport::default();

        for entry in inner.queue.pending() {
            let command = &entry.command;
            match apply_command(&town, command, command.client_created_at) {
                Ok(applied) => {
                    town = applied.state;
                    report.replayed += 1;
                }
                Err(reason) => {
                    tracing::warn!(
                        id = %command.id,
                        kind = command.type_name(),
                        %reason,
                        "pending command no longer applies, skipped in replay"
                    );
                    report.skipped.push(SkippedReplay {
                        id: command.id.clone(),
                        reason,
                    });
                }
            }
        }

        report.version = town.version;
        inner.town = town;
        let stamp = (self.clock)();
        let town = inner.town.clone();
        self.persist(&mut inner, |journal| {
            journal.append_snapshot(&town, stamp).map(|_| ())
        });
        drop(inner);

        tracing::debug!(
            version = report.version,
            replayed = report.replayed,
            skipped = report.skipped.len(),
            "reconciled with authoritative state"
        );
        self.emit(StoreEvent::Reconciled {
            version: report.version,
            replayed: report.replayed,
            skipped: report.skipped.len(),
        });
        self.emit(StoreEvent::StateChanged {
            version: report.version,
        });
        report
    }

    /// Removes confirmed commands. Returns how many were removed.
    pub fn mark_acked(&self, ids: &[String]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let mut inner = self.inner.lock();
        let removed = inner.queue.remove_acked(ids);
        if !removed.is_empty() {
            self.persist(&mut inner, |journal| journal.append_dequeue(&removed).map(|_| ()));
        }
        drop(inner);

        let count = removed.len();
        if count > 0 {
            tracing::debug!(count, "commands acknowledged");
            self.emit(StoreEvent::Acked { ids: removed });
        }
        count
    }

    /// Marks commands refused by the server. The state is not rolled back.
    /// Returns how many entries were updated.
    pub fn mark_rejected(&self, rejections: &[Rejection]) -> usize {
        if rejections.is_empty() {
            return 0;
        }
        let mut inner = self.inner.lock();
        let updated = inner.queue.mark_rejected(rejections);
        if !updated.is_empty() {
            self.persist(&mut inner, |journal| {
                updated
                    .iter()
                    .try_for_each(|entry| journal.append_queue(entry).map(|_| ()))
            });
        }
        drop(inner);

        let ids: Vec<String> = updated.into_iter().map(|e| e.command.id).collect();
        let count = ids.len();
        if count > 0 {
            for rejection in rejections {
                tracing::debug!(id = %rejection.id, reason = %rejection.reason, "server rejected command");
            }
            self.emit(StoreEvent::Rejected { ids });
        }
        count
    }

    /// Bumps `retry_count` on pending commands the server left unresolved.
    pub fn bump_retries(&self, ids: &[String]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let mut inner = self.inner.lock();
        let bumped = inner.queue.bump_retries(ids);
        if !bumped.is_empty() {
            self.persist(&mut inner, |journal| {
                bumped
                    .iter()
                    .try_for_each(|entry| journal.append_queue(entry).map(|_| ()))
            });
        }
        bumped.len()
    }

    /// Back to the starter town with an empty queue.
    pub fn reset(&self) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let now = (self.clock)();
        inner.town = TownState::initial(now);
        inner.queue.clear();
        if let Some(journal) = inner.journal.as_mut() {
            if let Err(err) = journal.checkpoint(&inner.town, now, &[]) {
                tracing::error!(error = %err, "journal reset failed");
                self.emit(StoreEvent::PersistenceFailed {
                    error: err.to_string(),
                });
            }
        }
        let version = inner.town.version;
        drop(guard);

        tracing::info!("store reset");
        self.emit(StoreEvent::Reset);
        self.emit(StoreEvent::StateChanged { version });
    }

    /// Compacts the journal now.
    ///
    /// # Errors
    ///
    /// Fails if the checkpoint cannot be written or flushed to disk.
    pub fn checkpoint(&self) -> SyncResult<()> {
        let mut inner = self.inner.lock();
        let now = (self.clock)();
        let StoreInner {
            town,
            queue,
            journal,
        } = &mut *inner;
        if let Some(journal) = journal {
            journal.checkpoint(town, now, queue.entries())?;
            journal.sync()?;
        }
        Ok(())
    }
}
