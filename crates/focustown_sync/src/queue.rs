//! # Pending Command Queue
//!
//! Commands in enqueue order, each tagged with where it stands with the
//! server.
//!
//! ```text
//! enqueue ──ok──> [pending] ──ack──> (removed)
//!    │                │
//!    │                └──reject──> [rejected]
//!    └──local reject──> [rejected]
//! ```
//!
//! Rejected entries stay in the queue for the UI to show; only acks remove
//! entries. Order is never changed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use focustown_core::{Command, RejectReason};

/// Where a queued command stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Applied locally, not yet confirmed.
    Pending,
    /// Confirmed by the server.
    Acked,
    /// Refused locally or by the server.
    Rejected,
}

impl QueueStatus {
    /// Lowercase name, as persisted.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Acked => "acked",
            Self::Rejected => "rejected",
        }
    }
}

/// A server-side refusal of one command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Id of the refused command.
    pub id: String,
    /// Reason code as sent by the server.
    pub reason: String,
}

impl Rejection {
    /// Creates a rejection from a known reason.
    #[must_use]
    pub fn new(id: impl Into<String>, reason: RejectReason) -> Self {
        Self {
            id: id.into(),
            reason: reason.code().to_string(),
        }
    }
}

/// A command and its sync status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedCommand {
    /// The command, never modified.
    pub command: Command,
    /// Sync status.
    pub status: QueueStatus,
    /// Reason code when rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Round trips in which the command was pushed but not resolved.
    #[serde(default)]
    pub retry_count: u32,
}

impl QueuedCommand {
    /// A freshly applied command awaiting confirmation.
    #[must_use]
    pub const fn pending(command: Command) -> Self {
        Self {
            command,
            status: QueueStatus::Pending,
            error: None,
            retry_count: 0,
        }
    }

    /// A command refused with `reason`.
    #[must_use]
    pub fn rejected(command: Command, reason: impl Into<String>) -> Self {
        Self {
            command,
            status: QueueStatus::Rejected,
            error: Some(reason.into()),
            retry_count: 0,
        }
    }

    /// Id of the wrapped command.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.command.id
    }

    /// True while awaiting confirmation.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == QueueStatus::Pending
    }

    /// The rejection reason, if it is one this build knows.
    #[must_use]
    pub fn reject_reason(&self) -> Option<RejectReason> {
        self.error.as_deref().and_then(RejectReason::from_code)
    }
}

/// Ordered queue of commands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandQueue {
    entries: Vec<QueuedCommand>,
}

impl CommandQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Rebuilds a queue from persisted entries, keeping their order.
    #[must_use]
    pub fn from_entries(entries: Vec<QueuedCommand>) -> Self {
        Self { entries }
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: QueuedCommand) {
        self.entries.push(entry);
    }

    /// All entries in enqueue order.
    #[must_use]
    pub fn entries(&self) -> &[QueuedCommand] {
        &self.entries
    }

    /// Pending entries in enqueue order.
    pub fn pending(&self) -> impl Iterator<Item = &QueuedCommand> {
        self.entries.iter().filter(|entry| entry.is_pending())
    }

    /// Clones of the pending commands, in enqueue order.
    #[must_use]
    pub fn pending_commands(&self) -> Vec<Command> {
        self.pending().map(|entry| entry.command.clone()).collect()
    }

    /// Number of pending entries.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }

    /// Looks up an entry by command id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&QueuedCommand> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    /// Removes every entry whose id is in `ids`, returning the removed ids.
    pub fn remove_acked(&mut self, ids: &[String]) -> Vec<String> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut removed = Vec::new();
        self.entries.retain(|entry| {
            if wanted.contains(entry.id()) {
                removed.push(entry.command.id.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Marks matching entries rejected, returning the updated entries.
    ///
    /// Unknown ids are ignored.
    pub fn mark_rejected(&mut self, rejections: &[Rejection]) -> Vec<QueuedCommand> {
        let mut updated = Vec::new();
        for rejection in rejections {
            if let Some(entry) = self.entries.iter_mut().find(|e| e.command.id == rejection.id) {
                entry.status = QueueStatus::Rejected;
                entry.error = Some(rejection.reason.clone());
                updated.push(entry.clone());
            }
        }
        updated
    }

    /// Bumps `retry_count` on matching pending entries, returning them.
    pub fn bump_retries(&mut self, ids: &[String]) -> Vec<QueuedCommand> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.entries
            .iter_mut()
            .filter(|entry| entry.is_pending() && wanted.contains(entry.command.id.as_str()))
            .map(|entry| {
                entry.retry_count = entry.retry_count.saturating_add(1);
                entry.clone()
            })
            .collect()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the queue holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
