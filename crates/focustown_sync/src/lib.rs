//! # FOCUSTOWN Sync
//!
//! Offline-first state synchronization for the FOCUSTOWN client.
//!
//! ## Design Principles
//!
//! 1. **Optimistic** - commands apply locally at once and queue for the server
//! 2. **Server wins** - an authoritative snapshot always replaces local state
//! 3. **Replay, never merge** - pending commands are re-applied on the snapshot
//! 4. **Durable queue** - an optional journal survives restarts
//!
//! ## Flow
//!
//! ```text
//! UI ──enqueue──> LocalStore ──pending──> SyncService ──> ServerAdapter
//!                     ▲                                       │
//!                     └──── acks / rejections / snapshot ─────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use focustown_sync::{InProcessServer, LocalStore, SyncService};
//!
//! let service = SyncService::new(LocalStore::new().shared(), InProcessServer::default());
//! service.enqueue(service.commands().claim_production("farm-1"))?;
//! let summary = service.sync_now().await?;
//! assert_eq!(summary.acked, 1);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod config;
pub mod error;
pub mod events;
pub mod journal;
pub mod queue;
pub mod service;
pub mod store;

pub use adapter::{InProcessServer, PushOutcome, ServerAdapter};
pub use config::SyncConfig;
pub use error::{ConfigError, JournalError, JournalResult, SyncError, SyncResult};
pub use events::{EventChannel, StoreEvent};
pub use journal::{EconomyEntry, Journal, RecordKind, RecoveredState, SnapshotRow};
pub use queue::{CommandQueue, QueueStatus, QueuedCommand, Rejection};
pub use service::{SyncService, SyncStatus, SyncSummary};
pub use store::{LocalStore, ReconcileReport, SkippedReplay};
