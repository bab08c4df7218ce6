//! # FOCUSTOWN
//!
//! Client core of a focus-timer town builder.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          FOCUSTOWN                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌──────────────────┐          ┌──────────────────────────┐  │
//! │  │  focustown_core  │<─────────│     focustown_sync       │  │
//! │  │                  │  apply   │                          │  │
//! │  │  • Town state    │          │  • Local store + queue   │  │
//! │  │  • Commands      │          │  • Reconciliation        │  │
//! │  │  • Reducer       │          │  • Sync service          │  │
//! │  │  • XP / costs    │          │  • Journal               │  │
//! │  └──────────────────┘          └──────────────────────────┘  │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `logging`: subscriber setup for binaries

#![deny(unsafe_code)]
#![deny(missing_docs)]

pub mod logging;

pub use focustown_core as core;
pub use focustown_sync as sync;

pub use focustown_core::{apply_command, Command, CommandFactory, RejectReason, TownState};
pub use focustown_sync::{InProcessServer, LocalStore, SyncConfig, SyncService};
