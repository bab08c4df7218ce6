//! # Server Adapter
//!
//! The seam between the client and whatever holds the authoritative town.
//!
//! ```text
//! SyncService ──push_commands(pending)──> ServerAdapter
//!             <──PushOutcome { acked, rejected, new_state }──
//! ```
//!
//! Transport is up to the implementation. [`InProcessServer`] runs the same
//! reducer in memory and serves as the reference.

mod in_process;

use std::future::Future;

use serde::{Deserialize, Serialize};

use focustown_core::{Command, TownState};

use crate::error::SyncResult;
pub use crate::queue::Rejection;

pub use in_process::InProcessServer;

/// Server verdict on a batch of pushed commands.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOutcome {
    /// Ids the server applied.
    pub acked: Vec<String>,
    /// Ids the server refused, with reasons.
    pub rejected: Vec<Rejection>,
    /// Authoritative state after the batch, if the server sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_state: Option<TownState>,
}

/// Access to the authoritative town.
pub trait ServerAdapter: Send + Sync {
    /// Fetches the current authoritative state.
    fn fetch_state(&self) -> impl Future<Output = SyncResult<TownState>> + Send;

    /// Submits commands in order and reports which ones the server accepted.
    fn push_commands(
        &self,
        commands: &[Command],
    ) -> impl Future<Output = SyncResult<PushOutcome>> + Send;
}
