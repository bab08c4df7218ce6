//! # Command Reducer
//!
//! `apply_command(state, command, timestamp)` is the single transition
//! function of the town.
//!
//! ```text
//!   &TownState ──┐
//!   &Command   ──┼──> validate ──ok──> clone ──> mutate ──> version + 1 ──> Applied
//!   Timestamp  ──┘        │
//!                         └──err──> RejectReason (input untouched)
//! ```
//!
//! ## Guarantees
//!
//! 1. **Pure** - no I/O, no clock reads, no randomness
//! 2. **All-or-nothing** - every check runs before the state is cloned
//! 3. **Versioned** - every success bumps `version` by exactly one
//!
//! The same reducer runs on the client (optimistic apply and replay) and in
//! the in-process server, so both sides agree on every outcome.

mod activities;
mod buildings;
mod sessions;
mod tasks;

use crate::command::{Command, CommandKind};
use crate::error::RejectReason;
use crate::types::{Timestamp, TownState};

/// Outcome of applying a command.
pub type ApplyResult = Result<Applied, RejectReason>;

/// Informational note attached to a successful application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApplyMessage {
    /// A session ended after at least one whole minute.
    SessionComplete,
    /// A session ended before a whole minute elapsed.
    SessionEndedNoReward,
}

impl ApplyMessage {
    /// Stable kebab-case code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::SessionComplete => "session-complete",
            Self::SessionEndedNoReward => "session-ended-no-reward",
        }
    }
}

impl std::fmt::Display for ApplyMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A successfully applied command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied {
    /// The new state.
    pub state: TownState,
    /// Optional note for the UI.
    pub message: Option<ApplyMessage>,
}

impl Applied {
    pub(crate) const fn silent(state: TownState) -> Self {
        Self { state, message: None }
    }
}

/// Applies `command` to `state` as of `timestamp`.
///
/// # Errors
///
/// Returns the [`RejectReason`] of the first failed check. `state` is never
/// modified.
pub fn apply_command(state: &TownState, command: &Command, timestamp: Timestamp) -> ApplyResult {
    let mut applied = match &command.kind {
        CommandKind::StartSession {
            duration,
            activity_id,
            reward_building,
        } => sessions::start(state, &command.id, *duration, activity_id, *reward_building, timestamp),
        CommandKind::CompleteSession { session_id } => {
            sessions::complete(state, &command.id, session_id, timestamp)
        }
        CommandKind::PlaceBuilding {
            building_id,
            building_kind,
            x,
            y,
            rot,
        } => buildings::place(state, building_id, *building_kind, *x, *y, rot.unwrap_or(0), timestamp),
        CommandKind::MoveBuilding {
            building_id,
            x,
            y,
            rot,
        } => buildings::relocate(state, building_id, *x, *y, *rot),
        CommandKind::UpgradeBuilding { building_id } => buildings::upgrade(state, building_id),
        CommandKind::ClaimProduction { building_id } => {
            buildings::claim(state, building_id, timestamp)
        }
        CommandKind::DeleteBuilding { building_id } => buildings::demolish(state, building_id),
        CommandKind::AddActivity {
            activity_id,
            name,
            category,
            building_kind,
        } => activities::add(state, activity_id, name, category, *building_kind),
        CommandKind::DeleteActivity { activity_id } => activities::remove(state, activity_id),
        CommandKind::AddTask {
            task_id,
            name,
            target,
            reward_xp,
        } => Ok(tasks::add(state, task_id, name, *target, *reward_xp)),
        CommandKind::UpdateTaskProgress { task_id, delta } => {
            tasks::update_progress(state, task_id, *delta)
        }
        CommandKind::CompleteTask { task_id } => tasks::complete(state, task_id),
    }?;

    applied.state.version = state.version.saturating_add(1);
    Ok(applied)
}

/// Trims `raw` and keeps at most `max_chars` characters.
pub(crate) fn clip(raw: &str, max_chars: usize) -> String {
    raw.trim().chars().take(max_chars).collect()
}
