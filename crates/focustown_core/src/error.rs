//! # Reject Reasons
//!
//! Every way a command can be refused by the reducer.
//!
//! Rejections are values, not failures: the caller keeps its original state
//! and decides whether to surface the reason or drop the command. Each reason
//! renders as a stable kebab-case code that is also its wire form.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the reducer refused a command.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// Session duration outside the allowed range.
    #[error("invalid-duration")]
    InvalidDuration,

    /// A focus session is already running.
    #[error("session-already-active")]
    SessionAlreadyActive,

    /// The referenced activity does not exist.
    #[error("activity-not-found")]
    ActivityNotFound,

    /// No active session matches the given session id.
    #[error("session-not-found")]
    SessionNotFound,

    /// The target area collides with a building or leaves the map.
    #[error("tile-occupied")]
    TileOccupied,

    /// Too many buildings of the same kind for the current town hall level.
    #[error("building-limit")]
    BuildingLimit,

    /// The town cannot pay the cost.
    #[error("insufficient-resources")]
    InsufficientResources,

    /// The referenced building does not exist.
    #[error("building-missing")]
    BuildingMissing,

    /// A building with this id already exists.
    #[error("building-exists")]
    BuildingExists,

    /// The building cannot be removed.
    #[error("protected-building")]
    ProtectedBuilding,

    /// An activity with this id already exists.
    #[error("activity-exists")]
    ActivityExists,

    /// The activity is bound to the running session.
    #[error("activity-in-use")]
    ActivityInUse,

    /// The referenced task does not exist.
    #[error("task-missing")]
    TaskMissing,

    /// The task is already completed.
    #[error("task-complete")]
    TaskComplete,

    /// A peer sent a command tag this build does not understand.
    #[error("unknown-command")]
    UnknownCommand,
}

impl RejectReason {
    /// Every reason, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::InvalidDuration,
        Self::SessionAlreadyActive,
        Self::ActivityNotFound,
        Self::SessionNotFound,
        Self::TileOccupied,
        Self::BuildingLimit,
        Self::InsufficientResources,
        Self::BuildingMissing,
        Self::BuildingExists,
        Self::ProtectedBuilding,
        Self::ActivityExists,
        Self::ActivityInUse,
        Self::TaskMissing,
        Self::TaskComplete,
        Self::UnknownCommand,
    ];

    /// Returns the stable reason code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidDuration => "invalid-duration",
            Self::SessionAlreadyActive => "session-already-active",
            Self::ActivityNotFound => "activity-not-found",
            Self::SessionNotFound => "session-not-found",
            Self::TileOccupied => "tile-occupied",
            Self::BuildingLimit => "building-limit",
            Self::InsufficientResources => "insufficient-resources",
            Self::BuildingMissing => "building-missing",
            Self::BuildingExists => "building-exists",
            Self::ProtectedBuilding => "protected-building",
            Self::ActivityExists => "activity-exists",
            Self::ActivityInUse => "activity-in-use",
            Self::TaskMissing => "task-missing",
            Self::TaskComplete => "task-complete",
            Self::UnknownCommand => "unknown-command",
        }
    }

    /// Parses a reason code. Returns `None` for codes this build does not know.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|reason| reason.code() == code)
    }
}
