//! # Commands
//!
//! The closed set of town mutations, and a factory that builds them.
//!
//! A command is an immutable value: it is created once, applied
//! optimistically, queued, pushed to the server and possibly replayed, but
//! never edited. On the wire a command is a flat JSON object tagged by
//! `type`:
//!
//! ```text
//! { "id": "…", "clientCreatedAt": 1700000000000,
//!   "type": "PLACE_BUILDING", "buildingId": "farm-2",
//!   "buildingType": "farm", "x": 0, "y": 0, "rot": 0 }
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{now_millis, BuildingKind, Timestamp};

/// Shortest allowed focus session, in seconds.
pub const MIN_SESSION_SECONDS: u32 = 300;

/// Longest allowed focus session, in seconds.
pub const MAX_SESSION_SECONDS: u32 = 3600;

/// Unique command identifier.
pub type CommandId = String;

/// A town mutation with its identity and creation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Unique id. Also used as the session id by `StartSession`.
    pub id: CommandId,
    /// When the client created the command.
    pub client_created_at: Timestamp,
    /// What the command does.
    #[serde(flatten)]
    pub kind: CommandKind,
}

impl Command {
    /// Wraps a command kind with an explicit id and creation time.
    #[must_use]
    pub fn new(id: impl Into<CommandId>, client_created_at: Timestamp, kind: CommandKind) -> Self {
        Self {
            id: id.into(),
            client_created_at,
            kind,
        }
    }

    /// Wire tag of the command.
    #[inline]
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

/// Every mutation the reducer understands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum CommandKind {
    /// Start a focus session.
    StartSession {
        /// Planned length in seconds.
        duration: u32,
        /// Activity the session counts toward.
        activity_id: String,
        /// Overrides the activity's building for the reward.
        #[serde(
            rename = "rewardBuildingType",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        reward_building: Option<BuildingKind>,
    },
    /// Finish the running focus session and collect its reward.
    CompleteSession {
        /// Id of the session to complete.
        session_id: String,
    },
    /// Place a new building.
    PlaceBuilding {
        /// Id of the new building.
        building_id: String,
        /// Kind of the new building.
        #[serde(rename = "buildingType")]
        building_kind: BuildingKind,
        /// Target column.
        x: i32,
        /// Target row.
        y: i32,
        /// Rotation, defaults to 0.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rot: Option<i32>,
    },
    /// Move an existing building.
    MoveBuilding {
        /// Building to move.
        building_id: String,
        /// Target column.
        x: i32,
        /// Target row.
        y: i32,
        /// New rotation; keeps the current one when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rot: Option<i32>,
    },
    /// Raise a building by one level.
    UpgradeBuilding {
        /// Building to upgrade.
        building_id: String,
    },
    /// Collect a building's production.
    ClaimProduction {
        /// Building to claim from.
        building_id: String,
    },
    /// Create a focus activity.
    AddActivity {
        /// Id of the new activity.
        activity_id: String,
        /// Display name.
        name: String,
        /// Category label.
        category: String,
        /// Building that decides the reward resource.
        #[serde(rename = "buildingType")]
        building_kind: BuildingKind,
    },
    /// Remove a focus activity.
    DeleteActivity {
        /// Activity to remove.
        activity_id: String,
    },
    /// Demolish a building.
    DeleteBuilding {
        /// Building to remove.
        building_id: String,
    },
    /// Create a task.
    AddTask {
        /// Id of the new task.
        task_id: String,
        /// Display name.
        name: String,
        /// Progress needed to complete; values below 1 become 1.
        target: i64,
        /// XP reward; negative values become 0.
        reward_xp: i64,
    },
    /// Move a task's progress by `delta`.
    UpdateTaskProgress {
        /// Task to update.
        task_id: String,
        /// Signed progress change.
        delta: i64,
    },
    /// Complete a task outright.
    CompleteTask {
        /// Task to complete.
        task_id: String,
    },
}

impl CommandKind {
    /// Wire tag, e.g. `PLACE_BUILDING`.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::StartSession { .. } => "START_SESSION",
            Self::CompleteSession { .. } => "COMPLETE_SESSION",
            Self::PlaceBuilding { .. } => "PLACE_BUILDING",
            Self::MoveBuilding { .. } => "MOVE_BUILDING",
            Self::UpgradeBuilding { .. } => "UPGRADE_BUILDING",
            Self::ClaimProduction { .. } => "CLAIM_PRODUCTION",
            Self::AddActivity { .. } => "ADD_ACTIVITY",
            Self::DeleteActivity { .. } => "DELETE_ACTIVITY",
            Self::DeleteBuilding { .. } => "DELETE_BUILDING",
            Self::AddTask { .. } => "ADD_TASK",
            Self::UpdateTaskProgress { .. } => "UPDATE_TASK_PROGRESS",
            Self::CompleteTask { .. } => "COMPLETE_TASK",
        }
    }
}

/// Generates a fresh random identifier.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds well-formed commands with fresh ids and creation times.
///
/// Trivial bounds are clamped here, before submission. The reducer still
/// validates everything.
#[derive(Clone, Copy, Debug)]
pub struct CommandFactory {
    clock: fn() -> Timestamp,
}

impl Default for CommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory {
    /// A factory stamping commands with the wall clock.
    #[must_use]
    pub const fn new() -> Self {
        Self { clock: now_millis }
    }

    /// A factory stamping commands with a custom clock.
    #[must_use]
    pub const fn with_clock(clock: fn() -> Timestamp) -> Self {
        Self { clock }
    }

    fn build(&self, kind: CommandKind) -> Command {
        Command::new(new_id(), (self.clock)(), kind)
    }

    /// Start a session; `duration_secs` is clamped to 5–60 minutes.
    #[must_use]
    pub fn start_session(
        &self,
        duration_secs: u32,
        activity_id: impl Into<String>,
        reward_building: Option<BuildingKind>,
    ) -> Command {
        self.build(CommandKind::StartSession {
            duration: duration_secs.clamp(MIN_SESSION_SECONDS, MAX_SESSION_SECONDS),
            activity_id: activity_id.into(),
            reward_building,
        })
    }

    /// Complete the session started by command `session_id`.
    #[must_use]
    pub fn complete_session(&self, session_id: impl Into<String>) -> Command {
        self.build(CommandKind::CompleteSession {
            session_id: session_id.into(),
        })
    }

    /// Place a building.
    #[must_use]
    pub fn place_building(
        &self,
        building_id: impl Into<String>,
        building_kind: BuildingKind,
        x: i32,
        y: i32,
        rot: i32,
    ) -> Command {
        self.build(CommandKind::PlaceBuilding {
            building_id: building_id.into(),
            building_kind,
            x,
            y,
            rot: Some(rot),
        })
    }

    /// Move a building; `None` keeps its rotation.
    #[must_use]
    pub fn move_building(
        &self,
        building_id: impl Into<String>,
        x: i32,
        y: i32,
        rot: Option<i32>,
    ) -> Command {
        self.build(CommandKind::MoveBuilding {
            building_id: building_id.into(),
            x,
            y,
            rot,
        })
    }

    /// Upgrade a building.
    #[must_use]
    pub fn upgrade_building(&self, building_id: impl Into<String>) -> Command {
        self.build(CommandKind::UpgradeBuilding {
            building_id: building_id.into(),
        })
    }

    /// Claim a building's production.
    #[must_use]
    pub fn claim_production(&self, building_id: impl Into<String>) -> Command {
        self.build(CommandKind::ClaimProduction {
            building_id: building_id.into(),
        })
    }

    /// Create an activity with a freshly generated id.
    #[must_use]
    pub fn add_activity(
        &self,
        name: impl Into<String>,
        category: impl Into<String>,
        building_kind: BuildingKind,
    ) -> Command {
        self.build(CommandKind::AddActivity {
            activity_id: new_id(),
            name: name.into(),
            category: category.into(),
            building_kind,
        })
    }

    /// Delete an activity.
    #[must_use]
    pub fn delete_activity(&self, activity_id: impl Into<String>) -> Command {
        self.build(CommandKind::DeleteActivity {
            activity_id: activity_id.into(),
        })
    }

    /// Demolish a building.
    #[must_use]
    pub fn delete_building(&self, building_id: impl Into<String>) -> Command {
        self.build(CommandKind::DeleteBuilding {
            building_id: building_id.into(),
        })
    }

    /// Create a task with a freshly generated id.
    #[must_use]
    pub fn add_task(&self, name: impl Into<String>, target: i64, reward_xp: i64) -> Command {
        self.build(CommandKind::AddTask {
            task_id: new_id(),
            name: name.into(),
            target,
            reward_xp,
        })
    }

    /// Move a task's progress.
    #[must_use]
    pub fn update_task_progress(&self, task_id: impl Into<String>, delta: i64) -> Command {
        self.build(CommandKind::UpdateTaskProgress {
            task_id: task_id.into(),
            delta,
        })
    }

    /// Complete a task.
    #[must_use]
    pub fn complete_task(&self, task_id: impl Into<String>) -> Command {
        self.build(CommandKind::CompleteTask {
            task_id: task_id.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_clock() -> Timestamp {
        42
    }

    #[test]
    fn test_factory_clamps_duration() {
        let factory = CommandFactory::with_clock(fixed_clock);

        let short = factory.start_session(10, "a1", None);
        assert!(matches!(short.kind, CommandKind::StartSession { duration: 300, .. }));

        let long = factory.start_session(99_999, "a1", None);
        assert!(matches!(long.kind, CommandKind::StartSession { duration: 3600, .. }));
        assert_eq!(long.client_created_at, 42);
    }

    #[test]
    fn test_factory_ids_are_unique() {
        let factory = CommandFactory::new();
        let a = factory.upgrade_building("town-hall");
        let b = factory.upgrade_building("town-hall");
        assert_ne!(a.id, b.id);

        let first = factory.add_task("x", 1, 1);
        let second = factory.add_task("x", 1, 1);
        match (first.kind, second.kind) {
            (
                CommandKind::AddTask { task_id: t1, .. },
                CommandKind::AddTask { task_id: t2, .. },
            ) => assert_ne!(t1, t2),
            other => panic!("unexpected kinds: {other:?}"),
        }
    }

    #[test]
    fn test_wire_shape() {
        let command = Command::new(
            "c1",
            7,
            CommandKind::PlaceBuilding {
                building_id: "farm-2".to_string(),
                building_kind: BuildingKind::Farm,
                x: 0,
                y: 1,
                rot: None,
            },
        );
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["type"], "PLACE_BUILDING");
        assert_eq!(json["buildingId"], "farm-2");
        assert_eq!(json["buildingType"], "farm");
        assert_eq!(json["clientCreatedAt"], 7);
        assert!(json.get("rot").is_none());

        let back: Command = serde_json::from_value(json).unwrap();
        assert_eq!(back, command);
    }

    #[test]
    fn test_unknown_tag_does_not_decode() {
        let json = r#"{"id":"c1","clientCreatedAt":0,"type":"FEED_DRAGON"}"#;
        assert!(serde_json::from_str::<Command>(json).is_err());
    }

    #[test]
    fn test_type_name() {
        let factory = CommandFactory::with_clock(fixed_clock);
        assert_eq!(factory.complete_task("t").type_name(), "COMPLETE_TASK");
        assert_eq!(
            factory.update_task_progress("t", -1).type_name(),
            "UPDATE_TASK_PROGRESS"
        );
    }
}
