//! # Town State Model
//!
//! The authoritative aggregate and its parts.
//!
//! `TownState` is a plain value: the reducer takes it by reference and hands
//! back a fresh copy on success. Field names serialize in camelCase so the
//! snapshot matches the shape exchanged with the server adapter.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::footprint::footprint_for;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Id of the building that always exists and can never be deleted.
pub const TOWN_HALL_ID: &str = "town-hall";

/// Returns the current wall-clock time in milliseconds.
#[must_use]
pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}

/// The four fixed resource kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Gold.
    Gold,
    /// Wood.
    Wood,
    /// Stone.
    Stone,
    /// Food.
    Food,
}

impl ResourceKind {
    /// Every resource kind.
    pub const ALL: [Self; 4] = [Self::Gold, Self::Wood, Self::Stone, Self::Food];

    /// Lowercase name, as used on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Wood => "wood",
            Self::Stone => "stone",
            Self::Food => "food",
        }
    }
}

/// Resource totals. Unsigned, so a stored total can never be negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resources {
    /// Gold.
    pub gold: u64,
    /// Wood.
    pub wood: u64,
    /// Stone.
    pub stone: u64,
    /// Food.
    pub food: u64,
}

impl Resources {
    /// Creates a resource bundle.
    #[inline]
    #[must_use]
    pub const fn new(gold: u64, wood: u64, stone: u64, food: u64) -> Self {
        Self { gold, wood, stone, food }
    }

    /// Amount of a single resource.
    #[inline]
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Food => self.food,
        }
    }

    /// Mutable access to a single resource.
    #[inline]
    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut u64 {
        match kind {
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Stone => &mut self.stone,
            ResourceKind::Food => &mut self.food,
        }
    }

    /// True if every component of `cost` is covered.
    #[must_use]
    pub fn covers(&self, cost: &Self) -> bool {
        ResourceKind::ALL
            .iter()
            .all(|&kind| self.get(kind) >= cost.get(kind))
    }

    /// Subtracts `cost`, or returns `None` if any component would go negative.
    #[must_use]
    pub fn checked_sub(&self, cost: &Self) -> Option<Self> {
        Some(Self {
            gold: self.gold.checked_sub(cost.gold)?,
            wood: self.wood.checked_sub(cost.wood)?,
            stone: self.stone.checked_sub(cost.stone)?,
            food: self.food.checked_sub(cost.food)?,
        })
    }

    /// Adds `amount` of one resource, saturating at `u64::MAX`.
    pub fn credit(&mut self, kind: ResourceKind, amount: u64) {
        let slot = self.get_mut(kind);
        *slot = slot.saturating_add(amount);
    }

    /// Signed per-resource difference `self - before`.
    #[must_use]
    pub fn delta_from(&self, before: &Self) -> ResourceDelta {
        let diff = |after: u64, before: u64| {
            i64::try_from(i128::from(after) - i128::from(before)).unwrap_or(i64::MAX)
        };
        ResourceDelta {
            gold: diff(self.gold, before.gold),
            wood: diff(self.wood, before.wood),
            stone: diff(self.stone, before.stone),
            food: diff(self.food, before.food),
        }
    }
}

/// Signed change in resources between two states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDelta {
    /// Gold change.
    pub gold: i64,
    /// Wood change.
    pub wood: i64,
    /// Stone change.
    pub stone: i64,
    /// Food change.
    pub food: i64,
}

impl ResourceDelta {
    /// True if nothing changed.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.gold == 0 && self.wood == 0 && self.stone == 0 && self.food == 0
    }
}

/// Kinds of building that can stand in the town.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    /// The town hall. Its level gates the per-kind building cap.
    TownHall,
    /// Farm, produces food.
    Farm,
    /// Sawmill, produces wood.
    Sawmill,
    /// Mine, produces stone.
    Mine,
    /// Market, produces gold.
    Market,
    /// Decoration.
    Decor,
}

impl BuildingKind {
    /// Every building kind.
    pub const ALL: [Self; 6] = [
        Self::TownHall,
        Self::Farm,
        Self::Sawmill,
        Self::Mine,
        Self::Market,
        Self::Decor,
    ];

    /// Snake-case name, as used on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TownHall => "town_hall",
            Self::Farm => "farm",
            Self::Sawmill => "sawmill",
            Self::Mine => "mine",
            Self::Market => "market",
            Self::Decor => "decor",
        }
    }
}

/// Rectangular tile area occupied by a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
}

impl Footprint {
    /// Creates a footprint.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A tile coordinate on the town grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePos {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl TilePos {
    /// Creates a tile position.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A placed building.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    /// Unique id.
    pub id: String,
    /// Building kind.
    #[serde(rename = "type")]
    pub kind: BuildingKind,
    /// Level, starting at 1.
    pub level: u32,
    /// Column of the top-left tile.
    pub x: i32,
    /// Row of the top-left tile.
    pub y: i32,
    /// Rotation, in quarter turns as chosen by the client.
    pub rot: i32,
    /// Footprint captured when the building was placed.
    pub footprint: Footprint,
    /// Production has been claimed up to this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produced_until: Option<Timestamp>,
}

impl Building {
    /// Creates a level-1 building with the default footprint of its kind.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: BuildingKind, x: i32, y: i32) -> Self {
        Self {
            id: id.into(),
            kind,
            level: 1,
            x,
            y,
            rot: 0,
            footprint: footprint_for(kind),
            produced_until: None,
        }
    }
}

/// Town map dimensions. Immutable once the town exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSize {
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
}

/// A user-defined focus category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Unique id.
    pub id: String,
    /// Display name, at most 30 characters.
    pub name: String,
    /// Category label, at most 24 characters.
    pub category: String,
    /// Building kind that decides the session reward resource.
    #[serde(rename = "buildingType")]
    pub building: BuildingKind,
}

/// Level and XP accumulated by an activity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityProgress {
    /// Owning activity.
    pub activity_id: String,
    /// Current level, starting at 1.
    pub level: u32,
    /// XP toward the next level. Always below the current threshold.
    pub xp: u64,
}

impl ActivityProgress {
    /// Fresh progress at level 1 with no XP.
    #[must_use]
    pub fn fresh(activity_id: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            level: 1,
            xp: 0,
        }
    }
}

/// The running focus session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimer {
    /// Always true while installed.
    pub active: bool,
    /// Id of the command that started the session.
    pub session_id: String,
    /// Start instant.
    pub start_at: Timestamp,
    /// Planned length in seconds.
    pub planned_duration: u32,
    /// Activity the session counts toward.
    pub activity_id: String,
    /// Overrides the activity's building for reward purposes.
    #[serde(
        rename = "rewardBuildingType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reward_building: Option<BuildingKind>,
}

/// Timers attached to the town.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timers {
    /// At most one active focus session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionTimer>,
}

impl Timers {
    /// The session timer, if one is installed and active.
    #[must_use]
    pub fn active_session(&self) -> Option<&SessionTimer> {
        self.session.as_ref().filter(|timer| timer.active)
    }
}

/// A counter-style task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique id.
    pub id: String,
    /// Display name, at most 40 characters.
    pub name: String,
    /// Current progress.
    pub progress: u64,
    /// Progress needed to complete. At least 1.
    pub target: u64,
    /// XP granted on completion.
    pub reward_xp: u64,
    /// Completion flag.
    pub completed: bool,
}

/// A completed focus session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    /// Id of the command that completed the session.
    pub id: String,
    /// Activity the session counted toward.
    pub activity_id: String,
    /// Whole minutes elapsed.
    pub minutes: u64,
    /// Completion instant.
    pub at: Timestamp,
}

/// Advisory metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TownMeta {
    /// When the server last produced this snapshot. Not used for conflict resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_server_sync_at: Option<Timestamp>,
}

/// The complete, versioned town.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TownState {
    /// Incremented by exactly one on every accepted command.
    pub version: u64,
    /// Resource totals.
    pub resources: Resources,
    /// Buildings in placement order.
    pub buildings: Vec<Building>,
    /// Grid dimensions.
    pub map: MapSize,
    /// Running timers.
    #[serde(default)]
    pub timers: Timers,
    /// Focus categories, in creation order.
    #[serde(default)]
    pub activities: Vec<Activity>,
    /// Progress keyed by activity id.
    #[serde(default)]
    pub activity_progress: BTreeMap<String, ActivityProgress>,
    /// Tasks, in creation order.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Completed sessions, append-only.
    #[serde(default)]
    pub session_log: Vec<SessionEntry>,
    /// Advisory metadata.
    #[serde(default)]
    pub meta: TownMeta,
}

impl TownState {
    /// The starter town: a town hall, one farm, sawmill and mine on a 10x10 map.
    ///
    /// Seeded footprints are pairwise disjoint.
    #[must_use]
    pub fn initial(now: Timestamp) -> Self {
        let seeded = |id: &str, kind: BuildingKind, x: i32, y: i32| Building {
            produced_until: Some(now),
            ..Building::new(id, kind, x, y)
        };

        Self {
            version: 1,
            resources: Resources::new(500, 400, 200, 300),
            buildings: vec![
                seeded(TOWN_HALL_ID, BuildingKind::TownHall, 4, 4),
                seeded("farm-1", BuildingKind::Farm, 2, 6),
                seeded("sawmill-1", BuildingKind::Sawmill, 7, 6),
                seeded("mine-1", BuildingKind::Mine, 7, 3),
            ],
            map: MapSize { width: 10, height: 10 },
            timers: Timers::default(),
            activities: Vec::new(),
            activity_progress: BTreeMap::new(),
            tasks: vec![
                Task {
                    id: "task-bed".to_string(),
                    name: "Yatagi topla".to_string(),
                    progress: 0,
                    target: 1,
                    reward_xp: 5,
                    completed: false,
                },
                Task {
                    id: "task-water".to_string(),
                    name: "Su ic".to_string(),
                    progress: 0,
                    target: 200,
                    reward_xp: 5,
                    completed: false,
                },
            ],
            session_log: Vec::new(),
            meta: TownMeta {
                last_server_sync_at: Some(now),
            },
        }
    }

    /// Looks up a building by id.
    #[must_use]
    pub fn building(&self, id: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Looks up an activity by id.
    #[must_use]
    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Number of buildings of a kind.
    #[must_use]
    pub fn count_of(&self, kind: BuildingKind) -> usize {
        self.buildings.iter().filter(|b| b.kind == kind).count()
    }

    /// Level of the first town hall, or 1 if there is none.
    #[must_use]
    pub fn town_hall_level(&self) -> u32 {
        self.buildings
            .iter()
            .find(|b| b.kind == BuildingKind::TownHall)
            .map_or(1, |b| b.level)
    }
}
