//! # FOCUSTOWN Core
//!
//! Deterministic rules for a focus-timer town: the state model, the closed
//! command set and the reducer that applies one to the other.
//!
//! ## Design Principles
//!
//! 1. **Pure** - no I/O, no clocks inside the reducer, no shared mutation
//! 2. **Closed command set** - every mutation is a [`CommandKind`] variant
//! 3. **Rejections are values** - a refused command yields a [`RejectReason`]
//!    and leaves the input state as it was
//! 4. **Integer resources** - totals are unsigned and can never go negative
//!
//! ## Example
//!
//! ```rust
//! use focustown_core::{apply_command, BuildingKind, CommandFactory, TownState};
//!
//! let town = TownState::initial(0);
//! let commands = CommandFactory::new();
//!
//! let place = commands.place_building("farm-2", BuildingKind::Farm, 0, 0, 0);
//! let applied = apply_command(&town, &place, 1_000).expect("free tile");
//! assert_eq!(applied.state.version, town.version + 1);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod command;
pub mod economy;
pub mod error;
pub mod footprint;
pub mod occupancy;
pub mod progression;
pub mod reducer;
pub mod types;

pub use command::{Command, CommandFactory, CommandId, CommandKind};
pub use economy::{can_afford, pay, place_cost, upgrade_cost};
pub use error::RejectReason;
pub use footprint::footprint_for;
pub use occupancy::{find_next_open_slot, is_area_free};
pub use progression::{
    apply_xp, calculate_session_xp, resource_for_building, session_reward_preview, xp_threshold,
    SessionRewardPreview,
};
pub use reducer::{apply_command, Applied, ApplyMessage, ApplyResult};
pub use types::{
    now_millis, Activity, ActivityProgress, Building, BuildingKind, Footprint, MapSize, ResourceDelta,
    ResourceKind, Resources, SessionEntry, SessionTimer, Task, TilePos, Timers, Timestamp,
    TownMeta, TownState, TOWN_HALL_ID,
};
