//! Activity creation and removal.

use super::{clip, Applied, ApplyResult};
use crate::error::RejectReason;
use crate::types::{Activity, ActivityProgress, BuildingKind, TownState};

const NAME_MAX_CHARS: usize = 30;
const CATEGORY_MAX_CHARS: usize = 24;

/// Category used when the given one is blank.
pub(crate) const DEFAULT_CATEGORY: &str = "Ozel";

pub(super) fn add(
    state: &TownState,
    activity_id: &str,
    name: &str,
    category: &str,
    building: BuildingKind,
) -> ApplyResult {
    if state.activity(activity_id).is_some() {
        return Err(RejectReason::ActivityExists);
    }

    let mut category = clip(category, CATEGORY_MAX_CHARS);
    if category.is_empty() {
        category = DEFAULT_CATEGORY.to_string();
    }

    let mut next = state.clone();
    next.activities.push(Activity {
        id: activity_id.to_string(),
        name: clip(name, NAME_MAX_CHARS),
        category,
        building,
    });
    next.activity_progress
        .entry(activity_id.to_string())
        .or_insert_with(|| ActivityProgress::fresh(activity_id));
    Ok(Applied::silent(next))
}

pub(super) fn remove(state: &TownState, activity_id: &str) -> ApplyResult {
    if state.activity(activity_id).is_none() {
        return Err(RejectReason::ActivityNotFound);
    }
    let in_use = state
        .timers
        .session
        .as_ref()
        .is_some_and(|timer| timer.activity_id == activity_id);
    if in_use {
        return Err(RejectReason::ActivityInUse);
    }

    let mut next = state.clone();
    next.activities.retain(|a| a.id != activity_id);
    next.activity_progress.remove(activity_id);
    Ok(Applied::silent(next))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_trims_and_defaults() {
        let town = TownState::initial(0);
        let long_name = "x".repeat(50);
        let applied = add(&town, "a1", &format!("  {long_name}  "), "   ", BuildingKind::Farm).unwrap();

        let activity = applied.state.activity("a1").unwrap();
        assert_eq!(activity.name.chars().count(), 30);
        assert_eq!(activity.category, DEFAULT_CATEGORY);
        assert_eq!(
            applied.state.activity_progress.get("a1"),
            Some(&ActivityProgress::fresh("a1"))
        );
    }

    #[test]
    fn test_add_duplicate() {
        let town = TownState::initial(0);
        let once = add(&town, "a1", "Read", "Study", BuildingKind::Mine).unwrap().state;
        assert_eq!(
            add(&once, "a1", "Again", "Study", BuildingKind::Mine),
            Err(RejectReason::ActivityExists)
        );
    }

    #[test]
    fn test_remove_drops_progress() {
        let town = TownState::initial(0);
        let with = add(&town, "a1", "Read", "Study", BuildingKind::Mine).unwrap().state;
        let without = remove(&with, "a1").unwrap().state;
        assert!(without.activities.is_empty());
        assert!(without.activity_progress.is_empty());
        assert_eq!(remove(&without, "a1"), Err(RejectReason::ActivityNotFound));
    }
}
