//! # Activity Progression
//!
//! XP curves, session rewards and level-up rollover.
//!
//! ## Session XP
//!
//! Minutes are counted in blocks of ten; each block is worth twice the one
//! before it:
//!
//! ```text
//! minutes:     1..=10   11..=20   21..=30   ...
//! xp/minute:      1        2         4      ...
//! ```
//!
//! ## Levels
//!
//! Level `L` needs `120 + 30 * (L - 1)` XP. Surplus XP rolls over, possibly
//! through several levels at once.

use serde::{Deserialize, Serialize};

use crate::types::{ActivityProgress, BuildingKind, ResourceKind, Timestamp, TownState};

/// Length of one XP block in minutes.
const XP_BLOCK_MINUTES: u64 = 10;

const MILLIS_PER_MINUTE: Timestamp = 60_000;

/// XP required to leave `level`.
#[inline]
#[must_use]
pub const fn xp_threshold(level: u32) -> u64 {
    120 + 30 * (level.saturating_sub(1) as u64)
}

/// XP earned by a session of `minutes` whole minutes.
#[must_use]
pub fn calculate_session_xp(minutes: u64) -> u64 {
    let mut remaining = minutes;
    let mut multiplier: u64 = 1;
    let mut total: u64 = 0;

    while remaining > 0 {
        let chunk = remaining.min(XP_BLOCK_MINUTES);
        total = total.saturating_add(chunk.saturating_mul(multiplier));
        remaining -= chunk;
        multiplier = multiplier.saturating_mul(2);
        if total == u64::MAX {
            break;
        }
    }

    total
}

/// Resource units earned per focused minute at an activity level.
#[inline]
#[must_use]
pub fn reward_per_minute(level: u32) -> f64 {
    1.0 + f64::from(level.saturating_sub(1)) * 0.1
}

/// Resource a building kind yields as a session reward.
#[inline]
#[must_use]
pub const fn resource_for_building(kind: BuildingKind) -> ResourceKind {
    match kind {
        BuildingKind::Mine => ResourceKind::Stone,
        BuildingKind::Sawmill => ResourceKind::Wood,
        BuildingKind::Farm => ResourceKind::Food,
        BuildingKind::TownHall | BuildingKind::Market | BuildingKind::Decor => ResourceKind::Gold,
    }
}

/// XP needed to climb `levels` levels starting from a level whose threshold is
/// `threshold`. Thresholds grow by 30 per level, so this is an arithmetic sum.
fn cost_of_levels(threshold: u64, levels: u128) -> u128 {
    levels * u128::from(threshold) + 15 * levels * levels.saturating_sub(1)
}

/// Integer square root, rounded down.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn isqrt(n: u128) -> u128 {
    let mut root = (n as f64).sqrt() as u128;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root
}

/// Largest number of whole levels `xp` pays for, starting at `threshold`.
///
/// Solves `15k² + (threshold - 15)k <= xp` for `k`.
fn levels_covered(threshold: u64, xp: u64) -> u128 {
    let xp = u128::from(xp);
    let b = u128::from(threshold.saturating_sub(15));
    let mut levels = (isqrt(b * b + 60 * xp) - b) / 30;
    while cost_of_levels(threshold, levels + 1) <= xp {
        levels += 1;
    }
    while levels > 0 && cost_of_levels(threshold, levels) > xp {
        levels -= 1;
    }
    levels
}

/// Adds `gained` XP to `progress`, rolling over as many levels as it covers.
#[must_use]
pub fn apply_xp(progress: &ActivityProgress, gained: u64) -> ActivityProgress {
    let total = progress.xp.saturating_add(gained);
    let level = progress.level.max(1);
    let threshold = xp_threshold(level);

    let headroom = u128::from(u32::MAX - level);
    let climbed = levels_covered(threshold, total).min(headroom);
    let spent = cost_of_levels(threshold, climbed);

    ActivityProgress {
        activity_id: progress.activity_id.clone(),
        level: level.saturating_add(u32::try_from(climbed).unwrap_or(u32::MAX)),
        xp: u64::try_from(u128::from(total) - spent).unwrap_or(0),
    }
}

/// What completing the active session right now would yield.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRewardPreview {
    /// Activity the session counts toward.
    pub activity_id: String,
    /// Whole minutes elapsed since the session started.
    pub minutes: u64,
    /// XP that would be granted.
    pub xp: u64,
    /// Amount of `reward_resource` that would be credited.
    pub reward_amount: u64,
    /// Resource that would be credited.
    pub reward_resource: ResourceKind,
    /// Current progress of the activity, before this session.
    pub current: ActivityProgress,
    /// Number of buildings of the rewarding kind.
    pub building_count: usize,
}

/// Previews the reward of the active session at `timestamp`.
///
/// Returns `None` if no session is active or its activity no longer exists.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn session_reward_preview(
    state: &TownState,
    timestamp: Timestamp,
) -> Option<SessionRewardPreview> {
    let timer = state.timers.active_session()?;
    let activity = state.activity(&timer.activity_id)?;

    let elapsed = timestamp.saturating_sub(timer.start_at).max(0);
    let minutes = (elapsed / MILLIS_PER_MINUTE) as u64;

    let reward_source = timer.reward_building.unwrap_or(activity.building);
    let current = state
        .activity_progress
        .get(&activity.id)
        .cloned()
        .unwrap_or_else(|| ActivityProgress::fresh(&activity.id));
    let building_count = state.count_of(reward_source);

    let raw = minutes as f64 * reward_per_minute(current.level) * building_count.max(1) as f64;
    let reward_amount = raw.round().max(0.0) as u64;

    Some(SessionRewardPreview {
        activity_id: activity.id.clone(),
        minutes,
        xp: calculate_session_xp(minutes),
        reward_amount,
        reward_resource: resource_for_building(reward_source),
        current,
        building_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_xp_blocks() {
        assert_eq!(calculate_session_xp(0), 0);
        assert_eq!(calculate_session_xp(5), 5);
        assert_eq!(calculate_session_xp(10), 10);
        assert_eq!(calculate_session_xp(25), 10 + 10 * 2 + 5 * 4);
        assert_eq!(calculate_session_xp(60), 10 + 20 + 40 + 80 + 160 + 320);
    }

    #[test]
    fn test_session_xp_saturates() {
        assert_eq!(calculate_session_xp(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_threshold_curve() {
        assert_eq!(xp_threshold(1), 120);
        assert_eq!(xp_threshold(2), 150);
        assert_eq!(xp_threshold(5), 240);
    }

    #[test]
    fn test_apply_xp_multi_level() {
        let start = ActivityProgress::fresh("a1");
        // 120 + 150 + 10
        let after = apply_xp(&start, 280);
        assert_eq!(after.level, 3);
        assert_eq!(after.xp, 10);
    }

    #[test]
    fn test_apply_xp_exact_threshold() {
        let after = apply_xp(&ActivityProgress::fresh("a1"), 120);
        assert_eq!((after.level, after.xp), (2, 0));
    }

    #[test]
    fn test_apply_xp_matches_level_by_level() {
        for start_level in [1, 2, 7] {
            for gained in (0..3_000).step_by(7) {
                let start = ActivityProgress {
                    level: start_level,
                    xp: 11,
                    ..ActivityProgress::fresh("a1")
                };
                let mut level = start_level;
                let mut xp = 11 + gained;
                while xp >= xp_threshold(level) {
                    xp -= xp_threshold(level);
                    level += 1;
                }
                let after = apply_xp(&start, gained);
                assert_eq!((after.level, after.xp), (level, xp), "gained {gained}");
            }
        }
    }

    #[test]
    fn test_apply_xp_huge_gain_is_closed_form() {
        let after = apply_xp(&ActivityProgress::fresh("a1"), u64::MAX);
        assert!(after.xp < xp_threshold(after.level));
        let spent = cost_of_levels(120, u128::from(after.level - 1));
        assert_eq!(spent + u128::from(after.xp), u128::from(u64::MAX));
        // Roughly sqrt(u64::MAX / 15) levels.
        assert!(after.level > 1_000_000_000);
    }

    #[test]
    fn test_reward_resource_table() {
        assert_eq!(resource_for_building(BuildingKind::Mine), ResourceKind::Stone);
        assert_eq!(resource_for_building(BuildingKind::Sawmill), ResourceKind::Wood);
        assert_eq!(resource_for_building(BuildingKind::Farm), ResourceKind::Food);
        assert_eq!(resource_for_building(BuildingKind::Decor), ResourceKind::Gold);
    }

    #[test]
    fn test_reward_per_minute() {
        assert!((reward_per_minute(1) - 1.0).abs() < f64::EPSILON);
        assert!((reward_per_minute(3) - 1.2).abs() < 1e-9);
    }
}
