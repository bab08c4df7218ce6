//! # Construction Economy
//!
//! Placement and upgrade prices, and the all-or-nothing payment rule.
//!
//! ## Pricing
//!
//! | kind      | place (g/w/s) | upgrade base (g/w/s) |
//! |-----------|---------------|----------------------|
//! | town_hall | 0/0/0         | 120/80/60            |
//! | farm      | 40/60/10      | 60/60/20             |
//! | sawmill   | 50/80/20      | 70/80/30             |
//! | mine      | 80/40/40      | 90/60/60             |
//! | market    | 100/60/40     | 110/80/50            |
//! | decor     | 10/10/5       | 5/5/2                |
//!
//! Food is never charged. Upgrade prices grow 10% per level past the first,
//! rounded up per resource.

use crate::error::RejectReason;
use crate::types::{BuildingKind, Resources};

/// Price of placing a new building of `kind`.
#[must_use]
pub const fn place_cost(kind: BuildingKind) -> Resources {
    match kind {
        BuildingKind::TownHall => Resources::new(0, 0, 0, 0),
        BuildingKind::Farm => Resources::new(40, 60, 10, 0),
        BuildingKind::Sawmill => Resources::new(50, 80, 20, 0),
        BuildingKind::Mine => Resources::new(80, 40, 40, 0),
        BuildingKind::Market => Resources::new(100, 60, 40, 0),
        BuildingKind::Decor => Resources::new(10, 10, 5, 0),
    }
}

const fn upgrade_base_cost(kind: BuildingKind) -> Resources {
    match kind {
        BuildingKind::TownHall => Resources::new(120, 80, 60, 0),
        BuildingKind::Farm => Resources::new(60, 60, 20, 0),
        BuildingKind::Sawmill => Resources::new(70, 80, 30, 0),
        BuildingKind::Mine => Resources::new(90, 60, 60, 0),
        BuildingKind::Market => Resources::new(110, 80, 50, 0),
        BuildingKind::Decor => Resources::new(5, 5, 2, 0),
    }
}

/// Price of upgrading a building of `kind` to `target_level`.
///
/// The base price is scaled by `1 + 0.1 * (target_level - 1)` and each
/// component is rounded up.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn upgrade_cost(kind: BuildingKind, target_level: u32) -> Resources {
    let base = upgrade_base_cost(kind);
    let factor = 1.0 + f64::from(target_level.saturating_sub(1)) * 0.1;
    let scale = |amount: u64| (amount as f64 * factor).ceil() as u64;

    Resources::new(
        scale(base.gold),
        scale(base.wood),
        scale(base.stone),
        scale(base.food),
    )
}

/// True if `available` covers `cost` in every resource.
#[inline]
#[must_use]
pub fn can_afford(available: &Resources, cost: &Resources) -> bool {
    available.covers(cost)
}

/// Deducts `cost` from `available`.
///
/// # Errors
///
/// Returns [`RejectReason::InsufficientResources`] if any resource would go
/// negative; `available` is left untouched.
pub fn pay(available: &Resources, cost: &Resources) -> Result<Resources, RejectReason> {
    available
        .checked_sub(cost)
        .ok_or(RejectReason::InsufficientResources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_cost_never_charges_food() {
        for kind in BuildingKind::ALL {
            assert_eq!(place_cost(kind).food, 0);
        }
    }

    #[test]
    fn test_upgrade_cost_scaling() {
        assert_eq!(
            upgrade_cost(BuildingKind::TownHall, 2),
            Resources::new(132, 88, 66, 0)
        );
        assert_eq!(
            upgrade_cost(BuildingKind::TownHall, 3),
            Resources::new(144, 96, 72, 0)
        );
        assert_eq!(
            upgrade_cost(BuildingKind::Farm, 3),
            Resources::new(72, 72, 24, 0)
        );
    }

    #[test]
    fn test_upgrade_cost_rounds_up() {
        // 2 * 1.1 = 2.2 -> 3
        assert_eq!(upgrade_cost(BuildingKind::Decor, 2).stone, 3);
    }

    #[test]
    fn test_pay() {
        let wallet = Resources::new(100, 100, 100, 0);
        let cost = place_cost(BuildingKind::Farm);
        assert!(can_afford(&wallet, &cost));
        assert_eq!(pay(&wallet, &cost), Ok(Resources::new(60, 40, 90, 0)));

        let poor = Resources::new(10, 10, 10, 10);
        assert_eq!(pay(&poor, &cost), Err(RejectReason::InsufficientResources));
    }
}
