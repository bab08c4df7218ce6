//! Default footprints per building kind.

use crate::types::{BuildingKind, Footprint};

/// Tile area a freshly placed building of `kind` occupies.
///
/// The result is copied into the building at placement time, so changing this
/// table never moves buildings that already stand.
#[inline]
#[must_use]
pub const fn footprint_for(kind: BuildingKind) -> Footprint {
    match kind {
        BuildingKind::TownHall => Footprint::new(3, 3),
        BuildingKind::Farm
        | BuildingKind::Sawmill
        | BuildingKind::Mine
        | BuildingKind::Market => Footprint::new(2, 2),
        BuildingKind::Decor => Footprint::new(1, 1),
    }
}
