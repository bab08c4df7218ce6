//! # Occupancy
//!
//! Collision and bounds checks for building footprints.
//!
//! Two rectangles overlap iff both axis projections overlap strictly, so
//! buildings may share an edge but never a tile.

use crate::types::{Footprint, TilePos, TownState};

/// True if the `footprint` rectangle anchored at `(x, y)` lies inside the map
/// and overlaps no building other than `ignore_id`.
#[must_use]
pub fn is_area_free(
    state: &TownState,
    x: i32,
    y: i32,
    footprint: Footprint,
    ignore_id: Option<&str>,
) -> bool {
    let (x, y) = (i64::from(x), i64::from(y));
    let (w, h) = (i64::from(footprint.width), i64::from(footprint.height));

    let within_bounds = x >= 0
        && y >= 0
        && x + w <= i64::from(state.map.width)
        && y + h <= i64::from(state.map.height);
    if !within_bounds {
        return false;
    }

    !state.buildings.iter().any(|b| {
        if ignore_id == Some(b.id.as_str()) {
            return false;
        }
        let (bx, by) = (i64::from(b.x), i64::from(b.y));
        let bx2 = bx + i64::from(b.footprint.width);
        let by2 = by + i64::from(b.footprint.height);

        let x_overlap = x < bx2 && x + w > bx;
        let y_overlap = y < by2 && y + h > by;
        x_overlap && y_overlap
    })
}

/// First free anchor for `footprint`, scanning rows top to bottom and columns
/// left to right.
#[must_use]
pub fn find_next_open_slot(state: &TownState, footprint: Footprint) -> Option<TilePos> {
    let width = i32::try_from(state.map.width).unwrap_or(i32::MAX);
    let height = i32::try_from(state.map.height).unwrap_or(i32::MAX);

    (0..height)
        .flat_map(|row| (0..width).map(move |col| TilePos::new(col, row)))
        .find(|pos| is_area_free(state, pos.x, pos.y, footprint, None))
}
