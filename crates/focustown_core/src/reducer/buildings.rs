//! Building placement, movement, upgrades, production and demolition.

use super::{Applied, ApplyResult};
use crate::economy::{pay, place_cost, upgrade_cost};
use crate::error::RejectReason;
use crate::occupancy::is_area_free;
use crate::types::{Building, BuildingKind, ResourceKind, Timestamp, TownState, TOWN_HALL_ID};

/// Same-kind buildings allowed while the town hall is below [`UNCAPPED_HALL_LEVEL`].
pub(crate) const MAX_PER_KIND: usize = 2;

/// Town hall level at which the per-kind cap is lifted.
pub(crate) const UNCAPPED_HALL_LEVEL: u32 = 10;

fn position_of(state: &TownState, building_id: &str) -> Result<usize, RejectReason> {
    state
        .buildings
        .iter()
        .position(|b| b.id == building_id)
        .ok_or(RejectReason::BuildingMissing)
}

pub(super) fn place(
    state: &TownState,
    building_id: &str,
    kind: BuildingKind,
    x: i32,
    y: i32,
    rot: i32,
    timestamp: Timestamp,
) -> ApplyResult {
    if state.building(building_id).is_some() {
        return Err(RejectReason::BuildingExists);
    }
    let building = Building {
        rot,
        produced_until: Some(timestamp),
        ..Building::new(building_id, kind, x, y)
    };
    if !is_area_free(state, x, y, building.footprint, None) {
        return Err(RejectReason::TileOccupied);
    }
    if state.town_hall_level() < UNCAPPED_HALL_LEVEL && state.count_of(kind) >= MAX_PER_KIND {
        return Err(RejectReason::BuildingLimit);
    }
    let resources = pay(&state.resources, &place_cost(kind))?;

    let mut next = state.clone();
    next.resources = resources;
    next.buildings.push(building);
    Ok(Applied::silent(next))
}

pub(super) fn relocate(
    state: &TownState,
    building_id: &str,
    x: i32,
    y: i32,
    rot: Option<i32>,
) -> ApplyResult {
    let index = position_of(state, building_id)?;
    let footprint = state.buildings[index].footprint;
    if !is_area_free(state, x, y, footprint, Some(building_id)) {
        return Err(RejectReason::TileOccupied);
    }

    let mut next = state.clone();
    let building = &mut next.buildings[index];
    building.x = x;
    building.y = y;
    if let Some(rot) = rot {
        building.rot = rot;
    }
    Ok(Applied::silent(next))
}

pub(super) fn upgrade(state: &TownState, building_id: &str) -> ApplyResult {
    let index = position_of(state, building_id)?;
    let current = &state.buildings[index];
    let cost = upgrade_cost(current.kind, current.level.saturating_add(1));
    let resources = pay(&state.resources, &cost)?;

    let mut next = state.clone();
    next.resources = resources;
    next.buildings[index].level = current.level.saturating_add(1);
    Ok(Applied::silent(next))
}

pub(super) fn claim(state: &TownState, building_id: &str, timestamp: Timestamp) -> ApplyResult {
    let index = position_of(state, building_id)?;
    let reward = u64::from(state.buildings[index].level.max(1));

    let mut next = state.clone();
    next.resources.credit(ResourceKind::Gold, reward);
    next.buildings[index].produced_until = Some(timestamp);
    Ok(Applied::silent(next))
}

pub(super) fn demolish(state: &TownState, building_id: &str) -> ApplyResult {
    if building_id == TOWN_HALL_ID {
        return Err(RejectReason::ProtectedBuilding);
    }
    let index = position_of(state, building_id)?;

    let mut next = state.clone();
    next.buildings.remove(index);
    Ok(Applied::silent(next))
}
