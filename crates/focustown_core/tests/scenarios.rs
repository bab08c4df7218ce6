//! End-to-end reducer scenarios on the starter town.

use focustown_core::{
    apply_command, calculate_session_xp, ApplyMessage, BuildingKind, Command, CommandFactory,
    CommandKind, RejectReason, ResourceKind, Timestamp, TownState, TOWN_HALL_ID,
};

const MINUTE: Timestamp = 60_000;

fn clock() -> Timestamp {
    0
}

fn factory() -> CommandFactory {
    CommandFactory::with_clock(clock)
}

fn add_activity(id: &str, building: BuildingKind) -> Command {
    Command::new(
        format!("cmd-{id}"),
        0,
        CommandKind::AddActivity {
            activity_id: id.to_string(),
            name: "Reading".to_string(),
            category: "Study".to_string(),
            building_kind: building,
        },
    )
}

fn town_with_activity(building: BuildingKind) -> TownState {
    let town = TownState::initial(0);
    apply_command(&town, &add_activity("a1", building), 0)
        .unwrap()
        .state
}

#[test]
fn test_start_session_installs_timer() {
    let town = town_with_activity(BuildingKind::Farm);
    let start = factory().start_session(300, "a1", None);

    let applied = apply_command(&town, &start, 10).unwrap();
    let timer = applied.state.timers.active_session().unwrap();
    assert_eq!(timer.session_id, start.id);
    assert_eq!(timer.start_at, 10);
    assert_eq!(timer.planned_duration, 300);
    assert_eq!(applied.state.version, town.version + 1);
}

#[test]
fn test_double_start_is_rejected() {
    let town = town_with_activity(BuildingKind::Farm);
    let first = factory().start_session(300, "a1", None);
    let second = factory().start_session(300, "a1", None);

    let running = apply_command(&town, &first, 0).unwrap().state;
    assert_eq!(
        apply_command(&running, &second, 1),
        Err(RejectReason::SessionAlreadyActive)
    );
}

#[test]
fn test_start_rejects_bad_duration_and_unknown_activity() {
    let town = town_with_activity(BuildingKind::Farm);
    let too_short = Command::new(
        "short",
        0,
        CommandKind::StartSession {
            duration: 299,
            activity_id: "a1".to_string(),
            reward_building: None,
        },
    );
    assert_eq!(
        apply_command(&town, &too_short, 0),
        Err(RejectReason::InvalidDuration)
    );
    assert_eq!(
        apply_command(&town, &factory().start_session(600, "nope", None), 0),
        Err(RejectReason::ActivityNotFound)
    );
}

#[test]
fn test_complete_session_rewards_focus() {
    let town = town_with_activity(BuildingKind::Farm);
    let start = factory().start_session(1500, "a1", None);
    let running = apply_command(&town, &start, 0).unwrap().state;

    let finish = factory().complete_session(start.id.clone());
    let applied = apply_command(&running, &finish, 25 * MINUTE).unwrap();

    assert_eq!(applied.message, Some(ApplyMessage::SessionComplete));
    let done = applied.state;
    assert!(done.timers.session.is_none());
    // One farm at level 1: 25 minutes x 1.0 x 1.
    assert_eq!(done.resources.food, 300 + 25);
    assert_eq!(done.activity_progress["a1"].xp, 50);
    assert_eq!(done.activity_progress["a1"].level, 1);
    assert_eq!(done.session_log.len(), 1);
    assert_eq!(done.session_log[0].minutes, 25);
    assert_eq!(done.session_log[0].id, finish.id);
}

#[test]
fn test_complete_session_under_a_minute() {
    let town = town_with_activity(BuildingKind::Mine);
    let start = factory().start_session(300, "a1", None);
    let running = apply_command(&town, &start, 0).unwrap().state;

    let applied = apply_command(&running, &factory().complete_session(start.id), 59_999).unwrap();
    assert_eq!(applied.message, Some(ApplyMessage::SessionEndedNoReward));
    assert_eq!(applied.state.resources, running.resources);
    assert_eq!(applied.state.session_log[0].minutes, 0);
}

#[test]
fn test_reward_building_override() {
    let town = town_with_activity(BuildingKind::Farm);
    let start = factory().start_session(600, "a1", Some(BuildingKind::Market));
    let running = apply_command(&town, &start, 0).unwrap().state;

    // No market stands, so the multiplier falls back to one.
    let done = apply_command(&running, &factory().complete_session(start.id), 10 * MINUTE)
        .unwrap()
        .state;
    assert_eq!(done.resources.gold, 500 + 10);
    assert_eq!(done.resources.food, 300);
}

#[test]
fn test_complete_session_mismatch_and_missing_activity() {
    let town = town_with_activity(BuildingKind::Farm);
    let start = factory().start_session(300, "a1", None);
    let running = apply_command(&town, &start, 0).unwrap().state;

    assert_eq!(
        apply_command(&running, &factory().complete_session("other"), MINUTE),
        Err(RejectReason::SessionNotFound)
    );

    let mut orphaned = running.clone();
    orphaned.activities.clear();
    assert_eq!(
        apply_command(&orphaned, &factory().complete_session(start.id), MINUTE),
        Err(RejectReason::ActivityNotFound)
    );
}

#[test]
fn test_delete_activity_in_use() {
    let town = town_with_activity(BuildingKind::Farm);
    let start = factory().start_session(300, "a1", None);
    let running = apply_command(&town, &start, 0).unwrap().state;
    assert_eq!(
        apply_command(&running, &factory().delete_activity("a1"), 1),
        Err(RejectReason::ActivityInUse)
    );
}

#[test]
fn test_place_on_seeded_farm() {
    let town = TownState::initial(0);
    let place = factory().place_building("farm-2", BuildingKind::Farm, 2, 6, 0);
    assert_eq!(apply_command(&town, &place, 0), Err(RejectReason::TileOccupied));
}

#[test]
fn test_place_with_taken_id_is_rejected() {
    let town = TownState::initial(0);
    let twin = factory().place_building("farm-1", BuildingKind::Decor, 3, 8, 0);
    assert_eq!(apply_command(&town, &twin, 0), Err(RejectReason::BuildingExists));

    // Moving and deleting still address exactly one building.
    let moved = apply_command(&town, &factory().move_building("farm-1", 2, 7, None), 0)
        .unwrap()
        .state;
    let gone = apply_command(&moved, &factory().delete_building("farm-1"), 0)
        .unwrap()
        .state;
    assert!(gone.building("farm-1").is_none());
}

#[test]
fn test_move_onto_own_footprint() {
    let town = TownState::initial(0);
    // farm-1 covers (2..=3, 6..=7); one row down overlaps its old tiles only.
    let moved = apply_command(&town, &factory().move_building("farm-1", 2, 7, None), 0)
        .unwrap()
        .state;
    let farm = moved.building("farm-1").unwrap();
    assert_eq!((farm.x, farm.y), (2, 7));
    assert_eq!(moved.buildings.len(), town.buildings.len());

    // Self-exclusion does not hide the town hall at (4..=6, 4..=6).
    assert_eq!(
        apply_command(&town, &factory().move_building("farm-1", 3, 6, None), 0),
        Err(RejectReason::TileOccupied)
    );
}

#[test]
fn test_session_xp_examples() {
    assert_eq!(calculate_session_xp(10), 10);
    assert_eq!(calculate_session_xp(25), 50);
}

#[test]
fn test_town_hall_is_protected() {
    let town = TownState::initial(0);
    assert_eq!(
        apply_command(&town, &factory().delete_building(TOWN_HALL_ID), 0),
        Err(RejectReason::ProtectedBuilding)
    );
}

#[test]
fn test_rejection_is_idempotent() {
    let town = TownState::initial(0);
    let place = factory().place_building("farm-2", BuildingKind::Farm, 2, 6, 0);
    let first = apply_command(&town, &place, 0);
    let second = apply_command(&town, &place, 0);
    assert_eq!(first, second);
    assert_eq!(town, TownState::initial(0));
}

#[test]
fn test_claim_production_has_no_cooldown() {
    let town = TownState::initial(0);
    let claim = factory().claim_production("farm-1");
    let once = apply_command(&town, &claim, 5).unwrap().state;
    let twice = apply_command(&once, &claim, 5).unwrap().state;
    assert_eq!(twice.resources.get(ResourceKind::Gold), 502);
    assert_eq!(twice.version, town.version + 2);
}

#[test]
fn test_upgrade_until_broke() {
    let mut town = TownState::initial(0);
    let upgrade = factory().upgrade_building(TOWN_HALL_ID);
    let mut upgrades = 0;
    loop {
        match apply_command(&town, &upgrade, 0) {
            Ok(applied) => {
                town = applied.state;
                upgrades += 1;
            }
            Err(reason) => {
                assert_eq!(reason, RejectReason::InsufficientResources);
                break;
            }
        }
    }
    // Stone runs out first: 66 + 72 = 138, then 78 exceeds the remaining 62.
    assert_eq!(upgrades, 2);
    assert_eq!(town.town_hall_level(), 3);
    assert_eq!(town.resources.stone, 62);
}
