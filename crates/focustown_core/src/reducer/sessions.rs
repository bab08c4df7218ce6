//! Focus session start and completion.

use super::{Applied, ApplyMessage, ApplyResult};
use crate::command::{MAX_SESSION_SECONDS, MIN_SESSION_SECONDS};
use crate::error::RejectReason;
use crate::progression::{apply_xp, session_reward_preview};
use crate::types::{BuildingKind, SessionEntry, SessionTimer, Timestamp, TownState};

pub(super) fn start(
    state: &TownState,
    command_id: &str,
    duration: u32,
    activity_id: &str,
    reward_building: Option<BuildingKind>,
    timestamp: Timestamp,
) -> ApplyResult {
    if !(MIN_SESSION_SECONDS..=MAX_SESSION_SECONDS).contains(&duration) {
        return Err(RejectReason::InvalidDuration);
    }
    if state.timers.active_session().is_some() {
        return Err(RejectReason::SessionAlreadyActive);
    }
    if state.activity(activity_id).is_none() {
        return Err(RejectReason::ActivityNotFound);
    }

    let mut next = state.clone();
    next.timers.session = Some(SessionTimer {
        active: true,
        session_id: command_id.to_string(),
        start_at: timestamp,
        planned_duration: duration,
        activity_id: activity_id.to_string(),
        reward_building,
    });
    Ok(Applied::silent(next))
}

pub(super) fn complete(
    state: &TownState,
    command_id: &str,
    session_id: &str,
    timestamp: Timestamp,
) -> ApplyResult {
    let matches = state
        .timers
        .active_session()
        .is_some_and(|timer| timer.session_id == session_id);
    if !matches {
        return Err(RejectReason::SessionNotFound);
    }
    let preview = session_reward_preview(state, timestamp).ok_or(RejectReason::ActivityNotFound)?;

    let mut next = state.clone();
    let progress = apply_xp(&preview.current, preview.xp);
    next.activity_progress
        .insert(preview.activity_id.clone(), progress);
    next.resources
        .credit(preview.reward_resource, preview.reward_amount);
    next.timers.session = None;
    next.session_log.push(SessionEntry {
        id: command_id.to_string(),
        activity_id: preview.activity_id,
        minutes: preview.minutes,
        at: timestamp,
    });

    let message = if preview.minutes > 0 {
        ApplyMessage::SessionComplete
    } else {
        ApplyMessage::SessionEndedNoReward
    };
    Ok(Applied {
        state: next,
        message: Some(message),
    })
}
