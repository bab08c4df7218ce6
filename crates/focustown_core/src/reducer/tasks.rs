//! Counter tasks.

use super::{clip, Applied, ApplyResult};
use crate::error::RejectReason;
use crate::progression::apply_xp;
use crate::types::{ActivityProgress, Task, TownState};

const NAME_MAX_CHARS: usize = 40;

fn position_of(state: &TownState, task_id: &str) -> Result<usize, RejectReason> {
    state
        .tasks
        .iter()
        .position(|t| t.id == task_id)
        .ok_or(RejectReason::TaskMissing)
}

/// Appends a task. An existing `task_id` is not checked; lookups by id then
/// resolve to the earliest task with it.
pub(super) fn add(
    state: &TownState,
    task_id: &str,
    name: &str,
    target: i64,
    reward_xp: i64,
) -> Applied {
    let mut next = state.clone();
    next.tasks.push(Task {
        id: task_id.to_string(),
        name: clip(name, NAME_MAX_CHARS),
        progress: 0,
        target: u64::try_from(target.max(1)).unwrap_or(1),
        reward_xp: u64::try_from(reward_xp.max(0)).unwrap_or(0),
        completed: false,
    });
    Applied::silent(next)
}

pub(super) fn update_progress(state: &TownState, task_id: &str, delta: i64) -> ApplyResult {
    let index = position_of(state, task_id)?;
    let task = &state.tasks[index];
    if task.completed {
        return Err(RejectReason::TaskComplete);
    }

    let raw = i128::from(task.progress) + i128::from(delta);
    let progress = u64::try_from(raw.max(0)).unwrap_or(u64::MAX);

    let mut next = state.clone();
    let task = &mut next.tasks[index];
    task.progress = progress;
    task.completed = raw >= i128::from(task.target);
    Ok(Applied::silent(next))
}

/// Completes the task and credits its XP to the first activity, if any.
pub(super) fn complete(state: &TownState, task_id: &str) -> ApplyResult {
    let index = position_of(state, task_id)?;

    let mut next = state.clone();
    let task = &mut next.tasks[index];
    task.progress = task.target;
    task.completed = true;
    let reward_xp = task.reward_xp;

    if let Some(first) = state.activities.first() {
        let current = next
            .activity_progress
            .get(&first.id)
            .cloned()
            .unwrap_or_else(|| ActivityProgress::fresh(&first.id));
        next.activity_progress
            .insert(first.id.clone(), apply_xp(&current, reward_xp));
    }
    Ok(Applied::silent(next))
}
