//! Importance scoring and ordering of tasks.
//!
//! Everything here is a pure function of the tasks, the optional current user
//! and the instant passed in as `now`. Nothing touches the store.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};

use crate::error::{Result, TaskError};
use crate::fields::{Priority, Status};
use crate::task::Task;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Tags that mark a task as more pressing than its priority alone says.
pub const ESCALATION_TAGS: [&str; 3] = ["blocker", "critical", "urgent"];

pub const OVERDUE_BONUS: i64 = 35;
pub const DUE_TODAY_BONUS: i64 = 20;
pub const DUE_SOON_BONUS: i64 = 15;
pub const DUE_THIS_WEEK_BONUS: i64 = 10;
pub const DONE_PENALTY: i64 = 50;
pub const REVIEW_PENALTY: i64 = 15;
pub const TAG_BONUS: i64 = 8;
pub const RECENT_UPDATE_BONUS: i64 = 5;
pub const ASSIGNED_BONUS: i64 = 12;

/// Priority contribution; `None` stands for a value outside the enumeration.
pub fn base_score(priority: Option<Priority>) -> i64 {
    priority.map_or(0, Priority::weight) * 10
}

/// Whole days until `due`, rounded up. Negative when `due` has passed by
/// more than a full day; zero for anything within the last 24 hours.
pub fn days_until(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (due - now).num_milliseconds();
    -(-ms).div_euclid(MS_PER_DAY)
}

/// Whole days elapsed since `then`, rounded down.
pub fn days_since(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - then).num_milliseconds().div_euclid(MS_PER_DAY)
}

fn due_date_bonus(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    match days_until(due, now) {
        d if d < 0 => OVERDUE_BONUS,
        0 => DUE_TODAY_BONUS,
        1..=2 => DUE_SOON_BONUS,
        3..=7 => DUE_THIS_WEEK_BONUS,
        _ => 0,
    }
}

/// Importance of `task` at `now`. Never negative.
pub fn calculate_task_score(task: &Task, current_user: Option<&str>, now: DateTime<Utc>) -> u32 {
    let mut score = base_score(Some(task.priority));

    if let Some(due) = task.due_date {
        score += due_date_bonus(due, now);
    }

    score -= match task.status {
        Status::Done => DONE_PENALTY,
        Status::Review => REVIEW_PENALTY,
        Status::Todo | Status::InProgress => 0,
    };

    if task.tags.iter().any(|t| ESCALATION_TAGS.contains(&t.as_str())) {
        score += TAG_BONUS;
    }

    if days_since(task.updated_at, now) < 1 {
        score += RECENT_UPDATE_BONUS;
    }

    if let Some(user) = current_user {
        if task.assigned_to.as_deref() == Some(user) {
            score += ASSIGNED_BONUS;
        }
    }

    score.max(0) as u32
}

/// A new list ordered by descending score. Equal scores keep their input order.
pub fn sort_tasks_by_importance<'a>(tasks: &[&'a Task], current_user: Option<&str>, now: DateTime<Utc>) -> Vec<&'a Task> {
    let mut sorted = tasks.to_vec();
    // sort_by_cached_key is stable.
    sorted.sort_by_cached_key(|t| Reverse(calculate_task_score(t, current_user, now)));
    sorted
}

/// The `limit` most important tasks.
pub fn get_top_priority_tasks<'a>(
    tasks: &[&'a Task],
    limit: i64,
    current_user: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<&'a Task>> {
    let limit = usize::try_from(limit).map_err(|_| TaskError::NegativeLimit(limit))?;
    let mut sorted = sort_tasks_by_importance(tasks, current_user, now);
    sorted.truncate(limit);
    Ok(sorted)
}
