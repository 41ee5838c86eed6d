//! Task data structure and its lifecycle.
//!
//! A `Task` is one unit of trackable work. It owns its own timestamps: every
//! mutation goes through a method that takes the current time, so `updated_at`
//! and `completed_at` stay consistent with `status`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::db::parse_due_input;
use crate::error::{Result, TaskError};
use crate::fields::*;

/// A work item with scheduling and categorisation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a fresh TODO task with a newly generated id.
    pub fn new(
        title: &str,
        description: &str,
        priority: Priority,
        due_date: Option<DateTime<Utc>>,
        tags: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        Task {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            priority,
            status: Status::Todo,
            due_date,
            tags: dedup_tags(tags),
            assigned_to: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn mark_as_done(&mut self, now: DateTime<Utc>) {
        self.status = Status::Done;
        self.completed_at = Some(now);
        self.touch(now);
    }

    /// Apply every field present in `update`; `updated_at` is refreshed even
    /// when the update is empty.
    pub fn update(&mut self, update: TaskUpdate, now: DateTime<Utc>) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(status) = update.status {
            self.status = status;
            if status == Status::Done {
                self.completed_at.get_or_insert(now);
            } else {
                self.completed_at = None;
            }
        }
        if let Some(due_date) = update.due_date {
            self.due_date = due_date;
        }
        if let Some(tags) = update.tags {
            self.tags = dedup_tags(&tags);
        }
        if let Some(assigned_to) = update.assigned_to {
            self.assigned_to = assigned_to;
        }
        self.touch(now);
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => due < now && self.status != Status::Done,
            None => false,
        }
    }

    /// Returns whether the tag was newly added.
    pub fn add_tag(&mut self, tag: &str, now: DateTime<Utc>) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        self.touch(now);
        true
    }

    /// Returns whether the tag was present and has been removed.
    pub fn remove_tag(&mut self, tag: &str, now: DateTime<Utc>) -> bool {
        let tag = tag.trim();
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        if self.tags.len() == before {
            return false;
        }
        self.touch(now);
        true
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        // Keep created_at <= updated_at even if the clock steps backwards.
        self.updated_at = now.max(self.created_at);
    }
}

/// Trim tags, drop empties and collapse duplicates keeping the first occurrence.
fn dedup_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// A partial set of task fields. `None` leaves the field untouched; the
/// nested options on `due_date` and `assigned_to` allow clearing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
    pub assigned_to: Option<Option<String>>,
}

impl TaskUpdate {
    pub fn status(status: Status) -> Self {
        TaskUpdate { status: Some(status), ..Default::default() }
    }

    pub fn priority(priority: Priority) -> Self {
        TaskUpdate { priority: Some(priority), ..Default::default() }
    }

    pub fn due_date(due_date: Option<DateTime<Utc>>) -> Self {
        TaskUpdate { due_date: Some(due_date), ..Default::default() }
    }

    pub fn assigned_to(user: Option<String>) -> Self {
        TaskUpdate { assigned_to: Some(user), ..Default::default() }
    }

    /// Build an update from textual `key=value` style pairs.
    ///
    /// Recognised keys: `title`, `description`, `priority`, `status`,
    /// `due_date`, `tags` (comma separated) and `assigned_to`, plus a few
    /// spelling aliases. Unknown keys are ignored. An empty value (or `none`)
    /// for `due_date`/`assigned_to` clears the field.
    pub fn from_fields<I, K, V>(fields: I, now: DateTime<Utc>) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut update = TaskUpdate::default();
        for (key, value) in fields {
            let value = value.as_ref();
            match key.as_ref().trim().to_lowercase().replace('-', "_").as_str() {
                "title" => {
                    if value.trim().is_empty() {
                        return Err(TaskError::EmptyTitle);
                    }
                    update.title = Some(value.to_string());
                }
                "description" | "desc" => update.description = Some(value.to_string()),
                "priority" => update.priority = Some(value.parse()?),
                "status" => update.status = Some(value.parse()?),
                "due_date" | "due" | "duedate" => {
                    update.due_date = Some(if is_clear(value) {
                        None
                    } else {
                        Some(parse_due_input(value, now).ok_or_else(|| TaskError::InvalidDate(value.to_string()))?)
                    });
                }
                "tags" => {
                    update.tags = Some(value.split(',').map(str::to_string).collect());
                }
                "assigned_to" | "assignee" | "assignedto" => {
                    update.assigned_to = Some(if is_clear(value) { None } else { Some(value.trim().to_string()) });
                }
                other => debug!("ignoring unrecognised task field '{other}'"),
            }
        }
        Ok(update)
    }
}

fn is_clear(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("none")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
    }

    fn sample() -> Task {
        Task::new("Write report", "quarterly", Priority::High, None, &["work".into()], t0())
    }

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new("A", "", Priority::default(), None, &[], t0());
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.created_at, t0());
        assert_eq!(task.updated_at, t0());
        assert!(task.completed_at.is_none());
        assert!(task.assigned_to.is_none());
        assert!(Uuid::parse_str(&task.id).is_ok());
    }

    #[test]
    fn test_new_tasks_get_distinct_ids() {
        assert_ne!(sample().id, sample().id);
    }

    #[test]
    fn test_new_collapses_duplicate_tags() {
        let tags = vec!["a".to_string(), " b ".into(), "a".into(), "".into()];
        let task = Task::new("A", "", Priority::Low, None, &tags, t0());
        assert_eq!(task.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_mark_as_done_sets_completed_at() {
        let mut task = sample();
        let later = t0() + Duration::hours(3);
        task.mark_as_done(later);
        assert_eq!(task.status, Status::Done);
        assert_eq!(task.completed_at, Some(later));
        assert_eq!(task.updated_at, later);
    }

    #[test]
    fn test_update_overwrites_present_fields_only() {
        let mut task = sample();
        let later = t0() + Duration::minutes(5);
        task.update(
            TaskUpdate { title: Some("Renamed".into()), priority: Some(Priority::Low), ..Default::default() },
            later,
        );
        assert_eq!(task.title, "Renamed");
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.description, "quarterly");
        assert_eq!(task.tags, vec!["work"]);
        assert_eq!(task.updated_at, later);
    }

    #[test]
    fn test_empty_update_still_refreshes_updated_at() {
        let mut task = sample();
        let later = t0() + Duration::seconds(1);
        task.update(TaskUpdate::default(), later);
        assert_eq!(task.updated_at, later);
    }

    #[test]
    fn test_leaving_done_clears_completed_at() {
        let mut task = sample();
        task.mark_as_done(t0() + Duration::hours(1));
        task.update(TaskUpdate::status(Status::InProgress), t0() + Duration::hours(2));
        assert_eq!(task.status, Status::InProgress);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_generic_update_to_done_sets_completed_at_once() {
        let mut task = sample();
        let first = t0() + Duration::hours(1);
        task.update(TaskUpdate::status(Status::Done), first);
        assert_eq!(task.completed_at, Some(first));
        task.update(TaskUpdate::status(Status::Done), first + Duration::hours(1));
        assert_eq!(task.completed_at, Some(first));
    }

    #[test]
    fn test_is_overdue() {
        let mut task = sample();
        assert!(!task.is_overdue(t0()));

        task.due_date = Some(t0() - Duration::seconds(1));
        assert!(task.is_overdue(t0()));

        // Due exactly now is not yet overdue.
        task.due_date = Some(t0());
        assert!(!task.is_overdue(t0()));

        task.due_date = Some(t0() - Duration::days(3));
        task.mark_as_done(t0());
        assert!(!task.is_overdue(t0()));
    }

    #[test]
    fn test_tag_membership() {
        let mut task = sample();
        let later = t0() + Duration::minutes(1);
        assert!(!task.add_tag("work", later));
        assert_eq!(task.updated_at, t0());
        assert!(task.add_tag("blocker", later));
        assert_eq!(task.tags, vec!["work", "blocker"]);
        assert_eq!(task.updated_at, later);
        assert!(!task.remove_tag("missing", later));
        assert!(task.remove_tag("work", later));
        assert_eq!(task.tags, vec!["blocker"]);
    }

    #[test]
    fn test_from_fields_parses_and_ignores_unknown_keys() {
        let update = TaskUpdate::from_fields(
            [("title", "New"), ("priority", "urgent"), ("status", "review"), ("colour", "red"), ("due", "2026-04-01")],
            t0(),
        )
        .unwrap();
        assert_eq!(update.title.as_deref(), Some("New"));
        assert_eq!(update.priority, Some(Priority::Urgent));
        assert_eq!(update.status, Some(Status::Review));
        assert_eq!(update.due_date, Some(Some(Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap())));
        assert!(update.tags.is_none());
    }

    #[test]
    fn test_from_fields_clears_optional_fields() {
        let update = TaskUpdate::from_fields([("due_date", ""), ("assigned_to", "none")], t0()).unwrap();
        assert_eq!(update.due_date, Some(None));
        assert_eq!(update.assigned_to, Some(None));
    }

    #[test]
    fn test_from_fields_rejects_bad_values() {
        assert!(matches!(
            TaskUpdate::from_fields([("priority", "9")], t0()),
            Err(TaskError::InvalidPriority(_))
        ));
        assert!(matches!(
            TaskUpdate::from_fields([("status", "blocked")], t0()),
            Err(TaskError::InvalidStatus(_))
        ));
        assert!(matches!(
            TaskUpdate::from_fields([("due", "not a date")], t0()),
            Err(TaskError::InvalidDate(_))
        ));
        assert!(matches!(
            TaskUpdate::from_fields([("due", "in 9999999999999d")], t0()),
            Err(TaskError::InvalidDate(_))
        ));
        assert!(matches!(TaskUpdate::from_fields([("title", "  ")], t0()), Err(TaskError::EmptyTitle)));
    }
}
