//! Use-case layer over the task store.
//!
//! `TaskManager` validates caller input, routes mutations to [`TaskStore`] and
//! exposes the ranking engine with its own clock as "now".

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::clock::{Clock, SystemClock};
use crate::db::{parse_due_input, TaskFilter, TaskStore};
use crate::error::{Result, TaskError};
use crate::export;
use crate::fields::*;
use crate::ranking;
use crate::task::{Task, TaskUpdate};

/// Length of the "completed recently" window used by [`TaskManager::get_statistics`].
pub const RECENT_COMPLETION_DAYS: i64 = 7;

/// Aggregate counts over every task in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub total: usize,
    pub by_status: StatusCounts,
    pub by_priority: PriorityCounts,
    pub overdue: usize,
    pub completed_last_week: usize,
}

pub struct TaskManager<C: Clock = SystemClock> {
    store: TaskStore,
    clock: C,
}

impl TaskManager<SystemClock> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TaskManager::with_clock(path, SystemClock)
    }
}

impl<C: Clock> TaskManager<C> {
    pub fn with_clock(path: impl Into<PathBuf>, clock: C) -> Self {
        TaskManager { store: TaskStore::open(path), clock }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn parse_due(&self, text: &str) -> Result<DateTime<Utc>> {
        parse_due_input(text, self.now()).ok_or_else(|| TaskError::InvalidDate(text.to_string()))
    }

    /// Create and persist a task. Nothing is stored if validation fails.
    pub fn create_task(
        &mut self,
        title: &str,
        description: &str,
        priority: Priority,
        due_date: Option<&str>,
        tags: &[String],
    ) -> Result<String> {
        if title.trim().is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        let due = due_date.map(|d| self.parse_due(d)).transpose()?;
        let task = Task::new(title, description, priority, due, tags, self.now());
        Ok(self.store.add(task))
    }

    /// At most one filter applies: overdue, then status, then priority.
    pub fn list_tasks(&self, status: Option<Status>, priority: Option<Priority>, show_overdue: bool) -> Vec<&Task> {
        if show_overdue {
            return self.store.list_overdue(self.now());
        }
        if let Some(status) = status {
            return self.store.list_by_status(status);
        }
        if let Some(priority) = priority {
            return self.store.list_by_priority(priority);
        }
        self.store.list_all()
    }

    pub fn update_task_status(&mut self, id: &str, status: Status) -> bool {
        let now = self.now();
        if status == Status::Done {
            return self
                .store
                .mutate(id, |task| {
                    task.mark_as_done(now);
                    true
                })
                .is_some();
        }
        self.store.update(id, TaskUpdate::status(status), now)
    }

    pub fn update_task_priority(&mut self, id: &str, priority: Priority) -> bool {
        let now = self.now();
        self.store.update(id, TaskUpdate::priority(priority), now)
    }

    /// Returns `Ok(false)` for an unknown id; a bad date is rejected before lookup.
    pub fn update_task_due_date(&mut self, id: &str, due_date: &str) -> Result<bool> {
        let due = self.parse_due(due_date)?;
        let now = self.now();
        Ok(self.store.update(id, TaskUpdate::due_date(Some(due)), now))
    }

    pub fn assign_task(&mut self, id: &str, user: Option<&str>) -> bool {
        let now = self.now();
        let user = user.map(str::trim).filter(|u| !u.is_empty()).map(str::to_string);
        self.store.update(id, TaskUpdate::assigned_to(user), now)
    }

    /// Apply an arbitrary partial update. A status of `Done` goes through
    /// [`Task::mark_as_done`] like [`TaskManager::update_task_status`].
    pub fn update_task(&mut self, id: &str, mut update: TaskUpdate) -> Result<bool> {
        if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(TaskError::EmptyTitle);
        }
        let now = self.now();
        let mark_done = update.status == Some(Status::Done);
        if mark_done {
            update.status = None;
        }
        let found = self.store.mutate(id, |task| {
            task.update(update, now);
            if mark_done {
                task.mark_as_done(now);
            }
            true
        });
        Ok(found.is_some())
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        self.store.delete(id)
    }

    pub fn get_task_details(&self, id: &str) -> Option<&Task> {
        self.store.get(id)
    }

    /// Reports whether the task exists; only writes when the tag is new.
    pub fn add_tag_to_task(&mut self, id: &str, tag: &str) -> bool {
        let now = self.now();
        self.store.mutate(id, |task| task.add_tag(tag, now)).is_some()
    }

    /// Reports whether the task exists; only writes when the tag was present.
    pub fn remove_tag_from_task(&mut self, id: &str, tag: &str) -> bool {
        let now = self.now();
        self.store.mutate(id, |task| task.remove_tag(tag, now)).is_some()
    }

    /// Counts over all tasks. "Completed last week" covers `[now - 7 days, now]`.
    pub fn get_statistics(&self) -> Statistics {
        let now = self.now();
        let window_start = now - Duration::days(RECENT_COMPLETION_DAYS);
        let mut stats = Statistics::default();
        for task in self.store.list_all() {
            stats.total += 1;
            stats.by_status.increment(task.status);
            stats.by_priority.increment(task.priority);
            if task.is_overdue(now) {
                stats.overdue += 1;
            }
            if task.completed_at.is_some_and(|c| c >= window_start && c <= now) {
                stats.completed_last_week += 1;
            }
        }
        stats
    }

    /// Write the tasks matching `filter` as CSV. Unlike store writes, failure
    /// here is returned to the caller.
    pub fn export_tasks(&self, path: &Path, filter: &TaskFilter) -> Result<usize> {
        let tasks = self.store.list_filtered(filter, self.now());
        export::write_csv(path, &tasks)
    }

    pub fn calculate_task_score(&self, task: &Task, current_user: Option<&str>) -> u32 {
        ranking::calculate_task_score(task, current_user, self.now())
    }

    pub fn sort_tasks_by_importance<'a>(&self, tasks: &[&'a Task], current_user: Option<&str>) -> Vec<&'a Task> {
        ranking::sort_tasks_by_importance(tasks, current_user, self.now())
    }

    pub fn get_top_priority_tasks<'a>(
        &self,
        tasks: &[&'a Task],
        limit: i64,
        current_user: Option<&str>,
    ) -> Result<Vec<&'a Task>> {
        ranking::get_top_priority_tasks(tasks, limit, current_user, self.now())
    }
}
