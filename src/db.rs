//! File-backed task store and related utility functions.
//!
//! `TaskStore` keeps every task in memory, in insertion order, and mirrors the
//! whole collection to one JSON file after each mutation. A failed write does
//! not roll the mutation back: the store logs the failure and reports itself as
//! out of sync until a later write succeeds.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::{debug, error, warn};

use crate::error::{Result, TaskError};
use crate::fields::*;
use crate::task::{Task, TaskUpdate};

/// Optional criteria combined with AND semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub overdue: bool,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        !self.overdue || task.is_overdue(now)
    }
}

/// In-memory task collection mirrored to a single file.
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    tasks: Vec<Task>,
    synced: bool,
}

impl TaskStore {
    /// Open the store at `path`, loading any tasks already saved there.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = TaskStore { path: path.into(), tasks: Vec::new(), synced: true };
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory tasks with the file's contents. A missing file is
    /// an empty store; an unreadable or malformed one is logged and also
    /// yields an empty store.
    pub fn load(&mut self) {
        self.tasks.clear();
        self.synced = true;
        if !self.path.exists() {
            debug!("no task file at {}, starting empty", self.path.display());
            return;
        }
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Error reading tasks from {}, starting fresh: {e}", self.path.display());
                return;
            }
        };
        if content.trim().is_empty() {
            return;
        }
        match serde_json::from_str::<Vec<Task>>(&content) {
            Ok(tasks) => {
                for task in tasks {
                    self.insert(task);
                }
                debug!("loaded {} task(s) from {}", self.tasks.len(), self.path.display());
            }
            Err(e) => warn!("Error parsing tasks in {}, starting fresh: {e}", self.path.display()),
        }
    }

    /// Write every task to the backing file using a temp file + rename.
    pub fn save(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.tasks)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
        }
        let tmp = temp_path(&self.path);
        let write = || -> std::io::Result<()> {
            let mut f = File::create(&tmp)?;
            f.write_all(data.as_bytes())?;
            f.flush()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            TaskError::io(&self.path, e)
        })
    }

    /// Whether the last write-through succeeded, i.e. the file reflects memory.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    fn flush(&mut self) {
        match self.save() {
            Ok(()) => self.synced = true,
            Err(e) => {
                error!("Failed to save tasks, in-memory changes are not on disk: {e}");
                self.synced = false;
            }
        }
    }

    fn insert(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Insert (or replace by id) and persist. Returns the task id.
    pub fn add(&mut self, task: Task) -> String {
        let id = task.id.clone();
        self.insert(task);
        self.flush();
        id
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn update(&mut self, id: &str, update: TaskUpdate, now: DateTime<Utc>) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        self.tasks[idx].update(update, now);
        self.flush();
        true
    }

    /// Run `f` on the task and persist if it reports a change.
    /// Returns `None` when no task has this id.
    pub fn mutate<F>(&mut self, id: &str, f: F) -> Option<bool>
    where
        F: FnOnce(&mut Task) -> bool,
    {
        let idx = self.position(id)?;
        let changed = f(&mut self.tasks[idx]);
        if changed {
            self.flush();
        }
        Some(changed)
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        self.tasks.remove(idx);
        self.flush();
        true
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn list_all(&self) -> Vec<&Task> {
        self.tasks.iter().collect()
    }

    pub fn list_by_status(&self, status: Status) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.status == status).collect()
    }

    pub fn list_by_priority(&self, priority: Priority) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.priority == priority).collect()
    }

    pub fn list_overdue(&self, now: DateTime<Utc>) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.is_overdue(now)).collect()
    }

    pub fn list_filtered(&self, filter: &TaskFilter, now: DateTime<Utc>) -> Vec<&Task> {
        self.tasks.iter().filter(|t| filter.matches(t, now)).collect()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "tasks".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Parse due date input.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "in 3d", "in 2w"
/// - "YYYY-MM-DD" (midnight UTC)
/// - "YYYY-MM-DDTHH:MM[:SS]" or with a space separator (UTC)
/// - RFC 3339 timestamps with any offset
pub fn parse_due_input(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let lower = s.to_lowercase();
    let today = start_of_day(now.date_naive());

    match lower.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        _ => {}
    }

    if let Some(rest) = lower.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Duration::try_days(days).and_then(|d| today.checked_add_signed(d));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Duration::try_weeks(weeks).and_then(|d| today.checked_add_signed(d));
            }
        }
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(start_of_day)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Resolve a task identifier to a task id: an exact id, a unique id prefix,
/// or a case-insensitive exact title.
pub fn resolve_task_identifier(identifier: &str, store: &TaskStore) -> std::result::Result<String, String> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err("Task identifier cannot be empty".to_string());
    }
    if let Some(task) = store.get(identifier) {
        return Ok(task.id.clone());
    }

    let mut matches: Vec<&Task> = store.tasks.iter().filter(|t| t.id.starts_with(identifier)).collect();
    if matches.is_empty() {
        let wanted = identifier.to_lowercase();
        matches = store.tasks.iter().filter(|t| t.title.to_lowercase() == wanted).collect();
    }

    match matches.len() {
        0 => Err(format!("No task found matching '{identifier}'")),
        1 => Ok(matches[0].id.clone()),
        _ => {
            let mut msg = format!("Multiple tasks match '{identifier}':\n");
            for task in matches {
                msg.push_str(&format!("  {}: {} ({})\n", task.id, task.title, task.status));
            }
            msg.push_str("Please use a longer id prefix.");
            Err(msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, 15, 30, 0).unwrap()
    }

    fn setup() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("tasks.json");
        (dir, path)
    }

    fn task(title: &str, priority: Priority) -> Task {
        Task::new(title, "", priority, None, &[], t0())
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let (_dir, path) = setup();
        let store = TaskStore::open(&path);
        assert!(store.is_empty());
        assert!(store.is_synced());
        assert!(!path.exists());
    }

    #[test]
    fn test_malformed_file_is_empty_store() {
        let (_dir, path) = setup();
        fs::write(&path, "{ not json").unwrap();
        let store = TaskStore::open(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_loads_records_without_optional_fields() {
        let (_dir, path) = setup();
        fs::write(
            &path,
            r#"[{
                "id": "legacy-1",
                "title": "Old task",
                "description": "",
                "priority": "high",
                "status": "todo",
                "due_date": null,
                "created_at": "2026-01-02T03:04:05Z",
                "updated_at": "2026-01-02T03:04:05Z"
            }]"#,
        )
        .unwrap();

        let store = TaskStore::open(&path);
        assert_eq!(store.len(), 1);
        let task = store.get("legacy-1").unwrap();
        assert_eq!(task.title, "Old task");
        assert_eq!(task.priority, Priority::High);
        assert!(task.tags.is_empty());
        assert!(task.assigned_to.is_none());
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_blank_file_is_empty_store() {
        let (_dir, path) = setup();
        fs::write(&path, "  \n").unwrap();
        assert!(TaskStore::open(&path).is_empty());
    }

    #[test]
    fn test_add_persists_immediately() {
        let (_dir, path) = setup();
        let mut store = TaskStore::open(&path);
        let id = store.add(task("First", Priority::High));
        assert!(path.exists());
        let reloaded = TaskStore::open(&path);
        assert_eq!(reloaded.get(&id).map(|t| t.title.as_str()), Some("First"));
    }

    #[test]
    fn test_round_trip_preserves_every_field() {
        let (_dir, path) = setup();
        let mut store = TaskStore::open(&path);

        let mut full = Task::new(
            "Full",
            "line one\nline \"two\"",
            Priority::Urgent,
            Some(t0() + Duration::milliseconds(86_400_123)),
            &["x".into(), "y".into()],
            t0(),
        );
        full.assigned_to = Some("alice".into());
        full.mark_as_done(t0() + Duration::nanoseconds(1_500));
        let bare = task("Bare", Priority::Low);

        store.add(full.clone());
        store.add(bare.clone());

        let reloaded = TaskStore::open(&path);
        assert_eq!(reloaded.list_all(), vec![&full, &bare]);
        assert!(reloaded.get(&bare.id).unwrap().due_date.is_none());
        assert!(reloaded.get(&bare.id).unwrap().completed_at.is_none());
    }

    #[test]
    fn test_add_same_id_replaces_in_place() {
        let (_dir, path) = setup();
        let mut store = TaskStore::open(&path);
        let a = task("A", Priority::Low);
        let b = task("B", Priority::Low);
        store.add(a.clone());
        store.add(b.clone());
        let mut a2 = a.clone();
        a2.title = "A2".into();
        store.add(a2);
        let titles: Vec<_> = store.list_all().iter().map(|t| t.title.clone()).collect();
        assert_eq!(titles, vec!["A2", "B"]);
    }

    #[test]
    fn test_update_and_delete_report_presence() {
        let (_dir, path) = setup();
        let mut store = TaskStore::open(&path);
        let id = store.add(task("A", Priority::Low));

        assert!(store.update(&id, TaskUpdate::priority(Priority::High), t0()));
        assert!(!store.update("nope", TaskUpdate::priority(Priority::High), t0()));
        assert_eq!(TaskStore::open(&path).get(&id).unwrap().priority, Priority::High);

        assert!(!store.delete("nope"));
        assert!(store.delete(&id));
        assert!(TaskStore::open(&path).is_empty());
    }

    #[test]
    fn test_mutate_persists_only_on_change() {
        let (_dir, path) = setup();
        let mut store = TaskStore::open(&path);
        let id = store.add(task("A", Priority::Low));
        let before = fs::read_to_string(&path).unwrap();

        assert_eq!(store.mutate(&id, |_| false), Some(false));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);

        assert_eq!(store.mutate(&id, |t| t.add_tag("new", t0())), Some(true));
        assert!(TaskStore::open(&path).get(&id).unwrap().has_tag("new"));

        assert_eq!(store.mutate("missing", |_| true), None);
    }

    #[test]
    fn test_failed_save_keeps_memory_and_flags_divergence() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes every rename fail.
        let path = dir.path().join("tasks.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let mut store = TaskStore::open(&path);
        let id = store.add(task("A", Priority::Low));
        assert!(store.get(&id).is_some());
        assert!(!store.is_synced());
        assert!(store.save().is_err());
    }

    #[test]
    fn test_list_queries() {
        let (_dir, path) = setup();
        let mut store = TaskStore::open(&path);
        let mut late = task("late", Priority::High);
        late.due_date = Some(t0() - Duration::days(1));
        let mut late_done = task("late-done", Priority::High);
        late_done.due_date = Some(t0() - Duration::days(1));
        late_done.mark_as_done(t0());
        let mut review = task("review", Priority::Low);
        review.update(TaskUpdate::status(Status::Review), t0());

        store.add(late);
        store.add(late_done);
        store.add(review);

        let titles = |v: Vec<&Task>| v.into_iter().map(|t| t.title.clone()).collect::<Vec<_>>();
        assert_eq!(titles(store.list_by_status(Status::Review)), vec!["review"]);
        assert_eq!(titles(store.list_by_priority(Priority::High)), vec!["late", "late-done"]);
        assert_eq!(titles(store.list_overdue(t0())), vec!["late"]);

        let filter = TaskFilter { status: Some(Status::Done), priority: Some(Priority::High), overdue: false };
        assert_eq!(titles(store.list_filtered(&filter, t0())), vec!["late-done"]);
        let filter = TaskFilter { status: None, priority: Some(Priority::High), overdue: true };
        assert_eq!(titles(store.list_filtered(&filter, t0())), vec!["late"]);
        assert_eq!(store.list_filtered(&TaskFilter::default(), t0()).len(), 3);
    }

    #[test]
    fn test_parse_due_input() {
        let midnight = Utc.with_ymd_and_hms(2026, 5, 20, 0, 0, 0).unwrap();
        assert_eq!(parse_due_input("today", t0()), Some(midnight));
        assert_eq!(parse_due_input("Tomorrow", t0()), Some(midnight + Duration::days(1)));
        assert_eq!(parse_due_input("in 3d", t0()), Some(midnight + Duration::days(3)));
        assert_eq!(parse_due_input("in 2w", t0()), Some(midnight + Duration::days(14)));
        assert_eq!(
            parse_due_input("2026-06-01", t0()),
            Some(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_due_input("2026-06-01T08:15", t0()),
            Some(Utc.with_ymd_and_hms(2026, 6, 1, 8, 15, 0).unwrap())
        );
        assert_eq!(
            parse_due_input("2026-06-01T10:00:00+02:00", t0()),
            Some(Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap())
        );
        assert_eq!(parse_due_input("2026-13-01", t0()), None);
        assert_eq!(parse_due_input("someday", t0()), None);
        assert_eq!(parse_due_input("in a while", t0()), None);
    }

    #[test]
    fn test_parse_due_input_out_of_range_offsets() {
        assert_eq!(parse_due_input("in 9999999999999d", t0()), None);
        assert_eq!(parse_due_input("in 999999999d", t0()), None);
        assert_eq!(parse_due_input("in 99999999999w", t0()), None);
        assert_eq!(parse_due_input("in -999999999d", t0()), None);
    }

    #[test]
    fn test_resolve_task_identifier() {
        let (_dir, path) = setup();
        let mut store = TaskStore::open(&path);
        let id = store.add(task("Write docs", Priority::Low));

        assert_eq!(resolve_task_identifier(&id, &store), Ok(id.clone()));
        assert_eq!(resolve_task_identifier(&id[..8], &store), Ok(id.clone()));
        assert_eq!(resolve_task_identifier("write DOCS", &store), Ok(id.clone()));
        assert!(resolve_task_identifier("nothing", &store).is_err());

        store.add(task("Write docs", Priority::High));
        assert!(resolve_task_identifier("write docs", &store).unwrap_err().contains("Multiple"));
    }
}
