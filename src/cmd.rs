//! Command implementations for the CLI interface.
//!
//! Each handler resolves its arguments, calls one `TaskManager` operation and
//! prints the outcome. Failures are reported on stderr with a non-zero exit.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Subcommand, ValueEnum};
use clap_complete::{generate, Shell};

use task_tracker::db::resolve_task_identifier;
use task_tracker::{Priority, Status, Task, TaskError, TaskFilter, TaskManager, TaskUpdate};

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long, default_value = "")]
        desc: String,
        /// Priority: low | medium | high | urgent, or a level 1-4.
        #[arg(long, value_parser = parse_priority, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Due date: YYYY-MM-DD, RFC 3339, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        due: Option<String>,
        /// Comma-separated tags. May be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List tasks. Only one filter applies: --overdue, then --status, then --priority.
    List {
        /// Show overdue tasks only.
        #[arg(long)]
        overdue: bool,
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Filter by priority (name or level 1-4).
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Created)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the most important open work.
    Top {
        /// How many tasks to show.
        #[arg(short = 'n', long, default_value_t = 5, allow_negative_numbers = true)]
        limit: i64,
        /// Include completed tasks in the ranking.
        #[arg(long)]
        all: bool,
    },

    /// View a single task by ID, ID prefix or title.
    View {
        id: String,
    },

    /// Set a task's status.
    Status {
        id: String,
        #[arg(value_enum)]
        status: Status,
    },

    /// Mark a task done.
    Complete {
        id: String,
    },

    /// Reopen a task (status todo).
    Reopen {
        id: String,
    },

    /// Set a task's priority.
    Priority {
        id: String,
        /// low | medium | high | urgent, or a level 1-4.
        #[arg(value_parser = parse_priority)]
        priority: Priority,
    },

    /// Set a task's due date.
    Due {
        id: String,
        /// YYYY-MM-DD, RFC 3339, "today", "tomorrow", or "in Nd".
        due: String,
    },

    /// Assign a task to a user, or clear the assignee when no user is given.
    Assign {
        id: String,
        user: Option<String>,
    },

    /// Update arbitrary fields: title, description, priority, status, due_date, tags, assigned_to.
    Set {
        id: String,
        /// KEY=VALUE pairs. Unknown keys are ignored.
        #[arg(required = true, value_parser = parse_key_val)]
        fields: Vec<(String, String)>,
    },

    /// Add or remove tags.
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Delete a task.
    Delete {
        id: String,
    },

    /// Show task counts by status and priority.
    Stats,

    /// Export tasks to CSV.
    Export {
        /// Output path.
        #[arg(short, long, default_value = "tasks.csv")]
        output: PathBuf,
        /// Only tasks with this status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Only tasks with this priority (name or level 1-4).
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        /// Only overdue tasks.
        #[arg(long)]
        overdue: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TagAction {
    /// Add a tag to a task.
    Add { id: String, tag: String },
    /// Remove a tag from a task.
    Rm { id: String, tag: String },
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    /// Insertion order.
    Created,
    Importance,
    Due,
}

/// Same rules as the library's `Priority::from_str`, so numeric levels work too.
fn parse_priority(s: &str) -> Result<Priority, String> {
    s.parse::<Priority>().map_err(|e| e.to_string())
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s.split_once('=').ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    Ok((key.to_string(), value.to_string()))
}

/// Split comma-separated tag strings.
fn split_tags(inputs: &[String]) -> Vec<String> {
    inputs
        .iter()
        .flat_map(|raw| raw.split(','))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn resolve_or_exit(manager: &TaskManager, id: &str) -> String {
    match resolve_task_identifier(id, manager.store()) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {}", e);
            std::process::exit(1);
        }
    }
}

fn fail(e: TaskError) -> ! {
    eprintln!("Error: {e}");
    std::process::exit(1);
}

/// Warn when the last write-through failed; the change only lives in memory.
fn warn_if_unsaved(manager: &TaskManager) {
    if !manager.store().is_synced() {
        eprintln!(
            "Warning: could not write {}; this change was not saved.",
            manager.store().path().display()
        );
    }
}

fn report(manager: &TaskManager, found: bool, id: &str, done: &str) {
    if !found {
        eprintln!("Task {} not found.", id);
        std::process::exit(1);
    }
    warn_if_unsaved(manager);
    println!("{done} {}", short_id(id));
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Format a due date relative to now ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let days = (d.date_naive() - now.date_naive()).num_days();
            match days {
                0 => "today".into(),
                1 => "tomorrow".into(),
                n if n > 1 => format!("in {n}d"),
                n => format!("{}d late", -n),
            }
        }
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Print tasks in a formatted table with their importance score.
pub fn print_table(manager: &TaskManager, tasks: &[&Task], user: Option<&str>) {
    println!(
        "{:<8} {:<11} {:<7} {:<10} {:>5}  {}",
        "ID", "Status", "Pri", "Due", "Score", "Title [tags]"
    );
    let now = manager.now();
    for t in tasks {
        let tags = if t.tags.is_empty() { String::new() } else { format!(" [{}]", t.tags.join(",")) };
        println!(
            "{:<8} {:<11} {:<7} {:<10} {:>5}  {}{}",
            short_id(&t.id),
            t.status.as_str(),
            t.priority.as_str(),
            format_due_relative(t.due_date, now),
            manager.calculate_task_score(t, user),
            truncate(&t.title, 60),
            tags
        );
    }
}

pub fn cmd_add(
    manager: &mut TaskManager,
    title: String,
    desc: String,
    priority: Priority,
    due: Option<String>,
    tags: Vec<String>,
) {
    let tags = split_tags(&tags);
    match manager.create_task(&title, &desc, priority, due.as_deref(), &tags) {
        Ok(id) => {
            warn_if_unsaved(manager);
            println!("Added {} {}", short_id(&id), title);
        }
        Err(e) => fail(e),
    }
}

pub fn cmd_list(
    manager: &TaskManager,
    user: Option<&str>,
    overdue: bool,
    status: Option<Status>,
    priority: Option<Priority>,
    sort: SortKey,
    limit: Option<usize>,
) {
    let mut tasks = manager.list_tasks(status, priority, overdue);
    match sort {
        SortKey::Created => {}
        SortKey::Importance => tasks = manager.sort_tasks_by_importance(&tasks, user),
        // Tasks without a due date go last.
        SortKey::Due => tasks.sort_by_key(|t| (t.due_date.is_none(), t.due_date)),
    }
    if let Some(n) = limit {
        tasks.truncate(n);
    }
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }
    print_table(manager, &tasks, user);
}

pub fn cmd_top(manager: &TaskManager, user: Option<&str>, limit: i64, all: bool) {
    let tasks: Vec<&Task> = manager
        .list_tasks(None, None, false)
        .into_iter()
        .filter(|t| all || t.status != Status::Done)
        .collect();
    match manager.get_top_priority_tasks(&tasks, limit, user) {
        Ok(top) if top.is_empty() => println!("No tasks found."),
        Ok(top) => print_table(manager, &top, user),
        Err(e) => fail(e),
    }
}

pub fn cmd_view(manager: &TaskManager, user: Option<&str>, id: String) {
    let task_id = resolve_or_exit(manager, &id);
    let Some(task) = manager.get_task_details(&task_id) else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };
    let now = manager.now();
    let fmt_time = |t: Option<DateTime<Utc>>| t.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into());
    println!("ID:           {}", task.id);
    println!("Title:        {}", task.title);
    println!("Status:       {}", task.status);
    println!("Priority:     {}", task.priority);
    println!(
        "Due:          {}",
        match task.due_date {
            Some(d) => format!("{} ({})", d.format("%Y-%m-%d %H:%M"), format_due_relative(Some(d), now)),
            None => "-".into(),
        }
    );
    println!("Overdue:      {}", if task.is_overdue(now) { "yes" } else { "no" });
    println!("Tags:         {}", if task.tags.is_empty() { "-".into() } else { task.tags.join(",") });
    println!("Assigned to:  {}", task.assigned_to.as_deref().unwrap_or("-"));
    println!("Score:        {}", manager.calculate_task_score(task, user));
    println!("Created UTC:  {}", fmt_time(Some(task.created_at)));
    println!("Updated UTC:  {}", fmt_time(Some(task.updated_at)));
    println!("Completed:    {}", fmt_time(task.completed_at));
    println!("Description:\n{}\n", if task.description.is_empty() { "-" } else { task.description.as_str() });
}

pub fn cmd_status(manager: &mut TaskManager, id: String, status: Status) {
    let task_id = resolve_or_exit(manager, &id);
    let found = manager.update_task_status(&task_id, status);
    report(manager, found, &task_id, &format!("Status set to {status} for"));
}

pub fn cmd_priority(manager: &mut TaskManager, id: String, priority: Priority) {
    let task_id = resolve_or_exit(manager, &id);
    let found = manager.update_task_priority(&task_id, priority);
    report(manager, found, &task_id, &format!("Priority set to {priority} for"));
}

pub fn cmd_due(manager: &mut TaskManager, id: String, due: String) {
    let task_id = resolve_or_exit(manager, &id);
    match manager.update_task_due_date(&task_id, &due) {
        Ok(found) => report(manager, found, &task_id, "Due date updated for"),
        Err(e) => fail(e),
    }
}

pub fn cmd_assign(manager: &mut TaskManager, id: String, user: Option<String>) {
    let task_id = resolve_or_exit(manager, &id);
    let found = manager.assign_task(&task_id, user.as_deref());
    let msg = match user {
        Some(u) => format!("Assigned to {u}:"),
        None => "Cleared assignee of".to_string(),
    };
    report(manager, found, &task_id, &msg);
}

pub fn cmd_set(manager: &mut TaskManager, id: String, fields: Vec<(String, String)>) {
    let task_id = resolve_or_exit(manager, &id);
    let update = match TaskUpdate::from_fields(fields, manager.now()) {
        Ok(update) => update,
        Err(e) => fail(e),
    };
    match manager.update_task(&task_id, update) {
        Ok(found) => report(manager, found, &task_id, "Updated"),
        Err(e) => fail(e),
    }
}

pub fn cmd_tag(manager: &mut TaskManager, action: TagAction) {
    match action {
        TagAction::Add { id, tag } => {
            let task_id = resolve_or_exit(manager, &id);
            let found = manager.add_tag_to_task(&task_id, &tag);
            report(manager, found, &task_id, &format!("Tagged '{tag}':"));
        }
        TagAction::Rm { id, tag } => {
            let task_id = resolve_or_exit(manager, &id);
            let found = manager.remove_tag_from_task(&task_id, &tag);
            report(manager, found, &task_id, &format!("Untagged '{tag}':"));
        }
    }
}

pub fn cmd_delete(manager: &mut TaskManager, id: String) {
    let task_id = resolve_or_exit(manager, &id);
    let found = manager.delete_task(&task_id);
    report(manager, found, &task_id, "Deleted");
}

pub fn cmd_stats(manager: &TaskManager) {
    let stats = manager.get_statistics();
    println!("Total:              {}", stats.total);
    println!("By status:");
    for (status, n) in stats.by_status.iter() {
        println!("  {:<12} {}", status.as_str(), n);
    }
    println!("By priority:");
    for (priority, n) in stats.by_priority.iter() {
        println!("  {:<12} {}", priority.as_str(), n);
    }
    println!("Overdue:            {}", stats.overdue);
    println!("Completed (7 days): {}", stats.completed_last_week);
}

pub fn cmd_export(
    manager: &TaskManager,
    output: PathBuf,
    status: Option<Status>,
    priority: Option<Priority>,
    overdue: bool,
) {
    let filter = TaskFilter { status, priority, overdue };
    match manager.export_tasks(&output, &filter) {
        Ok(n) => println!("Exported {} task(s) to {}", n, output.display()),
        Err(e) => {
            eprintln!("Failed to write CSV file: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
