//! CSV rendering of task lists.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{Result, TaskError};
use crate::task::Task;

pub const CSV_HEADER: [&str; 10] = [
    "ID",
    "Title",
    "Description",
    "Priority",
    "Status",
    "Due Date",
    "Created At",
    "Updated At",
    "Completed At",
    "Tags",
];

/// Double embedded quotes and turn line breaks into literal `\n` / `\r`.
pub fn escape_csv_field(field: &str) -> String {
    field.replace('"', "\"\"").replace('\n', "\\n").replace('\r', "\\r")
}

fn quoted(field: &str) -> String {
    format!("\"{}\"", escape_csv_field(field))
}

fn date_only(dt: Option<DateTime<Utc>>) -> String {
    dt.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

/// One header line plus one line per task, joined by `\n` without a trailing newline.
pub fn tasks_to_csv(tasks: &[&Task]) -> String {
    let mut rows = Vec::with_capacity(tasks.len() + 1);
    rows.push(CSV_HEADER.join(","));
    for task in tasks {
        let row = [
            task.id.clone(),
            quoted(&task.title),
            quoted(&task.description),
            task.priority.to_string(),
            task.status.to_string(),
            date_only(task.due_date),
            date_only(Some(task.created_at)),
            date_only(Some(task.updated_at)),
            date_only(task.completed_at),
            quoted(&task.tags.join(";")),
        ];
        rows.push(row.join(","));
    }
    rows.join("\n")
}

/// Write `tasks` as CSV to `path`. Returns the number of rows written.
pub fn write_csv(path: &Path, tasks: &[&Task]) -> Result<usize> {
    fs::write(path, tasks_to_csv(tasks)).map_err(|e| TaskError::io(path, e))?;
    info!("Exported {} task(s) to {}", tasks.len(), path.display());
    Ok(tasks.len())
}
