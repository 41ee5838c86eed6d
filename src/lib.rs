//! # Task Tracker
//!
//! A personal task tracker with file-backed persistence and an importance
//! ranking engine.
//!
//! - [`task`]: the `Task` entity and its lifecycle (`mark_as_done`, partial updates, overdue checks)
//! - [`db`]: `TaskStore`, the in-memory collection mirrored to a JSON file after every mutation
//! - [`manager`]: `TaskManager`, the use cases (create, update, list, statistics, CSV export)
//! - [`ranking`]: scoring, stable importance ordering and top-N selection
//!
//! ```no_run
//! use task_tracker::{Priority, TaskManager};
//!
//! let mut manager = TaskManager::new("tasks.json");
//! let id = manager
//!     .create_task("Review pull request", "", Priority::High, Some("tomorrow"), &["blocker".into()])
//!     .unwrap();
//! let all = manager.list_tasks(None, None, false);
//! let top = manager.get_top_priority_tasks(&all, 5, None).unwrap();
//! assert_eq!(top[0].id, id);
//! ```

pub mod clock;
pub mod db;
pub mod error;
pub mod export;
pub mod fields;
pub mod manager;
pub mod ranking;
pub mod task;

pub use clock::{Clock, FixedClock, SystemClock};
pub use db::{TaskFilter, TaskStore};
pub use error::TaskError;
pub use fields::{Priority, Status};
pub use manager::{Statistics, TaskManager};
pub use task::{Task, TaskUpdate};
