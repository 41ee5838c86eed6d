use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Simple, file-backed personal task tracker.
/// Storage defaults to ./tasks.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "tt", version, about = "Personal task tracker")]
pub struct Cli {
    /// Path to the JSON task file.
    #[arg(long, global = true, env = "TASK_TRACKER_DB", default_value = "tasks.json")]
    pub db: PathBuf,

    /// Current user id. Tasks assigned to this user rank higher.
    #[arg(long, global = true, env = "TASK_TRACKER_USER")]
    pub user: Option<String>,

    /// Log debug output to stderr (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
