//! # tt - personal task tracker
//!
//! A small command-line task tracker backed by a single JSON file.
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task
//! tt add "Fix login redirect" --priority high --due tomorrow --tag blocker
//!
//! # List tasks, most important first
//! tt list --sort importance
//!
//! # What should I work on?
//! tt top -n 3 --user alice
//!
//! # Finish it
//! tt complete "fix login redirect"
//! ```
//!
//! Tasks live in `./tasks.json` unless `--db` (or `TASK_TRACKER_DB`) points
//! elsewhere. Every change is written to disk immediately. Set `RUST_LOG` or
//! pass `--verbose` to see diagnostics on stderr.

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod cmd;

use cli::Cli;
use cmd::*;
use task_tracker::TaskManager;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = match cli.command {
        Commands::Completions { shell } => {
            cmd_completions(shell);
            return;
        }
        command => command,
    };

    let mut manager = TaskManager::new(&cli.db);
    let user = cli.user.as_deref();

    match command {
        Commands::Completions { .. } => {}

        Commands::Add { title, desc, priority, due, tags } =>
            cmd_add(&mut manager, title, desc, priority, due, tags),

        Commands::List { overdue, status, priority, sort, limit } =>
            cmd_list(&manager, user, overdue, status, priority, sort, limit),

        Commands::Top { limit, all } => cmd_top(&manager, user, limit, all),

        Commands::View { id } => cmd_view(&manager, user, id),

        Commands::Status { id, status } => cmd_status(&mut manager, id, status),

        Commands::Complete { id } => cmd_status(&mut manager, id, task_tracker::Status::Done),

        Commands::Reopen { id } => cmd_status(&mut manager, id, task_tracker::Status::Todo),

        Commands::Priority { id, priority } => cmd_priority(&mut manager, id, priority),

        Commands::Due { id, due } => cmd_due(&mut manager, id, due),

        Commands::Assign { id, user } => cmd_assign(&mut manager, id, user),

        Commands::Set { id, fields } => cmd_set(&mut manager, id, fields),

        Commands::Tag { action } => cmd_tag(&mut manager, action),

        Commands::Delete { id } => cmd_delete(&mut manager, id),

        Commands::Stats => cmd_stats(&manager),

        Commands::Export { output, status, priority, overdue } =>
            cmd_export(&manager, output, status, priority, overdue),
    }
}

/// Log to stderr. `--verbose` forces debug; otherwise `RUST_LOG`, defaulting to warn.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
