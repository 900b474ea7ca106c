//! CLI argument structs for all commands.

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use super::types::{parse_due_date, validate_title, TaskPriorityArg, TaskStatusArg};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Page selection shared by the list commands
#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    /// 1-based page index
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page (defaults to the configured page size)
    #[arg(long)]
    pub page_size: Option<usize>,
}

/// Arguments for the `task` command
#[derive(Parser, Debug, Clone)]
pub struct TaskArgs {
    /// Task subcommand
    #[command(subcommand)]
    pub action: TaskAction,
}

/// Task actions
#[derive(Subcommand, Debug, Clone)]
pub enum TaskAction {
    /// List tasks, newest first
    List(PageArgs),

    /// Show a task with the dependencies touching it
    Show {
        /// Task ID
        id: u64,
    },

    /// Create a task
    Create(TaskCreateArgs),

    /// Update a task; omitted fields keep their current value
    Update(TaskUpdateArgs),

    /// Delete a task
    ///
    /// Dependencies referencing the task are removed too, unless the project
    /// is configured with `delete-policy: reject`.
    Delete {
        /// Task ID
        id: u64,
    },
}

/// Arguments for `task create`
#[derive(Parser, Debug, Clone)]
pub struct TaskCreateArgs {
    /// Task title
    #[arg(long, value_parser = validate_title)]
    pub title: String,

    /// Detailed description
    #[arg(short = 'D', long)]
    pub description: Option<String>,

    /// Priority
    #[arg(short, long, value_enum, default_value = "medium")]
    pub priority: TaskPriorityArg,

    /// Initial status
    #[arg(short, long, value_enum, default_value = "todo")]
    pub status: TaskStatusArg,

    /// Due date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_due_date)]
    pub due: Option<DateTime<Utc>>,
}

/// Arguments for `task update`
#[derive(Parser, Debug, Clone)]
pub struct TaskUpdateArgs {
    /// Task ID
    pub id: u64,

    /// New title
    #[arg(long, value_parser = validate_title)]
    pub title: Option<String>,

    /// New description
    #[arg(short = 'D', long)]
    pub description: Option<String>,

    /// New priority
    #[arg(short, long, value_enum)]
    pub priority: Option<TaskPriorityArg>,

    /// New status
    #[arg(short, long, value_enum)]
    pub status: Option<TaskStatusArg>,

    /// New due date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_due_date, conflicts_with = "clear_due")]
    pub due: Option<DateTime<Utc>>,

    /// Remove the due date
    #[arg(long)]
    pub clear_due: bool,
}

/// Arguments for the `dep` command
#[derive(Parser, Debug, Clone)]
pub struct DepArgs {
    /// Dependency subcommand
    #[command(subcommand)]
    pub action: DepAction,
}

/// Dependency actions
#[derive(Subcommand, Debug, Clone)]
pub enum DepAction {
    /// List dependencies, oldest first
    List(PageArgs),

    /// Show one dependency
    Show {
        /// Dependency ID
        id: u64,
    },

    /// Add a dependency: TASK depends on DEPENDS_ON
    Add {
        /// Task that depends on another
        task: u64,

        /// Task being depended on
        depends_on: u64,
    },

    /// Point an existing dependency at new tasks
    Update {
        /// Dependency ID
        id: u64,

        /// Task that depends on another
        task: u64,

        /// Task being depended on
        depends_on: u64,
    },

    /// Remove a dependency
    Remove {
        /// Dependency ID
        id: u64,
    },
}
