//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `init`: Initialize a new taskdeps project
//! - `task`: List, show, create, update or delete tasks
//! - `dep`: List, show, add, update or remove dependencies
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//! - `--dir`: Run as if started in this directory
//!
//! # Example
//!
//! ```bash
//! taskdeps task create --title "Design schema" --priority high
//! taskdeps task create --title "Write migrations"
//! taskdeps dep add 2 1
//! taskdeps dep add 1 2   # rejected: circular dependency
//! ```

mod args;
mod execute;
mod types;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use args::{
    DepAction, DepArgs, InitArgs, PageArgs, TaskAction, TaskArgs, TaskCreateArgs, TaskUpdateArgs,
};
pub use types::{parse_due_date, validate_title, TaskPriorityArg, TaskStatusArg};

/// Taskdeps - tasks with validated dependencies
///
/// Track tasks and the dependencies between them. Duplicate and circular
/// dependencies are rejected. Data is stored in `.taskdeps/` as JSON Lines.
#[derive(Parser, Debug)]
#[command(name = "taskdeps")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Run as if started in this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new taskdeps project
    ///
    /// Creates the `.taskdeps/` directory with configuration and empty data
    /// files. Run this once in your project root.
    Init(InitArgs),

    /// Manage tasks
    Task(TaskArgs),

    /// Manage dependencies between tasks
    Dep(DepArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    ///
    /// # Errors
    ///
    /// Returns the engine's error for rejected or failed operations.
    pub async fn execute(&self) -> Result<()> {
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };
        let working_dir = match &self.dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        match &self.command {
            Some(Commands::Init(args)) => execute::execute_init(&working_dir, args).await,
            Some(Commands::Task(args)) => {
                let app = execute::open_app(&working_dir).await?;
                execute::execute_task(&app, args, output_mode).await
            }
            Some(Commands::Dep(args)) => {
                let app = execute::open_app(&working_dir).await?;
                execute::execute_dep(&app, args, output_mode).await
            }
            None => {
                println!("Taskdeps task tracker");
                println!("Use --help for more information");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_command() {
        let cli = Cli::try_parse_from(["taskdeps"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.json);
        assert!(cli.dir.is_none());
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["taskdeps", "task", "list", "--json", "--dir", "/tmp/x"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_parse_task_list_paging() {
        let cli = Cli::try_parse_from(["taskdeps", "task", "list", "--page", "3"]).unwrap();
        match cli.command {
            Some(Commands::Task(TaskArgs {
                action: TaskAction::List(page),
            })) => {
                assert_eq!(page.page, 3);
                assert!(page.page_size.is_none());
            }
            other => panic!("Expected task list, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_task_create() {
        let cli = Cli::try_parse_from([
            "taskdeps", "task", "create", "--title", "Ship", "-p", "high", "--due", "2026-05-01",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Task(TaskArgs {
                action: TaskAction::Create(args),
            })) => {
                assert_eq!(args.title, "Ship");
                assert_eq!(args.priority, TaskPriorityArg::High);
                assert_eq!(args.status, TaskStatusArg::Todo);
                assert!(args.due.is_some());
            }
            other => panic!("Expected task create, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_task_create_requires_title() {
        assert!(Cli::try_parse_from(["taskdeps", "task", "create"]).is_err());
    }

    #[test]
    fn test_parse_task_update_due_conflicts_with_clear() {
        let result = Cli::try_parse_from([
            "taskdeps", "task", "update", "1", "--due", "2026-05-01", "--clear-due",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_dep_add() {
        let cli = Cli::try_parse_from(["taskdeps", "dep", "add", "2", "1"]).unwrap();
        match cli.command {
            Some(Commands::Dep(DepArgs {
                action: DepAction::Add { task, depends_on },
            })) => {
                assert_eq!((task, depends_on), (2, 1));
            }
            other => panic!("Expected dep add, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_dep_update() {
        let cli = Cli::try_parse_from(["taskdeps", "dep", "update", "5", "1", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Dep(DepArgs {
                action: DepAction::Update {
                    id: 5,
                    task: 1,
                    depends_on: 2
                }
            }))
        ));
    }

    #[test]
    fn test_parse_dep_rejects_non_numeric_id() {
        assert!(Cli::try_parse_from(["taskdeps", "dep", "remove", "abc"]).is_err());
    }
}
