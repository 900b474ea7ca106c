//! Command execution logic.
//!
//! Every command except `init` runs against an [`App`] opened from the
//! project directory. Each engine write commits to disk before returning, so
//! no explicit save step is needed here.

use anyhow::Result;
use std::path::Path;

use super::args::{DepAction, DepArgs, InitArgs, PageArgs, TaskAction, TaskArgs, TaskUpdateArgs};
use crate::app::App;
use crate::domain::{DependencyId, DependencyRequest, TaskId, TaskRequest};
use crate::output::{self, OutputMode};

/// Execute the init command
pub async fn execute_init(base_dir: &Path, args: &InitArgs) -> Result<()> {
    use crate::commands::init;

    let result = init::init(base_dir).await?;

    if !args.quiet {
        println!("Initialized taskdeps in {}", result.taskdeps_dir.display());
        println!("  Config:       {}", result.config_file.display());
        println!("  Tasks:        {}", result.tasks_file.display());
        println!("  Dependencies: {}", result.dependencies_file.display());
    }

    Ok(())
}

/// Open the project containing `working_dir`, reporting load warnings.
pub async fn open_app(working_dir: &Path) -> Result<App> {
    let app = App::from_directory(working_dir).await?;
    output::print_load_warnings(app.warnings())?;
    Ok(app)
}

/// Execute a `task` subcommand
pub async fn execute_task(app: &App, args: &TaskArgs, output_mode: OutputMode) -> Result<()> {
    let graph = app.graph();

    match &args.action {
        TaskAction::List(PageArgs { page, page_size }) => {
            let tasks = graph.list_tasks(graph.page(*page, *page_size)?).await?;
            output::print_tasks(&tasks, output_mode)?;
        }
        TaskAction::Show { id } => {
            let id = TaskId::new(*id);
            let task = graph.get_task(id).await?;
            let dependencies = graph.dependencies_of(id).await?;
            let dependents = graph.dependents_of(id).await?;
            output::print_task_details(&task, &dependencies, &dependents, output_mode)?;
        }
        TaskAction::Create(create) => {
            let request = TaskRequest {
                title: create.title.clone(),
                description: create.description.clone().unwrap_or_default(),
                priority: create.priority.into(),
                status: create.status.into(),
                due_date: create.due,
            };
            let task = graph.create_task(request).await?;
            match output_mode {
                OutputMode::Json => output::print_json(&task)?,
                OutputMode::Text => {
                    output::print_message(&format!("Created task {}: {}", task.id, task.title))?;
                }
            }
        }
        TaskAction::Update(update) => {
            let id = TaskId::new(update.id);
            let current = graph.get_task(id).await?;
            let task = graph.update_task(id, merge_update(current.into(), update)).await?;
            match output_mode {
                OutputMode::Json => output::print_json(&task)?,
                OutputMode::Text => output::print_message(&format!("Updated task {}", task.id))?,
            }
        }
        TaskAction::Delete { id } => {
            let task = graph.delete_task(TaskId::new(*id)).await?;
            match output_mode {
                OutputMode::Json => output::print_json(&task)?,
                OutputMode::Text => {
                    output::print_message(&format!("Deleted task {}: {}", task.id, task.title))?;
                }
            }
        }
    }

    Ok(())
}

/// Overlay the fields given on the command line onto the current values.
fn merge_update(mut request: TaskRequest, update: &TaskUpdateArgs) -> TaskRequest {
    if let Some(title) = &update.title {
        request.title.clone_from(title);
    }
    if let Some(description) = &update.description {
        request.description.clone_from(description);
    }
    if let Some(priority) = update.priority {
        request.priority = priority.into();
    }
    if let Some(status) = update.status {
        request.status = status.into();
    }
    if update.clear_due {
        request.due_date = None;
    } else if update.due.is_some() {
        request.due_date = update.due;
    }
    request
}

/// Execute a `dep` subcommand
pub async fn execute_dep(app: &App, args: &DepArgs, output_mode: OutputMode) -> Result<()> {
    let graph = app.graph();

    match &args.action {
        DepAction::List(PageArgs { page, page_size }) => {
            let edges = graph
                .list_dependencies(graph.page(*page, *page_size)?)
                .await?;
            output::print_dependencies(&edges, output_mode)?;
        }
        DepAction::Show { id } => {
            let edge = graph.get_dependency(DependencyId::new(*id)).await?;
            output::print_dependencies(std::slice::from_ref(&edge), output_mode)?;
        }
        DepAction::Add { task, depends_on } => {
            let edge = graph
                .create_dependency(DependencyRequest::new(*task, *depends_on))
                .await?;
            match output_mode {
                OutputMode::Json => output::print_json(&edge)?,
                OutputMode::Text => output::print_message(&output::edge_message("Added", &edge))?,
            }
        }
        DepAction::Update {
            id,
            task,
            depends_on,
        } => {
            let edge = graph
                .update_dependency(
                    DependencyId::new(*id),
                    DependencyRequest::new(*task, *depends_on),
                )
                .await?;
            match output_mode {
                OutputMode::Json => output::print_json(&edge)?,
                OutputMode::Text => output::print_message(&output::edge_message("Updated", &edge))?,
            }
        }
        DepAction::Remove { id } => {
            let edge = graph.delete_dependency(DependencyId::new(*id)).await?;
            match output_mode {
                OutputMode::Json => output::print_json(&edge)?,
                OutputMode::Text => output::print_message(&format!("Removed dependency {}", edge.id))?,
            }
        }
    }

    Ok(())
}
