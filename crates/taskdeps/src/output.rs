//! Output formatting for CLI commands.
//!
//! Every command prints either human-readable text or pretty JSON. Text
//! rendering is written against `impl Write` so it can be tested without
//! touching stdout.

use crate::domain::{Dependency, Task, TaskPriority, TaskStatus};
use crate::store::LoadWarning;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::env;
use std::io::{self, Write};

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Settings for text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Read settings from the environment.
    ///
    /// Colors are off when `NO_COLOR` is set (any value) or when
    /// `TASKDEPS_COLOR` is `0` or `false`.
    pub fn from_env() -> Self {
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("TASKDEPS_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);
        Self { use_colors }
    }
}

// ===== Styling =====

fn paint(text: &str, config: OutputConfig, style: fn(&str) -> ColoredString) -> String {
    if config.use_colors {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

fn dimmed(text: &str, config: OutputConfig) -> String {
    paint(text, config, |t| t.dimmed())
}

fn bold(text: &str, config: OutputConfig) -> String {
    paint(text, config, |t| t.bold())
}

fn task_ref(id: impl std::fmt::Display, config: OutputConfig) -> String {
    paint(&format!("#{id}"), config, |t| t.cyan())
}

fn colorize_status(status: TaskStatus, config: OutputConfig) -> String {
    let text = status.to_string();
    match status {
        TaskStatus::Todo => paint(&text, config, |t| t.white()),
        TaskStatus::InProgress => paint(&text, config, |t| t.yellow()),
        TaskStatus::Done => paint(&text, config, |t| t.green()),
    }
}

fn colorize_priority(priority: TaskPriority, config: OutputConfig) -> String {
    let text = priority.to_string();
    match priority {
        TaskPriority::High => paint(&text, config, |t| t.red().bold()),
        TaskPriority::Medium => paint(&text, config, |t| t.yellow()),
        TaskPriority::Low => paint(&text, config, |t| t.dimmed()),
    }
}

// ===== Text formatting =====

fn write_task_line<W: Write>(w: &mut W, task: &Task, config: OutputConfig) -> io::Result<()> {
    writeln!(
        w,
        "{}  [{}]  [{}]  {}",
        task_ref(task.id, config),
        colorize_status(task.status, config),
        colorize_priority(task.priority, config),
        task.title
    )
}

pub(crate) fn write_tasks<W: Write>(w: &mut W, tasks: &[Task], config: OutputConfig) -> io::Result<()> {
    if tasks.is_empty() {
        return writeln!(w, "No tasks found.");
    }
    for task in tasks {
        write_task_line(w, task, config)?;
    }
    Ok(())
}

pub(crate) fn write_task_details<W: Write>(
    w: &mut W,
    task: &Task,
    dependencies: &[Dependency],
    dependents: &[Dependency],
    config: OutputConfig,
) -> io::Result<()> {
    writeln!(w, "{}: {}", task_ref(task.id, config), bold(&task.title, config))?;
    writeln!(
        w,
        "{} {}    {} {}",
        dimmed("Status:", config),
        colorize_status(task.status, config),
        dimmed("Priority:", config),
        colorize_priority(task.priority, config)
    )?;
    if let Some(due) = task.due_date {
        writeln!(w, "{} {}", dimmed("Due:", config), due.format("%Y-%m-%d %H:%M"))?;
    }
    if !task.description.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}", task.description)?;
    }

    if !dependencies.is_empty() {
        writeln!(w)?;
        writeln!(w, "{} ({}):", bold("Depends on", config), dependencies.len())?;
        for edge in dependencies {
            writeln!(
                w,
                "  -> {} {}",
                task_ref(edge.dependent_task_id, config),
                dimmed(&format!("(dependency {})", edge.id), config)
            )?;
        }
    }
    if !dependents.is_empty() {
        writeln!(w)?;
        writeln!(w, "{} ({}):", bold("Needed by", config), dependents.len())?;
        for edge in dependents {
            writeln!(
                w,
                "  <- {} {}",
                task_ref(edge.task_id, config),
                dimmed(&format!("(dependency {})", edge.id), config)
            )?;
        }
    }
    Ok(())
}

fn write_dependency_line<W: Write>(
    w: &mut W,
    edge: &Dependency,
    config: OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "{}  {} depends on {}",
        dimmed(&format!("[{}]", edge.id), config),
        task_ref(edge.task_id, config),
        task_ref(edge.dependent_task_id, config)
    )
}

pub(crate) fn write_dependencies<W: Write>(
    w: &mut W,
    edges: &[Dependency],
    config: OutputConfig,
) -> io::Result<()> {
    if edges.is_empty() {
        return writeln!(w, "No dependencies found.");
    }
    for edge in edges {
        write_dependency_line(w, edge, config)?;
    }
    Ok(())
}

pub(crate) fn write_load_warning<W: Write>(
    w: &mut W,
    warning: &LoadWarning,
    config: OutputConfig,
) -> io::Result<()> {
    let label = paint("warning:", config, |t| t.yellow().bold());
    let text = match warning {
        LoadWarning::MalformedJson {
            file,
            line_number,
            error,
        } => format!(
            "{}:{line_number}: skipped malformed line ({error})",
            file.display()
        ),
        LoadWarning::DuplicateId { file, id } => {
            format!(
                "{}: id {id} appears more than once, the last row wins",
                file.display()
            )
        }
        LoadWarning::SelfLoop { id, task_id } => {
            format!("dependency {id} makes task {task_id} depend on itself")
        }
        LoadWarning::DuplicateEdge {
            ids,
            task_id,
            dependent_task_id,
        } => format!(
            "dependencies {} all make task {task_id} depend on task {dependent_task_id}",
            ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        ),
        LoadWarning::Cycle { task_ids } => format!(
            "tasks {} form a dependency cycle",
            task_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        ),
    };
    writeln!(w, "{label} {text}")
}

// ===== Public dispatch =====

/// Print a list of tasks in the specified format
pub fn print_tasks(tasks: &[Task], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&tasks),
        OutputMode::Text => write_tasks(&mut io::stdout().lock(), tasks, OutputConfig::from_env()),
    }
}

/// Print one task with the edges touching it
pub fn print_task_details(
    task: &Task,
    dependencies: &[Dependency],
    dependents: &[Dependency],
    mode: OutputMode,
) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&serde_json::json!({
            "task": task,
            "dependencies": dependencies,
            "dependents": dependents,
        })),
        OutputMode::Text => write_task_details(
            &mut io::stdout().lock(),
            task,
            dependencies,
            dependents,
            OutputConfig::from_env(),
        ),
    }
}

/// Print a list of dependency rows in the specified format
pub fn print_dependencies(edges: &[Dependency], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&edges),
        OutputMode::Text => {
            write_dependencies(&mut io::stdout().lock(), edges, OutputConfig::from_env())
        }
    }
}

/// Print load warnings to stderr
pub fn print_load_warnings(warnings: &[LoadWarning]) -> io::Result<()> {
    let config = OutputConfig::from_env();
    let mut handle = io::stderr().lock();
    for warning in warnings {
        write_load_warning(&mut handle, warning, config)?;
    }
    Ok(())
}

/// Print a simple message
pub fn print_message(msg: &str) -> io::Result<()> {
    writeln!(io::stdout().lock(), "{msg}")
}

/// One-line confirmation for a written dependency row
pub(crate) fn edge_message(verb: &str, edge: &Dependency) -> String {
    format!(
        "{verb} dependency {}: task {} depends on task {}",
        edge.id, edge.task_id, edge.dependent_task_id
    )
}

/// Print a JSON-formatted result for any serializable value
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(io::stdout().lock(), "{json}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyId, DependencyRequest, Entity, TaskId, TaskRequest};

    const PLAIN: OutputConfig = OutputConfig { use_colors: false };

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn task() -> Task {
        let mut request = TaskRequest::titled("Write the parser");
        request.priority = TaskPriority::High;
        request.status = TaskStatus::InProgress;
        request.description = "Tokens first.".to_string();
        Task::from_request(TaskId::new(3), request)
    }

    fn edge(id: u64, task: u64, depends_on: u64) -> Dependency {
        Dependency::from_request(DependencyId::new(id), DependencyRequest::new(task, depends_on))
    }

    #[test]
    fn test_task_list_format() {
        let out = render(|w| write_tasks(w, &[task()], PLAIN));
        assert_eq!(out, "#3  [in_progress]  [high]  Write the parser\n");
        assert_eq!(render(|w| write_tasks(w, &[], PLAIN)), "No tasks found.\n");
    }

    #[test]
    fn test_task_details_lists_both_directions() {
        let out = render(|w| {
            write_task_details(w, &task(), &[edge(1, 3, 1)], &[edge(2, 4, 3)], PLAIN)
        });
        assert!(out.starts_with("#3: Write the parser\n"));
        assert!(out.contains("Tokens first."));
        assert!(out.contains("Depends on (1):\n  -> #1 (dependency 1)"));
        assert!(out.contains("Needed by (1):\n  <- #4 (dependency 2)"));
    }

    #[test]
    fn test_dependency_list_format() {
        let out = render(|w| write_dependencies(w, &[edge(5, 1, 2)], PLAIN));
        assert_eq!(out, "[5]  #1 depends on #2\n");
    }

    #[test]
    fn test_edge_confirmation_message() {
        assert_eq!(
            edge_message("Added", &edge(5, 1, 2)),
            "Added dependency 5: task 1 depends on task 2"
        );
    }

    #[test]
    fn test_cycle_warning_format() {
        let warning = LoadWarning::Cycle {
            task_ids: vec![TaskId::new(1), TaskId::new(2)],
        };
        let out = render(|w| write_load_warning(w, &warning, PLAIN));
        assert_eq!(out, "warning: tasks 1, 2 form a dependency cycle\n");
    }
}
