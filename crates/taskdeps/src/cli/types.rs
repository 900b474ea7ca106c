//! CLI value enums, parsers and domain type conversions.

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;

use crate::domain::{TaskPriority, TaskStatus};

/// Task priority for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPriorityArg {
    /// Can wait
    Low,
    /// Normal priority
    Medium,
    /// Do first
    High,
}

impl From<TaskPriorityArg> for TaskPriority {
    fn from(arg: TaskPriorityArg) -> Self {
        match arg {
            TaskPriorityArg::Low => TaskPriority::Low,
            TaskPriorityArg::Medium => TaskPriority::Medium,
            TaskPriorityArg::High => TaskPriority::High,
        }
    }
}

/// Task status for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatusArg {
    /// Not started
    Todo,
    /// Being worked on
    #[value(name = "in_progress", alias = "in-progress")]
    InProgress,
    /// Finished
    Done,
}

impl From<TaskStatusArg> for TaskStatus {
    fn from(arg: TaskStatusArg) -> Self {
        match arg {
            TaskStatusArg::Todo => TaskStatus::Todo,
            TaskStatusArg::InProgress => TaskStatus::InProgress,
            TaskStatusArg::Done => TaskStatus::Done,
        }
    }
}

/// Parse a due date given as RFC 3339 or as a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_due_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| format!("invalid date '{s}': expected YYYY-MM-DD or RFC 3339"))
}

/// Validate a task title: non-empty after trimming, at most 200 characters.
pub fn validate_title(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("title cannot be empty".to_string());
    }
    if trimmed.chars().count() > 200 {
        return Err("title cannot exceed 200 characters".to_string());
    }
    Ok(trimmed.to_string())
}
