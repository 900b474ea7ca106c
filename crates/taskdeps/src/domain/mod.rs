//! Domain types for task tracking.
//!
//! Two entity kinds exist: [`Task`] (an item of work) and [`Dependency`]
//! (a directed edge `task_id -> dependent_task_id`, read "task depends on
//! another task"). Both implement [`Entity`], which is what the store,
//! cache key derivation and accessor are generic over.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Store-assigned identifier of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Wrap a raw id
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<TaskId> for u64 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

/// Store-assigned identifier of a dependency row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyId(pub u64);

impl DependencyId {
    /// Wrap a raw id
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DependencyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<DependencyId> for u64 {
    fn from(id: DependencyId) -> Self {
        id.0
    }
}

/// The two entity kinds the engine manages.
///
/// The kind decides the cache key namespace and the human-readable name used
/// in not-found rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// [`Task`] rows
    Task,
    /// [`Dependency`] rows
    Dependency,
}

impl EntityKind {
    /// Prefix of per-entity cache keys (`TaskItem_7`).
    #[must_use]
    pub const fn entity_prefix(self) -> &'static str {
        match self {
            EntityKind::Task => "TaskItem",
            EntityKind::Dependency => "TaskDependency",
        }
    }

    /// Prefix of page-listing cache keys (`TaskItems_Page1_Size20`).
    #[must_use]
    pub const fn page_prefix(self) -> &'static str {
        match self {
            EntityKind::Task => "TaskItems",
            EntityKind::Dependency => "TaskDependency",
        }
    }

    /// Name used in user-facing messages
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::Task => "Task",
            EntityKind::Dependency => "Task Dependency",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A persisted record type.
///
/// Binds a record to its [`EntityKind`], its id type and the request shape
/// used to create or replace it. Cached values are the serde_json form of the
/// record itself, so `Serialize`/`DeserializeOwned` must round-trip losslessly.
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Identifier type, assigned by the store on insert
    type Id: Copy
        + Eq
        + Ord
        + Hash
        + fmt::Debug
        + fmt::Display
        + From<u64>
        + Into<u64>
        + Send
        + Sync
        + 'static;

    /// Payload accepted by create and update
    type Request: Clone + fmt::Debug + Send + Sync + 'static;

    /// Which namespace this record lives in
    const KIND: EntityKind;

    /// List pages newest-first (descending id) instead of ascending id
    const NEWEST_FIRST: bool;

    /// The record's id
    fn id(&self) -> Self::Id;

    /// Build a new record from a request and a freshly assigned id
    fn from_request(id: Self::Id, request: Self::Request) -> Self;

    /// Overwrite every mutable field from a request
    fn apply(&mut self, request: Self::Request);
}

/// Priority of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Can wait
    Low,
    /// Normal priority
    #[default]
    Medium,
    /// Do first
    High,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        };
        f.write_str(s)
    }
}

/// Status of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    #[default]
    Todo,
    /// Being worked on
    InProgress,
    /// Finished
    Done,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        };
        f.write_str(s)
    }
}

/// An item of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned id
    pub id: TaskId,

    /// Short title
    pub title: String,

    /// Longer description
    #[serde(default)]
    pub description: String,

    /// Priority
    #[serde(default)]
    pub priority: TaskPriority,

    /// Current status
    #[serde(default)]
    pub status: TaskStatus,

    /// Optional due date
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Fields accepted when creating or replacing a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Short title
    pub title: String,
    /// Longer description
    #[serde(default)]
    pub description: String,
    /// Priority
    #[serde(default)]
    pub priority: TaskPriority,
    /// Status
    #[serde(default)]
    pub status: TaskStatus,
    /// Optional due date
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskRequest {
    /// A request with the given title and default everything else
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

impl From<Task> for TaskRequest {
    fn from(task: Task) -> Self {
        Self {
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
        }
    }
}

impl Entity for Task {
    type Id = TaskId;
    type Request = TaskRequest;

    const KIND: EntityKind = EntityKind::Task;
    const NEWEST_FIRST: bool = true;

    fn id(&self) -> TaskId {
        self.id
    }

    fn from_request(id: TaskId, request: TaskRequest) -> Self {
        Self {
            id,
            title: request.title,
            description: request.description,
            priority: request.priority,
            status: request.status,
            due_date: request.due_date,
        }
    }

    fn apply(&mut self, request: TaskRequest) {
        self.title = request.title;
        self.description = request.description;
        self.priority = request.priority;
        self.status = request.status;
        self.due_date = request.due_date;
    }
}

/// A directed edge: `task_id` depends on `dependent_task_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Store-assigned id
    pub id: DependencyId,

    /// The dependent task (edge source)
    pub task_id: TaskId,

    /// The task it depends on (edge target)
    pub dependent_task_id: TaskId,
}

impl Dependency {
    /// Returns `true` if either endpoint is `task`
    #[must_use]
    pub fn touches(&self, task: TaskId) -> bool {
        self.task_id == task || self.dependent_task_id == task
    }
}

/// Endpoints accepted when creating or re-pointing a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRequest {
    /// The dependent task
    pub task_id: TaskId,
    /// The task it depends on
    pub dependent_task_id: TaskId,
}

impl DependencyRequest {
    /// Edge `task_id -> dependent_task_id` from raw ids
    #[must_use]
    pub const fn new(task_id: u64, dependent_task_id: u64) -> Self {
        Self {
            task_id: TaskId(task_id),
            dependent_task_id: TaskId(dependent_task_id),
        }
    }
}

impl Entity for Dependency {
    type Id = DependencyId;
    type Request = DependencyRequest;

    const KIND: EntityKind = EntityKind::Dependency;
    const NEWEST_FIRST: bool = false;

    fn id(&self) -> DependencyId {
        self.id
    }

    fn from_request(id: DependencyId, request: DependencyRequest) -> Self {
        Self {
            id,
            task_id: request.task_id,
            dependent_task_id: request.dependent_task_id,
        }
    }

    fn apply(&mut self, request: DependencyRequest) {
        self.task_id = request.task_id;
        self.dependent_task_id = request.dependent_task_id;
    }
}

/// A 1-based page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page_index: usize,
    page_size: usize,
}

impl PageRequest {
    /// Page size used when the caller does not pick one
    pub const DEFAULT_PAGE_SIZE: usize = 20;

    /// Build a page request.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPage` if either value is zero.
    pub fn new(page_index: usize, page_size: usize) -> Result<Self> {
        if page_index == 0 || page_size == 0 {
            return Err(Error::InvalidPage {
                page_index,
                page_size,
            });
        }
        Ok(Self {
            page_index,
            page_size,
        })
    }

    /// 1-based page index
    #[must_use]
    pub const fn page_index(&self) -> usize {
        self.page_index
    }

    /// Rows per page
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Rows to skip before this page starts
    #[must_use]
    pub const fn skip(&self) -> usize {
        (self.page_index - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_index: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}
