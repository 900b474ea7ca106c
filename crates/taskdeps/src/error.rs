//! Error types for the dependency-graph engine.
//!
//! [`Error`] is the caller-facing taxonomy. [`StoreError`] and [`ConfigError`]
//! describe collaborator faults and are propagated inside [`Error`].
//! [`CacheError`] never escapes the accessor: cache faults are logged and the
//! request falls back to the store.

use crate::domain::{DependencyId, EntityKind, TaskId};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The error type for engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No entity of this kind exists with the given id.
    #[error("{kind} with ID {id} not found")]
    NotFound {
        /// Kind of the missing entity
        kind: EntityKind,
        /// The id that was looked up
        id: u64,
    },

    /// An edge with the same ordered pair already exists.
    #[error("duplicate dependency: task {task_id} already depends on task {dependent_task_id}")]
    DuplicateEdge {
        /// The dependent task
        task_id: TaskId,
        /// The task it depends on
        dependent_task_id: TaskId,
    },

    /// Persisting the edge would close a cycle (a self-loop included).
    #[error("circular dependency: task {task_id} cannot depend on task {dependent_task_id}")]
    CircularEdge {
        /// The dependent task
        task_id: TaskId,
        /// The task it would depend on
        dependent_task_id: TaskId,
    },

    /// The task is still referenced by dependency rows and deletion is rejected.
    #[error("task {task_id} is referenced by {} dependencies", dependency_ids.len())]
    TaskInUse {
        /// The task that was to be deleted
        task_id: TaskId,
        /// Rows referencing the task on either end
        dependency_ids: Vec<DependencyId>,
    },

    /// Page index and page size are both 1-based.
    #[error("invalid page: index {page_index} and size {page_size} must both be at least 1")]
    InvalidPage {
        /// Requested page index
        page_index: usize,
        /// Requested page size
        page_size: usize,
    },

    /// Persistence failure, propagated uninterpreted.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns `true` for outcomes the caller is expected to handle
    /// (missing ids, rejected edges, bad paging), as opposed to faults.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. }
                | Error::DuplicateEdge { .. }
                | Error::CircularEdge { .. }
                | Error::TaskInUse { .. }
                | Error::InvalidPage { .. }
        )
    }

    /// HTTP status a controller maps this outcome to.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::DuplicateEdge { .. } | Error::CircularEdge { .. } | Error::InvalidPage { .. } => {
                400
            }
            Error::TaskInUse { .. } => 409,
            Error::Store(_) | Error::Config(_) | Error::Io(_) => 500,
        }
    }
}

/// Persistence errors raised by [`crate::store::Repository`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An update targeted a row that is no longer present.
    #[error("{kind} row {id} vanished before the update was applied")]
    MissingRow {
        /// Kind of the row
        kind: EntityKind,
        /// Row id
        id: u64,
    },

    /// Failed to read or write a backing file.
    #[error("failed to access {}: {source}", path.display())]
    File {
        /// File that could not be accessed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to serialize a row.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure.
    #[error("{0}")]
    Backend(String),
}

/// Cache collaborator errors. Always treated as non-fatal.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backend could not be reached.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// The expiry instant can't be represented.
    #[error("cache ttl of {0:?} is out of range")]
    TtlOutOfRange(std::time::Duration),

    /// A value could not be encoded for the cache.
    #[error("cache encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file found; the data directory was never initialized.
    #[error("Not a taskdeps directory (no {} found). Run 'taskdeps init' first.", .0.display())]
    NotInitialized(PathBuf),

    /// The configuration directory already exists.
    #[error("taskdeps is already initialized here. Found existing '{}'", .0.display())]
    AlreadyInitialized(PathBuf),

    /// Failed to parse or render YAML.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// The offending key
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// A specialized Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
