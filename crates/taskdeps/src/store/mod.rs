//! Store collaborator: CRUD plus paged listing per entity kind.
//!
//! The engine never touches persistence directly. It goes through one
//! [`Repository`] per entity kind, bundled in a [`Store`]. Two backends exist:
//!
//! - **In-memory** ([`MemoryRepository`]): ephemeral, ideal for tests
//! - **JSONL** ([`JsonlRepository`]): in-memory rows committed to one JSON
//!   Lines file per kind on [`Repository::save`]
//!
//! # Thread Safety
//!
//! Repositories are shared between concurrently running requests as
//! `Arc<dyn Repository<E>>`, so every method takes `&self` and
//! implementations synchronise internally. No caller-visible locking API
//! exists; serialising a validate-then-insert sequence is the engine's job
//! (see [`crate::accessor::WriteSection`]).
//!
//! # Example
//!
//! ```
//! use taskdeps::domain::{PageRequest, TaskRequest};
//! use taskdeps::store::{Repository, Store};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> taskdeps::Result<()> {
//!     let store = Store::in_memory();
//!     let task = store.tasks.insert(TaskRequest::titled("Write docs")).await?;
//!     store.save().await?;
//!
//!     let page = store.tasks.list(Some(PageRequest::default())).await?;
//!     assert_eq!(page[0].id, task.id);
//!     Ok(())
//! }
//! ```

use crate::domain::{Dependency, Entity, PageRequest, Task};
use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::Arc;

mod jsonl;
mod memory;

pub use jsonl::{open_jsonl_store, JsonlRepository, LoadWarning, DEPENDENCIES_FILE, TASKS_FILE};
pub use memory::MemoryRepository;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence interface for one entity kind.
///
/// # Method Categories
///
/// - **Reads**: `list`, `count`, `get_by_id`
/// - **Writes**: `insert`, `update`, `delete`
/// - **Commit**: `save`
///
/// `list(None)` returns every row; the dependency validator relies on this
/// for its graph scans, so it must stay tractable for the expected graph size.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// List rows in the kind's listing order, optionally restricted to a page.
    ///
    /// A page starting past the last row yields an empty vector.
    async fn list(&self, page: Option<PageRequest>) -> StoreResult<Vec<E>>;

    /// Number of rows.
    async fn count(&self) -> StoreResult<usize>;

    /// Get a row by id. Returns `None` if it doesn't exist.
    async fn get_by_id(&self, id: E::Id) -> StoreResult<Option<E>>;

    /// Insert a new row, assigning its id.
    async fn insert(&self, request: E::Request) -> StoreResult<E>;

    /// Replace an existing row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::MissingRow` if no row has `entity.id()`.
    async fn update(&self, entity: &E) -> StoreResult<()>;

    /// Delete a row. Returns `false` if it was already gone.
    async fn delete(&self, id: E::Id) -> StoreResult<bool>;

    /// Commit pending writes.
    ///
    /// For the in-memory backend this is a no-op. For JSONL it rewrites the
    /// backing file atomically.
    async fn save(&self) -> StoreResult<()>;
}

/// The store collaborator: one repository per entity kind.
#[derive(Clone)]
pub struct Store {
    /// Task rows
    pub tasks: Arc<dyn Repository<Task>>,

    /// Dependency rows
    pub dependencies: Arc<dyn Repository<Dependency>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("tasks", &"<dyn Repository<Task>>")
            .field("dependencies", &"<dyn Repository<Dependency>>")
            .finish()
    }
}

impl Store {
    /// Bundle two repositories.
    pub fn new(
        tasks: Arc<dyn Repository<Task>>,
        dependencies: Arc<dyn Repository<Dependency>>,
    ) -> Self {
        Self {
            tasks,
            dependencies,
        }
    }

    /// A fresh, empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryRepository::<Task>::new()),
            Arc::new(MemoryRepository::<Dependency>::new()),
        )
    }

    /// Commit pending writes of both kinds.
    ///
    /// # Errors
    ///
    /// Returns the first repository's error; the second is not attempted.
    pub async fn save(&self) -> StoreResult<()> {
        self.tasks.save().await?;
        self.dependencies.save().await
    }
}
