//! The task graph: controller-facing API over tasks and dependency edges.
//!
//! [`TaskGraph`] composes the store, the cache, the [`DependencyValidator`]
//! and one [`CachedAccessor`] per entity kind. Reads go through the
//! accessors. Dependency creates and updates run validate-then-persist inside
//! the dependency write section, so two concurrent requests can neither both
//! insert the same pair nor each add one half of a cycle.
//!
//! # Lock order
//!
//! Operations that write both kinds (task deletion) take the dependency
//! section first, then the task section. Nothing takes them the other way
//! round.
//!
//! # Example
//!
//! ```
//! use taskdeps::domain::{DependencyRequest, TaskRequest};
//! use taskdeps::{Error, TaskGraph};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> taskdeps::Result<()> {
//! let graph = TaskGraph::in_memory();
//! let design = graph.create_task(TaskRequest::titled("Design")).await?;
//! let build = graph.create_task(TaskRequest::titled("Build")).await?;
//!
//! // Build depends on Design
//! graph
//!     .create_dependency(DependencyRequest::new(build.id.get(), design.id.get()))
//!     .await?;
//!
//! // Design depending on Build would close a cycle
//! let err = graph
//!     .create_dependency(DependencyRequest::new(design.id.get(), build.id.get()))
//!     .await
//!     .unwrap_err();
//! assert!(matches!(err, Error::CircularEdge { .. }));
//! # Ok(())
//! # }
//! ```

use crate::accessor::CachedAccessor;
use crate::cache::{Cache, MemoryCache};
use crate::config::{EngineConfig, TaskDeletePolicy};
use crate::domain::{
    Dependency, DependencyId, DependencyRequest, EntityKind, PageRequest, Task, TaskId,
    TaskRequest,
};
use crate::error::{Error, Result};
use crate::store::{Repository, Store};
use crate::validator::DependencyValidator;
use std::sync::Arc;
use tracing::info;

/// Tasks, dependency edges and the integrity rules between them.
pub struct TaskGraph {
    store: Store,
    tasks: CachedAccessor<Task>,
    dependencies: CachedAccessor<Dependency>,
    validator: DependencyValidator,
    delete_policy: TaskDeletePolicy,
    default_page_size: usize,
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.tasks)
            .field("dependencies", &self.dependencies)
            .field("delete_policy", &self.delete_policy)
            .field("default_page_size", &self.default_page_size)
            .finish_non_exhaustive()
    }
}

impl TaskGraph {
    /// Build a graph over `store`, caching through `cache`.
    pub fn new(store: Store, cache: Arc<dyn Cache>, config: &EngineConfig) -> Self {
        let invalidation = config.cache.page_invalidation;
        let tasks = CachedAccessor::new(
            Arc::clone(&store.tasks),
            Arc::clone(&cache),
            config.ttl_for(EntityKind::Task),
            invalidation,
        );
        let dependencies = CachedAccessor::new(
            Arc::clone(&store.dependencies),
            cache,
            config.ttl_for(EntityKind::Dependency),
            invalidation,
        );
        let validator = DependencyValidator::new(Arc::clone(&store.dependencies));

        Self {
            store,
            tasks,
            dependencies,
            validator,
            delete_policy: config.tasks.delete_policy,
            default_page_size: config.paging.default_page_size,
        }
    }

    /// A graph over an in-memory store and cache with default settings.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Store::in_memory(),
            Arc::new(MemoryCache::new()),
            &EngineConfig::default(),
        )
    }

    /// The underlying store
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The dependency validator
    pub fn validator(&self) -> &DependencyValidator {
        &self.validator
    }

    /// Build a page request, falling back to the configured page size.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPage` if the index or size is zero.
    pub fn page(&self, page_index: usize, page_size: Option<usize>) -> Result<PageRequest> {
        PageRequest::new(page_index, page_size.unwrap_or(self.default_page_size))
    }

    // ===== Tasks =====

    /// One page of tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the store read fails.
    pub async fn list_tasks(&self, page: PageRequest) -> Result<Vec<Task>> {
        self.tasks.get_page(page).await
    }

    /// Get a task by id.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the task doesn't exist.
    pub async fn get_task(&self, id: TaskId) -> Result<Task> {
        self.tasks.get(id).await
    }

    /// Create a task.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the store write fails.
    pub async fn create_task(&self, request: TaskRequest) -> Result<Task> {
        self.tasks.create(request).await
    }

    /// Replace a task's fields.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the task doesn't exist.
    pub async fn update_task(&self, id: TaskId, request: TaskRequest) -> Result<Task> {
        self.tasks.update(id, request).await
    }

    /// Delete a task, applying the configured policy to dependency rows that
    /// reference it.
    ///
    /// With [`TaskDeletePolicy::Cascade`] the referencing rows are deleted
    /// first. With [`TaskDeletePolicy::Reject`] nothing is deleted while any
    /// row references the task.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the task doesn't exist
    /// - `Error::TaskInUse` if the policy is `Reject` and rows reference it
    /// - `Error::Store` if a store write fails
    ///
    /// Each cascaded row is committed on its own. If a commit fails partway,
    /// the rows already removed stay removed and the task survives; calling
    /// `delete_task` again finishes the job.
    pub async fn delete_task(&self, id: TaskId) -> Result<Task> {
        let dependencies = self.dependencies.write_section().await;
        let tasks = self.tasks.write_section().await;

        let task = tasks.fetch(id).await?;
        let referencing: Vec<Dependency> = self
            .store
            .dependencies
            .list(None)
            .await?
            .into_iter()
            .filter(|edge| edge.touches(id))
            .collect();

        if !referencing.is_empty() {
            match self.delete_policy {
                TaskDeletePolicy::Reject => {
                    return Err(Error::TaskInUse {
                        task_id: id,
                        dependency_ids: referencing.iter().map(|edge| edge.id).collect(),
                    });
                }
                TaskDeletePolicy::Cascade => {
                    for edge in &referencing {
                        dependencies.delete(edge.id).await?;
                    }
                    info!(task_id = %id, removed = referencing.len(), "Cascaded task delete to dependencies");
                }
            }
        }

        tasks.delete(id).await?;
        Ok(task)
    }

    // ===== Dependencies =====

    /// One page of dependency rows, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the store read fails.
    pub async fn list_dependencies(&self, page: PageRequest) -> Result<Vec<Dependency>> {
        self.dependencies.get_page(page).await
    }

    /// Get a dependency row by id.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the row doesn't exist.
    pub async fn get_dependency(&self, id: DependencyId) -> Result<Dependency> {
        self.dependencies.get(id).await
    }

    /// Add the edge `task_id -> dependent_task_id`.
    ///
    /// # Errors
    ///
    /// - `Error::DuplicateEdge` if the ordered pair already exists
    /// - `Error::CircularEdge` if the edge is a self-loop or closes a cycle
    /// - `Error::Store` if the store read or write fails
    pub async fn create_dependency(&self, request: DependencyRequest) -> Result<Dependency> {
        let section = self.dependencies.write_section().await;
        self.validator.validate(&request, None).await?;
        section.create(request).await
    }

    /// Move an existing row to new endpoints, re-validating against the
    /// proposed pair.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the row doesn't exist
    /// - `Error::DuplicateEdge` if another row already holds the pair
    /// - `Error::CircularEdge` if the new edge would close a cycle
    /// - `Error::Store` if the store read or write fails
    pub async fn update_dependency(
        &self,
        id: DependencyId,
        request: DependencyRequest,
    ) -> Result<Dependency> {
        let section = self.dependencies.write_section().await;
        section.fetch(id).await?;
        self.validator.validate(&request, Some(id)).await?;
        section.update(id, request).await
    }

    /// Delete a dependency row.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the row doesn't exist.
    pub async fn delete_dependency(&self, id: DependencyId) -> Result<Dependency> {
        self.dependencies.delete(id).await
    }

    /// Rows in which `task_id` is the dependent task, i.e. what it depends on.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the store read fails.
    pub async fn dependencies_of(&self, task_id: TaskId) -> Result<Vec<Dependency>> {
        let edges = self.store.dependencies.list(None).await?;
        Ok(edges
            .into_iter()
            .filter(|edge| edge.task_id == task_id)
            .collect())
    }

    /// Rows in which `task_id` is depended upon.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the store read fails.
    pub async fn dependents_of(&self, task_id: TaskId) -> Result<Vec<Dependency>> {
        let edges = self.store.dependencies.list(None).await?;
        Ok(edges
            .into_iter()
            .filter(|edge| edge.dependent_task_id == task_id)
            .collect())
    }

    /// Commit both repositories.
    ///
    /// Every write above already commits; this is for callers that changed
    /// the store directly.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if a commit fails.
    pub async fn save(&self) -> Result<()> {
        self.store.save().await?;
        Ok(())
    }
}
