//! Dependency validator: duplicate and cycle checks for proposed edges.
//!
//! Both checks read the store's full edge set and answer whether persisting
//! a proposed edge `task_id -> dependent_task_id` would break an invariant:
//!
//! - **No self-loop**: an edge never points a task at itself
//! - **No duplicate edge**: at most one row per ordered pair
//! - **Acyclicity**: no path leads from `dependent_task_id` back to `task_id`
//!
//! The proposed edge is not persisted yet, so a cycle is detected by asking
//! whether `task_id` is already reachable from `dependent_task_id` over the
//! existing edges.
//!
//! The validator never mutates the store or the cache and can be shared by
//! any number of concurrent readers. Its answers are only authoritative while
//! no other writer can change the edge set; the engine runs it inside the
//! dependency write section for that reason.

use crate::domain::{Dependency, DependencyId, DependencyRequest, TaskId};
use crate::error::{Error, Result};
use crate::store::Repository;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Returns `true` if a row other than `exclude` already has the ordered pair
/// `(task_id, dependent_task_id)`.
///
/// Reversed pairs are not duplicates.
pub fn has_duplicate(
    edges: &[Dependency],
    task_id: TaskId,
    dependent_task_id: TaskId,
    exclude: Option<DependencyId>,
) -> bool {
    edges.iter().any(|edge| {
        edge.task_id == task_id
            && edge.dependent_task_id == dependent_task_id
            && Some(edge.id) != exclude
    })
}

/// Returns `true` if adding `task_id -> dependent_task_id` to `edges` would
/// close a cycle, a self-loop included.
///
/// Breadth-first search from `dependent_task_id` over the existing edges,
/// looking for `task_id`. Visited nodes are never enqueued twice, so the scan
/// terminates on diamonds and on graphs that already contain a cycle.
pub fn closes_cycle(edges: &[Dependency], task_id: TaskId, dependent_task_id: TaskId) -> bool {
    if task_id == dependent_task_id {
        return true;
    }

    let mut adjacency: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for edge in edges {
        adjacency
            .entry(edge.task_id)
            .or_default()
            .push(edge.dependent_task_id);
    }

    let mut visited = HashSet::from([dependent_task_id]);
    let mut frontier = VecDeque::from([dependent_task_id]);

    while let Some(current) = frontier.pop_front() {
        let Some(targets) = adjacency.get(&current) else {
            continue;
        };
        if targets.contains(&task_id) {
            return true;
        }
        for &target in targets {
            if visited.insert(target) {
                frontier.push_back(target);
            }
        }
    }

    false
}

/// Store-backed duplicate and cycle checks.
#[derive(Clone)]
pub struct DependencyValidator {
    dependencies: Arc<dyn Repository<Dependency>>,
}

impl std::fmt::Debug for DependencyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyValidator")
            .field("dependencies", &"<dyn Repository<Dependency>>")
            .finish()
    }
}

impl DependencyValidator {
    /// Create a validator reading from the given dependency repository.
    pub fn new(dependencies: Arc<dyn Repository<Dependency>>) -> Self {
        Self { dependencies }
    }

    /// Returns `true` if another row already holds the ordered pair.
    ///
    /// `exclude` lets an update ignore the row being updated.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the edge set can't be read.
    pub async fn is_duplicate(
        &self,
        task_id: TaskId,
        dependent_task_id: TaskId,
        exclude: Option<DependencyId>,
    ) -> Result<bool> {
        let edges = self.dependencies.list(None).await?;
        Ok(has_duplicate(&edges, task_id, dependent_task_id, exclude))
    }

    /// Returns `true` if persisting `task_id -> dependent_task_id` would close
    /// a cycle.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the edge set can't be read.
    pub async fn is_circular(&self, task_id: TaskId, dependent_task_id: TaskId) -> Result<bool> {
        let edges = self.dependencies.list(None).await?;
        Ok(closes_cycle(&edges, task_id, dependent_task_id))
    }

    /// Check a proposed edge, duplicate check first.
    ///
    /// When `exclude` names the row being updated, that row is left out of
    /// both checks: it cannot duplicate itself, and its current endpoints
    /// will not exist once the update lands.
    ///
    /// # Errors
    ///
    /// - `Error::DuplicateEdge` if the pair is already present
    /// - `Error::CircularEdge` if the edge would close a cycle
    /// - `Error::Store` if the edge set can't be read
    pub async fn validate(
        &self,
        request: &DependencyRequest,
        exclude: Option<DependencyId>,
    ) -> Result<()> {
        let mut edges = self.dependencies.list(None).await?;
        let DependencyRequest {
            task_id,
            dependent_task_id,
        } = *request;

        if has_duplicate(&edges, task_id, dependent_task_id, exclude) {
            debug!(%task_id, %dependent_task_id, "Rejected duplicate dependency");
            return Err(Error::DuplicateEdge {
                task_id,
                dependent_task_id,
            });
        }

        if let Some(excluded) = exclude {
            edges.retain(|edge| edge.id != excluded);
        }
        if closes_cycle(&edges, task_id, dependent_task_id) {
            debug!(%task_id, %dependent_task_id, "Rejected circular dependency");
            return Err(Error::CircularEdge {
                task_id,
                dependent_task_id,
            });
        }

        Ok(())
    }
}
