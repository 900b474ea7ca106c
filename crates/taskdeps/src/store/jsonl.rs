//! JSONL persistence for the store.
//!
//! Each entity kind is kept in its own JSON Lines file inside the data
//! directory. Rows are held in memory by a [`MemoryRepository`] and the file
//! is rewritten atomically on [`Repository::save`].
//!
//! Loading is resilient: malformed lines are skipped and reported as
//! [`LoadWarning`]s rather than failing the whole load. Dependency rows that
//! already violate the graph invariants (self-loops, duplicate pairs, cycles)
//! are kept as-is but reported, since the validator's traversal tolerates a
//! malformed graph and the rows may only be repaired by deleting them.

use super::{MemoryRepository, Repository, Store, StoreResult};
use crate::domain::{Dependency, DependencyId, Entity, PageRequest, Task, TaskId};
use crate::error::StoreError;
use async_trait::async_trait;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

/// Name of the tasks data file
pub const TASKS_FILE: &str = "tasks.jsonl";

/// Name of the dependencies data file
pub const DEPENDENCIES_FILE: &str = "dependencies.jsonl";

/// Non-fatal problems found while loading JSONL data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// A line that couldn't be parsed.
    ///
    /// **Effect**: The line is skipped; no row is created from it.
    MalformedJson {
        /// File the line came from
        file: PathBuf,
        /// 1-based line number
        line_number: usize,
        /// Parser message
        error: String,
    },

    /// Two lines carry the same id.
    ///
    /// **Effect**: The later line wins.
    DuplicateId {
        /// File the lines came from
        file: PathBuf,
        /// The repeated id
        id: u64,
    },

    /// A dependency row points a task at itself.
    ///
    /// **Effect**: The row is loaded; delete it to repair the graph.
    SelfLoop {
        /// The offending row
        id: DependencyId,
        /// The task on both ends
        task_id: TaskId,
    },

    /// Several rows share the same ordered pair.
    ///
    /// **Effect**: All rows are loaded; the lowest id is the original.
    DuplicateEdge {
        /// Rows sharing the pair
        ids: Vec<DependencyId>,
        /// Edge source
        task_id: TaskId,
        /// Edge target
        dependent_task_id: TaskId,
    },

    /// The loaded edges already contain a cycle through these tasks.
    ///
    /// **Effect**: The rows are loaded; no new edge into the cycle can be
    /// validated until one of them is removed.
    Cycle {
        /// Tasks on the strongly connected component, ascending
        task_ids: Vec<TaskId>,
    },
}

/// A repository whose rows are committed to a JSONL file on `save()`.
pub struct JsonlRepository<E: Entity> {
    rows: MemoryRepository<E>,
    path: PathBuf,
}

impl<E: Entity> JsonlRepository<E> {
    /// Load rows from `path`. A missing file is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::File` if the file exists but can't be read.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<(Self, Vec<LoadWarning>)> {
        let path = path.into();
        let (rows, warnings) = read_rows::<E>(&path).await?;
        debug!(path = %path.display(), rows = rows.len(), "Loaded JSONL rows");

        let repo = Self {
            rows: MemoryRepository::with_rows(rows),
            path,
        };
        Ok((repo, warnings))
    }

    /// The backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for JsonlRepository<E> {
    async fn list(&self, page: Option<PageRequest>) -> StoreResult<Vec<E>> {
        self.rows.list(page).await
    }

    async fn count(&self) -> StoreResult<usize> {
        self.rows.count().await
    }

    async fn get_by_id(&self, id: E::Id) -> StoreResult<Option<E>> {
        self.rows.get_by_id(id).await
    }

    async fn insert(&self, request: E::Request) -> StoreResult<E> {
        self.rows.insert(request).await
    }

    async fn update(&self, entity: &E) -> StoreResult<()> {
        self.rows.update(entity).await
    }

    async fn delete(&self, id: E::Id) -> StoreResult<bool> {
        self.rows.delete(id).await
    }

    async fn save(&self) -> StoreResult<()> {
        let rows = self.rows.snapshot().await;
        write_rows_atomic(&self.path, &rows).await
    }
}

/// Open a JSONL-backed store in `data_dir`.
///
/// Reads [`TASKS_FILE`] and [`DEPENDENCIES_FILE`], then audits the loaded
/// dependency rows. Every warning is also logged.
///
/// # Errors
///
/// Returns `StoreError::File` if either file exists but can't be read.
pub async fn open_jsonl_store(data_dir: &Path) -> StoreResult<(Store, Vec<LoadWarning>)> {
    let (tasks, mut warnings) = JsonlRepository::<Task>::open(data_dir.join(TASKS_FILE)).await?;
    let (dependencies, dep_warnings) =
        JsonlRepository::<Dependency>::open(data_dir.join(DEPENDENCIES_FILE)).await?;
    warnings.extend(dep_warnings);
    warnings.extend(audit_edges(&dependencies.rows.snapshot().await));

    for warning in &warnings {
        warn!(?warning, "Problem in stored data");
    }

    let store = Store::new(Arc::new(tasks), Arc::new(dependencies));
    Ok((store, warnings))
}

/// Report rows that already break the no-self-loop, no-duplicate or
/// acyclicity invariants.
pub(crate) fn audit_edges(edges: &[Dependency]) -> Vec<LoadWarning> {
    let mut warnings = Vec::new();
    let mut pairs: HashMap<(TaskId, TaskId), Vec<DependencyId>> = HashMap::new();
    let mut graph = DiGraphMap::<TaskId, ()>::new();

    for edge in edges {
        if edge.task_id == edge.dependent_task_id {
            warnings.push(LoadWarning::SelfLoop {
                id: edge.id,
                task_id: edge.task_id,
            });
            continue;
        }
        pairs
            .entry((edge.task_id, edge.dependent_task_id))
            .or_default()
            .push(edge.id);
        graph.add_edge(edge.task_id, edge.dependent_task_id, ());
    }

    let mut duplicates: Vec<_> = pairs.into_iter().filter(|(_, ids)| ids.len() > 1).collect();
    duplicates.sort();
    for ((task_id, dependent_task_id), ids) in duplicates {
        warnings.push(LoadWarning::DuplicateEdge {
            ids,
            task_id,
            dependent_task_id,
        });
    }

    // Self-loops were skipped above, so any component with more than one
    // node is a genuine cycle.
    let mut cycles: Vec<Vec<TaskId>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|mut component| {
            component.sort();
            component
        })
        .collect();
    cycles.sort();
    warnings.extend(
        cycles
            .into_iter()
            .map(|task_ids| LoadWarning::Cycle { task_ids }),
    );

    warnings
}

async fn read_rows<E: Entity>(
    path: &Path,
) -> StoreResult<(Vec<E>, Vec<LoadWarning>)> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok((Vec::new(), Vec::new())),
        Err(source) => {
            return Err(StoreError::File {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut rows: Vec<E> = Vec::new();
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<E>(line) {
            Ok(row) => {
                let id: u64 = row.id().into();
                if !seen.insert(id) {
                    warnings.push(LoadWarning::DuplicateId {
                        file: path.to_path_buf(),
                        id,
                    });
                    rows.retain(|existing| Into::<u64>::into(existing.id()) != id);
                }
                rows.push(row);
            }
            Err(e) => warnings.push(LoadWarning::MalformedJson {
                file: path.to_path_buf(),
                line_number: index + 1,
                error: e.to_string(),
            }),
        }
    }

    Ok((rows, warnings))
}

/// Write rows to `path` using a write-then-rename pattern, so a crash
/// mid-write leaves the previous file intact.
async fn write_rows_atomic<E: Serialize>(path: &Path, rows: &[E]) -> StoreResult<()> {
    let file_error = |source: std::io::Error| StoreError::File {
        path: path.to_path_buf(),
        source,
    };
    let temp_path = path.with_extension("jsonl.tmp");

    let file = File::create(&temp_path).await.map_err(file_error)?;
    let mut writer = BufWriter::new(file);

    for row in rows {
        let json = serde_json::to_string(row)?;
        writer.write_all(json.as_bytes()).await.map_err(file_error)?;
        writer.write_all(b"\n").await.map_err(file_error)?;
    }

    writer.flush().await.map_err(file_error)?;
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(file_error)?;

    debug!(path = %path.display(), rows = rows.len(), "Saved JSONL rows");
    Ok(())
}
