//! Application context for CLI command execution.
//!
//! [`App`] finds the project root, loads its configuration, opens the JSONL
//! store and wraps it in a [`TaskGraph`] backed by an in-process cache.
//!
//! # Example
//!
//! ```no_run
//! use taskdeps::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     let first_page = app.graph().list_tasks(app.graph().page(1, None)?).await?;
//!     println!("{} tasks on page 1", first_page.len());
//!     Ok(())
//! }
//! ```

use crate::cache::MemoryCache;
use crate::commands::init::find_taskdeps_root;
use crate::config::{EngineConfig, CONFIG_FILE_NAME, TASKDEPS_DIR_NAME};
use crate::engine::TaskGraph;
use crate::error::{ConfigError, Result};
use crate::store::{open_jsonl_store, LoadWarning};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application context for CLI operations.
pub struct App {
    graph: TaskGraph,

    /// Directory containing `.taskdeps/`
    root_dir: PathBuf,

    config: EngineConfig,

    /// Problems found while loading the data files
    warnings: Vec<LoadWarning>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root_dir", &self.root_dir)
            .field("config", &self.config)
            .field("warnings", &self.warnings.len())
            .finish_non_exhaustive()
    }
}

impl App {
    /// Create an App from the given working directory.
    ///
    /// Searches up the directory tree for `.taskdeps/`, loads its
    /// configuration and opens the data files.
    ///
    /// # Errors
    ///
    /// - `ConfigError::NotInitialized` if no project is found
    /// - `Error::Config` if the configuration can't be parsed
    /// - `Error::Store` if a data file can't be read
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root_dir = find_taskdeps_root(working_dir).ok_or_else(|| {
            ConfigError::NotInitialized(working_dir.join(TASKDEPS_DIR_NAME))
        })?;

        let config_path = root_dir.join(TASKDEPS_DIR_NAME).join(CONFIG_FILE_NAME);
        let config = EngineConfig::load(&config_path).await?;

        let (store, warnings) = open_jsonl_store(&config.data_dir(&root_dir)).await?;
        let graph = TaskGraph::new(store, Arc::new(MemoryCache::new()), &config);

        Ok(Self {
            graph,
            root_dir,
            config,
            warnings,
        })
    }

    /// The task graph
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// The loaded configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Directory containing `.taskdeps/`
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Problems found while loading the data files
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init;
    use crate::domain::TaskRequest;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_app_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        init::init(temp_dir.path()).await.unwrap();

        let sub_dir = temp_dir.path().join("src").join("lib");
        std::fs::create_dir_all(&sub_dir).unwrap();

        let app = App::from_directory(&sub_dir).await.unwrap();
        assert_eq!(app.root_dir(), temp_dir.path());
        assert!(app.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_app_writes_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        init::init(temp_dir.path()).await.unwrap();

        let app = App::from_directory(temp_dir.path()).await.unwrap();
        let task = app
            .graph()
            .create_task(TaskRequest::titled("persisted"))
            .await
            .unwrap();
        drop(app);

        let reopened = App::from_directory(temp_dir.path()).await.unwrap();
        assert_eq!(reopened.graph().get_task(task.id).await.unwrap(), task);
    }

    #[tokio::test]
    async fn test_app_from_uninitialized_directory() {
        let temp_dir = TempDir::new().unwrap();

        let err = App::from_directory(temp_dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("Not a taskdeps directory"));
    }
}
