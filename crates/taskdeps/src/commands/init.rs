//! Implementation of the `init` command.
//!
//! Creates the `.taskdeps/` directory with a default configuration and empty
//! data files, and locates an existing one from any subdirectory.

use crate::config::{EngineConfig, CONFIG_FILE_NAME, TASKDEPS_DIR_NAME};
use crate::error::{ConfigError, Result};
use crate::store::{DEPENDENCIES_FILE, TASKS_FILE};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the gitignore file within .taskdeps
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Maximum directory depth to traverse when searching for the project root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created taskdeps directory
    pub taskdeps_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created tasks file
    pub tasks_file: PathBuf,
    /// Path to the created dependencies file
    pub dependencies_file: PathBuf,
}

/// Initialize a new taskdeps project in `base_dir`.
///
/// # Errors
///
/// - `ConfigError::AlreadyInitialized` if `.taskdeps/` already exists
/// - `Error::Io` if a file can't be written
pub async fn init(base_dir: &Path) -> Result<InitResult> {
    let taskdeps_dir = base_dir.join(TASKDEPS_DIR_NAME);
    if taskdeps_dir.exists() {
        return Err(ConfigError::AlreadyInitialized(taskdeps_dir).into());
    }
    fs::create_dir_all(&taskdeps_dir).await?;

    let config = EngineConfig::default();
    let config_file = taskdeps_dir.join(CONFIG_FILE_NAME);
    config.save(&config_file).await?;

    let data_dir = config.data_dir(base_dir);
    fs::create_dir_all(&data_dir).await?;
    let tasks_file = data_dir.join(TASKS_FILE);
    let dependencies_file = data_dir.join(DEPENDENCIES_FILE);
    fs::write(&tasks_file, "").await?;
    fs::write(&dependencies_file, "").await?;

    let gitignore_content = "\
# Taskdeps scratch files; the .jsonl data files should be tracked
*.tmp
";
    fs::write(taskdeps_dir.join(GITIGNORE_FILE_NAME), gitignore_content).await?;

    Ok(InitResult {
        taskdeps_dir,
        config_file,
        tasks_file,
        dependencies_file,
    })
}

/// Find the project root by searching up the directory tree for `.taskdeps/`.
///
/// Returns `None` if no project is found within [`MAX_TRAVERSAL_DEPTH`]
/// levels.
pub fn find_taskdeps_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(TASKDEPS_DIR_NAME).exists() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
