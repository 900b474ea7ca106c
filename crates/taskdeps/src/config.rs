//! Configuration management for taskdeps.
//!
//! Configuration lives in `.taskdeps/config.yaml`. Every key is optional;
//! missing keys take the defaults below:
//! tasks are cached for 5 minutes, dependencies for 15, pages hold 20 rows.

use crate::domain::{EntityKind, PageRequest};
use crate::error::{ConfigError, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Name of the taskdeps directory
pub const TASKDEPS_DIR_NAME: &str = ".taskdeps";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default cache lifetime of task entries, in seconds
pub const DEFAULT_TASK_TTL_SECS: u64 = 5 * 60;

/// Default cache lifetime of dependency entries, in seconds
pub const DEFAULT_DEPENDENCY_TTL_SECS: u64 = 15 * 60;

/// Longest accepted cache lifetime, in seconds (one year)
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// What happens to cached page listings when an entity of the same kind is
/// written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageInvalidation {
    /// Every page key written for the kind is removed after each successful
    /// create, update or delete of that kind.
    #[default]
    OnWrite,

    /// Pages are left to expire. A cached page may omit or show outdated
    /// rows for at most the kind's TTL.
    TtlOnly,
}

/// What deleting a task does to dependency rows that reference it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskDeletePolicy {
    /// Delete the referencing rows along with the task.
    #[default]
    Cascade,

    /// Refuse to delete a task that is still referenced.
    Reject,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Storage settings
    pub storage: StorageConfig,

    /// Cache settings
    pub cache: CacheConfig,

    /// Task lifecycle settings
    pub tasks: TaskConfig,

    /// Listing settings
    pub paging: PagingConfig,
}

/// Storage configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Directory holding the JSONL files, relative to the project root
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(TASKDEPS_DIR_NAME),
        }
    }
}

/// Cache configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Lifetime of task entries and task pages
    pub task_ttl_secs: u64,

    /// Lifetime of dependency entries and dependency pages
    pub dependency_ttl_secs: u64,

    /// Page listing invalidation strategy
    pub page_invalidation: PageInvalidation,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            task_ttl_secs: DEFAULT_TASK_TTL_SECS,
            dependency_ttl_secs: DEFAULT_DEPENDENCY_TTL_SECS,
            page_invalidation: PageInvalidation::default(),
        }
    }
}

/// Task lifecycle configuration section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TaskConfig {
    /// Policy for dependency rows referencing a deleted task
    pub delete_policy: TaskDeletePolicy,
}

/// Listing configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PagingConfig {
    /// Rows per page when the caller does not pick a size
    pub default_page_size: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: PageRequest::DEFAULT_PAGE_SIZE,
        }
    }
}

impl EngineConfig {
    /// Cache lifetime for entries of `kind`
    #[must_use]
    pub fn ttl_for(&self, kind: EntityKind) -> Duration {
        let secs = match kind {
            EntityKind::Task => self.cache.task_ttl_secs,
            EntityKind::Dependency => self.cache.dependency_ttl_secs,
        };
        Duration::from_secs(secs)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for a zero page size, or a TTL of zero
    /// or above [`MAX_TTL_SECS`].
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (field, secs) in [
            ("cache.task-ttl-secs", self.cache.task_ttl_secs),
            ("cache.dependency-ttl-secs", self.cache.dependency_ttl_secs),
        ] {
            if !(1..=MAX_TTL_SECS).contains(&secs) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be between 1 and {MAX_TTL_SECS}"),
                });
            }
        }
        if self.paging.default_page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "paging.default-page-size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Parse and validate YAML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the YAML is malformed or a value is out of range.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotInitialized` if the file doesn't exist, or
    /// `Error::Config` if it can't be parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotInitialized(path.to_path_buf()).into());
            }
            Err(e) => return Err(Error::Io(e)),
        };
        Self::from_yaml(&content)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).map_err(ConfigError::from)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Data directory resolved against the project root
    #[must_use]
    pub fn data_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.storage.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.ttl_for(EntityKind::Task), Duration::from_secs(300));
        assert_eq!(
            config.ttl_for(EntityKind::Dependency),
            Duration::from_secs(900)
        );
        assert_eq!(config.paging.default_page_size, 20);
        assert_eq!(config.cache.page_invalidation, PageInvalidation::OnWrite);
        assert_eq!(config.tasks.delete_policy, TaskDeletePolicy::Cascade);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml(
            "cache:\n  task-ttl-secs: 30\n  page-invalidation: ttl_only\ntasks:\n  delete-policy: reject\n",
        )
        .unwrap();
        assert_eq!(config.cache.task_ttl_secs, 30);
        assert_eq!(config.cache.dependency_ttl_secs, DEFAULT_DEPENDENCY_TTL_SECS);
        assert_eq!(config.cache.page_invalidation, PageInvalidation::TtlOnly);
        assert_eq!(config.tasks.delete_policy, TaskDeletePolicy::Reject);
        assert_eq!(config.storage.data_dir, PathBuf::from(TASKDEPS_DIR_NAME));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let err = EngineConfig::from_yaml("cache:\n  dependency-ttl-secs: 0\n").unwrap_err();
        assert!(err.to_string().contains("dependency-ttl-secs"));
    }

    #[test]
    fn test_ttl_above_maximum_rejected() {
        let err = EngineConfig::from_yaml("cache:\n  task-ttl-secs: 18446744073709551615\n")
            .unwrap_err();
        assert!(err.to_string().contains("task-ttl-secs"));

        let at_limit = format!("cache:\n  dependency-ttl-secs: {MAX_TTL_SECS}\n");
        assert!(EngineConfig::from_yaml(&at_limit).is_ok());
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);

        let mut config = EngineConfig::default();
        config.paging.default_page_size = 50;
        config.save(&path).await.unwrap();

        let loaded = EngineConfig::load(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_not_initialized() {
        let temp_dir = TempDir::new().unwrap();
        let err = EngineConfig::load(&temp_dir.path().join(CONFIG_FILE_NAME))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NotInitialized(_))));
    }
}
