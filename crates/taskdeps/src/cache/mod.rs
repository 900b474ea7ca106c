//! Cache collaborator: string-keyed blobs with an absolute TTL.
//!
//! The engine stores the serde_json form of entities and page listings under
//! two key namespaces per [`EntityKind`]:
//!
//! - one key per entity: `TaskItem_7`, `TaskDependency_3`
//! - one key per page listing: `TaskItems_Page1_Size20`,
//!   `TaskDependency_Page2_Size50`
//!
//! The cache is injected as `Arc<dyn Cache>`; it is never a process-wide
//! singleton, which keeps the engine testable against [`MemoryCache`] or a
//! fault-injecting fake.

use crate::domain::{EntityKind, PageRequest};
use crate::error::CacheError;
use async_trait::async_trait;
use std::fmt::Display;
use std::time::Duration;

mod memory;

pub use memory::MemoryCache;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// String-keyed cache with per-entry absolute expiration.
///
/// An entry written with `ttl` must stop being returned once `ttl` has
/// elapsed since the write, regardless of how often it is read.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get the value stored under `key`, or `None` if absent or expired.
    async fn get_string(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set_string(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> CacheResult<()>;
}

/// Cache key of a single entity.
pub fn entity_key(kind: EntityKind, id: impl Display) -> String {
    format!("{}_{}", kind.entity_prefix(), id)
}

/// Cache key of a page listing.
#[must_use]
pub fn page_key(kind: EntityKind, page: PageRequest) -> String {
    format!(
        "{}_Page{}_Size{}",
        kind.page_prefix(),
        page.page_index(),
        page.page_size()
    )
}
