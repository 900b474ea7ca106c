//! Cache-coherent accessor: read-through and write-through caching per kind.
//!
//! Every read prefers the cache and populates it from the store on a miss.
//! Every successful write refreshes or removes the entity's own key, so a
//! [`CachedAccessor::get`] issued after a write returns exactly what was
//! written.
//!
//! # Page listings
//!
//! Page keys (`TaskItems_Page1_Size20`) cannot be derived from the entity
//! being written. With [`PageInvalidation::OnWrite`] the accessor keeps the
//! set of page keys it has written and removes all of them after each write
//! of the kind. With [`PageInvalidation::TtlOnly`] pages are left alone and a
//! cached page can be stale for at most the TTL; a stale page is always a
//! complete earlier listing, never a merge of old and new rows.
//!
//! # Concurrency
//!
//! Writes of one kind are serialised by a [`WriteSection`], held across the
//! store write and the cache refresh so two concurrent updates cannot leave
//! the older value cached. Reads never take that lock. Instead each write
//! bumps a generation counter, and a read-through populate is skipped when
//! the generation moved while the store fetch was in flight. The counter's
//! lock is held while a populate or a write publishes to the cache, so the
//! check and the publish can't interleave with a concurrent write.
//!
//! # Cache failures
//!
//! Cache errors never fail a request. They are logged and the accessor falls
//! back to the store. A failed refresh after a write is followed by a remove
//! of the key so the previous value can't be served.

use crate::cache::{entity_key, page_key, Cache};
use crate::config::PageInvalidation;
use crate::domain::{Entity, EntityKind, PageRequest};
use crate::error::{CacheError, Error, Result};
use crate::store::{Repository, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Read-through/write-through access to one entity kind.
pub struct CachedAccessor<E: Entity> {
    repository: Arc<dyn Repository<E>>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
    invalidation: PageInvalidation,

    /// Page keys written since the last invalidation (`OnWrite` only)
    page_keys: Mutex<BTreeSet<String>>,

    /// Bumped after every store write of this kind
    generation: Mutex<u64>,

    writes: Mutex<()>,
}

impl<E: Entity> std::fmt::Debug for CachedAccessor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedAccessor")
            .field("kind", &E::KIND)
            .field("ttl", &self.ttl)
            .field("invalidation", &self.invalidation)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> CachedAccessor<E> {
    /// Create an accessor over `repository`, caching entries for `ttl`.
    pub fn new(
        repository: Arc<dyn Repository<E>>,
        cache: Arc<dyn Cache>,
        ttl: Duration,
        invalidation: PageInvalidation,
    ) -> Self {
        Self {
            repository,
            cache,
            ttl,
            invalidation,
            page_keys: Mutex::new(BTreeSet::new()),
            generation: Mutex::new(0),
            writes: Mutex::new(()),
        }
    }

    /// The kind this accessor serves
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        E::KIND
    }

    /// Absolute lifetime of entries written by this accessor
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get one entity, from cache if possible.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the store has no such row
    /// - `Error::Store` if the store read fails
    pub async fn get(&self, id: E::Id) -> Result<E> {
        let key = entity_key(E::KIND, id);
        if let Some(cached) = self.read_cached::<E>(&key).await {
            return Ok(cached);
        }

        let seen = *self.generation.lock().await;
        let entity = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found::<E>(id))?;

        let generation = self.generation.lock().await;
        if *generation == seen {
            self.write_cached(&key, &entity).await;
        } else {
            debug!(%key, "Skipped populate, a write landed during the fetch");
        }
        Ok(entity)
    }

    /// Get one page of the kind's listing, from cache if possible.
    ///
    /// On a miss the page is fetched from the store and both the page key and
    /// every listed entity's own key are populated. A page starting past the
    /// last row is empty and is not cached.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the store read fails.
    pub async fn get_page(&self, page: PageRequest) -> Result<Vec<E>> {
        let key = page_key(E::KIND, page);
        if let Some(cached) = self.read_cached::<Vec<E>>(&key).await {
            return Ok(cached);
        }

        let seen = *self.generation.lock().await;
        let total = self.repository.count().await?;
        if page.skip() >= total {
            return Ok(Vec::new());
        }
        let rows = self.repository.list(Some(page)).await?;

        let generation = self.generation.lock().await;
        if *generation == seen {
            for row in &rows {
                self.write_cached(&entity_key(E::KIND, row.id()), row).await;
            }
            if self.invalidation == PageInvalidation::OnWrite {
                self.page_keys.lock().await.insert(key.clone());
            }
            self.write_cached(&key, &rows).await;
        } else {
            debug!(%key, "Skipped page populate, a write landed during the fetch");
        }
        Ok(rows)
    }

    /// Insert a new entity and cache it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the insert or commit fails.
    pub async fn create(&self, request: E::Request) -> Result<E> {
        self.write_section().await.create(request).await
    }

    /// Replace an entity's fields and refresh its cache entry.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the store has no such row
    /// - `Error::Store` if the update or commit fails
    pub async fn update(&self, id: E::Id, request: E::Request) -> Result<E> {
        self.write_section().await.update(id, request).await
    }

    /// Delete an entity and drop its cache entry. Returns the deleted row.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the store has no such row
    /// - `Error::Store` if the delete or commit fails
    pub async fn delete(&self, id: E::Id) -> Result<E> {
        self.write_section().await.delete(id).await
    }

    /// Enter the write section of this kind.
    ///
    /// Writes of the kind are serialised until the returned guard is dropped,
    /// so a caller can run checks against the store and then write without
    /// another writer slipping in between.
    pub async fn write_section(&self) -> WriteSection<'_, E> {
        WriteSection {
            accessor: self,
            _guard: self.writes.lock().await,
        }
    }

    /// Page keys currently tracked for invalidation, sorted.
    pub async fn tracked_page_keys(&self) -> Vec<String> {
        self.page_keys.lock().await.iter().cloned().collect()
    }

    async fn read_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get_string(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(key, "Cache hit");
                    Some(value)
                }
                Err(error) => {
                    warn!(key, %error, "Discarding undecodable cache entry");
                    self.evict(key).await;
                    None
                }
            },
            Ok(None) => {
                debug!(key, "Cache miss");
                None
            }
            Err(error) => {
                warn!(key, %error, "Cache read failed, falling back to store");
                None
            }
        }
    }

    async fn write_cached<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let outcome = match serde_json::to_string(value) {
            Ok(encoded) => self.cache.set_string(key, encoded, self.ttl).await,
            Err(e) => Err(CacheError::from(e)),
        };
        if let Err(error) = outcome {
            warn!(key, %error, "Cache write failed, removing the key instead");
            self.evict(key).await;
        }
    }

    async fn evict(&self, key: &str) {
        if let Err(error) = self.cache.remove(key).await {
            warn!(key, %error, "Cache remove failed, entry may be stale until it expires");
        }
    }

    async fn invalidate_pages(&self) {
        if self.invalidation != PageInvalidation::OnWrite {
            return;
        }
        let keys = std::mem::take(&mut *self.page_keys.lock().await);
        for key in &keys {
            self.evict(key).await;
        }
        if !keys.is_empty() {
            debug!(kind = %E::KIND, count = keys.len(), "Invalidated cached pages");
        }
    }
}

/// Exclusive write access to one entity kind.
///
/// Obtained from [`CachedAccessor::write_section`]. Reads through the section
/// go straight to the store.
pub struct WriteSection<'a, E: Entity> {
    accessor: &'a CachedAccessor<E>,
    _guard: MutexGuard<'a, ()>,
}

impl<E: Entity> WriteSection<'_, E> {
    /// Read a row straight from the store.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the store has no such row
    /// - `Error::Store` if the store read fails
    pub async fn fetch(&self, id: E::Id) -> Result<E> {
        self.accessor
            .repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found::<E>(id))
    }

    /// Insert and commit a new row, then cache it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the insert or commit fails.
    pub async fn create(&self, request: E::Request) -> Result<E> {
        let repository = &self.accessor.repository;
        let entity = repository.insert(request).await?;
        let saved = repository.save().await;
        self.finish(entity.id(), Some(&entity), saved).await?;

        info!(kind = %E::KIND, id = %entity.id(), "Created");
        Ok(entity)
    }

    /// Replace a row's fields, commit, then refresh its cache entry.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the store has no such row
    /// - `Error::Store` if the update or commit fails
    pub async fn update(&self, id: E::Id, request: E::Request) -> Result<E> {
        let mut entity = self.fetch(id).await?;
        entity.apply(request);

        let repository = &self.accessor.repository;
        repository.update(&entity).await?;
        let saved = repository.save().await;
        self.finish(id, Some(&entity), saved).await?;

        info!(kind = %E::KIND, %id, "Updated");
        Ok(entity)
    }

    /// Delete a row, commit, then drop its cache entry.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the store has no such row
    /// - `Error::Store` if the delete or commit fails
    pub async fn delete(&self, id: E::Id) -> Result<E> {
        let entity = self.fetch(id).await?;

        let repository = &self.accessor.repository;
        if !repository.delete(id).await? {
            return Err(not_found::<E>(id));
        }
        let saved = repository.save().await;
        self.finish(id, None, saved).await?;

        info!(kind = %E::KIND, %id, "Deleted");
        Ok(entity)
    }

    /// Publish a store write to the cache.
    ///
    /// `value` is the entity's new state, or `None` after a delete. When the
    /// commit failed the key is removed instead of refreshed, since the
    /// store's state is then unknown.
    async fn finish(&self, id: E::Id, value: Option<&E>, saved: StoreResult<()>) -> Result<()> {
        let accessor = self.accessor;
        let mut generation = accessor.generation.lock().await;
        *generation += 1;

        let key = entity_key(E::KIND, id);
        match (&saved, value) {
            (Ok(()), Some(value)) => accessor.write_cached(&key, value).await,
            _ => accessor.evict(&key).await,
        }
        accessor.invalidate_pages().await;

        saved.map_err(Error::from)
    }
}

fn not_found<E: Entity>(id: E::Id) -> Error {
    Error::NotFound {
        kind: E::KIND,
        id: id.into(),
    }
}
