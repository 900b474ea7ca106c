//! In-memory repository backed by an ordered map.

use super::{Repository, StoreResult};
use crate::domain::{Entity, PageRequest};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Rows plus the id counter, guarded together so ids are never reused.
struct Table<E: Entity> {
    rows: BTreeMap<E::Id, E>,

    /// Next id to hand out. Starts at 1 and only ever grows.
    next_id: u64,
}

/// Ephemeral repository for one entity kind.
///
/// Rows live in a `BTreeMap` keyed by id, so listing order is the id order
/// (reversed for kinds that list newest-first). Ids are assigned from a
/// monotonic counter and are not reused after deletes.
pub struct MemoryRepository<E: Entity> {
    table: RwLock<Table<E>>,
}

impl<E: Entity> MemoryRepository<E> {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    /// Create a repository pre-populated with rows (ids kept as-is).
    ///
    /// The id counter resumes after the highest id present. A later row with
    /// an id already seen replaces the earlier one.
    #[must_use]
    pub fn with_rows(rows: Vec<E>) -> Self {
        let next_id = rows
            .iter()
            .map(|row| Into::<u64>::into(row.id()))
            .max()
            .map_or(1, |max| max + 1);
        let rows = rows.into_iter().map(|row| (row.id(), row)).collect();
        Self {
            table: RwLock::new(Table { rows, next_id }),
        }
    }

    /// Snapshot of every row in ascending id order.
    pub async fn snapshot(&self) -> Vec<E> {
        self.table.read().await.rows.values().cloned().collect()
    }
}

impl<E: Entity> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn list(&self, page: Option<PageRequest>) -> StoreResult<Vec<E>> {
        let table = self.table.read().await;
        let skip = page.map_or(0, |p| p.skip());
        let take = page.map_or(usize::MAX, |p| p.page_size());

        let rows = if E::NEWEST_FIRST {
            table.rows.values().rev().skip(skip).take(take).cloned().collect()
        } else {
            table.rows.values().skip(skip).take(take).cloned().collect()
        };
        Ok(rows)
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.table.read().await.rows.len())
    }

    async fn get_by_id(&self, id: E::Id) -> StoreResult<Option<E>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn insert(&self, request: E::Request) -> StoreResult<E> {
        let mut table = self.table.write().await;
        let id = E::Id::from(table.next_id);
        table.next_id += 1;

        let entity = E::from_request(id, request);
        table.rows.insert(id, entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: &E) -> StoreResult<()> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&entity.id()) {
            Some(row) => {
                *row = entity.clone();
                Ok(())
            }
            None => Err(StoreError::MissingRow {
                kind: E::KIND,
                id: entity.id().into(),
            }),
        }
    }

    async fn delete(&self, id: E::Id) -> StoreResult<bool> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }

    async fn save(&self) -> StoreResult<()> {
        Ok(())
    }
}
