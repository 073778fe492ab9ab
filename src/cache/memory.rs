//! In-memory [`CacheStore`] used by the tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use super::CacheStore;
use crate::error::{AppError, Result};
use crate::models::{Category, CategoryRecord, Location, Stored};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    locations: Vec<Location>,
    rows: HashMap<(Category, Uuid), Vec<Value>>,
    fail_writes: bool,
    fail_at_row: Option<usize>,
}

impl Inner {
    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent insert fail like an unreachable database.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Makes the row at `index` (zero-based) of every later batch fail, after
    /// the rows before it were staged. `None` clears it.
    pub fn set_fail_at_row(&self, index: Option<usize>) {
        self.inner.lock().fail_at_row = index;
    }

    pub fn count(&self, category: Category, location_id: Uuid) -> usize {
        self.inner
            .lock()
            .rows
            .get(&(category, location_id))
            .map_or(0, Vec::len)
    }

    pub fn location_count(&self) -> usize {
        self.inner.lock().locations.len()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn find_location(&self, search_query: &str) -> Result<Option<Location>> {
        Ok(self
            .inner
            .lock()
            .locations
            .iter()
            .find(|l| l.search_query == search_query)
            .cloned())
    }

    async fn insert_location(&self, location: &Location) -> Result<Location> {
        let mut inner = self.inner.lock();
        inner.check_writable()?;
        if let Some(existing) = inner
            .locations
            .iter()
            .find(|l| l.search_query == location.search_query)
        {
            return Ok(existing.clone());
        }
        inner.locations.push(location.clone());
        Ok(location.clone())
    }

    async fn find<R: CategoryRecord>(&self, location_id: Uuid) -> Result<Vec<Stored<R>>> {
        let rows = self
            .inner
            .lock()
            .rows
            .get(&(R::CATEGORY, location_id))
            .cloned()
            .unwrap_or_default();

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(AppError::from))
            .collect()
    }

    async fn insert<R: CategoryRecord>(
        &self,
        location_id: Uuid,
        created_at: DateTime<Utc>,
        record: &R,
    ) -> Result<Stored<R>> {
        let mut stored = self
            .insert_batch(location_id, created_at, std::slice::from_ref(record))
            .await?;
        stored
            .pop()
            .ok_or_else(|| AppError::Malformed("insert returned no row".to_string()))
    }

    async fn insert_batch<R: CategoryRecord>(
        &self,
        location_id: Uuid,
        created_at: DateTime<Utc>,
        records: &[R],
    ) -> Result<Vec<Stored<R>>> {
        let mut inner = self.inner.lock();
        inner.check_writable()?;

        // Stage the whole batch, then commit it in one step.
        let mut next_id = inner.next_id;
        let mut stored = Vec::with_capacity(records.len());
        let mut staged = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if inner.fail_at_row == Some(index) {
                return Err(AppError::Database(sqlx::Error::RowNotFound));
            }
            next_id += 1;
            let row = Stored {
                id: next_id,
                location_id,
                created_at,
                record: record.clone(),
            };
            staged.push(serde_json::to_value(&row)?);
            stored.push(row);
        }

        inner.next_id = next_id;
        inner
            .rows
            .entry((R::CATEGORY, location_id))
            .or_default()
            .extend(staged);
        Ok(stored)
    }

    async fn delete_all<R: CategoryRecord>(&self, location_id: Uuid) -> Result<u64> {
        let removed = self
            .inner
            .lock()
            .rows
            .remove(&(R::CATEGORY, location_id))
            .map_or(0, |rows| rows.len());
        Ok(removed as u64)
    }
}
