//! Location-keyed record cache and the lookup-or-fetch policy on top of it.

pub mod keyed_lock;
#[cfg(test)]
pub mod memory;
pub mod orchestrator;

pub use orchestrator::Orchestrator;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CategoryRecord, Location, Stored};

/// Persistent storage for locations and their category records. The
/// category of a call is the record type `R`.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    async fn find_location(&self, search_query: &str) -> Result<Option<Location>>;

    /// Stores a location. If one already exists for the same search query,
    /// that one is returned instead.
    async fn insert_location(&self, location: &Location) -> Result<Location>;

    /// All records of category `R` owned by `location_id`, in insertion order.
    async fn find<R: CategoryRecord>(&self, location_id: Uuid) -> Result<Vec<Stored<R>>>;

    async fn insert<R: CategoryRecord>(
        &self,
        location_id: Uuid,
        created_at: DateTime<Utc>,
        record: &R,
    ) -> Result<Stored<R>>;

    /// Inserts every record or none of them. A failure part way through
    /// leaves no rows behind.
    async fn insert_batch<R: CategoryRecord>(
        &self,
        location_id: Uuid,
        created_at: DateTime<Utc>,
        records: &[R],
    ) -> Result<Vec<Stored<R>>>;

    async fn delete_all<R: CategoryRecord>(&self, location_id: Uuid) -> Result<u64>;
}

/// What the store holds for one location and category.
#[derive(Debug, PartialEq)]
pub enum CacheState<R> {
    Fresh(Vec<Stored<R>>),
    Stale,
    Empty,
}

/// Rows are fresh while the oldest of them is no older than `threshold`.
pub fn classify<R>(rows: Vec<Stored<R>>, threshold: Duration, now: DateTime<Utc>) -> CacheState<R> {
    let Some(oldest) = rows.iter().map(|row| row.created_at).min() else {
        return CacheState::Empty;
    };

    let age = now.signed_duration_since(oldest);
    let fresh = chrono::Duration::from_std(threshold)
        .map(|threshold| age <= threshold)
        .unwrap_or(true);

    if fresh {
        CacheState::Fresh(rows)
    } else {
        CacheState::Stale
    }
}
