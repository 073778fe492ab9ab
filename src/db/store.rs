use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Executor, FromRow, Postgres};
use tracing::debug;
use uuid::Uuid;

use super::{queries, DbPool};
use crate::cache::CacheStore;
use crate::error::Result;
use crate::models::{CategoryRecord, Location, Stored};

/// [`CacheStore`] backed by the Postgres pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn insert_row<'c, R, E>(
    executor: E,
    location_id: Uuid,
    created_at: DateTime<Utc>,
    record: &R,
) -> Result<Stored<R>>
where
    R: CategoryRecord,
    E: Executor<'c, Database = Postgres>,
{
    let sql = queries::insert_record(R::CATEGORY, R::COLUMNS);
    let query = sqlx::query(&sql).bind(location_id).bind(created_at);
    let row = record.bind_columns(query).fetch_one(executor).await?;
    Ok(Stored::<R>::from_row(&row)?)
}

#[async_trait]
impl CacheStore for PgStore {
    async fn find_location(&self, search_query: &str) -> Result<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(queries::SELECT_LOCATION_BY_QUERY)
            .bind(search_query)
            .fetch_optional(&self.pool)
            .await?;
        Ok(location)
    }

    async fn insert_location(&self, location: &Location) -> Result<Location> {
        let stored = sqlx::query_as::<_, Location>(queries::INSERT_LOCATION)
            .bind(location.id)
            .bind(&location.search_query)
            .bind(&location.formatted_query)
            .bind(location.latitude)
            .bind(location.longitude)
            .bind(location.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(stored)
    }

    async fn find<R: CategoryRecord>(&self, location_id: Uuid) -> Result<Vec<Stored<R>>> {
        let sql = queries::select_records(R::CATEGORY);
        let rows = sqlx::query_as::<_, Stored<R>>(&sql)
            .bind(location_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert<R: CategoryRecord>(
        &self,
        location_id: Uuid,
        created_at: DateTime<Utc>,
        record: &R,
    ) -> Result<Stored<R>> {
        insert_row(&self.pool, location_id, created_at, record).await
    }

    async fn insert_batch<R: CategoryRecord>(
        &self,
        location_id: Uuid,
        created_at: DateTime<Utc>,
        records: &[R],
    ) -> Result<Vec<Stored<R>>> {
        let mut tx = self.pool.begin().await?;

        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            stored.push(insert_row(&mut *tx, location_id, created_at, record).await?);
        }

        tx.commit().await?;
        debug!("Committed {} {} rows", stored.len(), R::CATEGORY);
        Ok(stored)
    }

    async fn delete_all<R: CategoryRecord>(&self, location_id: Uuid) -> Result<u64> {
        let sql = queries::delete_records(R::CATEGORY);
        let result = sqlx::query(&sql)
            .bind(location_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
