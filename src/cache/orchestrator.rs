use chrono::Utc;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, info};
use uuid::Uuid;

use super::keyed_lock::KeyedLocks;
use super::{classify, CacheState, CacheStore};
use crate::config::CacheTtl;
use crate::error::Result;
use crate::models::{Category, CategoryRecord, Geocoded, Location, Stored};

/// Serves category records from the store while they are fresh and refetches
/// them from upstream otherwise.
///
/// Requests for the same key are serialized, so concurrent cold lookups
/// trigger a single upstream fetch; the later callers see the stored rows.
pub struct Orchestrator<S> {
    store: S,
    ttl: CacheTtl,
    record_locks: KeyedLocks<(Category, Uuid)>,
    location_locks: KeyedLocks<String>,
}

impl<S: CacheStore> Orchestrator<S> {
    pub fn new(store: S, ttl: CacheTtl) -> Self {
        Self {
            store,
            ttl,
            record_locks: KeyedLocks::new(),
            location_locks: KeyedLocks::new(),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the stored location for `search_query`, geocoding it only the
    /// first time the query is seen. Locations never go stale.
    pub async fn locate<F, Fut>(&self, search_query: &str, geocode: F) -> Result<Location>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Geocoded>>,
    {
        let _guard = self.location_locks.lock(search_query.to_string()).await;

        if let Some(location) = self.store.find_location(search_query).await? {
            debug!("Location cache hit for '{}'", search_query);
            return Ok(location);
        }

        info!("Geocoding new location '{}'", search_query);
        let location = Location::new(search_query, geocode().await?);
        self.store.insert_location(&location).await
    }

    /// Returns the records of category `R` for `location_id`.
    ///
    /// `fetch` yields the raw upstream elements and is only called on a miss
    /// or after stale rows were deleted. Every element is normalized before
    /// anything is written, and the batch is stored atomically, so a failed
    /// cycle leaves nothing behind.
    pub async fn lookup<R, F, Fut>(&self, location_id: Uuid, fetch: F) -> Result<Vec<Stored<R>>>
    where
        R: CategoryRecord,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Value>>>,
    {
        let category = R::CATEGORY;
        let _guard = self.record_locks.lock((category, location_id)).await;

        let rows = self.store.find::<R>(location_id).await?;
        match classify(rows, self.ttl.threshold(category), Utc::now()) {
            CacheState::Fresh(rows) => {
                debug!("{} cache hit for {} ({} rows)", category, location_id, rows.len());
                return Ok(rows);
            }
            CacheState::Stale => {
                let deleted = self.store.delete_all::<R>(location_id).await?;
                info!("Discarded {} stale {} rows for {}", deleted, category, location_id);
            }
            CacheState::Empty => {
                debug!("{} cache miss for {}", category, location_id);
            }
        }

        let raw = fetch().await?;
        let records = raw
            .into_iter()
            .map(R::from_upstream)
            .collect::<Result<Vec<R>>>()?;

        let created_at = Utc::now();
        let stored = self
            .store
            .insert_batch(location_id, created_at, &records)
            .await?;

        info!("Stored {} {} rows for {}", stored.len(), category, location_id);
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryStore;
    use crate::error::AppError;
    use crate::models::{Event, Movie, Review, Trail, Weather};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn orchestrator() -> Orchestrator<MemoryStore> {
        Orchestrator::new(MemoryStore::new(), CacheTtl::default())
    }

    fn forecast_days(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({ "summary": format!("Day {}", i), "time": 1514764800 + 86400 * i as i64 }))
            .collect()
    }

    fn weather(forecast: &str) -> Weather {
        Weather {
            forecast: forecast.to_string(),
            time: "Mon Jan 01 2018".to_string(),
        }
    }

    /// Counts how often the returned closure's future runs.
    fn counting<T>(
        calls: &Arc<AtomicUsize>,
        value: T,
    ) -> impl FnOnce() -> std::future::Ready<Result<T>> {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(value))
        }
    }

    #[tokio::test]
    async fn test_cold_lookup_fetches_once_and_persists_all() {
        let orch = orchestrator();
        let location_id = Uuid::new_v4();
        let calls = Arc::new(AtomicUsize::new(0));

        let rows = orch
            .lookup::<Weather, _, _>(location_id, counting(&calls, forecast_days(8)))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(rows.len(), 8);
        assert_eq!(orch.store().count(Category::Weather, location_id), 8);
        assert!(rows.iter().all(|r| r.location_id == location_id));
        assert!(rows.iter().all(|r| r.created_at == rows[0].created_at));
    }

    #[tokio::test]
    async fn test_fresh_rows_are_served_without_fetching() {
        let orch = orchestrator();
        let location_id = Uuid::new_v4();
        let seeded = orch
            .store()
            .insert_batch(
                location_id,
                Utc::now() - chrono::Duration::minutes(10),
                &[weather("Sunny"), weather("Cloudy")],
            )
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let rows = orch
            .lookup::<Weather, _, _>(location_id, counting(&calls, forecast_days(3)))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(rows, seeded);
    }

    #[tokio::test]
    async fn test_weather_older_than_thirty_minutes_is_replaced() {
        let orch = orchestrator();
        let location_id = Uuid::new_v4();
        orch.store()
            .insert_batch(
                location_id,
                Utc::now() - chrono::Duration::minutes(31),
                &[weather("Old"), weather("Older"), weather("Oldest")],
            )
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let before = Utc::now();
        let rows = orch
            .lookup::<Weather, _, _>(location_id, counting(&calls, forecast_days(2)))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(rows.len(), 2);
        assert_eq!(orch.store().count(Category::Weather, location_id), 2);
        assert!(rows.iter().all(|r| r.created_at >= before));
        assert!(rows.iter().all(|r| r.record.forecast.starts_with("Day")));
    }

    #[tokio::test]
    async fn test_category_thresholds_apply_per_category() {
        let orch = orchestrator();
        let location_id = Uuid::new_v4();
        let two_hours_ago = Utc::now() - chrono::Duration::hours(2);

        // Two hours is stale for weather but fresh for trails.
        orch.store()
            .insert_batch(location_id, two_hours_ago, &[weather("Old")])
            .await
            .unwrap();
        let trail = Trail {
            url: "https://example.com/t".to_string(),
            name: "Loop".to_string(),
            location: "Here".to_string(),
            length: 1.0,
            condition_date: "2018-07-21".to_string(),
            condition_time: "20:58:20".to_string(),
            conditions: None,
            stars: 4.0,
            star_votes: 3,
            summary: "Short".to_string(),
        };
        orch.store()
            .insert_batch(location_id, two_hours_ago, &[trail])
            .await
            .unwrap();

        let weather_calls = Arc::new(AtomicUsize::new(0));
        orch.lookup::<Weather, _, _>(location_id, counting(&weather_calls, forecast_days(1)))
            .await
            .unwrap();
        let trail_calls = Arc::new(AtomicUsize::new(0));
        let trails = orch
            .lookup::<Trail, _, _>(location_id, counting(&trail_calls, Vec::new()))
            .await
            .unwrap();

        assert_eq!(weather_calls.load(Ordering::SeqCst), 1);
        assert_eq!(trail_calls.load(Ordering::SeqCst), 0);
        assert_eq!(trails.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_upstream_result_is_not_an_error() {
        let orch = orchestrator();
        let location_id = Uuid::new_v4();
        let calls = Arc::new(AtomicUsize::new(0));

        let rows = orch
            .lookup::<Movie, _, _>(location_id, counting(&calls, Vec::new()))
            .await
            .unwrap();

        assert!(rows.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(orch.store().count(Category::Movies, location_id), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_persists_nothing() {
        let orch = orchestrator();
        let location_id = Uuid::new_v4();

        let result = orch
            .lookup::<Review, _, _>(location_id, || async {
                Err::<Vec<Value>, _>(AppError::Malformed("connection reset".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(orch.store().count(Category::Reviews, location_id), 0);

        // No sticky failure: the next request fetches again.
        let calls = Arc::new(AtomicUsize::new(0));
        let business = json!({ "url": "u", "name": "n", "rating": 4.0 });
        let rows = orch
            .lookup::<Review, _, _>(location_id, counting(&calls, vec![business]))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_one_bad_element_aborts_the_whole_batch() {
        let orch = orchestrator();
        let location_id = Uuid::new_v4();
        let calls = Arc::new(AtomicUsize::new(0));
        let events = vec![
            json!({
                "link": "https://www.meetup.com/a",
                "name": "Good",
                "group": { "name": "Host" },
                "created": 1514764800000i64
            }),
            json!({ "link": "https://www.meetup.com/b", "name": "No group" }),
        ];

        let result = orch
            .lookup::<Event, _, _>(location_id, counting(&calls, events))
            .await;

        assert!(matches!(result, Err(AppError::Malformed(_))));
        assert_eq!(orch.store().count(Category::Events, location_id), 0);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let orch = orchestrator();
        orch.store().set_fail_writes(true);
        let calls = Arc::new(AtomicUsize::new(0));

        let result = orch
            .lookup::<Weather, _, _>(Uuid::new_v4(), counting(&calls, forecast_days(2)))
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_store_failure_mid_batch_leaves_no_rows() {
        let orch = orchestrator();
        let location_id = Uuid::new_v4();
        orch.store().set_fail_at_row(Some(1));
        let calls = Arc::new(AtomicUsize::new(0));

        let result = orch
            .lookup::<Weather, _, _>(location_id, counting(&calls, forecast_days(3)))
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(orch.store().count(Category::Weather, location_id), 0);

        // Nothing half-written is served as fresh: the next lookup refetches.
        orch.store().set_fail_at_row(None);
        let retry_calls = Arc::new(AtomicUsize::new(0));
        let rows = orch
            .lookup::<Weather, _, _>(location_id, counting(&retry_calls, forecast_days(3)))
            .await
            .unwrap();
        assert_eq!(retry_calls.load(Ordering::SeqCst), 1);
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_cold_lookups_fetch_once() {
        let orch = Arc::new(orchestrator());
        let location_id = Uuid::new_v4();
        let calls = Arc::new(AtomicUsize::new(0));

        let lookups = (0..3).map(|_| {
            let orch = orch.clone();
            let calls = calls.clone();
            async move {
                orch.lookup::<Weather, _, _>(location_id, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok::<_, AppError>(forecast_days(4))
                })
                .await
            }
        });
        let results = futures::future::join_all(lookups).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(orch.store().count(Category::Weather, location_id), 4);
        for rows in results {
            assert_eq!(rows.unwrap().len(), 4);
        }
    }

    #[tokio::test]
    async fn test_location_is_geocoded_once_per_query() {
        let orch = orchestrator();
        let calls = Arc::new(AtomicUsize::new(0));
        let geocoded = Geocoded {
            formatted_address: "Seattle, WA, USA".to_string(),
            latitude: 47.6062095,
            longitude: -122.3320708,
        };

        let first = orch
            .locate("seattle", counting(&calls, geocoded.clone()))
            .await
            .unwrap();
        let second = orch
            .locate("seattle", counting(&calls, geocoded))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(orch.store().location_count(), 1);
    }

    #[tokio::test]
    async fn test_geocode_failure_stores_no_location() {
        let orch = orchestrator();

        let result = orch
            .locate("nowhere", || async {
                Err::<Geocoded, _>(AppError::Malformed("geocoder returned no results".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(orch.store().location_count(), 0);
    }
}
