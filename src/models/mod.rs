//! Normalized records and the per-category mapping from upstream JSON.
//!
//! Every category record is a plain data struct. Its bookkeeping (row id,
//! owning location, creation time) lives in [`Stored`], which wraps the
//! record once it has been persisted.

pub mod event;
pub mod location;
pub mod movie;
pub mod params;
pub mod review;
pub mod trail;
pub mod weather;

pub use event::Event;
pub use location::{Geocoded, Location};
pub use movie::Movie;
pub use review::Review;
pub use trail::Trail;
pub use weather::Weather;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, Postgres, Row};
use std::fmt;
use uuid::Uuid;

use crate::error::Result;

pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// The cached data categories hanging off a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Weather,
    Reviews,
    Movies,
    Events,
    Trails,
}

impl Category {
    pub fn table(self) -> &'static str {
        match self {
            Category::Weather => "weathers",
            Category::Reviews => "reviews",
            Category::Movies => "movies",
            Category::Events => "events",
            Category::Trails => "trails",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A normalized record belonging to one [`Category`].
pub trait CategoryRecord:
    Serialize + DeserializeOwned + for<'r> FromRow<'r, PgRow> + Clone + Send + Sync + Unpin + 'static
{
    const CATEGORY: Category;

    /// Category columns, in the order `bind_columns` binds them.
    const COLUMNS: &'static [&'static str];

    /// Maps one upstream element into a record. A missing or mistyped field
    /// fails the whole fetch cycle.
    fn from_upstream(raw: Value) -> Result<Self>;

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q>;
}

/// A persisted record with its row id, owning location and creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stored<R> {
    pub id: i64,
    pub location_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: R,
}

impl<'r, R> FromRow<'r, PgRow> for Stored<R>
where
    R: FromRow<'r, PgRow>,
{
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            location_id: row.try_get("location_id")?,
            created_at: row.try_get("created_at")?,
            record: R::from_row(row)?,
        })
    }
}

/// Renders a day the way the client displays it, e.g. `Mon Jan 01 2018`.
pub(crate) fn format_day<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    at.format("%a %b %d %Y").to_string()
}

/// Renders `at` as a day in the server's local zone (`TZ`).
pub(crate) fn format_local_day(at: DateTime<Utc>) -> String {
    format_day(&at.with_timezone(&Local))
}
