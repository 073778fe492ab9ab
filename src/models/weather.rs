use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::{format_local_day, Category, CategoryRecord, PgQuery};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Weather {
    pub forecast: String,
    pub time: String,
}

/// One entry of the forecast service's `daily.data` list.
#[derive(Debug, Deserialize)]
struct ForecastDay {
    summary: String,
    time: i64, // unix seconds
}

impl CategoryRecord for Weather {
    const CATEGORY: Category = Category::Weather;
    const COLUMNS: &'static [&'static str] = &["forecast", "time"];

    fn from_upstream(raw: Value) -> Result<Self> {
        let day: ForecastDay = serde_json::from_value(raw)?;
        let at = DateTime::from_timestamp(day.time, 0)
            .ok_or_else(|| AppError::Malformed(format!("forecast time out of range: {}", day.time)))?;

        Ok(Self {
            forecast: day.summary,
            time: format_local_day(at),
        })
    }

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(&self.forecast).bind(&self.time)
    }
}
