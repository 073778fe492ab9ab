use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::{format_local_day, Category, CategoryRecord, PgQuery};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub link: String,
    pub name: String,
    pub host: String,
    pub creation_date: String,
}

#[derive(Debug, Deserialize)]
struct UpcomingEvent {
    link: String,
    name: String,
    group: Group,
    created: i64, // unix millis
}

#[derive(Debug, Deserialize)]
struct Group {
    name: String,
}

impl CategoryRecord for Event {
    const CATEGORY: Category = Category::Events;
    const COLUMNS: &'static [&'static str] = &["link", "name", "host", "creation_date"];

    fn from_upstream(raw: Value) -> Result<Self> {
        let event: UpcomingEvent = serde_json::from_value(raw)?;
        let created = DateTime::from_timestamp_millis(event.created).ok_or_else(|| {
            AppError::Malformed(format!("event creation time out of range: {}", event.created))
        })?;

        Ok(Self {
            link: event.link,
            name: event.name,
            host: event.group.name,
            creation_date: format_local_day(created),
        })
    }

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.link)
            .bind(&self.name)
            .bind(&self.host)
            .bind(&self.creation_date)
    }
}
