use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::{Category, CategoryRecord, PgQuery};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub url: String,
    pub name: String,
    pub rating: f64,
    pub price: Option<String>, // not every business has a price tier
    #[serde(rename = "img_url")]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Business {
    url: String,
    name: String,
    rating: f64,
    price: Option<String>,
    image_url: Option<String>,
}

impl CategoryRecord for Review {
    const CATEGORY: Category = Category::Reviews;
    const COLUMNS: &'static [&'static str] = &["url", "name", "rating", "price", "image_url"];

    fn from_upstream(raw: Value) -> Result<Self> {
        let business: Business = serde_json::from_value(raw)?;
        Ok(Self {
            url: business.url,
            name: business.name,
            rating: business.rating,
            price: business.price,
            image_url: business.image_url.filter(|u| !u.is_empty()),
        })
    }

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.url)
            .bind(&self.name)
            .bind(self.rating)
            .bind(&self.price)
            .bind(&self.image_url)
    }
}
