use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::{Category, CategoryRecord, PgQuery};
use crate::error::Result;

const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w185";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Movie {
    pub title: String,
    pub released_on: String,
    pub average_votes: f64,
    pub total_votes: i64,
    pub image_url: Option<String>,
    pub overview: String,
    pub popularity: f64,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    title: String,
    #[serde(default)]
    release_date: String,
    vote_average: f64,
    vote_count: i64,
    poster_path: Option<String>,
    overview: String,
    popularity: f64,
}

fn poster_url(path: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", POSTER_BASE_URL, path)
    } else {
        format!("{}/{}", POSTER_BASE_URL, path)
    }
}

impl CategoryRecord for Movie {
    const CATEGORY: Category = Category::Movies;
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "released_on",
        "average_votes",
        "total_votes",
        "image_url",
        "overview",
        "popularity",
    ];

    fn from_upstream(raw: Value) -> Result<Self> {
        let movie: SearchResult = serde_json::from_value(raw)?;
        Ok(Self {
            title: movie.title,
            released_on: movie.release_date,
            average_votes: movie.vote_average,
            total_votes: movie.vote_count,
            image_url: movie.poster_path.as_deref().map(poster_url),
            overview: movie.overview,
            popularity: movie.popularity,
        })
    }

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.title)
            .bind(&self.released_on)
            .bind(self.average_votes)
            .bind(self.total_votes)
            .bind(&self.image_url)
            .bind(&self.overview)
            .bind(self.popularity)
    }
}
