use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::models::Category;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub log_level: String,
    pub upstream: UpstreamConfig,
    pub ttl: CacheTtl,
}

/// Credentials and service roots for the third-party APIs.
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    pub geocode_api_key: String,
    pub darksky_api_key: String,
    pub yelp_api_key: String,
    pub moviedb_api_key: String,
    pub meetup_api_key: String,
    pub trail_api_key: String,
    pub geocode_base_url: String,
    pub darksky_base_url: String,
    pub yelp_base_url: String,
    pub moviedb_base_url: String,
    pub meetup_base_url: String,
    pub trail_base_url: String,
    pub timeout_secs: u64,
}

/// Staleness threshold per category, in seconds.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    pub weather_secs: u64,
    pub reviews_secs: u64,
    pub movies_secs: u64,
    pub events_secs: u64,
    pub trails_secs: u64,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            weather_secs: 30 * 60,
            reviews_secs: 7 * 24 * 60 * 60,
            movies_secs: 7 * 24 * 60 * 60,
            events_secs: 24 * 60 * 60,
            trails_secs: 24 * 60 * 60,
        }
    }
}

impl CacheTtl {
    pub fn threshold(&self, category: Category) -> Duration {
        let secs = match category {
            Category::Weather => self.weather_secs,
            Category::Reviews => self.reviews_secs,
            Category::Movies => self.movies_secs,
            Category::Events => self.events_secs,
            Category::Trails => self.trails_secs,
        };
        Duration::from_secs(secs)
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like `parse_or`, but zero also falls back to the default.
fn parse_nonzero_or(key: &str, default: u64) -> u64 {
    nonzero_or(env::var(key).ok().as_deref(), default)
}

fn nonzero_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse().ok())
        .filter(|&secs: &u64| secs > 0)
        .unwrap_or(default)
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let port = parse_or("PORT", 3000);

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let db_host = var_or("DB_HOST", "localhost");
                let db_port = var_or("DB_PORT", "5432");
                let db_name = var_or("DB_DATABASE", "city_explorer");
                let db_user = var_or("DB_USER", "postgres");
                let db_pwd = var_or("DB_PWD", "postgres");
                format!(
                    "postgres://{}:{}@{}:{}/{}",
                    db_user, db_pwd, db_host, db_port, db_name
                )
            }
        };
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", 10);
        let run_migrations = env::var("RUN_MIGRATIONS")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let log_level = var_or("LOG_LEVEL", "info");

        let upstream = UpstreamConfig {
            geocode_api_key: env::var("GEOCODE_API_KEY").unwrap_or_default(),
            darksky_api_key: env::var("DARKSKY_API_KEY").unwrap_or_default(),
            yelp_api_key: env::var("YELP_API_KEY").unwrap_or_default(),
            moviedb_api_key: env::var("MOVIEDB_API_KEY").unwrap_or_default(),
            meetup_api_key: env::var("MEETUP_API_KEY").unwrap_or_default(),
            trail_api_key: env::var("TRAIL_API_KEY").unwrap_or_default(),
            geocode_base_url: var_or("GEOCODE_BASE_URL", "https://maps.googleapis.com"),
            darksky_base_url: var_or("DARKSKY_BASE_URL", "https://api.darksky.net"),
            yelp_base_url: var_or("YELP_BASE_URL", "https://api.yelp.com"),
            moviedb_base_url: var_or("MOVIEDB_BASE_URL", "https://api.themoviedb.org"),
            meetup_base_url: var_or("MEETUP_BASE_URL", "https://api.meetup.com"),
            trail_base_url: var_or("TRAIL_BASE_URL", "https://www.hikingproject.com"),
            timeout_secs: parse_nonzero_or("UPSTREAM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
        };

        let defaults = CacheTtl::default();
        let ttl = CacheTtl {
            weather_secs: parse_or("WEATHER_TTL_SECS", defaults.weather_secs),
            reviews_secs: parse_or("REVIEWS_TTL_SECS", defaults.reviews_secs),
            movies_secs: parse_or("MOVIES_TTL_SECS", defaults.movies_secs),
            events_secs: parse_or("EVENTS_TTL_SECS", defaults.events_secs),
            trails_secs: parse_or("TRAILS_TTL_SECS", defaults.trails_secs),
        };

        Ok(Self {
            port,
            database_url,
            db_max_connections,
            run_migrations,
            log_level,
            upstream,
            ttl,
        })
    }
}
