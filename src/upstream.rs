//! Clients for the third-party APIs behind each category.
//!
//! Every call returns the raw JSON elements the service answered with;
//! mapping them into records is left to the normalizers in `models`.

use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};
use crate::models::Geocoded;

const TRAIL_SEARCH_RADIUS_MILES: u32 = 10;
const EVENT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| AppError::Upstream {
                service: "http client",
                source,
            })?;

        Ok(Self { client, config })
    }

    #[instrument(skip(self))]
    pub async fn geocode(&self, address: &str) -> Result<Geocoded> {
        let url = format!("{}/maps/api/geocode/json", self.config.geocode_base_url);
        let request = self.client.get(&url).query(&[
            ("address", address),
            ("key", self.config.geocode_api_key.as_str()),
        ]);

        let body = send("geocode", request).await?;
        Geocoded::from_upstream(body)
    }

    #[instrument(skip(self))]
    pub async fn weather(&self, latitude: f64, longitude: f64) -> Result<Vec<Value>> {
        let url = format!(
            "{}/forecast/{}/{},{}",
            self.config.darksky_base_url, self.config.darksky_api_key, latitude, longitude
        );

        let body = send("weather", self.client.get(&url)).await?;
        take_list(body, "/daily/data")
    }

    #[instrument(skip(self))]
    pub async fn reviews(&self, latitude: f64, longitude: f64) -> Result<Vec<Value>> {
        let url = format!("{}/v3/businesses/search", self.config.yelp_base_url);
        let request = self
            .client
            .get(&url)
            .bearer_auth(&self.config.yelp_api_key)
            .query(&[
                ("term", "restaurants".to_string()),
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
            ]);

        let body = send("reviews", request).await?;
        take_list(body, "/businesses")
    }

    #[instrument(skip(self))]
    pub async fn movies(&self, search_query: &str) -> Result<Vec<Value>> {
        let url = format!("{}/3/search/movie", self.config.moviedb_base_url);
        let request = self.client.get(&url).query(&[
            ("query", search_query),
            ("api_key", self.config.moviedb_api_key.as_str()),
        ]);

        let body = send("movies", request).await?;
        take_list(body, "/results")
    }

    #[instrument(skip(self))]
    pub async fn events(&self, latitude: f64, longitude: f64) -> Result<Vec<Value>> {
        let url = format!("{}/find/upcoming_events", self.config.meetup_base_url);
        let request = self.client.get(&url).query(&[
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
            ("page", EVENT_PAGE_SIZE.to_string()),
            ("key", self.config.meetup_api_key.clone()),
        ]);

        let body = send("events", request).await?;
        take_list(body, "/events")
    }

    #[instrument(skip(self))]
    pub async fn trails(&self, latitude: f64, longitude: f64) -> Result<Vec<Value>> {
        let url = format!("{}/data/get-trails", self.config.trail_base_url);
        let request = self.client.get(&url).query(&[
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
            ("maxDistance", TRAIL_SEARCH_RADIUS_MILES.to_string()),
            ("key", self.config.trail_api_key.clone()),
        ]);

        let body = send("trails", request).await?;
        take_list(body, "/trails")
    }
}

async fn send(service: &'static str, request: RequestBuilder) -> Result<Value> {
    let response = request
        .send()
        .await
        .map_err(|source| AppError::Upstream { service, source })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::UpstreamStatus { service, status });
    }

    debug!("{} responded {}", service, status);
    response
        .json()
        .await
        .map_err(|source| AppError::Upstream { service, source })
}

/// Takes the array at `pointer` out of a response body.
fn take_list(mut body: Value, pointer: &str) -> Result<Vec<Value>> {
    match body.pointer_mut(pointer).map(Value::take) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(AppError::Malformed(format!("{} is not a list", pointer))),
        None => Err(AppError::Malformed(format!("{} missing from response", pointer))),
    }
}
