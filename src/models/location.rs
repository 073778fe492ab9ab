use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// A geocoded place. Created once per distinct search query and never
/// refreshed; category records reference it by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: Uuid,
    pub search_query: String,
    pub formatted_query: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

impl Location {
    pub fn new(search_query: &str, geocoded: Geocoded) -> Self {
        Self {
            id: Uuid::new_v4(),
            search_query: search_query.to_string(),
            formatted_query: geocoded.formatted_address,
            latitude: geocoded.latitude,
            longitude: geocoded.longitude,
            created_at: Utc::now(),
        }
    }
}

/// The first match of a geocoding lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Geocoded {
    pub formatted_address: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl Geocoded {
    pub fn from_upstream(body: Value) -> Result<Self> {
        let response: GeocodeResponse = serde_json::from_value(body)?;
        let first = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Malformed("geocoder returned no results".to_string()))?;

        Ok(Self {
            formatted_address: first.formatted_address,
            latitude: first.geometry.location.lat,
            longitude: first.geometry.location.lng,
        })
    }
}
