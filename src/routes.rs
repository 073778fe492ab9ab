use axum::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cache::{CacheStore, Orchestrator};
use crate::error::{AppError, Result};
use crate::models::params::{parse_data, CoordinateParams, MovieParams};
use crate::models::{Event, Location, Movie, Review, Stored, Trail, Weather};
use crate::upstream::UpstreamClient;

pub struct AppState<S> {
    pub orchestrator: Arc<Orchestrator<S>>,
    pub upstream: Arc<UpstreamClient>,
}

impl<S> AppState<S> {
    pub fn new(orchestrator: Orchestrator<S>, upstream: UpstreamClient) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            upstream: Arc::new(upstream),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: self.orchestrator.clone(),
            upstream: self.upstream.clone(),
        }
    }
}

pub fn router<S: CacheStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/location", get(location::<S>))
        .route("/weather", get(weather::<S>))
        .route("/yelp", get(reviews::<S>))
        .route("/movies", get(movies::<S>))
        .route("/meetups", get(events::<S>))
        .route("/trails", get(trails::<S>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The decoded `data` query parameter.
pub struct DataQuery<T>(pub T);

#[async_trait]
impl<T, St> FromRequestParts<St> for DataQuery<T>
where
    T: DeserializeOwned,
    St: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self> {
        parse_data(parts.uri.query().unwrap_or_default()).map(DataQuery)
    }
}

async fn location<S: CacheStore>(
    State(state): State<AppState<S>>,
    DataQuery(search_query): DataQuery<String>,
) -> Result<Json<Location>> {
    let upstream = &state.upstream;
    let location = state
        .orchestrator
        .locate(&search_query, || upstream.geocode(&search_query))
        .await?;
    Ok(Json(location))
}

async fn weather<S: CacheStore>(
    State(state): State<AppState<S>>,
    DataQuery(params): DataQuery<CoordinateParams>,
) -> Result<Json<Vec<Stored<Weather>>>> {
    let upstream = &state.upstream;
    let rows = state
        .orchestrator
        .lookup::<Weather, _, _>(params.id, || upstream.weather(params.latitude, params.longitude))
        .await?;
    Ok(Json(rows))
}

async fn reviews<S: CacheStore>(
    State(state): State<AppState<S>>,
    DataQuery(params): DataQuery<CoordinateParams>,
) -> Result<Json<Vec<Stored<Review>>>> {
    let upstream = &state.upstream;
    let rows = state
        .orchestrator
        .lookup::<Review, _, _>(params.id, || upstream.reviews(params.latitude, params.longitude))
        .await?;
    Ok(Json(rows))
}

async fn movies<S: CacheStore>(
    State(state): State<AppState<S>>,
    DataQuery(params): DataQuery<MovieParams>,
) -> Result<Json<Vec<Stored<Movie>>>> {
    let upstream = &state.upstream;
    let rows = state
        .orchestrator
        .lookup::<Movie, _, _>(params.id, || upstream.movies(&params.search_query))
        .await?;
    Ok(Json(rows))
}

async fn events<S: CacheStore>(
    State(state): State<AppState<S>>,
    DataQuery(params): DataQuery<CoordinateParams>,
) -> Result<Json<Vec<Stored<Event>>>> {
    let upstream = &state.upstream;
    let rows = state
        .orchestrator
        .lookup::<Event, _, _>(params.id, || upstream.events(params.latitude, params.longitude))
        .await?;
    Ok(Json(rows))
}

async fn trails<S: CacheStore>(
    State(state): State<AppState<S>>,
    DataQuery(params): DataQuery<CoordinateParams>,
) -> Result<Json<Vec<Stored<Trail>>>> {
    let upstream = &state.upstream;
    let rows = state
        .orchestrator
        .lookup::<Trail, _, _>(params.id, || upstream.trails(params.latitude, params.longitude))
        .await?;
    Ok(Json(rows))
}
