use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

pub const GENERIC_ERROR_BODY: &str = "Sorry, something went wrong";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{service} request failed: {source}")]
    Upstream {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned status {status}")]
    UpstreamStatus {
        service: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("Malformed upstream data: {0}")]
    Malformed(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Malformed(err.to_string())
    }
}

// Every failure class is reported to the client the same way.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_BODY).into_response()
    }
}
