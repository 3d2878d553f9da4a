use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jobsearch_core::JobSearchError;
use jobsearch_retrieval::SearchResponse;
use thiserror::Error;

/// Failures a handler reports to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request input. Answered with 400.
    #[error("{0}")]
    BadRequest(String),

    /// The search could not complete. Answered with 500 and an empty envelope.
    #[error("search failed: {source}")]
    SearchFailed {
        source: JobSearchError,
        envelope: Box<SearchResponse>,
    },
}

impl ApiError {
    /// Map a service error for `raw_query` onto the right response.
    pub fn from_search(source: JobSearchError, raw_query: &str, page: usize, limit: usize) -> Self {
        match source {
            JobSearchError::InvalidQuery(reason) => ApiError::BadRequest(reason),
            source => ApiError::SearchFailed {
                source,
                envelope: Box::new(SearchResponse::error_envelope(raw_query, page, limit)),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": message })))
                    .into_response()
            }
            ApiError::SearchFailed { envelope, .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(*envelope)).into_response()
            }
        }
    }
}
