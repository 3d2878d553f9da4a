use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::IntoResponse,
    Json,
};
use jobsearch_core::{DatePosted, SearchFilters};
use jobsearch_retrieval::{JobSearchService, SearchRequest, SearchResponse, StatsSnapshot, Suggestion};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::ApiError;

/// Shared handler state.
pub struct AppState {
    /// The search service behind every route.
    pub service: Arc<JobSearchService>,
}

/// Query-string form of a search.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Required search text.
    pub query: Option<String>,
    /// 1-based page number.
    pub page: Option<String>,
    /// Page size.
    pub limit: Option<String>,
    /// Location filter.
    pub location: Option<String>,
    /// `true` for remote jobs only.
    pub remote_only: Option<String>,
    /// One of `24h`, `7d`, `30d`, `all`.
    pub date_posted: Option<String>,
    /// Company filter.
    pub company: Option<String>,
    /// Title filter.
    pub title: Option<String>,
    /// `false` skips the semantic layer.
    pub use_enhanced: Option<String>,
}

fn parse_number(name: &str, value: Option<&str>) -> Result<Option<usize>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("{name} must be a positive integer"))),
    }
}

fn parse_flag(name: &str, value: Option<&str>) -> Result<Option<bool>, ApiError> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(None),
        Some("true" | "1" | "yes") => Ok(Some(true)),
        Some("false" | "0" | "no") => Ok(Some(false)),
        Some(_) => Err(ApiError::BadRequest(format!("{name} must be true or false"))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl SearchParams {
    /// Validate into a [`SearchRequest`].
    pub fn into_request(self) -> Result<SearchRequest, ApiError> {
        let query = non_empty(self.query)
            .ok_or_else(|| ApiError::BadRequest("query is required".into()))?;
        let date_posted = match non_empty(self.date_posted) {
            Some(v) => Some(v.parse::<DatePosted>().map_err(ApiError::BadRequest)?),
            None => None,
        };
        Ok(SearchRequest {
            query,
            page: parse_number("page", self.page.as_deref())?,
            limit: parse_number("limit", self.limit.as_deref())?,
            filters: SearchFilters {
                location: non_empty(self.location),
                remote_only: parse_flag("remoteOnly", self.remote_only.as_deref())?,
                date_posted,
                company: non_empty(self.company),
                title: non_empty(self.title),
            },
            use_enhanced: parse_flag("useEnhanced", self.use_enhanced.as_deref())?,
        })
    }
}

/// Body of `POST /api/search/did-you-mean`, and the query string of its GET form.
#[derive(Debug, Default, Deserialize)]
pub struct SuggestParams {
    /// Query to correct.
    #[serde(default)]
    pub query: String,
}

async fn run_search(
    state: &AppState,
    request: SearchRequest,
) -> Result<Json<SearchResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query is required".into()));
    }
    match state.service.search(&request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            let page = request.page.unwrap_or(1);
            let limit = state.service.config().clamp_limit(request.limit);
            let api_error = ApiError::from_search(e, &request.query, page, limit);
            if let ApiError::SearchFailed { source, .. } = &api_error {
                error!(error = %source, query = %request.query, "Search failed after degradation");
            }
            Err(api_error)
        }
    }
}

/// `POST /api/search/jobs`
pub async fn search_post(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = body.map_err(|e| {
        debug!(error = %e, "Rejected search body");
        ApiError::BadRequest(e.body_text())
    })?;
    run_search(&state, request).await
}

/// `GET /api/search/jobs`
pub async fn search_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    run_search(&state, params.into_request()?).await
}

/// `GET /api/search/did-you-mean`
pub async fn did_you_mean_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestParams>,
) -> Json<Suggestion> {
    Json(state.service.suggest(&params.query))
}

/// `POST /api/search/did-you-mean`
pub async fn did_you_mean_post(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SuggestParams>, JsonRejection>,
) -> Result<Json<Suggestion>, ApiError> {
    let Json(params) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Json(state.service.suggest(&params.query)))
}

/// `GET /api/search/stats`
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsSnapshot> {
    Json(state.service.stats())
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "jobsearch"}))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn params(query: &str) -> SearchParams {
        SearchParams {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_params_into_request() {
        let request = SearchParams {
            page: Some("2".into()),
            limit: Some("25".into()),
            remote_only: Some("true".into()),
            date_posted: Some("7d".into()),
            location: Some("".into()),
            use_enhanced: Some("false".into()),
            ..params("rust")
        }
        .into_request()
        .unwrap();

        assert_eq!(request.query, "rust");
        assert_eq!(request.page, Some(2));
        assert_eq!(request.limit, Some(25));
        assert_eq!(request.filters.remote_only, Some(true));
        assert_eq!(request.filters.date_posted, Some(DatePosted::Last7Days));
        assert_eq!(request.filters.location, None);
        assert_eq!(request.use_enhanced, Some(false));
    }

    #[test]
    fn test_missing_query_is_bad_request() {
        let err = SearchParams::default().into_request().unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_bad_numbers_and_flags_rejected() {
        let bad_page = SearchParams {
            page: Some("two".into()),
            ..params("rust")
        };
        assert!(bad_page.into_request().is_err());

        let bad_flag = SearchParams {
            remote_only: Some("maybe".into()),
            ..params("rust")
        };
        assert!(bad_flag.into_request().is_err());

        let bad_window = SearchParams {
            date_posted: Some("1y".into()),
            ..params("rust")
        };
        assert!(bad_window.into_request().is_err());
    }
}
