use crate::handlers::{
    did_you_mean_get, did_you_mean_post, health, search_get, search_post, stats, AppState,
};
use crate::middleware::rate_limit_middleware;
use crate::rate_limit::RateLimiter;
use axum::{
    middleware as axum_mw,
    routing::get,
    Router,
};
use jobsearch_retrieval::JobSearchService;
use std::sync::Arc;
use tracing::info;

/// The HTTP gateway.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the gateway without rate limiting.
    pub fn build(service: Arc<JobSearchService>) -> Router {
        Self::build_with_rate_limit(service, None)
    }

    /// Build the gateway, rate limiting the API routes per peer IP when a
    /// limiter is given.
    ///
    /// `/health` stays outside the limiter.
    pub fn build_with_rate_limit(
        service: Arc<JobSearchService>,
        rate_limiter: Option<Arc<RateLimiter>>,
    ) -> Router {
        let state = Arc::new(AppState { service });

        let api = Router::new()
            .route("/api/search/jobs", get(search_get).post(search_post))
            .route(
                "/api/search/did-you-mean",
                get(did_you_mean_get).post(did_you_mean_post),
            )
            .route("/api/search/stats", get(stats))
            .with_state(state);

        let api = match rate_limiter {
            Some(limiter) => {
                info!(
                    idle_expiry_secs = limiter.idle_expiry().as_secs(),
                    "Rate limiting enabled"
                );
                api.layer(axum_mw::from_fn_with_state(limiter, rate_limit_middleware))
            }
            None => api,
        };

        Router::new().route("/health", get(health)).merge(api)
    }
}
