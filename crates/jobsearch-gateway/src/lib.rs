//! axum HTTP surface for the job search pipeline.
//!
//! Routes:
//!
//! - `POST /api/search/jobs`, `GET /api/search/jobs` — ranked, paginated search.
//! - `GET /api/search/did-you-mean`, `POST /api/search/did-you-mean` — suggestions.
//! - `GET /api/search/stats` — process-wide counters.
//! - `GET /health` — liveness.

/// Handler errors and their HTTP mapping.
pub mod error;
/// Route handlers and shared state.
pub mod handlers;
/// Per-peer rate limiting middleware.
pub mod middleware;
/// Per-peer token bucket.
pub mod rate_limit;
/// Router construction.
pub mod server;

pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use server::GatewayServer;
