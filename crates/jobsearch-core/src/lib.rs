//! Core types and error definitions for the job search pipeline.
//!
//! This crate provides the request-scoped data model shared by the retrieval
//! pipeline and the HTTP gateway.
//!
//! # Main types
//!
//! - [`JobSearchError`] — Unified error enum for every pipeline stage.
//! - [`JobSearchResult`] — Convenience alias for `Result<T, JobSearchError>`.
//! - [`Job`] — A posting as held by the corpus store.
//! - [`SearchQuery`] — A normalized and classified user query.
//! - [`SearchFilters`] — Optional constraints honored by every layer.
//! - [`Layer`] — One of the six retrieval strategies.
//! - [`Candidate`] / [`RankedResult`] — Per-layer matches and their merged form.

/// Error type and result alias.
pub mod error;
/// Filter set and posting-age windows.
pub mod filters;
/// Job posting record.
pub mod job;
/// Layer identifiers, candidates and ranked results.
pub mod layer;
/// Query representation and classification labels.
pub mod query;

pub use error::{JobSearchError, JobSearchResult};
pub use filters::{DatePosted, SearchFilters};
pub use job::Job;
pub use layer::{Candidate, Layer, RankedResult};
pub use query::{QueryEcho, QueryType, SearchQuery};
