use thiserror::Error;

/// A convenience `Result` alias using [`JobSearchError`].
pub type JobSearchResult<T> = Result<T, JobSearchError>;

/// Top-level error type for the job search pipeline.
///
/// Collaborator failures inside a layer are absorbed by the orchestrator,
/// which skips the affected layer. Anything that still reaches the caller is
/// either a [`JobSearchError::InvalidQuery`] (400) or a failure after
/// degradation was exhausted (500 envelope).
#[derive(Error, Debug)]
pub enum JobSearchError {
    /// Empty or malformed user input. User-correctable.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A backing store or index (full-text, fuzzy, vector, embedding) could
    /// not answer.
    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable {
        /// Name of the collaborator that failed.
        collaborator: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A collaborator did not answer within its time budget.
    #[error("{collaborator} timed out after {after_ms}ms")]
    Timeout {
        /// Name of the collaborator that timed out.
        collaborator: String,
        /// Budget that elapsed, in milliseconds.
        after_ms: u64,
    },

    /// The orchestrator or ranker broke one of its own invariants.
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from an outbound HTTP request (e.g. remote embeddings).
    #[error("HTTP error: {0}")]
    Http(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobSearchError {
    /// Shorthand for [`JobSearchError::CollaboratorUnavailable`].
    pub fn unavailable(collaborator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable {
            collaborator: collaborator.into(),
            reason: reason.into(),
        }
    }

    /// True for failures that the orchestrator recovers from by skipping a layer.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CollaboratorUnavailable { .. } | Self::Timeout { .. } | Self::Http(_) | Self::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = JobSearchError::unavailable("vector index", "connection refused");
        assert_eq!(err.to_string(), "vector index unavailable: connection refused");

        let err = JobSearchError::Timeout {
            collaborator: "embedder".into(),
            after_ms: 2500,
        };
        assert_eq!(err.to_string(), "embedder timed out after 2500ms");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(JobSearchError::unavailable("fts", "down").is_recoverable());
        assert!(!JobSearchError::InvalidQuery("empty".into()).is_recoverable());
        assert!(!JobSearchError::Pipeline("duplicate id".into()).is_recoverable());
    }
}
