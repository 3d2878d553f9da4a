use serde::{Deserialize, Serialize};

/// Shape of a normalized query, used to pick matching behavior and for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryType {
    /// A single whitespace-delimited token.
    SingleTerm,
    /// A quoted phrase that should be matched as a unit.
    Phrase,
    /// Several independent terms.
    Compound,
    /// Looks like a company name or a job title.
    CompanyOrTitle,
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryType::SingleTerm => write!(f, "single-term"),
            QueryType::Phrase => write!(f, "phrase"),
            QueryType::Compound => write!(f, "compound"),
            QueryType::CompanyOrTitle => write!(f, "company-or-title"),
        }
    }
}

/// A parsed user query. Lives for a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Raw input as received.
    pub original: String,
    /// Folded, lower-cased, whitespace-collapsed form.
    pub normalized: String,
    /// Classification of the query.
    pub query_type: QueryType,
    /// Filled in lazily by the orchestrator; `None` if the embedder was
    /// unavailable or never needed.
    pub embedding: Option<Vec<f32>>,
}

impl SearchQuery {
    /// The normalized query without the wrapping quotes of a phrase.
    pub fn text(&self) -> &str {
        self.normalized
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .map(str::trim)
            .unwrap_or(&self.normalized)
    }

    /// Whitespace tokens of [`SearchQuery::text`], with stray quotes removed.
    pub fn tokens(&self) -> Vec<&str> {
        self.text()
            .split_whitespace()
            .map(|t| t.trim_matches('"'))
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Wire form: the embedding vector is replaced by a presence flag.
    pub fn echo(&self) -> QueryEcho {
        QueryEcho {
            original: self.original.clone(),
            normalized: self.normalized.clone(),
            embedding: self.embedding.is_some(),
            query_type: self.query_type,
        }
    }
}

/// Serialized view of a [`SearchQuery`] in search responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEcho {
    /// Raw input as submitted.
    pub original: String,
    /// Normalized form used for matching.
    pub normalized: String,
    /// Whether an embedding was generated for this request.
    pub embedding: bool,
    /// Classification of the query.
    pub query_type: QueryType,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn query(normalized: &str, query_type: QueryType) -> SearchQuery {
        SearchQuery {
            original: normalized.to_string(),
            normalized: normalized.to_string(),
            query_type,
            embedding: None,
        }
    }

    #[test]
    fn test_phrase_text_strips_quotes() {
        let q = query("\"rust developer\"", QueryType::Phrase);
        assert_eq!(q.text(), "rust developer");
        assert_eq!(q.tokens(), vec!["rust", "developer"]);
    }

    #[test]
    fn test_unquoted_text_is_unchanged() {
        let q = query("data engineer", QueryType::CompanyOrTitle);
        assert_eq!(q.text(), "data engineer");
    }

    #[test]
    fn test_echo_hides_vector() {
        let mut q = query("rust", QueryType::SingleTerm);
        q.embedding = Some(vec![0.1, 0.2]);
        let json = serde_json::to_value(q.echo()).unwrap();
        assert_eq!(json["embedding"], true);
        assert_eq!(json["queryType"], "single-term");
    }
}
