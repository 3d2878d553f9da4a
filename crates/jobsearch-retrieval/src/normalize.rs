use jobsearch_core::{JobSearchError, JobSearchResult, QueryType, SearchQuery};
use unicode_normalization::UnicodeNormalization;

/// Symbols that carry meaning in job vocabulary (`c++`, `c#`, `r&d`, quotes).
const KEPT_SYMBOLS: [char; 5] = ['+', '#', '&', '_', '"'];

/// Kept only between two alphanumerics (`node.js`, `front-end`, `ci/cd`, `o'reilly`).
const JOINERS: [char; 4] = ['.', '-', '/', '\''];

const COMPANY_SUFFIXES: &[&str] = &[
    "inc",
    "llc",
    "ltd",
    "corp",
    "corporation",
    "gmbh",
    "co",
    "labs",
    "technologies",
    "group",
];

const ROLE_NOUNS: &[&str] = &[
    "engineer",
    "developer",
    "manager",
    "designer",
    "analyst",
    "scientist",
    "architect",
    "consultant",
    "director",
    "intern",
    "administrator",
    "specialist",
    "lead",
    "recruiter",
];

/// Max tokens for a query to still be read as a company name or job title.
const MAX_COMPANY_OR_TITLE_TOKENS: usize = 4;

type Rule = fn(original: &str, tokens: &[&str]) -> bool;

/// Company-or-title heuristics, evaluated in order.
const COMPANY_OR_TITLE_RULES: &[(&str, Rule)] = &[
    ("company_suffix", has_company_suffix),
    ("role_noun", has_role_noun),
    ("title_case", is_title_case),
];

/// Fold, lower-case and de-noise a string.
///
/// Applied to both queries and job text so that tokens line up.
pub fn normalize(raw: &str) -> String {
    let folded: Vec<char> = raw
        .nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();

    let mut out = String::with_capacity(folded.len());
    for (i, &c) in folded.iter().enumerate() {
        let keep = c.is_alphanumeric()
            || KEPT_SYMBOLS.contains(&c)
            || (JOINERS.contains(&c)
                && i > 0
                && folded[i - 1].is_alphanumeric()
                && folded.get(i + 1).is_some_and(|n| n.is_alphanumeric()));
        out.push(if keep { c } else { ' ' });
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized tokens of arbitrary text, quotes removed.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(|t| t.trim_matches('"'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Label a normalized query. `original` is consulted for capitalization only.
pub fn classify(original: &str, normalized: &str) -> QueryType {
    if normalized.len() >= 2 && normalized.starts_with('"') && normalized.ends_with('"') {
        return QueryType::Phrase;
    }

    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    if tokens.len() <= 1 {
        return QueryType::SingleTerm;
    }

    if tokens.len() <= MAX_COMPANY_OR_TITLE_TOKENS
        && COMPANY_OR_TITLE_RULES
            .iter()
            .any(|(_, rule)| rule(original, &tokens))
    {
        return QueryType::CompanyOrTitle;
    }

    QueryType::Compound
}

/// Normalize and classify raw input.
///
/// Fails with [`JobSearchError::InvalidQuery`] when nothing searchable remains
/// or the input exceeds `max_length` characters.
pub fn parse_query(raw: &str, max_length: usize) -> JobSearchResult<SearchQuery> {
    if raw.chars().count() > max_length {
        return Err(JobSearchError::InvalidQuery(format!(
            "query exceeds {max_length} characters"
        )));
    }

    let normalized = normalize(raw);
    let query = SearchQuery {
        original: raw.to_string(),
        query_type: classify(raw, &normalized),
        normalized,
        embedding: None,
    };

    if query.tokens().is_empty() {
        return Err(JobSearchError::InvalidQuery(
            "query is empty after normalization".into(),
        ));
    }
    Ok(query)
}

fn has_company_suffix(_original: &str, tokens: &[&str]) -> bool {
    tokens
        .iter()
        .skip(1)
        .any(|t| COMPANY_SUFFIXES.contains(&t.trim_end_matches('.')))
}

fn has_role_noun(_original: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| {
        let singular = t.strip_suffix('s').unwrap_or(t);
        ROLE_NOUNS.contains(t) || ROLE_NOUNS.contains(&singular)
    })
}

fn is_title_case(original: &str, _tokens: &[&str]) -> bool {
    let words: Vec<&str> = original
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(char::is_alphabetic))
        .collect();
    !words.is_empty()
        && words
            .iter()
            .all(|w| w.chars().next().is_some_and(char::is_uppercase))
}
