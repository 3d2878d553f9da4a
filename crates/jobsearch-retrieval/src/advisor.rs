//! Did-you-mean suggestions: spelling correction against corpus vocabulary
//! and alternative phrasings from a synonym table.
//!
//! Both tables are built once and never mutated, so an advisor can be shared
//! behind an `Arc` and queried concurrently with searches.

use jobsearch_core::JobSearchResult;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::config::{AdvisorConfig, SynonymEntry};
use crate::normalize::{normalize, tokenize};
use crate::store::JobCorpus;

/// Phrase-level alternatives shipped with the advisor.
const BUILTIN_PHRASES: &[(&str, &[&str])] = &[
    ("software engineer", &["software developer", "programmer"]),
    ("software developer", &["software engineer", "programmer"]),
    ("frontend developer", &["front-end developer", "ui developer"]),
    ("backend developer", &["back-end developer", "server-side developer"]),
    ("full stack developer", &["fullstack developer", "full-stack engineer"]),
    ("data scientist", &["machine learning engineer", "data analyst"]),
    ("machine learning engineer", &["ml engineer", "data scientist"]),
    ("devops engineer", &["site reliability engineer", "platform engineer"]),
    ("product manager", &["product owner", "program manager"]),
    ("project manager", &["program manager", "delivery manager"]),
    ("ux designer", &["ui designer", "product designer"]),
    ("qa engineer", &["test engineer", "quality assurance engineer"]),
];

/// Single-term substitutions shipped with the advisor.
const BUILTIN_TERMS: &[(&str, &[&str])] = &[
    ("engineer", &["developer"]),
    ("developer", &["engineer"]),
    ("programmer", &["developer"]),
    ("js", &["javascript"]),
    ("javascript", &["js"]),
    ("ts", &["typescript"]),
    ("golang", &["go"]),
    ("k8s", &["kubernetes"]),
    ("kubernetes", &["k8s"]),
    ("ml", &["machine learning"]),
    ("ai", &["artificial intelligence", "machine learning"]),
    ("sre", &["site reliability engineer"]),
    ("frontend", &["front-end"]),
    ("backend", &["back-end"]),
    ("sr", &["senior"]),
    ("jr", &["junior"]),
    ("remote", &["work from home"]),
];

/// Known terms with their corpus frequencies.
#[derive(Debug, Clone, Default)]
pub struct TermDictionary {
    terms: HashMap<String, usize>,
}

impl TermDictionary {
    /// Count every occurrence in `terms`. Terms are normalized first.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for term in terms {
            for token in tokenize(term.as_ref()) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }
        Self { terms: counts }
    }

    /// Whether `term` occurs in the corpus vocabulary.
    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains_key(term)
    }

    /// Occurrences of `term`, zero if unknown.
    pub fn frequency(&self, term: &str) -> usize {
        self.terms.get(term).copied().unwrap_or(0)
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True when the corpus had no vocabulary.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Closest term within `max_distance` edits.
    ///
    /// Ties go to the more frequent term, then the lexicographically smaller one.
    pub fn nearest(&self, token: &str, max_distance: usize) -> Option<&str> {
        let len = token.chars().count();
        self.terms
            .iter()
            .filter(|(term, _)| term.chars().count().abs_diff(len) <= max_distance)
            .map(|(term, &freq)| (strsim::levenshtein(token, term), freq, term.as_str()))
            .filter(|&(distance, _, _)| distance <= max_distance)
            .min_by(|a, b| {
                a.0.cmp(&b.0)
                    .then_with(|| b.1.cmp(&a.1))
                    .then_with(|| a.2.cmp(b.2))
            })
            .map(|(_, _, term)| term)
    }
}

/// Curated phrase and term alternatives.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    phrases: HashMap<String, Vec<String>>,
    terms: HashMap<String, Vec<String>>,
}

impl SynonymTable {
    /// The built-in table.
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (phrase, alternatives) in BUILTIN_PHRASES.iter().chain(BUILTIN_TERMS) {
            table.add(phrase, alternatives.iter().copied());
        }
        table
    }

    /// Add configured entries. Multi-word entries are phrases, single words are terms.
    pub fn extend(&mut self, entries: &[SynonymEntry]) {
        for entry in entries {
            self.add(&entry.phrase, entry.alternatives.iter().map(String::as_str));
        }
    }

    fn add<'a>(&mut self, phrase: &str, alternatives: impl IntoIterator<Item = &'a str>) {
        let key = normalize(phrase);
        if key.is_empty() {
            return;
        }
        let target = if key.contains(' ') {
            &mut self.phrases
        } else {
            &mut self.terms
        };
        let list = target.entry(key.clone()).or_default();
        for alt in alternatives {
            let alt = normalize(alt);
            if !alt.is_empty() && alt != key && !list.contains(&alt) {
                list.push(alt);
            }
        }
    }

    /// Alternative phrasings of normalized `text`, in table order.
    ///
    /// Whole-query phrase matches come first, then embedded phrase
    /// substitutions, then single-term substitutions.
    pub fn alternatives(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(alts) = self.phrases.get(text) {
            out.extend(alts.iter().cloned());
        }

        let padded = format!(" {text} ");
        let mut phrases: Vec<&String> = self.phrases.keys().collect();
        phrases.sort();
        for phrase in phrases {
            if phrase == text || !padded.contains(&format!(" {phrase} ")) {
                continue;
            }
            for alt in &self.phrases[phrase] {
                let replaced = padded.replacen(&format!(" {phrase} "), &format!(" {alt} "), 1);
                out.push(replaced.trim().to_string());
            }
        }

        let tokens: Vec<&str> = text.split_whitespace().collect();
        for (i, token) in tokens.iter().enumerate() {
            let Some(alts) = self.terms.get(*token) else {
                continue;
            };
            for alt in alts {
                let mut replaced = tokens.clone();
                replaced[i] = alt.as_str();
                out.push(replaced.join(" "));
            }
        }
        out
    }
}

/// Result of a did-you-mean lookup, in wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Query as submitted.
    pub original: String,
    /// Corrected query, if any token was corrected.
    pub suggestion: Option<String>,
    /// Alternative phrasings, original excluded.
    pub alternatives: Vec<String>,
    /// True when `suggestion` is set.
    pub has_correction: bool,
}

impl Suggestion {
    fn empty(original: &str) -> Self {
        Self {
            original: original.to_string(),
            suggestion: None,
            alternatives: Vec::new(),
            has_correction: false,
        }
    }
}

/// Spelling correction and alternative phrasing for user queries.
pub struct DidYouMeanAdvisor {
    dictionary: TermDictionary,
    synonyms: SynonymTable,
    config: AdvisorConfig,
}

impl DidYouMeanAdvisor {
    /// Build an advisor from explicit tables. Configured synonyms are merged in.
    pub fn new(dictionary: TermDictionary, mut synonyms: SynonymTable, config: AdvisorConfig) -> Self {
        synonyms.extend(&config.synonyms);
        Self {
            dictionary,
            synonyms,
            config,
        }
    }

    /// Build the dictionary from the corpus vocabulary, with the built-in synonyms.
    pub async fn from_corpus(corpus: &dyn JobCorpus, config: AdvisorConfig) -> JobSearchResult<Self> {
        let vocabulary = corpus.vocabulary().await?;
        let dictionary = TermDictionary::from_terms(&vocabulary);
        info!(terms = dictionary.len(), "Did-you-mean dictionary built");
        Ok(Self::new(dictionary, SynonymTable::builtin(), config))
    }

    /// Vocabulary used for corrections.
    pub fn dictionary(&self) -> &TermDictionary {
        &self.dictionary
    }

    /// A corrected form of `query`, or `None` if nothing needs correcting.
    pub fn suggest_correction(&self, query: &str) -> Option<String> {
        let normalized = normalize(query);
        if normalized.chars().count() < self.config.min_query_len || self.dictionary.is_empty() {
            return None;
        }

        let mut changed = false;
        let corrected: Vec<String> = normalized
            .split_whitespace()
            .map(|raw| {
                let token = raw.trim_matches('"');
                if token.chars().count() < self.config.min_token_len
                    || self.dictionary.contains(token)
                {
                    return raw.to_string();
                }
                match self.dictionary.nearest(token, self.config.max_edit_distance) {
                    Some(term) => {
                        changed = true;
                        raw.replacen(token, term, 1)
                    }
                    None => raw.to_string(),
                }
            })
            .collect();

        changed.then(|| corrected.join(" "))
    }

    /// Distinct alternative phrasings for `query`, excluding the query itself.
    ///
    /// Alternatives of the corrected query are included after those of the
    /// original.
    pub fn generate_alternatives(&self, query: &str) -> Vec<String> {
        let normalized = normalize(query);
        if normalized.chars().count() < self.config.min_query_len {
            return Vec::new();
        }
        let text = normalized.trim_matches('"').trim().to_string();

        let mut sources = vec![text.clone()];
        if let Some(corrected) = self.suggest_correction(&normalized) {
            sources.push(corrected.trim_matches('"').trim().to_string());
        }

        let mut seen: HashSet<String> = HashSet::from([text.clone(), normalized]);
        let mut out = Vec::new();
        for source in &sources {
            for alt in self.synonyms.alternatives(source) {
                if seen.insert(alt.clone()) {
                    out.push(alt);
                }
            }
        }
        out
    }

    /// Correction and alternatives together.
    pub fn advise(&self, query: &str) -> Suggestion {
        let trimmed = query.trim();
        if normalize(trimmed).chars().count() < self.config.min_query_len {
            return Suggestion::empty(trimmed);
        }
        let suggestion = self.suggest_correction(trimmed);
        Suggestion {
            original: trimmed.to_string(),
            has_correction: suggestion.is_some(),
            alternatives: self.generate_alternatives(trimmed),
            suggestion,
        }
    }
}
