//! Trigram similarity in the style of PostgreSQL's `pg_trgm`.
//!
//! Each word is padded with two leading spaces and one trailing space before
//! its 3-character windows are collected; similarity is the Jaccard index of
//! the two trigram sets.

use std::collections::HashSet;

use crate::normalize::normalize;

/// Trigram set of a piece of text, after normalization.
pub fn trigrams(text: &str) -> HashSet<String> {
    let mut grams = HashSet::new();
    for word in normalize(text).split_whitespace() {
        let word: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
        if word.is_empty() {
            continue;
        }
        let padded: Vec<char> = format!("  {word} ").chars().collect();
        for window in padded.windows(3) {
            grams.insert(window.iter().collect());
        }
    }
    grams
}

/// Jaccard similarity of two trigram sets, in `[0, 1]`.
pub fn set_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    shared as f32 / union as f32
}

/// Trigram similarity of two strings.
pub fn similarity(a: &str, b: &str) -> f32 {
    set_similarity(&trigrams(a), &trigrams(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings() {
        assert!((similarity("Software Engineer", "software engineer") - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_typos_stay_above_cutoff() {
        let score = similarity("sofware enginer", "Software Engineer");
        assert!(score > 0.5, "got {score}");
    }

    #[test]
    fn test_unrelated_strings_below_cutoff() {
        let score = similarity("sofware enginer", "Pastry Chef");
        assert!(score < 0.3, "got {score}");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(similarity("", "anything"), 0.0);
        assert_eq!(similarity("!!!", "anything"), 0.0);
    }

    #[test]
    fn test_word_padding() {
        let grams = trigrams("go");
        assert!(grams.contains("  g"));
        assert!(grams.contains(" go"));
        assert!(grams.contains("go "));
        assert_eq!(grams.len(), 3);
    }
}
