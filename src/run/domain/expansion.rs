//! Expanded keyword sets and their word-group rendering.

use serde::Serialize;
use std::collections::HashSet;

/// Maximum number of terms kept for one seed keyword.
pub const MAX_TERMS_PER_SEED: usize = 10;

/// The terms a single seed keyword expanded into.
///
/// The seed is always the first term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordExpansion {
    seed: String,
    terms: Vec<String>,
}

impl KeywordExpansion {
    /// Creates an expansion that contains only the seed itself.
    #[must_use]
    pub fn identity(seed: impl Into<String>) -> Self {
        let seed = seed.into();
        Self {
            terms: vec![seed.clone()],
            seed,
        }
    }

    /// Creates a normalised expansion.
    ///
    /// The seed is placed first; blank terms and case-insensitive duplicates
    /// are dropped and the list is capped at [`MAX_TERMS_PER_SEED`].
    #[must_use]
    pub fn new(seed: impl Into<String>, terms: impl IntoIterator<Item = String>) -> Self {
        let seed = seed.into();
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for term in std::iter::once(seed.clone()).chain(terms) {
            let trimmed = term.trim();
            if trimmed.is_empty() || !seen.insert(trimmed.to_lowercase()) {
                continue;
            }
            kept.push(trimmed.to_owned());
            if kept.len() == MAX_TERMS_PER_SEED {
                break;
            }
        }
        Self { seed, terms: kept }
    }

    /// Returns the seed keyword.
    #[must_use]
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Returns the expanded terms, seed first.
    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Returns `true` when the expansion adds nothing beyond the seed.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        matches!(self.terms.as_slice(), [only] if *only == self.seed)
    }

    /// Renders the expansion as one word-group line.
    ///
    /// Identity expansions render as the bare seed. Otherwise the line has
    /// the form `/alt1|alt2/ => seed`, where purely alphabetic ASCII terms
    /// are wrapped in word boundaries and everything else is escaped.
    #[must_use]
    pub fn word_group_line(&self) -> String {
        if self.is_identity() {
            return self.seed.clone();
        }
        let alternatives: Vec<String> = self.terms.iter().map(|term| term_pattern(term)).collect();
        format!("/{}/ => {}", alternatives.join("|"), self.seed)
    }
}

fn term_pattern(term: &str) -> String {
    let ascii_words = term
        .chars()
        .all(|ch| ch.is_ascii_alphabetic() || ch.is_whitespace());
    if ascii_words {
        let words: Vec<&str> = term.split_whitespace().collect();
        format!(r"\b{}\b", words.join(r"\s+"))
    } else {
        regex::escape(term)
    }
}

/// Expansions for every seed of a run, in seed order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExpandedKeywords(Vec<KeywordExpansion>);

impl ExpandedKeywords {
    /// Uses every seed verbatim.
    #[must_use]
    pub fn identity(seeds: &[String]) -> Self {
        Self(seeds.iter().map(KeywordExpansion::identity).collect())
    }

    /// Aligns provider expansions to `seeds`.
    ///
    /// Seeds with no matching expansion fall back to identity; expansions
    /// for unknown seeds are ignored.
    #[must_use]
    pub fn from_expansions(seeds: &[String], expansions: Vec<KeywordExpansion>) -> Self {
        let aligned = seeds
            .iter()
            .map(|seed| {
                expansions
                    .iter()
                    .find(|expansion| expansion.seed == *seed)
                    .cloned()
                    .unwrap_or_else(|| KeywordExpansion::identity(seed))
            })
            .collect();
        Self(aligned)
    }

    /// Returns the expansions in seed order.
    #[must_use]
    pub fn as_slice(&self) -> &[KeywordExpansion] {
        &self.0
    }

    /// Returns `true` when no seeds were supplied.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders one word-group line per seed.
    #[must_use]
    pub fn word_group_lines(&self) -> Vec<String> {
        self.0.iter().map(KeywordExpansion::word_group_line).collect()
    }
}
