//! Keyword matching and tiered ranking of persisted result items.

use super::ExpandedKeywords;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Maximum number of matched items returned by one run.
pub const MAX_MATCHED_ITEMS: usize = 100;

/// Kind of content source a result set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Items carry popularity rank positions.
    Ranked,
    /// Items carry a publish timestamp.
    Feed,
}

/// One titled item from a persisted result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    /// Item title.
    pub title: String,
    /// Item link.
    #[serde(default)]
    pub url: String,
    /// Mobile link.
    #[serde(default)]
    pub mobile_url: String,
    /// Rank positions observed for the item.
    #[serde(default)]
    pub ranks: Vec<u32>,
    /// Publish time for feed items.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Items from one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceResults {
    /// Source identifier.
    pub id: String,
    /// Display name; defaults to the identifier.
    #[serde(default)]
    pub name: Option<String>,
    /// Source kind.
    pub kind: SourceKind,
    /// Items in source order.
    #[serde(default)]
    pub items: Vec<ResultItem>,
}

impl SourceResults {
    /// Returns the display name, falling back to the identifier.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A result item that matched a run's keywords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedItem {
    /// Item title.
    pub title: String,
    /// Item link.
    pub url: String,
    /// Mobile link.
    pub mobile_url: String,
    /// Source display name.
    pub platform: String,
    /// Source identifier.
    pub platform_id: String,
    /// Source kind.
    pub source_kind: SourceKind,
    /// Seed keyword the match is attributed to.
    pub matched_keyword: String,
    /// Rank positions, for ranked sources.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ranks: Vec<u32>,
    /// Publish time, for feed sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Case-insensitive substring matcher over expanded keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatcher {
    groups: Vec<(String, Vec<String>)>,
    exclusions: Vec<String>,
}

impl KeywordMatcher {
    /// Builds a matcher from expansions and global exclusion terms.
    #[must_use]
    pub fn new(expanded: &ExpandedKeywords, exclusions: &[String]) -> Self {
        let groups = expanded
            .as_slice()
            .iter()
            .map(|expansion| {
                let terms = expansion
                    .terms()
                    .iter()
                    .map(|term| term.to_lowercase())
                    .collect();
                (expansion.seed().to_owned(), terms)
            })
            .collect();
        let exclusions = exclusions
            .iter()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();
        Self { groups, exclusions }
    }

    /// Returns the seed whose terms match `title`, if any.
    ///
    /// Titles containing an exclusion term never match.
    #[must_use]
    pub fn match_title(&self, title: &str) -> Option<&str> {
        let lowered = title.to_lowercase();
        if self
            .exclusions
            .iter()
            .any(|term| lowered.contains(term.as_str()))
        {
            return None;
        }
        self.groups
            .iter()
            .find(|(_, terms)| terms.iter().any(|term| lowered.contains(term.as_str())))
            .map(|(seed, _)| seed.as_str())
    }
}

/// Matches every item of `sources` and returns them in ranked order,
/// truncated to [`MAX_MATCHED_ITEMS`].
#[must_use]
pub fn match_and_rank(sources: &[SourceResults], matcher: &KeywordMatcher) -> Vec<MatchedItem> {
    let mut matched: Vec<MatchedItem> = sources
        .iter()
        .flat_map(|source| {
            source.items.iter().filter_map(move |item| {
                matcher.match_title(&item.title).map(|seed| MatchedItem {
                    title: item.title.clone(),
                    url: item.url.clone(),
                    mobile_url: item.mobile_url.clone(),
                    platform: source.display_name().to_owned(),
                    platform_id: source.id.clone(),
                    source_kind: source.kind,
                    matched_keyword: seed.to_owned(),
                    ranks: item.ranks.clone(),
                    published_at: item.published_at,
                })
            })
        })
        .collect();
    matched.sort_by(compare_matches);
    matched.truncate(MAX_MATCHED_ITEMS);
    matched
}

/// Orders ranked items before unranked ones.
///
/// Ranked items with more rank occurrences come first, ties going to the
/// lowest rank value. Unranked items are ordered newest first, undated last.
#[must_use]
pub fn compare_matches(left: &MatchedItem, right: &MatchedItem) -> Ordering {
    match (left.ranks.iter().min(), right.ranks.iter().min()) {
        (Some(left_best), Some(right_best)) => right
            .ranks
            .len()
            .cmp(&left.ranks.len())
            .then_with(|| left_best.cmp(right_best)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => match (left.published_at, right.published_at) {
            (Some(left_at), Some(right_at)) => right_at.cmp(&left_at),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}
