//! Query matching and ranking of script entries.
//!
//! Every candidate is scored against the query independently and the result is
//! fully ordered, so the same query always yields the same list.

use std::cmp::Ordering;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use itertools::Itertools;

use crate::catalog::ScriptEntry;

/// Match quality class. Lower is better and is compared before the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Empty query, everything passes.
    Unfiltered = 0,
    Exact = 1,
    Prefix = 2,
    Substring = 3,
    Fuzzy = 4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult<'a> {
    /// Position of the entry in the candidate slice.
    pub index: usize,
    pub entry: &'a ScriptEntry,
    pub score: i64,
    pub tier: Tier,
    /// Length of the field that produced the match.
    pub field_len: usize,
    pub matched_description: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldMatch {
    tier: Tier,
    score: i64,
    field_len: usize,
}

impl FieldMatch {
    fn is_better_than(&self, other: &FieldMatch) -> bool {
        (self.tier, -self.score) < (other.tier, -other.score)
    }
}

fn match_field(matcher: &SkimMatcherV2, field: &str, query_lower: &str) -> Option<FieldMatch> {
    let field_lower = field.to_lowercase();
    let field_len = field.chars().count();

    let (tier, score) = if field_lower == query_lower {
        (Tier::Exact, 0)
    } else if field_lower.starts_with(query_lower) {
        (Tier::Prefix, 0)
    } else if let Some(position) = field_lower.find(query_lower) {
        (Tier::Substring, -(position as i64))
    } else {
        (Tier::Fuzzy, matcher.fuzzy_match(&field_lower, query_lower)?)
    };

    Some(FieldMatch {
        tier,
        score,
        field_len,
    })
}

fn compare(a: &FilterResult, b: &FilterResult) -> Ordering {
    a.tier
        .cmp(&b.tier)
        .then_with(|| a.field_len.cmp(&b.field_len))
        .then_with(|| b.score.cmp(&a.score))
        .then_with(|| {
            a.entry
                .name
                .to_lowercase()
                .cmp(&b.entry.name.to_lowercase())
        })
        .then_with(|| a.entry.name.cmp(&b.entry.name))
}

/// Ranks `entries` against `query`, dropping those that don't match at all.
///
/// The query is matched case-insensitively against the name and, when
/// `search_descriptions` is set, the description; the better of the two
/// counts. An empty query returns every entry in its original order.
pub fn rank<'a>(
    query: &str,
    entries: &'a [ScriptEntry],
    search_descriptions: bool,
) -> Vec<FilterResult<'a>> {
    let query = query.trim();
    if query.is_empty() {
        return entries
            .iter()
            .enumerate()
            .map(|(index, entry)| FilterResult {
                index,
                entry,
                score: 0,
                tier: Tier::Unfiltered,
                field_len: entry.name.chars().count(),
                matched_description: false,
            })
            .collect();
    }

    let query_lower = query.to_lowercase();
    let matcher = SkimMatcherV2::default().ignore_case();

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let name_match = match_field(&matcher, &entry.name, &query_lower);
            let description_match = entry
                .description
                .as_deref()
                .filter(|_| search_descriptions)
                .and_then(|d| match_field(&matcher, d, &query_lower));

            let (best, matched_description) = match (name_match, description_match) {
                (Some(n), Some(d)) if d.is_better_than(&n) => (d, true),
                (Some(n), _) => (n, false),
                (None, Some(d)) => (d, true),
                (None, None) => return None,
            };

            Some(FilterResult {
                index,
                entry,
                score: best.score,
                tier: best.tier,
                field_len: best.field_len,
                matched_description,
            })
        })
        .sorted_by(compare)
        .collect()
}
