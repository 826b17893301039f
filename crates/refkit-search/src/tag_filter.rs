//! In-memory tag filter.
//!
//! The native executor only supports single-tag equality, so tag
//! combinations are post-filtered here. Matched-tag subsets live in a side
//! table keyed by record id; records themselves are never touched.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use refkit_core::{Record, RecordId, TagMatch, TagMode};

/// Result of the tag filter stage.
#[derive(Debug, Default)]
pub struct TagFilterOutcome {
    /// Qualifying records, candidate order preserved.
    pub retained: Vec<Arc<Record>>,
    /// Per-record subset of query tags it satisfied.
    pub matched: HashMap<RecordId, Vec<String>>,
    /// How many examined candidates matched each query tag. Ordered map so
    /// the response serialization is deterministic.
    pub histogram: BTreeMap<String, usize>,
}

/// Does one record tag satisfy one query tag under the match semantics?
fn tag_matches(record_tag: &str, query_tag: &str, tag_match: TagMatch) -> bool {
    let record_tag = record_tag.to_lowercase();
    let query_tag = query_tag.to_lowercase();
    match tag_match {
        TagMatch::Exact => record_tag == query_tag,
        TagMatch::Contains => record_tag.contains(&query_tag),
        TagMatch::StartsWith => record_tag.starts_with(&query_tag),
    }
}

/// Apply the tag filter to a candidate set.
pub fn apply(
    candidates: Vec<Arc<Record>>,
    query_tags: &[String],
    mode: TagMode,
    tag_match: TagMatch,
) -> TagFilterOutcome {
    let mut outcome = TagFilterOutcome::default();
    for tag in query_tags {
        outcome.histogram.insert(tag.clone(), 0);
    }

    let candidate_count = candidates.len();
    for record in candidates {
        let matched: Vec<String> = query_tags
            .iter()
            .filter(|query_tag| {
                record
                    .tags
                    .iter()
                    .any(|record_tag| tag_matches(record_tag, query_tag, tag_match))
            })
            .cloned()
            .collect();

        for tag in &matched {
            *outcome.histogram.entry(tag.clone()).or_insert(0) += 1;
        }

        let qualifies = match mode {
            TagMode::Any => !matched.is_empty(),
            TagMode::All => matched.len() == query_tags.len(),
            TagMode::None => matched.is_empty(),
        };
        if qualifies {
            if !matched.is_empty() {
                outcome.matched.insert(record.id, matched);
            }
            outcome.retained.push(record);
        }
    }

    debug!(
        stage = "tag_filter",
        candidate_count,
        tag_filter_kept = outcome.retained.len(),
        "tag filter applied"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use refkit_store::fixtures;

    async fn candidates() -> Vec<Arc<Record>> {
        use refkit_core::RecordStore;
        let store = fixtures::sample_store();
        let ids = store
            .native_query(
                fixtures::LIBRARY,
                &[refkit_core::NativeCondition::KindIs(
                    refkit_core::RecordKind::Item,
                )],
            )
            .await
            .unwrap();
        store.get_records(&ids).await.unwrap()
    }

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_any_mode_keeps_partial_matches() {
        let outcome = apply(
            candidates().await,
            &tags(&["consensus", "ml"]),
            TagMode::Any,
            TagMatch::Exact,
        );
        // consensus (2 records) + ml (1 record)
        assert_eq!(outcome.retained.len(), 3);
        assert_eq!(outcome.histogram["consensus"], 2);
        assert_eq!(outcome.histogram["ml"], 1);
    }

    #[tokio::test]
    async fn test_all_mode_requires_every_tag() {
        let outcome = apply(
            candidates().await,
            &tags(&["consensus", "distributed"]),
            TagMode::All,
            TagMatch::Exact,
        );
        assert_eq!(outcome.retained.len(), 1);
        assert_eq!(outcome.retained[0].id, fixtures::id_consensus());
        let matched = &outcome.matched[&fixtures::id_consensus()];
        assert_eq!(matched.len(), 2);
    }

    #[tokio::test]
    async fn test_none_mode_excludes_matches() {
        let outcome = apply(
            candidates().await,
            &tags(&["consensus"]),
            TagMode::None,
            TagMatch::Exact,
        );
        assert!(outcome
            .retained
            .iter()
            .all(|r| !r.tags.iter().any(|t| t == "consensus")));
        assert!(outcome.matched.is_empty());
        // The histogram still reports how often the excluded tag appeared.
        assert_eq!(outcome.histogram["consensus"], 2);
    }

    #[tokio::test]
    async fn test_contains_match_semantics() {
        let outcome = apply(
            candidates().await,
            &tags(&["program"]),
            TagMode::Any,
            TagMatch::Contains,
        );
        // "programming" contains "program".
        assert_eq!(outcome.retained.len(), 1);
        assert_eq!(outcome.retained[0].id, fixtures::id_systems_book());
    }

    #[tokio::test]
    async fn test_starts_with_match_semantics() {
        let outcome = apply(
            candidates().await,
            &tags(&["stat"]),
            TagMode::Any,
            TagMatch::StartsWith,
        );
        assert_eq!(outcome.retained.len(), 1);
        assert_eq!(outcome.retained[0].id, fixtures::id_ml_basics());
    }

    #[tokio::test]
    async fn test_match_is_case_insensitive() {
        let outcome = apply(
            candidates().await,
            &tags(&["CONSENSUS"]),
            TagMode::Any,
            TagMatch::Exact,
        );
        assert_eq!(outcome.retained.len(), 2);
    }

    #[tokio::test]
    async fn test_candidate_order_preserved() {
        let input = candidates().await;
        let expected: Vec<_> = input
            .iter()
            .filter(|r| !r.tags.is_empty())
            .map(|r| r.id)
            .collect();
        let outcome = apply(
            input,
            &tags(&[
                "consensus",
                "systems",
                "ml",
                "survey",
                "report",
                "distributed",
            ]),
            TagMode::Any,
            TagMatch::Exact,
        );
        let got: Vec<_> = outcome.retained.iter().map(|r| r.id).collect();
        assert_eq!(got, expected);
    }
}
