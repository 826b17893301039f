//! Relevance scoring and result ordering.
//!
//! Scores live in a side table keyed by record id; records are read-only.
//! Sorting is stable, so score and field-value ties keep the candidate
//! order produced by the earlier stages.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use refkit_core::defaults;
use refkit_core::{Record, RecordField, RecordId, SearchQuery, SortDirection, SortField};

/// Base field weights for the scoring model.
static FIELD_WEIGHTS: Lazy<Vec<(RecordField, f64)>> = Lazy::new(|| {
    vec![
        (RecordField::Title, defaults::WEIGHT_TITLE),
        (RecordField::Creator, defaults::WEIGHT_CREATOR),
        (RecordField::Abstract, defaults::WEIGHT_ABSTRACT),
        (
            RecordField::PublicationTitle,
            defaults::WEIGHT_PUBLICATION_TITLE,
        ),
        (RecordField::Tags, defaults::WEIGHT_TAGS),
        (RecordField::Extra, defaults::WEIGHT_EXTRA),
    ]
});

/// Per-record scoring result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreDetail {
    pub score: f64,
    /// Wire names of the fields that contributed to the score.
    pub matched_fields: Vec<String>,
}

/// Effective weight of a field under the query's boost list.
fn weight_of(field: RecordField, query: &SearchQuery) -> f64 {
    let base = FIELD_WEIGHTS
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, w)| *w)
        .unwrap_or(0.0);
    if query.boost.contains(&field) {
        base * defaults::BOOST_MULTIPLIER
    } else {
        base
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn score_record(record: &Record, query: &SearchQuery) -> ScoreDetail {
    let mut detail = ScoreDetail::default();

    if let Some(q) = &query.q {
        for (field, _) in FIELD_WEIGHTS.iter() {
            if let Some(value) = record.field(*field) {
                if contains_ci(&value, q) {
                    detail.score += weight_of(*field, query);
                    detail.matched_fields.push(field.as_str().to_string());
                }
            }
        }
    }

    // The structured title/creator parameters credit their field once more,
    // unless the general query already did.
    for (param, field) in [
        (&query.title, RecordField::Title),
        (&query.creator, RecordField::Creator),
    ] {
        if let Some(needle) = param {
            let already = detail.matched_fields.iter().any(|f| f == field.as_str());
            if !already {
                if let Some(value) = record.field(field) {
                    if contains_ci(&value, needle) {
                        detail.score += weight_of(field, query);
                        detail.matched_fields.push(field.as_str().to_string());
                    }
                }
            }
        }
    }

    detail
}

/// Score every candidate. Only called when the query asked for relevance.
pub fn score_all(
    candidates: &[Arc<Record>],
    query: &SearchQuery,
) -> HashMap<RecordId, ScoreDetail> {
    let scores: HashMap<RecordId, ScoreDetail> = candidates
        .iter()
        .map(|record| (record.id, score_record(record, query)))
        .collect();
    debug!(
        stage = "relevance",
        candidate_count = candidates.len(),
        "relevance scores computed"
    );
    scores
}

/// Sort key for a field-based ordering. Strings compare case-insensitively
/// and a missing value sorts as the empty string.
fn field_sort_key(record: &Record, sort: SortField) -> String {
    let field = match sort {
        SortField::Date => RecordField::Date,
        SortField::Title => RecordField::Title,
        SortField::Creator => RecordField::Creator,
        SortField::DateAdded => RecordField::DateAdded,
        SortField::DateModified => RecordField::DateModified,
        // Relevance ordering never goes through the string key path.
        SortField::Relevance => RecordField::Title,
    };
    record.field(field).unwrap_or_default().to_lowercase()
}

/// Order the candidate set per the query's sort field and direction.
pub fn sort_records(
    candidates: &mut [Arc<Record>],
    query: &SearchQuery,
    scores: &HashMap<RecordId, ScoreDetail>,
) {
    let direction = query.direction;
    match query.sort {
        SortField::Relevance => {
            candidates.sort_by(|a, b| {
                let sa = scores.get(&a.id).map(|d| d.score).unwrap_or(0.0);
                let sb = scores.get(&b.id).map(|d| d.score).unwrap_or(0.0);
                let ord = sa.total_cmp(&sb);
                match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
        sort => {
            candidates.sort_by(|a, b| {
                let ord = field_sort_key(a, sort).cmp(&field_sort_key(b, sort));
                match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
    }
    debug!(
        stage = "sort",
        sort_field = query.sort.as_str(),
        direction = %direction,
        "candidates ordered"
    );
}

/// Aggregate statistics over the computed scores.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RelevanceStats {
    pub average: f64,
    pub max: f64,
    pub min: f64,
}

impl RelevanceStats {
    pub fn compute(scores: &HashMap<RecordId, ScoreDetail>) -> Option<RelevanceStats> {
        if scores.is_empty() {
            return None;
        }
        let mut sum = 0.0;
        let mut max = f64::MIN;
        let mut min = f64::MAX;
        for detail in scores.values() {
            sum += detail.score;
            max = max.max(detail.score);
            min = min.min(detail.score);
        }
        Some(RelevanceStats {
            average: sum / scores.len() as f64,
            max,
            min,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refkit_core::RawSearchQuery;
    use refkit_store::fixtures;

    async fn items() -> Vec<Arc<Record>> {
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

    fn query(raw: RawSearchQuery) -> SearchQuery {
        SearchQuery::normalize(raw, fixtures::LIBRARY).unwrap()
    }

    #[tokio::test]
    async fn test_title_match_outscores_tag_match() {
        let q = query(RawSearchQuery {
            q: Some("consensus".to_string()),
            relevance: Some(refkit_core::FlexibleBool(true)),
            ..Default::default()
        });
        let scores = score_all(&items().await, &q);

        // Title + abstract + tag match for the consensus article.
        let consensus = &scores[&fixtures::id_consensus()];
        assert_eq!(
            consensus.score,
            defaults::WEIGHT_TITLE + defaults::WEIGHT_ABSTRACT + defaults::WEIGHT_TAGS
        );
        assert_eq!(consensus.matched_fields, vec!["title", "abstract", "tags"]);

        // Title + tag for the survey; no abstract.
        let survey = &scores[&fixtures::id_tag_survey()];
        assert_eq!(survey.score, defaults::WEIGHT_TITLE + defaults::WEIGHT_TAGS);

        // Unrelated record scores zero.
        assert_eq!(scores[&fixtures::id_undated()].score, 0.0);
    }

    #[tokio::test]
    async fn test_boost_doubles_field_weight() {
        let q = query(RawSearchQuery {
            q: Some("consensus".to_string()),
            boost: vec!["tags".to_string()],
            relevance: Some(refkit_core::FlexibleBool(true)),
            ..Default::default()
        });
        let scores = score_all(&items().await, &q);
        let consensus = &scores[&fixtures::id_consensus()];
        assert_eq!(
            consensus.score,
            defaults::WEIGHT_TITLE
                + defaults::WEIGHT_ABSTRACT
                + defaults::WEIGHT_TAGS * defaults::BOOST_MULTIPLIER
        );
    }

    #[tokio::test]
    async fn test_creator_param_credits_once() {
        // q matches the creator field and the creator param targets the same
        // field; the weight must not be added twice.
        let q = query(RawSearchQuery {
            q: Some("lovelace".to_string()),
            creator: Some("Lovelace".to_string()),
            relevance: Some(refkit_core::FlexibleBool(true)),
            ..Default::default()
        });
        let scores = score_all(&items().await, &q);
        let consensus = &scores[&fixtures::id_consensus()];
        assert_eq!(consensus.score, defaults::WEIGHT_CREATOR);
        assert_eq!(consensus.matched_fields, vec!["creator"]);
    }

    #[tokio::test]
    async fn test_title_param_scores_without_general_query() {
        let q = query(RawSearchQuery {
            title: Some("machine learning".to_string()),
            relevance: Some(refkit_core::FlexibleBool(true)),
            ..Default::default()
        });
        let scores = score_all(&items().await, &q);
        assert_eq!(
            scores[&fixtures::id_ml_basics()].score,
            defaults::WEIGHT_TITLE
        );
        assert_eq!(scores[&fixtures::id_consensus()].score, 0.0);
    }

    #[tokio::test]
    async fn test_relevance_sort_descending_by_default() {
        let q = query(RawSearchQuery {
            q: Some("consensus".to_string()),
            sort: Some("relevance".to_string()),
            ..Default::default()
        });
        let mut records = items().await;
        let scores = score_all(&records, &q);
        sort_records(&mut records, &q, &scores);
        assert_eq!(records[0].id, fixtures::id_consensus());
        assert_eq!(records[1].id, fixtures::id_tag_survey());
    }

    #[tokio::test]
    async fn test_relevance_sort_ascending_inverts() {
        let q = query(RawSearchQuery {
            q: Some("consensus".to_string()),
            sort: Some("relevance".to_string()),
            direction: Some("asc".to_string()),
            ..Default::default()
        });
        let mut records = items().await;
        let scores = score_all(&records, &q);
        sort_records(&mut records, &q, &scores);
        let last = records.last().map(|r| r.id);
        assert_eq!(last, Some(fixtures::id_consensus()));
    }

    #[tokio::test]
    async fn test_title_sort_case_insensitive() {
        let q = query(RawSearchQuery {
            sort: Some("title".to_string()),
            direction: Some("asc".to_string()),
            ..Default::default()
        });
        let mut records = items().await;
        sort_records(&mut records, &q, &HashMap::new());
        let titles: Vec<_> = records
            .iter()
            .map(|r| r.title.clone().unwrap_or_default())
            .collect();
        let mut expected = titles.clone();
        expected.sort_by_key(|t| t.to_lowercase());
        assert_eq!(titles, expected);
    }

    #[tokio::test]
    async fn test_date_modified_sort_desc() {
        let q = query(RawSearchQuery::default());
        let mut records = items().await;
        sort_records(&mut records, &q, &HashMap::new());
        assert_eq!(records[0].id, fixtures::id_tag_survey()); // 2024-03-01
        assert_eq!(records.last().map(|r| r.id), Some(fixtures::id_undated()));
    }

    #[tokio::test]
    async fn test_missing_sort_value_sorts_as_empty() {
        let q = query(RawSearchQuery {
            sort: Some("date".to_string()),
            direction: Some("asc".to_string()),
            ..Default::default()
        });
        let mut records = items().await;
        sort_records(&mut records, &q, &HashMap::new());
        // The undated record has no date string; empty sorts first asc.
        assert_eq!(records[0].id, fixtures::id_undated());
    }

    #[test]
    fn test_relevance_stats() {
        let mut scores = HashMap::new();
        scores.insert(
            fixtures::id_consensus(),
            ScoreDetail {
                score: 4.0,
                matched_fields: vec!["title".to_string()],
            },
        );
        scores.insert(
            fixtures::id_undated(),
            ScoreDetail {
                score: 1.0,
                matched_fields: vec![],
            },
        );
        let stats = RelevanceStats::compute(&scores).unwrap();
        assert_eq!(stats.average, 2.5);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.min, 1.0);

        assert!(RelevanceStats::compute(&HashMap::new()).is_none());
    }
}
