//! Pipeline orchestrator.
//!
//! Composes the stages left to right: normalize, exact-key short-circuit,
//! fulltext, native query, tag filter, advanced filters, scoring and
//! ordering, pagination and assembly. Each call is a pure function of the
//! query and current store contents; the only state is the store handle.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use refkit_core::{
    ContentSource, RawSearchQuery, Record, RecordStore, Result, SearchQuery,
};

use crate::advanced::AdvancedFilter;
use crate::relevance::{self, RelevanceStats};
use crate::response::{paginate, Pagination, SearchResponse, SearchResult};
use crate::tag_filter;
use crate::{conditions, fulltext};

/// The search pipeline, parameterized over the backing store.
pub struct SearchPipeline<S> {
    store: Arc<S>,
    default_library: refkit_core::LibraryId,
}

impl<S> SearchPipeline<S>
where
    S: RecordStore + ContentSource,
{
    pub fn new(store: Arc<S>, default_library: refkit_core::LibraryId) -> Self {
        SearchPipeline {
            store,
            default_library,
        }
    }

    /// Run one search end to end.
    #[instrument(skip_all, fields(subsystem = "search"))]
    pub async fn search(&self, raw: RawSearchQuery) -> Result<SearchResponse> {
        let start = Instant::now();
        let query = SearchQuery::normalize(raw, self.default_library)?;
        let library = query.library_id;
        let mut features: Vec<String> = Vec::new();

        // Exact key overrides everything: no filters, no scoring, no sort.
        if let Some(key) = &query.exact_key {
            features.push("exactKey".to_string());
            let record = self.store.resolve_by_key(library, key).await?;
            let results: Vec<SearchResult> = record
                .as_ref()
                .map(SearchResult::from_record)
                .into_iter()
                .collect();
            let mut response = SearchResponse::new(
                query.raw.clone(),
                Pagination::exact_key(results.len()),
                elapsed_ms(start),
            );
            response.results = results;
            response.search_features = features;
            info!(
                library_id = library,
                result_count = response.results.len(),
                duration_ms = response.search_time,
                "exact-key lookup complete"
            );
            return Ok(response);
        }

        // Fulltext runs first; an empty match set means no results no
        // matter what the other filters would keep.
        let ft_outcome = match &query.fulltext {
            None => None,
            Some(ft) => {
                features.push("fulltext".to_string());
                let outcome =
                    fulltext::run(self.store.as_ref(), self.store.as_ref(), library, ft).await;
                if outcome.owner_ids.is_empty() {
                    return Ok(self.empty_page(&query, features, start));
                }
                Some(outcome)
            }
        };

        features.push("nativeQuery".to_string());
        if query.collection.is_some() {
            features.push("collection".to_string());
        }
        let candidate_ids = match conditions::run(self.store.as_ref(), library, &query).await? {
            Some(ids) => ids,
            // Unresolvable collection key.
            None => return Ok(self.empty_page(&query, features, start)),
        };

        // Intersect with the fulltext owner set, native order preserved.
        let candidate_ids: Vec<_> = match &ft_outcome {
            None => candidate_ids,
            Some(outcome) => candidate_ids
                .into_iter()
                .filter(|id| outcome.details.contains_key(id))
                .collect(),
        };

        let mut records: Vec<Arc<Record>> = self.store.get_records(&candidate_ids).await?;

        let tag_outcome = if query.has_tag_filter() {
            features.push("tagFilter".to_string());
            let outcome =
                tag_filter::apply(records, &query.tags, query.tag_mode, query.tag_match);
            records = outcome.retained.clone();
            Some(outcome)
        } else {
            None
        };

        if query.has_advanced_filter() {
            features.push("advancedFilter".to_string());
            records = AdvancedFilter::from_query(&query).retain(records);
        }

        let scores = if query.score_relevance {
            features.push("relevance".to_string());
            relevance::score_all(&records, &query)
        } else {
            Default::default()
        };
        relevance::sort_records(&mut records, &query, &scores);

        let (page, pagination) = paginate(records, query.limit, query.offset);

        let mut results = Vec::with_capacity(page.len());
        for record in &page {
            let mut result = SearchResult::from_record(record);
            if let Some(outcome) = &tag_outcome {
                result.matched_tags = outcome.matched.get(&record.id).cloned();
            }
            if query.score_relevance {
                result.relevance = scores.get(&record.id).cloned().map(Into::into);
            }
            if let Some(outcome) = &ft_outcome {
                result.fulltext_matches = outcome.details.get(&record.id).cloned();
            }
            results.push(result);
        }

        let mut response =
            SearchResponse::new(query.raw.clone(), pagination, elapsed_ms(start));
        response.results = results;
        response.matched_tags = tag_outcome
            .map(|o| o.histogram)
            .filter(|h| !h.is_empty());
        if query.score_relevance {
            response.relevance_stats = RelevanceStats::compute(&scores);
        }
        response.search_features = features;

        info!(
            library_id = library,
            result_count = response.results.len(),
            total = response.pagination.total,
            sort_field = query.sort.as_str(),
            duration_ms = response.search_time,
            "search complete"
        );
        Ok(response)
    }

    fn empty_page(
        &self,
        query: &SearchQuery,
        features: Vec<String>,
        start: Instant,
    ) -> SearchResponse {
        let mut response = SearchResponse::new(
            query.raw.clone(),
            Pagination::new(query.limit, query.offset, 0),
            elapsed_ms(start),
        );
        response.search_features = features;
        info!(
            library_id = query.library_id,
            result_count = 0usize,
            duration_ms = response.search_time,
            "search short-circuited to empty page"
        );
        response
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use refkit_store::fixtures;

    fn pipeline() -> SearchPipeline<refkit_store::MemoryRecordStore> {
        SearchPipeline::new(Arc::new(fixtures::sample_store()), fixtures::LIBRARY)
    }

    #[tokio::test]
    async fn test_default_query_returns_everything_paged() {
        let response = pipeline().search(RawSearchQuery::default()).await.unwrap();
        assert_eq!(response.pagination.total, 8);
        assert_eq!(response.results.len(), 8);
        assert!(!response.pagination.has_more);
        assert_eq!(response.search_features, vec!["nativeQuery"]);
        assert!(response.relevance_stats.is_none());
        assert!(response.matched_tags.is_none());
    }

    #[tokio::test]
    async fn test_exact_key_found() {
        let raw = RawSearchQuery {
            key: Some(fixtures::KEY_CONSENSUS.to_string()),
            // These must all be ignored on the exact-key path.
            sort: Some("title".to_string()),
            tag: vec!["nonexistent".to_string()],
            limit: Some(refkit_core::FlexibleInt(50)),
            ..Default::default()
        };
        let response = pipeline().search(raw).await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].key, fixtures::KEY_CONSENSUS);
        assert_eq!(response.pagination.limit, 1);
        assert_eq!(response.pagination.offset, 0);
        assert_eq!(response.pagination.total, 1);
        assert!(!response.pagination.has_more);
        assert_eq!(response.search_features, vec!["exactKey"]);
    }

    #[tokio::test]
    async fn test_exact_key_missing_is_empty_page() {
        let raw = RawSearchQuery {
            key: Some("ZZZZ9999".to_string()),
            ..Default::default()
        };
        let response = pipeline().search(raw).await.unwrap();
        assert!(response.results.is_empty());
        assert_eq!(response.pagination.total, 0);
        assert_eq!(response.pagination.limit, 1);
    }

    #[tokio::test]
    async fn test_fulltext_no_hits_short_circuits() {
        let raw = RawSearchQuery {
            fulltext: Some("zymurgy".to_string()),
            q: Some("consensus".to_string()),
            ..Default::default()
        };
        let response = pipeline().search(raw).await.unwrap();
        assert!(response.results.is_empty());
        assert_eq!(response.pagination.total, 0);
        assert_eq!(response.search_features, vec!["fulltext"]);
    }

    #[tokio::test]
    async fn test_unresolvable_collection_is_empty_page() {
        let raw = RawSearchQuery {
            collection: Some("NOPE0000".to_string()),
            ..Default::default()
        };
        let response = pipeline().search(raw).await.unwrap();
        assert!(response.results.is_empty());
        assert_eq!(response.pagination.total, 0);
        assert!(response
            .search_features
            .contains(&"collection".to_string()));
    }

    #[tokio::test]
    async fn test_validation_error_before_store_access() {
        let raw = RawSearchQuery {
            sort: Some("shuffle".to_string()),
            ..Default::default()
        };
        let err = pipeline().search(raw).await.unwrap_err();
        assert_eq!(err.status(), 400);
    }
}
