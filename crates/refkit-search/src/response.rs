//! Response envelope: pagination, per-record enrichment, and the final
//! assembled page.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use refkit_core::defaults;
use refkit_core::{
    AttachmentSummary, LibraryId, RawSearchQuery, Record, RecordId, RecordKind,
};

use crate::fulltext::FulltextMatchDetail;
use crate::relevance::{RelevanceStats, ScoreDetail};

/// Pagination block of the response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
    pub total: usize,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(limit: usize, offset: usize, total: usize) -> Self {
        Pagination {
            limit,
            offset,
            total,
            has_more: offset + limit < total,
        }
    }

    /// Pagination for the exact-key short-circuit page.
    pub fn exact_key(total: usize) -> Self {
        Pagination {
            limit: 1,
            offset: 0,
            total,
            has_more: false,
        }
    }
}

/// Slice the ordered candidate sequence to `[offset, offset+limit)`.
pub fn paginate<T>(items: Vec<T>, limit: usize, offset: usize) -> (Vec<T>, Pagination) {
    let total = items.len();
    let page = items
        .into_iter()
        .skip(offset)
        .take(limit)
        .collect();
    (page, Pagination::new(limit, offset, total))
}

/// Relevance portion of an emitted result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceDetail {
    pub score: f64,
    pub matched_fields: Vec<String>,
}

impl From<ScoreDetail> for RelevanceDetail {
    fn from(detail: ScoreDetail) -> Self {
        RelevanceDetail {
            score: detail.score,
            matched_fields: detail.matched_fields,
        }
    }
}

/// One emitted record with its enrichments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: RecordId,
    pub key: String,
    pub library_id: LibraryId,
    pub kind: RecordKind,
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creators: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub date_added: chrono::DateTime<chrono::Utc>,
    pub date_modified: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rights: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentSummary>,

    /// Query tags this record satisfied, when a tag filter ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_tags: Option<Vec<String>>,
    /// Score and matched fields, when relevance scoring ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<RelevanceDetail>,
    /// Snippets and match count, when a fulltext filter ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulltext_matches: Option<FulltextMatchDetail>,
}

impl SearchResult {
    /// Core metadata projection of a record; enrichments start empty.
    pub fn from_record(record: &Arc<Record>) -> Self {
        SearchResult {
            id: record.id,
            key: record.key.clone(),
            library_id: record.library_id,
            kind: record.kind,
            item_type: record.item_type.clone(),
            title: record.title.clone(),
            creators: if record.creators.is_empty() {
                None
            } else {
                Some(record.creators_joined())
            },
            tags: record.tags.clone(),
            date: record.date.clone(),
            date_added: record.date_added,
            date_modified: record.date_modified,
            abstract_text: record.abstract_text.clone(),
            publication_title: record.publication_title.clone(),
            doi: record.doi.clone(),
            isbn: record.isbn.clone(),
            pages: record.pages,
            language: record.language.clone(),
            rights: record.rights.clone(),
            url: record.url.clone(),
            extra: record.extra.clone(),
            attachments: record.attachments.clone(),
            matched_tags: None,
            relevance: None,
            fulltext_matches: None,
        }
    }
}

/// The full response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// The caller's query, echoed verbatim.
    pub query: RawSearchQuery,
    pub pagination: Pagination,
    /// Elapsed wall-clock time in milliseconds.
    pub search_time: f64,
    pub results: Vec<SearchResult>,
    /// Per-query-tag match counts, present when a tag filter ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_tags: Option<BTreeMap<String, usize>>,
    /// Score aggregates, present when relevance scoring ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_stats: Option<RelevanceStats>,
    /// Capability tags for the query features this search exercised.
    pub search_features: Vec<String>,
    pub version: &'static str,
}

impl SearchResponse {
    pub fn new(query: RawSearchQuery, pagination: Pagination, search_time: f64) -> Self {
        SearchResponse {
            query,
            pagination,
            search_time,
            results: Vec::new(),
            matched_tags: None,
            relevance_stats: None,
            search_features: Vec::new(),
            version: defaults::RESPONSE_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refkit_store::fixtures;

    #[test]
    fn test_has_more_boundary() {
        assert!(Pagination::new(10, 0, 11).has_more);
        assert!(!Pagination::new(10, 0, 10).has_more);
        assert!(!Pagination::new(10, 5, 15).has_more);
        assert!(Pagination::new(10, 5, 16).has_more);
    }

    #[test]
    fn test_paginate_slices_window() {
        let items: Vec<i32> = (0..25).collect();
        let (page, pagination) = paginate(items, 10, 10);
        assert_eq!(page, (10..20).collect::<Vec<_>>());
        assert_eq!(pagination.total, 25);
        assert!(pagination.has_more);
    }

    #[test]
    fn test_paginate_offset_past_end() {
        let items: Vec<i32> = (0..5).collect();
        let (page, pagination) = paginate(items, 10, 100);
        assert!(page.is_empty());
        assert_eq!(pagination.total, 5);
        assert!(!pagination.has_more);
    }

    #[test]
    fn test_paginate_zero_limit() {
        let items: Vec<i32> = (0..5).collect();
        let (page, pagination) = paginate(items, 0, 0);
        assert!(page.is_empty());
        assert!(pagination.has_more);
    }

    #[test]
    fn test_exact_key_pagination_shape() {
        let found = Pagination::exact_key(1);
        assert_eq!(found.limit, 1);
        assert_eq!(found.offset, 0);
        assert_eq!(found.total, 1);
        assert!(!found.has_more);

        let missing = Pagination::exact_key(0);
        assert_eq!(missing.total, 0);
        assert!(!missing.has_more);
    }

    #[tokio::test]
    async fn test_result_serializes_camel_case() {
        use refkit_core::RecordStore;
        let store = fixtures::sample_store();
        let record = store
            .get_record(fixtures::id_consensus())
            .await
            .unwrap()
            .unwrap();
        let result = SearchResult::from_record(&record);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["key"], "CONS2345");
        assert_eq!(json["itemType"], "journalArticle");
        assert_eq!(json["creators"], "Ada Lovelace Alan Turing");
        assert_eq!(json["publicationTitle"], "Journal of Systems");
        assert_eq!(json["attachments"][0]["contentType"], "application/pdf");
        // Absent optional fields are omitted entirely.
        assert!(json.get("rights").is_none());
        assert!(json.get("matchedTags").is_none());
    }

    #[test]
    fn test_envelope_serializes_camel_case() {
        let response = SearchResponse::new(
            RawSearchQuery::default(),
            Pagination::new(100, 0, 0),
            1.25,
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["pagination"]["hasMore"], false);
        assert_eq!(json["searchTime"], 1.25);
        assert_eq!(json["version"], defaults::RESPONSE_VERSION);
        assert!(json.get("matchedTags").is_none());
        assert!(json.get("relevanceStats").is_none());
    }
}
