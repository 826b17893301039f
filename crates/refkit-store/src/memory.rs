//! In-memory implementation of the refkit store interfaces.
//!
//! [`MemoryRecordStore`] is the reference black-box for the pipeline: a
//! conjunctive exact/contains query executor over an in-memory record set,
//! plus the content accessors. Records are inserted up front and the store
//! is read-only afterwards, so the trait methods borrow immutably and the
//! store can be shared behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use refkit_core::{
    Collection, CollectionId, ContentSource, LibraryId, NativeCondition, Record, RecordId,
    RecordKind, RecordStore, Result,
};

/// In-memory record store.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: HashMap<RecordId, Arc<Record>>,
    /// Insertion order, so candidate sets are deterministic across calls.
    order: Vec<RecordId>,
    by_key: HashMap<(LibraryId, String), RecordId>,
    collections_by_key: HashMap<(LibraryId, String), Collection>,
    attachment_text: HashMap<RecordId, String>,
    note_html: HashMap<RecordId, String>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. Replaces any previous record with the same id.
    pub fn insert_record(&mut self, record: Record) {
        let id = record.id;
        self.by_key
            .insert((record.library_id, record.key.clone()), id);
        if self.records.insert(id, Arc::new(record)).is_none() {
            self.order.push(id);
        }
    }

    /// Register a collection for key resolution.
    pub fn insert_collection(&mut self, collection: Collection) {
        self.collections_by_key
            .insert((collection.library_id, collection.key.clone()), collection);
    }

    /// Attach extracted fulltext to an attachment record.
    pub fn set_attachment_text(&mut self, id: RecordId, text: impl Into<String>) {
        self.attachment_text.insert(id, text.into());
    }

    /// Attach raw note markup to a note record.
    pub fn set_note_html(&mut self, id: RecordId, html: impl Into<String>) {
        self.note_html.insert(id, html.into());
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn has_child_of_kind(&self, parent: RecordId, kind: RecordKind) -> bool {
        self.order.iter().any(|id| {
            self.records
                .get(id)
                .map(|r| r.parent_id == Some(parent) && r.kind == kind)
                .unwrap_or(false)
        })
    }

    fn matches(&self, record: &Record, condition: &NativeCondition) -> bool {
        match condition {
            NativeCondition::QuickSearch(term) => {
                let term = term.to_lowercase();
                contains_ci_opt(record.title.as_deref(), &term)
                    || record.creators_joined().to_lowercase().contains(&term)
                    || record.tags_joined().to_lowercase().contains(&term)
            }
            NativeCondition::TitleContains(term) => {
                contains_ci_opt(record.title.as_deref(), &term.to_lowercase())
            }
            NativeCondition::CreatorContains(term) => record
                .creators_joined()
                .to_lowercase()
                .contains(&term.to_lowercase()),
            NativeCondition::YearIs(year) => record.year() == Some(*year),
            NativeCondition::ItemTypeIs(item_type) => {
                record.item_type.eq_ignore_ascii_case(item_type)
            }
            NativeCondition::DoiIs(doi) => record
                .doi
                .as_deref()
                .map(|d| d.eq_ignore_ascii_case(doi))
                .unwrap_or(false),
            NativeCondition::IsbnIs(isbn) => record
                .isbn
                .as_deref()
                .map(|i| normalize_isbn(i) == normalize_isbn(isbn))
                .unwrap_or(false),
            NativeCondition::TagIs(tag) => {
                record.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
            }
            NativeCondition::InCollection(id) => record.collection_ids.contains(id),
            NativeCondition::KindIs(kind) => record.kind == *kind,
            NativeCondition::HasChild(kind) => self.has_child_of_kind(record.id, *kind),
            NativeCondition::ExcludeKind(kind) => record.kind != *kind,
        }
    }
}

fn contains_ci_opt(haystack: Option<&str>, lowered_needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(lowered_needle))
        .unwrap_or(false)
}

fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn native_query(
        &self,
        library: LibraryId,
        conditions: &[NativeCondition],
    ) -> Result<Vec<RecordId>> {
        let hits: Vec<RecordId> = self
            .order
            .iter()
            .filter_map(|id| self.records.get(id))
            .filter(|record| record.library_id == library)
            .filter(|record| conditions.iter().all(|c| self.matches(record, c)))
            .map(|record| record.id)
            .collect();
        trace!(
            library_id = library,
            condition_count = conditions.len(),
            result_count = hits.len(),
            "native query executed"
        );
        Ok(hits)
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<Arc<Record>>> {
        Ok(self.records.get(&id).cloned())
    }

    async fn get_records(&self, ids: &[RecordId]) -> Result<Vec<Arc<Record>>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect())
    }

    async fn resolve_collection(
        &self,
        library: LibraryId,
        key: &str,
    ) -> Result<Option<CollectionId>> {
        Ok(self
            .collections_by_key
            .get(&(library, key.to_string()))
            .map(|c| c.id))
    }

    async fn resolve_by_key(&self, library: LibraryId, key: &str) -> Result<Option<Arc<Record>>> {
        Ok(self
            .by_key
            .get(&(library, key.to_string()))
            .and_then(|id| self.records.get(id))
            .cloned())
    }
}

#[async_trait]
impl ContentSource for MemoryRecordStore {
    async fn attachment_text(&self, id: RecordId) -> Result<Option<String>> {
        Ok(self.attachment_text.get(&id).cloned())
    }

    async fn note_html(&self, id: RecordId) -> Result<Option<String>> {
        Ok(self.note_html.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn test_native_query_empty_conditions_returns_library() {
        let store = fixtures::sample_store();
        let ids = store.native_query(fixtures::LIBRARY, &[]).await.unwrap();
        assert_eq!(ids.len(), store.len());
        // Other libraries are never included.
        let other = store.native_query(99, &[]).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_native_query_is_conjunctive() {
        let store = fixtures::sample_store();
        let ids = store
            .native_query(
                fixtures::LIBRARY,
                &[
                    NativeCondition::ItemTypeIs("journalArticle".to_string()),
                    NativeCondition::TitleContains("consensus".to_string()),
                ],
            )
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_native_query_quick_search_spans_fields() {
        let store = fixtures::sample_store();
        // "lovelace" appears only as a creator surname.
        let ids = store
            .native_query(
                fixtures::LIBRARY,
                &[NativeCondition::QuickSearch("lovelace".to_string())],
            )
            .await
            .unwrap();
        assert!(!ids.is_empty());
    }

    #[tokio::test]
    async fn test_native_query_year() {
        let store = fixtures::sample_store();
        let ids = store
            .native_query(fixtures::LIBRARY, &[NativeCondition::YearIs(2021)])
            .await
            .unwrap();
        for id in ids {
            let record = store.get_record(id).await.unwrap().unwrap();
            assert_eq!(record.year(), Some(2021));
        }
    }

    #[tokio::test]
    async fn test_isbn_normalization() {
        let store = fixtures::sample_store();
        let with_dashes = store
            .native_query(
                fixtures::LIBRARY,
                &[NativeCondition::IsbnIs("978-0-13-468599-1".to_string())],
            )
            .await
            .unwrap();
        let without = store
            .native_query(
                fixtures::LIBRARY,
                &[NativeCondition::IsbnIs("9780134685991".to_string())],
            )
            .await
            .unwrap();
        assert_eq!(with_dashes, without);
        assert!(!with_dashes.is_empty());
    }

    #[tokio::test]
    async fn test_has_child_condition() {
        let store = fixtures::sample_store();
        let ids = store
            .native_query(
                fixtures::LIBRARY,
                &[NativeCondition::HasChild(RecordKind::Attachment)],
            )
            .await
            .unwrap();
        assert!(!ids.is_empty());
        for id in ids {
            let record = store.get_record(id).await.unwrap().unwrap();
            assert!(record.kind.is_item());
        }
    }

    #[tokio::test]
    async fn test_resolve_by_key_scoped_to_library() {
        let store = fixtures::sample_store();
        let record = store
            .resolve_by_key(fixtures::LIBRARY, fixtures::KEY_CONSENSUS)
            .await
            .unwrap();
        assert!(record.is_some());
        let miss = store
            .resolve_by_key(99, fixtures::KEY_CONSENSUS)
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_get_records_skips_unknown_ids() {
        let store = fixtures::sample_store();
        let known = store.native_query(fixtures::LIBRARY, &[]).await.unwrap();
        let mut ids = known.clone();
        ids.push(uuid::Uuid::new_v4());
        let records = store.get_records(&ids).await.unwrap();
        assert_eq!(records.len(), known.len());
    }

    #[tokio::test]
    async fn test_native_query_order_is_stable() {
        let store = fixtures::sample_store();
        let first = store.native_query(fixtures::LIBRARY, &[]).await.unwrap();
        let second = store.native_query(fixtures::LIBRARY, &[]).await.unwrap();
        assert_eq!(first, second);
    }
}
