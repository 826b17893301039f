//! Store-facing traits for refkit.
//!
//! The record store is an external collaborator: the pipeline consumes it
//! through these read-only interfaces and inherits its consistency
//! guarantees. Implementations must be `Send + Sync`; the pipeline never
//! mutates anything behind them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CollectionId, LibraryId, Record, RecordId, RecordKind};

// =============================================================================
// NATIVE QUERY CONDITIONS
// =============================================================================

/// A single conjunctive condition for the store's native query primitive.
///
/// The native executor supports only exact/contains matching over indexed
/// fields; everything richer is applied in memory by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCondition {
    /// Free-text quick-search over title, creators, and tags.
    QuickSearch(String),
    /// Case-insensitive substring match on the title.
    TitleContains(String),
    /// Case-insensitive substring match on the joined creator names.
    CreatorContains(String),
    /// Exact match on the extracted publication year.
    YearIs(i32),
    /// Exact match on the item type.
    ItemTypeIs(String),
    /// Exact match on the DOI.
    DoiIs(String),
    /// Exact match on the ISBN (separators ignored).
    IsbnIs(String),
    /// Exact (case-insensitive) single-tag equality. Tag combinations are
    /// beyond the native executor and handled by the tag filter stage.
    TagIs(String),
    /// Membership in a collection, already resolved to an internal id.
    InCollection(CollectionId),
    /// Restrict the candidate set to records of the given kind.
    KindIs(RecordKind),
    /// Record has at least one child of the given kind.
    HasChild(RecordKind),
    /// Exclude records of the given kind from the candidate set.
    ExcludeKind(RecordKind),
}

// =============================================================================
// STORE READ INTERFACE
// =============================================================================

/// Read interface of the underlying record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Execute the native conjunctive query and return matching record ids
    /// within the library. An empty condition list matches every record.
    async fn native_query(
        &self,
        library: LibraryId,
        conditions: &[NativeCondition],
    ) -> Result<Vec<RecordId>>;

    /// Fetch a single record by id.
    async fn get_record(&self, id: RecordId) -> Result<Option<Arc<Record>>>;

    /// Hydrate records by id, preserving input order; unknown ids are
    /// silently skipped.
    async fn get_records(&self, ids: &[RecordId]) -> Result<Vec<Arc<Record>>>;

    /// Resolve a collection key to its internal id.
    async fn resolve_collection(
        &self,
        library: LibraryId,
        key: &str,
    ) -> Result<Option<CollectionId>>;

    /// Resolve a record by (library, unique key).
    async fn resolve_by_key(&self, library: LibraryId, key: &str) -> Result<Option<Arc<Record>>>;
}

// =============================================================================
// CONTENT ACCESSORS
// =============================================================================

/// Read access to attachment fulltext and note content.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Extracted plain text of an attachment record, if indexed.
    async fn attachment_text(&self, id: RecordId) -> Result<Option<String>>;

    /// Raw note markup of a note record, if present.
    async fn note_html(&self, id: RecordId) -> Result<Option<String>>;
}
