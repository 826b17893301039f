//! # refkit-core
//!
//! Core types, traits, and the query model for the refkit record search
//! pipeline.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other refkit crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod query;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::{
    AttachmentSummary, Collection, CollectionId, Creator, LibraryId, LinkMode, Record, RecordField,
    RecordId, RecordKind,
};
pub use query::{
    FieldFilter, FieldOperator, FlexibleBool, FlexibleInt, FulltextMode, FulltextOperator,
    FulltextQuery, RawFieldFilter, RawSearchQuery, SearchQuery, SortDirection, SortField, TagMatch,
    TagMode,
};
pub use traits::{ContentSource, NativeCondition, RecordStore};
