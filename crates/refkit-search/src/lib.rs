//! # refkit-search
//!
//! The record search pipeline: query normalization, exact-key lookup,
//! fulltext matching over attachment and note content, native condition
//! building, in-memory tag and advanced filtering, relevance scoring, and
//! page assembly.
//!
//! The entry point is [`SearchPipeline::search`], which takes a raw query
//! and returns a [`SearchResponse`]. The backing store is any
//! [`refkit_core::RecordStore`] + [`refkit_core::ContentSource`].

pub mod advanced;
pub mod conditions;
pub mod fulltext;
pub mod pipeline;
pub mod relevance;
pub mod response;
pub mod tag_filter;

pub use fulltext::{FulltextMatchDetail, FulltextOutcome, Snippet};
pub use pipeline::SearchPipeline;
pub use relevance::{RelevanceStats, ScoreDetail};
pub use response::{Pagination, SearchResponse, SearchResult};
