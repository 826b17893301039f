//! Centralized default constants for refkit.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates should reference these constants instead of defining their
//! own magic numbers.

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for search requests when `limit` is absent.
pub const SEARCH_LIMIT_DEFAULT: usize = 100;

/// Hard cap on `limit`; larger requests are clamped, not rejected.
pub const SEARCH_LIMIT_MAX: usize = 500;

/// Default page offset.
pub const SEARCH_OFFSET_DEFAULT: usize = 0;

// =============================================================================
// FULLTEXT SNIPPETS
// =============================================================================

/// Characters of context kept on each side of a fulltext match.
pub const SNIPPET_CONTEXT: usize = 50;

/// Marker wrapped around truncated snippet edges.
pub const SNIPPET_ELLIPSIS: &str = "...";

// =============================================================================
// RELEVANCE SCORING
// =============================================================================

/// Base weight for a title match.
pub const WEIGHT_TITLE: f64 = 3.0;

/// Base weight for a creator match.
pub const WEIGHT_CREATOR: f64 = 2.0;

/// Base weight for an abstract match.
pub const WEIGHT_ABSTRACT: f64 = 1.5;

/// Base weight for a publication-title match.
pub const WEIGHT_PUBLICATION_TITLE: f64 = 1.2;

/// Base weight for a tag match.
pub const WEIGHT_TAGS: f64 = 1.0;

/// Base weight for an extra-field match.
pub const WEIGHT_EXTRA: f64 = 0.5;

/// Multiplier applied to the base weight of any boosted field.
pub const BOOST_MULTIPLIER: f64 = 2.0;

// =============================================================================
// RESPONSE
// =============================================================================

/// Response envelope schema version.
pub const RESPONSE_VERSION: &str = env!("CARGO_PKG_VERSION");
