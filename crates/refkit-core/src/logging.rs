//! Structured logging schema and field name constants for refkit.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Operation completions |
//! | DEBUG | Decision points, stage transitions, intermediate counts |
//! | TRACE | Per-record iteration, high-volume data (snippets, predicates) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "search", "store"
pub const SUBSYSTEM: &str = "subsystem";

/// Pipeline stage within the search subsystem.
/// Examples: "fulltext", "native_query", "tag_filter", "relevance"
pub const STAGE: &str = "stage";

/// Search query text.
pub const QUERY: &str = "query";

/// Library scope of the request.
pub const LIBRARY_ID: &str = "library_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

/// Size of the candidate set entering a filter stage.
pub const CANDIDATE_COUNT: &str = "candidate_count";

// ─── Search-specific fields ────────────────────────────────────────────────

/// Number of fulltext owner records matched.
pub const FULLTEXT_HITS: &str = "fulltext_hits";

/// Number of native conditions sent to the store.
pub const CONDITION_COUNT: &str = "condition_count";

/// Number of records surviving the tag filter.
pub const TAG_FILTER_KEPT: &str = "tag_filter_kept";

/// Number of records surviving the advanced filter engine.
pub const ADVANCED_FILTER_KEPT: &str = "advanced_filter_kept";

/// Sort field applied to the final ordering.
pub const SORT_FIELD: &str = "sort_field";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
