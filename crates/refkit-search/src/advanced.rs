//! Advanced filter engine.
//!
//! Applies the predicates the native query cannot express: year and date
//! ranges, a pages range, operator-qualified field filters, and generic
//! substring filters. All active predicates combine with AND semantics.
//!
//! Range grammar: `"start-end"`, `"start-"`, and `"-end"` over bare years;
//! full ISO dates use the comma forms `"start,end"`, `"start,"`, `",end"`
//! since a hyphen inside `2021-06-01` is ambiguous. An unparsable range
//! string deactivates that predicate rather than failing the query, and a
//! record whose own date field is absent or unparsable is never excluded
//! by a range filter.

use std::sync::Arc;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use refkit_core::{FieldFilter, FieldOperator, Record, RecordField, SearchQuery};

// =============================================================================
// RANGE GRAMMAR
// =============================================================================

/// Half-open-capable numeric range. `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl NumRange {
    fn contains(&self, value: i64) -> bool {
        self.start.map(|s| value >= s).unwrap_or(true)
            && self.end.map(|e| value <= e).unwrap_or(true)
    }
}

/// Date range with the same open-endedness as [`NumRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    fn contains(&self, value: NaiveDate) -> bool {
        self.start.map(|s| value >= s).unwrap_or(true)
            && self.end.map(|e| value <= e).unwrap_or(true)
    }
}

/// Split a range string into its two sides. Comma is the preferred
/// separator; the hyphen form is only unambiguous for bare integers.
fn split_range(input: &str) -> Option<(&str, &str)> {
    let input = input.trim();
    if let Some((a, b)) = input.split_once(',') {
        return Some((a.trim(), b.trim()));
    }
    let (a, b) = input.split_once('-')?;
    let (a, b) = (a.trim(), b.trim());
    // Hyphen form is reserved for bare integers on both sides; anything
    // else (an ISO date, a second hyphen) makes the split ambiguous.
    let bare = |s: &str| s.is_empty() || s.chars().all(|c| c.is_ascii_digit());
    if bare(a) && bare(b) {
        Some((a, b))
    } else {
        None
    }
}

/// Parse `"1999-2004"`, `"1999-"`, `"-2004"`, or the comma equivalents.
/// Returns `None` for anything unparsable, which disables the predicate.
pub fn parse_num_range(input: &str) -> Option<NumRange> {
    let (a, b) = split_range(input)?;
    if a.is_empty() && b.is_empty() {
        return None;
    }
    let parse = |s: &str| -> Option<Option<i64>> {
        if s.is_empty() {
            Some(None)
        } else {
            s.parse().ok().map(Some)
        }
    };
    Some(NumRange {
        start: parse(a)?,
        end: parse(b)?,
    })
}

/// Parse a date range. Each side is a full ISO date or a bare year; a bare
/// year expands to Jan 1 as a start bound and Dec 31 as an end bound.
pub fn parse_date_range(input: &str) -> Option<DateRange> {
    let (a, b) = split_range(input)?;
    if a.is_empty() && b.is_empty() {
        return None;
    }
    Some(DateRange {
        start: parse_date_bound(a, false)?,
        end: parse_date_bound(b, true)?,
    })
}

fn parse_date_bound(side: &str, is_end: bool) -> Option<Option<NaiveDate>> {
    if side.is_empty() {
        return Some(None);
    }
    if let Ok(date) = NaiveDate::parse_from_str(side, "%Y-%m-%d") {
        return Some(Some(date));
    }
    let year: i32 = side.parse().ok()?;
    let date = if is_end {
        NaiveDate::from_ymd_opt(year, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(year, 1, 1)?
    };
    Some(Some(date))
}

// =============================================================================
// PREDICATES
// =============================================================================

/// Compiled advanced filter, built once per query.
#[derive(Debug, Default)]
pub struct AdvancedFilter {
    year: Option<NumRange>,
    date_added: Option<DateRange>,
    date_modified: Option<DateRange>,
    pages: Option<NumRange>,
    field_filters: Vec<FieldFilter>,
    language: Option<String>,
    rights: Option<String>,
    url: Option<String>,
    extra: Option<String>,
}

impl AdvancedFilter {
    /// Compile the advanced predicates from a normalized query. Unparsable
    /// range strings quietly disable their predicate.
    pub fn from_query(query: &SearchQuery) -> Self {
        AdvancedFilter {
            year: query.year_range.as_deref().and_then(parse_num_range),
            date_added: query.date_added_range.as_deref().and_then(parse_date_range),
            date_modified: query
                .date_modified_range
                .as_deref()
                .and_then(parse_date_range),
            pages: query.pages_range.as_deref().and_then(parse_num_range),
            field_filters: query.field_filters.clone(),
            language: query.language.clone(),
            rights: query.rights.clone(),
            url: query.url.clone(),
            extra: query.extra.clone(),
        }
    }

    /// Apply all active predicates, AND-combined, preserving order.
    pub fn retain(&self, candidates: Vec<Arc<Record>>) -> Vec<Arc<Record>> {
        let candidate_count = candidates.len();
        let retained: Vec<Arc<Record>> = candidates
            .into_iter()
            .filter(|record| self.keeps(record))
            .collect();
        debug!(
            stage = "advanced_filter",
            candidate_count,
            advanced_filter_kept = retained.len(),
            "advanced filters applied"
        );
        retained
    }

    fn keeps(&self, record: &Record) -> bool {
        if let Some(range) = &self.year {
            // A record without an extractable year is not disqualified.
            if let Some(year) = record.year() {
                if !range.contains(i64::from(year)) {
                    return false;
                }
            }
        }
        if let Some(range) = &self.date_added {
            if !range.contains(record.date_added.date_naive()) {
                return false;
            }
        }
        if let Some(range) = &self.date_modified {
            if !range.contains(record.date_modified.date_naive()) {
                return false;
            }
        }
        if let Some(range) = &self.pages {
            if let Some(pages) = record.pages {
                if !range.contains(i64::from(pages)) {
                    return false;
                }
            }
        }
        for filter in &self.field_filters {
            let value = record.field(filter.field).unwrap_or_default();
            if !operator_matches(&value, filter.operator, &filter.value) {
                return false;
            }
        }
        for (field, needle) in [
            (RecordField::Language, &self.language),
            (RecordField::Rights, &self.rights),
            (RecordField::Url, &self.url),
            (RecordField::Extra, &self.extra),
        ] {
            if let Some(needle) = needle {
                let value = record.field(field).unwrap_or_default();
                if !value.to_lowercase().contains(&needle.to_lowercase()) {
                    return false;
                }
            }
        }
        true
    }
}

/// Operator-qualified comparison. String operators are case-insensitive;
/// an invalid regex pattern is a non-match, never an error.
fn operator_matches(value: &str, operator: FieldOperator, needle: &str) -> bool {
    if let FieldOperator::Regex = operator {
        return match Regex::new(needle) {
            Ok(re) => re.is_match(value),
            Err(_) => false,
        };
    }
    let value = value.to_lowercase();
    let needle = needle.to_lowercase();
    match operator {
        FieldOperator::Contains => value.contains(&needle),
        FieldOperator::Exact => value == needle,
        FieldOperator::StartsWith => value.starts_with(&needle),
        FieldOperator::EndsWith => value.ends_with(&needle),
        FieldOperator::Regex => false,
    }
}
