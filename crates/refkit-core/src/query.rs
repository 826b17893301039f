//! Query model and normalizer for the search pipeline.
//!
//! [`RawSearchQuery`] is the wire-facing parameter mapping; [`SearchQuery`]
//! is the validated, defaulted form every later pipeline stage consumes.
//! Validation happens here, before any store access: bad enum values and
//! malformed numeric parameters fail with a [`Error::Validation`] naming
//! the offending parameter and the allowed set.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::{LibraryId, RecordField};

// =============================================================================
// FLEXIBLE SCALARS
// =============================================================================

/// An integer parameter that deserializes from either a JSON number or a
/// numeric string, since the query interface is a string mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlexibleInt(pub i64);

impl<'de> Deserialize<'de> for FlexibleInt {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Ok(FlexibleInt(n)),
            Raw::Str(s) => s
                .trim()
                .parse()
                .map(FlexibleInt)
                .map_err(|_| de::Error::custom(format!("'{s}' is not an integer"))),
        }
    }
}

/// A boolean parameter that deserializes from a JSON bool or the strings
/// "true"/"false"/"1"/"0".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlexibleBool(pub bool);

impl<'de> Deserialize<'de> for FlexibleBool {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Ok(FlexibleBool(b)),
            Raw::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(FlexibleBool(true)),
                "false" | "0" | "no" => Ok(FlexibleBool(false)),
                other => Err(de::Error::custom(format!("'{other}' is not a boolean"))),
            },
        }
    }
}

/// Accept either a single string or an array of strings.
fn string_or_seq<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::One(s) => vec![s],
        Raw::Many(v) => v,
    })
}

// =============================================================================
// QUERY ENUMS
// =============================================================================

/// Field the final result ordering is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Date,
    Title,
    Creator,
    DateAdded,
    #[default]
    DateModified,
    Relevance,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Date => "date",
            SortField::Title => "title",
            SortField::Creator => "creator",
            SortField::DateAdded => "dateAdded",
            SortField::DateModified => "dateModified",
            SortField::Relevance => "relevance",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "date" => Ok(SortField::Date),
            "title" => Ok(SortField::Title),
            "creator" => Ok(SortField::Creator),
            "dateAdded" => Ok(SortField::DateAdded),
            "dateModified" => Ok(SortField::DateModified),
            "relevance" => Ok(SortField::Relevance),
            other => Err(format!(
                "'{other}' is not a sort field; allowed: date, title, creator, dateAdded, dateModified, relevance"
            )),
        }
    }
}

/// Direction of the final result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("'{other}' is not a direction; allowed: asc, desc")),
        }
    }
}

/// Inclusion mode for tag filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    /// At least one query tag matches.
    #[default]
    Any,
    /// Every query tag matches.
    All,
    /// No query tag matches.
    None,
}

impl FromStr for TagMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(TagMode::Any),
            "all" => Ok(TagMode::All),
            "none" => Ok(TagMode::None),
            other => Err(format!(
                "'{other}' is not a tag mode; allowed: any, all, none"
            )),
        }
    }
}

/// Match semantics for comparing a query tag against record tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TagMatch {
    #[default]
    Exact,
    Contains,
    StartsWith,
}

impl FromStr for TagMatch {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exact" => Ok(TagMatch::Exact),
            "contains" => Ok(TagMatch::Contains),
            "startsWith" => Ok(TagMatch::StartsWith),
            other => Err(format!(
                "'{other}' is not a tag match; allowed: exact, contains, startsWith"
            )),
        }
    }
}

/// Operator for a field-qualified string filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldOperator {
    Contains,
    Exact,
    StartsWith,
    EndsWith,
    Regex,
}

impl FromStr for FieldOperator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "contains" => Ok(FieldOperator::Contains),
            "exact" => Ok(FieldOperator::Exact),
            "startsWith" => Ok(FieldOperator::StartsWith),
            "endsWith" => Ok(FieldOperator::EndsWith),
            "regex" => Ok(FieldOperator::Regex),
            other => Err(format!(
                "'{other}' is not an operator; allowed: contains, exact, startsWith, endsWith, regex"
            )),
        }
    }
}

/// Which content class the fulltext matcher scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FulltextMode {
    Attachment,
    Note,
    #[default]
    Both,
}

impl FulltextMode {
    pub fn includes_attachments(&self) -> bool {
        matches!(self, FulltextMode::Attachment | FulltextMode::Both)
    }

    pub fn includes_notes(&self) -> bool {
        matches!(self, FulltextMode::Note | FulltextMode::Both)
    }
}

impl FromStr for FulltextMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "attachment" => Ok(FulltextMode::Attachment),
            "note" => Ok(FulltextMode::Note),
            "both" => Ok(FulltextMode::Both),
            other => Err(format!(
                "'{other}' is not a fulltext mode; allowed: attachment, note, both"
            )),
        }
    }
}

/// Operator the fulltext matcher applies to content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FulltextOperator {
    #[default]
    Contains,
    Exact,
    Regex,
}

impl FromStr for FulltextOperator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contains" => Ok(FulltextOperator::Contains),
            "exact" => Ok(FulltextOperator::Exact),
            "regex" => Ok(FulltextOperator::Regex),
            other => Err(format!(
                "'{other}' is not a fulltext operator; allowed: contains, exact, regex"
            )),
        }
    }
}

// =============================================================================
// RAW QUERY
// =============================================================================

/// Operator-qualified field filter as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFieldFilter {
    pub field: String,
    #[serde(default = "default_contains")]
    pub operator: String,
    pub value: String,
}

fn default_contains() -> String {
    "contains".to_string()
}

/// Raw search query as received from the transport layer.
///
/// Every parameter is optional; [`SearchQuery::normalize`] applies defaults
/// and validation. This struct is echoed verbatim into the response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSearchQuery {
    /// Free-text quick-search string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// Exact unique record key; short-circuits every other stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_id: Option<LibraryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    /// Year "is" filter against the record's extracted year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    /// Tag filters; a single string or an array.
    #[serde(deserialize_with = "string_or_seq", skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_match: Option<String>,

    /// Collection key restricting the candidate set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// `"start-end"`, `"start-"`, `"-end"` over bare years.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_range: Option<String>,
    /// Comma-separated ISO dates (or bare-year hyphen form).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_added_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified_range: Option<String>,
    /// Numeric range over the pages count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_range: Option<String>,

    /// Operator-qualified string filters.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_filters: Vec<RawFieldFilter>,

    /// Generic case-insensitive substring filters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rights: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,

    /// Fulltext sub-search over attachment/note content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulltext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulltext_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulltext_operator: Option<String>,

    /// Presence toggles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_attachment: Option<FlexibleBool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_note: Option<FlexibleBool>,
    /// Exclusion toggles for child record kinds in the candidate set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_attachments: Option<FlexibleBool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_notes: Option<FlexibleBool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<FlexibleInt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<FlexibleInt>,

    /// Force relevance scoring even under a field sort.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<FlexibleBool>,
    /// Fields whose relevance weight is doubled.
    #[serde(deserialize_with = "string_or_seq", skip_serializing_if = "Vec::is_empty")]
    pub boost: Vec<String>,
}

// =============================================================================
// NORMALIZED QUERY
// =============================================================================

/// Validated fulltext sub-query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulltextQuery {
    pub query: String,
    pub mode: FulltextMode,
    pub operator: FulltextOperator,
}

/// Validated operator-qualified field filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: RecordField,
    pub operator: FieldOperator,
    pub value: String,
}

/// Fields accepted in operator-qualified filters.
const OPERATOR_FILTER_FIELDS: [RecordField; 4] = [
    RecordField::Title,
    RecordField::Creator,
    RecordField::Abstract,
    RecordField::PublicationTitle,
];

/// Fields accepted in the boost list (the scorable fields).
const BOOSTABLE_FIELDS: [RecordField; 6] = [
    RecordField::Title,
    RecordField::Creator,
    RecordField::Abstract,
    RecordField::PublicationTitle,
    RecordField::Tags,
    RecordField::Extra,
];

/// Validated and defaulted search query, the input to every pipeline
/// stage past the normalizer.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// The raw query, preserved for echoing into the response envelope.
    pub raw: RawSearchQuery,
    pub library_id: LibraryId,
    pub q: Option<String>,
    pub exact_key: Option<String>,
    pub item_type: Option<String>,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub isbn: Option<String>,
    pub tags: Vec<String>,
    pub tag_mode: TagMode,
    pub tag_match: TagMatch,
    pub collection: Option<String>,
    pub year_range: Option<String>,
    pub date_added_range: Option<String>,
    pub date_modified_range: Option<String>,
    pub pages_range: Option<String>,
    pub field_filters: Vec<FieldFilter>,
    pub language: Option<String>,
    pub rights: Option<String>,
    pub url: Option<String>,
    pub extra: Option<String>,
    pub fulltext: Option<FulltextQuery>,
    pub has_attachment: bool,
    pub has_note: bool,
    pub exclude_attachments: bool,
    pub exclude_notes: bool,
    pub sort: SortField,
    pub direction: SortDirection,
    pub limit: usize,
    pub offset: usize,
    /// Whether relevance scores are computed for this query.
    pub score_relevance: bool,
    pub boost: Vec<RecordField>,
}

impl SearchQuery {
    /// Validate and default a raw query. The resolved default library id is
    /// passed in explicitly; the normalizer reads no ambient state and
    /// performs no store access.
    pub fn normalize(raw: RawSearchQuery, default_library: LibraryId) -> Result<Self> {
        let sort = match raw.sort.as_deref() {
            None => {
                // Absent sort falls back to relevance ordering when scoring
                // was requested, otherwise to recency.
                if raw.relevance.map(|b| b.0).unwrap_or(false) {
                    SortField::Relevance
                } else {
                    SortField::default()
                }
            }
            Some(s) => s.parse().map_err(|e: String| Error::validation("sort", e))?,
        };

        let direction = match raw.direction.as_deref() {
            None => SortDirection::default(),
            Some(s) => s
                .parse()
                .map_err(|e: String| Error::validation("direction", e))?,
        };

        let limit = match raw.limit {
            None => defaults::SEARCH_LIMIT_DEFAULT,
            Some(FlexibleInt(n)) => {
                (n.max(0) as usize).min(defaults::SEARCH_LIMIT_MAX)
            }
        };

        let offset = match raw.offset {
            None => defaults::SEARCH_OFFSET_DEFAULT,
            Some(FlexibleInt(n)) if n >= 0 => n as usize,
            Some(FlexibleInt(n)) => {
                return Err(Error::validation(
                    "offset",
                    format!("'{n}' is negative; offset must be >= 0"),
                ));
            }
        };

        let tag_mode = match raw.tag_mode.as_deref() {
            None => TagMode::default(),
            Some(s) => s
                .parse()
                .map_err(|e: String| Error::validation("tagMode", e))?,
        };

        let tag_match = match raw.tag_match.as_deref() {
            None => TagMatch::default(),
            Some(s) => s
                .parse()
                .map_err(|e: String| Error::validation("tagMatch", e))?,
        };

        let fulltext = match raw.fulltext.as_deref() {
            None | Some("") => None,
            Some(query) => {
                let mode = match raw.fulltext_mode.as_deref() {
                    None => FulltextMode::default(),
                    Some(s) => s
                        .parse()
                        .map_err(|e: String| Error::validation("fulltextMode", e))?,
                };
                let operator = match raw.fulltext_operator.as_deref() {
                    None => FulltextOperator::default(),
                    Some(s) => s
                        .parse()
                        .map_err(|e: String| Error::validation("fulltextOperator", e))?,
                };
                Some(FulltextQuery {
                    query: query.to_string(),
                    mode,
                    operator,
                })
            }
        };

        let mut field_filters = Vec::with_capacity(raw.field_filters.len());
        for filter in &raw.field_filters {
            let field: RecordField = filter
                .field
                .parse()
                .map_err(|e: String| Error::validation("fieldFilters.field", e))?;
            if !OPERATOR_FILTER_FIELDS.contains(&field) {
                return Err(Error::validation(
                    "fieldFilters.field",
                    format!(
                        "'{}' does not support operator filters; allowed: title, creator, abstract, publicationTitle",
                        filter.field
                    ),
                ));
            }
            let operator = filter
                .operator
                .parse()
                .map_err(|e: String| Error::validation("fieldFilters.operator", e))?;
            field_filters.push(FieldFilter {
                field,
                operator,
                value: filter.value.clone(),
            });
        }

        let mut boost = Vec::with_capacity(raw.boost.len());
        for name in &raw.boost {
            let field: RecordField = name
                .parse()
                .map_err(|e: String| Error::validation("boost", e))?;
            if !BOOSTABLE_FIELDS.contains(&field) {
                return Err(Error::validation(
                    "boost",
                    format!(
                        "'{name}' is not scorable; allowed: title, creator, abstract, publicationTitle, tags, extra"
                    ),
                ));
            }
            if !boost.contains(&field) {
                boost.push(field);
            }
        }

        let year = match raw.year.as_deref().filter(|s| !s.is_empty()) {
            None => None,
            Some(s) => Some(s.trim().parse::<i32>().map_err(|_| {
                Error::validation("year", format!("'{s}' is not a year; expected an integer"))
            })?),
        };

        let score_relevance =
            sort == SortField::Relevance || raw.relevance.map(|b| b.0).unwrap_or(false);

        let library_id = raw.library_id.unwrap_or(default_library);

        Ok(SearchQuery {
            library_id,
            q: non_empty(raw.q.clone()),
            exact_key: non_empty(raw.key.clone()),
            item_type: non_empty(raw.item_type.clone()),
            title: non_empty(raw.title.clone()),
            creator: non_empty(raw.creator.clone()),
            year,
            doi: non_empty(raw.doi.clone()),
            isbn: non_empty(raw.isbn.clone()),
            tags: raw.tag.iter().filter(|t| !t.is_empty()).cloned().collect(),
            tag_mode,
            tag_match,
            collection: non_empty(raw.collection.clone()),
            year_range: non_empty(raw.year_range.clone()),
            date_added_range: non_empty(raw.date_added_range.clone()),
            date_modified_range: non_empty(raw.date_modified_range.clone()),
            pages_range: non_empty(raw.pages_range.clone()),
            field_filters,
            language: non_empty(raw.language.clone()),
            rights: non_empty(raw.rights.clone()),
            url: non_empty(raw.url.clone()),
            extra: non_empty(raw.extra.clone()),
            fulltext,
            has_attachment: raw.has_attachment.map(|b| b.0).unwrap_or(false),
            has_note: raw.has_note.map(|b| b.0).unwrap_or(false),
            exclude_attachments: raw.exclude_attachments.map(|b| b.0).unwrap_or(false),
            exclude_notes: raw.exclude_notes.map(|b| b.0).unwrap_or(false),
            sort,
            direction,
            limit,
            offset,
            score_relevance,
            boost,
            raw,
        })
    }

    /// Whether any tag filter is active.
    pub fn has_tag_filter(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Whether any advanced (in-memory) filter is active.
    pub fn has_advanced_filter(&self) -> bool {
        self.year_range.is_some()
            || self.date_added_range.is_some()
            || self.date_modified_range.is_some()
            || self.pages_range.is_some()
            || !self.field_filters.is_empty()
            || self.language.is_some()
            || self.rights.is_some()
            || self.url.is_some()
            || self.extra.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}
