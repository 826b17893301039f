//! Core data models for refkit.
//!
//! These types are shared across all refkit crates and represent the
//! bibliographic domain entities. Records are read-only views owned by
//! the store; the pipeline never mutates them and stashes any transient
//! per-record data in side tables keyed by [`RecordId`].

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a record in the underlying store.
pub type RecordId = Uuid;

/// Identifier of a collection in the underlying store.
pub type CollectionId = Uuid;

/// Identifier of a library (top-level record namespace).
pub type LibraryId = i64;

// =============================================================================
// RECORD TYPES
// =============================================================================

/// Kind of record held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A regular bibliographic item.
    Item,
    /// An attachment (file) record, usually a child of an item.
    Attachment,
    /// A note record, usually a child of an item.
    Note,
}

impl RecordKind {
    pub fn is_item(&self) -> bool {
        matches!(self, RecordKind::Item)
    }

    pub fn is_attachment(&self) -> bool {
        matches!(self, RecordKind::Attachment)
    }

    pub fn is_note(&self) -> bool {
        matches!(self, RecordKind::Note)
    }
}

/// A creator (author, editor, ...) of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub first_name: String,
    pub last_name: String,
}

impl Creator {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Display form used for matching and output ("First Last").
    pub fn display(&self) -> String {
        if self.first_name.is_empty() {
            self.last_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

/// How an attachment is linked to its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    ImportedFile,
    ImportedUrl,
    LinkedFile,
    LinkedUrl,
}

/// Summary of an attachment emitted with search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentSummary {
    pub id: RecordId,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub link_mode: LinkMode,
}

/// A bibliographic record, hydrated from the store.
///
/// The pipeline treats this as a read-only view: field access goes through
/// the closed [`RecordField`] accessor table, never through dynamic lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Unique key within the library (exact-lookup handle).
    pub key: String,
    pub library_id: LibraryId,
    pub kind: RecordKind,
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub creators: Vec<Creator>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Freeform publication date; the leading 4-digit year is extracted
    /// for year filters and date sorting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
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
    /// Parent record for attachment/note children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<RecordId>,
    #[serde(default)]
    pub collection_ids: Vec<CollectionId>,
    #[serde(default)]
    pub attachments: Vec<AttachmentSummary>,
}

impl Record {
    /// Creators joined by a single space, the serialized form used for
    /// substring matching and relevance scoring.
    pub fn creators_joined(&self) -> String {
        self.creators
            .iter()
            .map(Creator::display)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Tags joined by a single space.
    pub fn tags_joined(&self) -> String {
        self.tags.join(" ")
    }

    /// First 4-digit year found in the freeform date field.
    pub fn year(&self) -> Option<i32> {
        let date = self.date.as_deref()?;
        let bytes = date.as_bytes();
        let mut i = 0;
        while i + 4 <= bytes.len() {
            if bytes[i..i + 4].iter().all(u8::is_ascii_digit)
                && (i + 4 == bytes.len() || !bytes[i + 4].is_ascii_digit())
                && (i == 0 || !bytes[i - 1].is_ascii_digit())
            {
                return date[i..i + 4].parse().ok();
            }
            i += 1;
        }
        None
    }

    /// Serialized value of a field through the closed accessor table.
    ///
    /// Returns `None` when the field is absent on this record. Creators and
    /// tags serialize to their space-joined forms.
    pub fn field(&self, field: RecordField) -> Option<String> {
        match field {
            RecordField::Title => self.title.clone(),
            RecordField::Creator => {
                if self.creators.is_empty() {
                    None
                } else {
                    Some(self.creators_joined())
                }
            }
            RecordField::Abstract => self.abstract_text.clone(),
            RecordField::PublicationTitle => self.publication_title.clone(),
            RecordField::Tags => {
                if self.tags.is_empty() {
                    None
                } else {
                    Some(self.tags_joined())
                }
            }
            RecordField::Extra => self.extra.clone(),
            RecordField::Language => self.language.clone(),
            RecordField::Rights => self.rights.clone(),
            RecordField::Url => self.url.clone(),
            RecordField::Doi => self.doi.clone(),
            RecordField::Isbn => self.isbn.clone(),
            RecordField::Date => self.date.clone(),
            RecordField::DateAdded => Some(self.date_added.to_rfc3339()),
            RecordField::DateModified => Some(self.date_modified.to_rfc3339()),
        }
    }
}

/// Closed set of addressable record fields.
///
/// Unknown field names are rejected at query validation time, not at
/// access time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordField {
    Title,
    Creator,
    Abstract,
    PublicationTitle,
    Tags,
    Extra,
    Language,
    Rights,
    Url,
    Doi,
    Isbn,
    Date,
    DateAdded,
    DateModified,
}

impl RecordField {
    /// Canonical wire name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::Title => "title",
            RecordField::Creator => "creator",
            RecordField::Abstract => "abstract",
            RecordField::PublicationTitle => "publicationTitle",
            RecordField::Tags => "tags",
            RecordField::Extra => "extra",
            RecordField::Language => "language",
            RecordField::Rights => "rights",
            RecordField::Url => "url",
            RecordField::Doi => "doi",
            RecordField::Isbn => "isbn",
            RecordField::Date => "date",
            RecordField::DateAdded => "dateAdded",
            RecordField::DateModified => "dateModified",
        }
    }
}

impl std::str::FromStr for RecordField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(RecordField::Title),
            "creator" => Ok(RecordField::Creator),
            "abstract" => Ok(RecordField::Abstract),
            "publicationTitle" => Ok(RecordField::PublicationTitle),
            "tags" => Ok(RecordField::Tags),
            "extra" => Ok(RecordField::Extra),
            "language" => Ok(RecordField::Language),
            "rights" => Ok(RecordField::Rights),
            "url" => Ok(RecordField::Url),
            "doi" => Ok(RecordField::Doi),
            "isbn" => Ok(RecordField::Isbn),
            "date" => Ok(RecordField::Date),
            "dateAdded" => Ok(RecordField::DateAdded),
            "dateModified" => Ok(RecordField::DateModified),
            other => Err(format!("unknown field '{other}'")),
        }
    }
}

// =============================================================================
// COLLECTION TYPES
// =============================================================================

/// A collection (folder) of records within a library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub key: String,
    pub library_id: LibraryId,
    pub name: String,
}

// =============================================================================
// HELPERS
// =============================================================================

/// Build a UTC timestamp from a calendar date, midnight UTC.
///
/// Panics on out-of-range input, so it is only suitable for literals in
/// fixtures and tests.
pub fn utc_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
        .unwrap_or_else(|| panic!("invalid date {year:04}-{month:02}-{day:02}"))
}

/// Current year, used as the upper bound for open-ended year ranges.
pub fn current_year() -> i32 {
    Utc::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        Record {
            id: Uuid::new_v4(),
            key: "ABCD2345".to_string(),
            library_id: 1,
            kind: RecordKind::Item,
            item_type: "journalArticle".to_string(),
            title: Some("Distributed Consensus in Practice".to_string()),
            creators: vec![
                Creator::new("Ada", "Lovelace"),
                Creator::new("Alan", "Turing"),
            ],
            tags: vec!["consensus".to_string(), "distributed".to_string()],
            date: Some("2021-06-01".to_string()),
            date_added: utc_date(2022, 1, 10),
            date_modified: utc_date(2022, 3, 4),
            abstract_text: Some("A survey of consensus protocols.".to_string()),
            publication_title: Some("Journal of Systems".to_string()),
            doi: Some("10.1000/xyz".to_string()),
            isbn: None,
            pages: Some(24),
            language: Some("en".to_string()),
            rights: None,
            url: None,
            extra: None,
            parent_id: None,
            collection_ids: Vec::new(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_creator_display() {
        assert_eq!(Creator::new("Ada", "Lovelace").display(), "Ada Lovelace");
        assert_eq!(Creator::new("", "Plato").display(), "Plato");
    }

    #[test]
    fn test_creators_joined() {
        let record = sample_record();
        assert_eq!(record.creators_joined(), "Ada Lovelace Alan Turing");
    }

    #[test]
    fn test_year_extraction_iso_date() {
        let record = sample_record();
        assert_eq!(record.year(), Some(2021));
    }

    #[test]
    fn test_year_extraction_bare_year() {
        let mut record = sample_record();
        record.date = Some("1999".to_string());
        assert_eq!(record.year(), Some(1999));
    }

    #[test]
    fn test_year_extraction_embedded() {
        let mut record = sample_record();
        record.date = Some("June 2018".to_string());
        assert_eq!(record.year(), Some(2018));
    }

    #[test]
    fn test_year_extraction_none() {
        let mut record = sample_record();
        record.date = Some("n.d.".to_string());
        assert_eq!(record.year(), None);
        record.date = None;
        assert_eq!(record.year(), None);
    }

    #[test]
    fn test_year_skips_longer_digit_runs() {
        let mut record = sample_record();
        record.date = Some("id 123456, printed 2003".to_string());
        assert_eq!(record.year(), Some(2003));
    }

    #[test]
    fn test_field_accessor_table() {
        let record = sample_record();
        assert_eq!(
            record.field(RecordField::Title).as_deref(),
            Some("Distributed Consensus in Practice")
        );
        assert_eq!(
            record.field(RecordField::Creator).as_deref(),
            Some("Ada Lovelace Alan Turing")
        );
        assert_eq!(
            record.field(RecordField::Tags).as_deref(),
            Some("consensus distributed")
        );
        assert_eq!(record.field(RecordField::Rights), None);
        assert_eq!(record.field(RecordField::Extra), None);
    }

    #[test]
    fn test_field_accessor_empty_collections_are_none() {
        let mut record = sample_record();
        record.creators.clear();
        record.tags.clear();
        assert_eq!(record.field(RecordField::Creator), None);
        assert_eq!(record.field(RecordField::Tags), None);
    }

    #[test]
    fn test_record_field_from_str_round_trip() {
        for field in [
            RecordField::Title,
            RecordField::PublicationTitle,
            RecordField::DateAdded,
            RecordField::DateModified,
        ] {
            let parsed: RecordField = field.as_str().parse().unwrap();
            assert_eq!(parsed, field);
        }
    }

    #[test]
    fn test_record_field_from_str_unknown() {
        let err = "callNumber".parse::<RecordField>().unwrap_err();
        assert!(err.contains("callNumber"));
    }

    #[test]
    fn test_record_kind_helpers() {
        assert!(RecordKind::Item.is_item());
        assert!(RecordKind::Attachment.is_attachment());
        assert!(RecordKind::Note.is_note());
        assert!(!RecordKind::Note.is_attachment());
    }
}
