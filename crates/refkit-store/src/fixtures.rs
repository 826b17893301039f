//! Deterministic sample corpus for tests.
//!
//! Ids are fixed so test assertions and candidate ordering are stable
//! across runs. The corpus covers the shapes the pipeline cares about:
//! items with creators/tags/dates, attachment and note children with
//! content, an orphaned attachment, an undated record, and a collection.

use uuid::Uuid;

use refkit_core::models::utc_date;
use refkit_core::{
    AttachmentSummary, Collection, Creator, LibraryId, LinkMode, Record, RecordId, RecordKind,
};

use crate::memory::MemoryRecordStore;

/// Library all fixture records live in.
pub const LIBRARY: LibraryId = 1;

pub const KEY_CONSENSUS: &str = "CONS2345";
pub const KEY_SYSTEMS_BOOK: &str = "ARTS2345";
pub const KEY_ML_BASICS: &str = "MLBA2345";
pub const KEY_TAG_SURVEY: &str = "TAGS2345";
pub const KEY_UNDATED: &str = "UNDA2345";
pub const KEY_COLLECTION: &str = "COLL1234";

pub fn id_consensus() -> RecordId {
    Uuid::from_u128(0x01)
}

pub fn id_systems_book() -> RecordId {
    Uuid::from_u128(0x02)
}

pub fn id_ml_basics() -> RecordId {
    Uuid::from_u128(0x03)
}

pub fn id_tag_survey() -> RecordId {
    Uuid::from_u128(0x04)
}

pub fn id_undated() -> RecordId {
    Uuid::from_u128(0x05)
}

pub fn id_consensus_pdf() -> RecordId {
    Uuid::from_u128(0x11)
}

pub fn id_systems_note() -> RecordId {
    Uuid::from_u128(0x12)
}

pub fn id_orphan_attachment() -> RecordId {
    Uuid::from_u128(0x13)
}

pub fn collection_id() -> Uuid {
    Uuid::from_u128(0xC0)
}

fn base_record(id: RecordId, key: &str, item_type: &str) -> Record {
    Record {
        id,
        key: key.to_string(),
        library_id: LIBRARY,
        kind: RecordKind::Item,
        item_type: item_type.to_string(),
        title: None,
        creators: Vec::new(),
        tags: Vec::new(),
        date: None,
        date_added: utc_date(2022, 1, 1),
        date_modified: utc_date(2022, 1, 1),
        abstract_text: None,
        publication_title: None,
        doi: None,
        isbn: None,
        pages: None,
        language: None,
        rights: None,
        url: None,
        extra: None,
        parent_id: None,
        collection_ids: Vec::new(),
        attachments: Vec::new(),
    }
}

/// Build the shared sample store.
pub fn sample_store() -> MemoryRecordStore {
    let mut store = MemoryRecordStore::new();

    let consensus = Record {
        title: Some("Distributed Consensus in Practice".to_string()),
        creators: vec![
            Creator::new("Ada", "Lovelace"),
            Creator::new("Alan", "Turing"),
        ],
        tags: vec!["consensus".to_string(), "distributed".to_string()],
        date: Some("2021-06-01".to_string()),
        date_added: utc_date(2022, 1, 10),
        date_modified: utc_date(2022, 3, 4),
        abstract_text: Some("A survey of consensus protocols in production systems.".to_string()),
        publication_title: Some("Journal of Systems".to_string()),
        doi: Some("10.1000/jsys.2021.42".to_string()),
        pages: Some(24),
        language: Some("en".to_string()),
        collection_ids: vec![collection_id()],
        attachments: vec![AttachmentSummary {
            id: id_consensus_pdf(),
            key: "CPDF2345".to_string(),
            filename: Some("consensus.pdf".to_string()),
            file_path: Some("/storage/CPDF2345/consensus.pdf".to_string()),
            content_type: Some("application/pdf".to_string()),
            link_mode: LinkMode::ImportedFile,
        }],
        ..base_record(id_consensus(), KEY_CONSENSUS, "journalArticle")
    };

    let systems_book = Record {
        title: Some("The Art of Systems Programming".to_string()),
        creators: vec![Creator::new("Grace", "Hopper")],
        tags: vec!["systems".to_string(), "programming".to_string()],
        date: Some("1999".to_string()),
        date_added: utc_date(2021, 6, 15),
        date_modified: utc_date(2021, 6, 15),
        isbn: Some("978-0-13-468599-1".to_string()),
        pages: Some(412),
        extra: Some("classic reference".to_string()),
        language: Some("en".to_string()),
        ..base_record(id_systems_book(), KEY_SYSTEMS_BOOK, "book")
    };

    let ml_basics = Record {
        title: Some("Machine Learning Basics".to_string()),
        creators: vec![Creator::new("Andrew", "Moore")],
        tags: vec!["ml".to_string(), "statistics".to_string()],
        date: Some("2018".to_string()),
        date_added: utc_date(2023, 2, 1),
        date_modified: utc_date(2023, 2, 20),
        abstract_text: Some("Probability and statistics for learning systems.".to_string()),
        publication_title: Some("Intro Press".to_string()),
        language: Some("en".to_string()),
        collection_ids: vec![collection_id()],
        ..base_record(id_ml_basics(), KEY_ML_BASICS, "book")
    };

    let tag_survey = Record {
        title: Some("A Survey of Consensus Literature".to_string()),
        creators: vec![Creator::new("Barbara", "Liskov")],
        tags: vec!["consensus".to_string(), "survey".to_string()],
        date: Some("2024-02-10".to_string()),
        date_added: utc_date(2024, 3, 1),
        date_modified: utc_date(2024, 3, 1),
        publication_title: Some("Journal of Systems".to_string()),
        language: Some("fr".to_string()),
        ..base_record(id_tag_survey(), KEY_TAG_SURVEY, "journalArticle")
    };

    let undated = Record {
        title: Some("Undated Technical Report".to_string()),
        creators: vec![Creator::new("", "Anonymous")],
        tags: vec!["report".to_string()],
        date: None,
        date_added: utc_date(2020, 5, 5),
        date_modified: utc_date(2020, 5, 5),
        ..base_record(id_undated(), KEY_UNDATED, "report")
    };

    let consensus_pdf = Record {
        kind: RecordKind::Attachment,
        title: Some("consensus.pdf".to_string()),
        parent_id: Some(id_consensus()),
        ..base_record(id_consensus_pdf(), "CPDF2345", "attachment")
    };

    let systems_note = Record {
        kind: RecordKind::Note,
        title: Some("Reading notes".to_string()),
        parent_id: Some(id_systems_book()),
        ..base_record(id_systems_note(), "NOTE2345", "note")
    };

    let orphan_attachment = Record {
        kind: RecordKind::Attachment,
        title: Some("standalone-scan.pdf".to_string()),
        parent_id: None,
        ..base_record(id_orphan_attachment(), "ORPH2345", "attachment")
    };

    store.insert_record(consensus);
    store.insert_record(systems_book);
    store.insert_record(ml_basics);
    store.insert_record(tag_survey);
    store.insert_record(undated);
    store.insert_record(consensus_pdf);
    store.insert_record(systems_note);
    store.insert_record(orphan_attachment);

    store.insert_collection(Collection {
        id: collection_id(),
        key: KEY_COLLECTION.to_string(),
        library_id: LIBRARY,
        name: "Systems Papers".to_string(),
    });

    store.set_attachment_text(
        id_consensus_pdf(),
        "In this paper we describe how the Paxos algorithm was used to build \
         a production replication system. Consensus is reached once a quorum \
         of acceptors has voted for the same proposal.",
    );
    store.set_attachment_text(
        id_orphan_attachment(),
        "Scanned appendix discussing quorum intersection and leases.",
    );
    store.set_note_html(
        id_systems_note(),
        "<p>Reading &amp; margin notes about <b>quorum</b> systems and\n  scheduling.</p>",
    );

    store
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_store_shape() {
        let store = sample_store();
        assert_eq!(store.len(), 8);
    }

    #[test]
    fn test_fixture_ids_are_stable() {
        assert_eq!(id_consensus(), id_consensus());
        assert_ne!(id_consensus(), id_systems_book());
    }
}
