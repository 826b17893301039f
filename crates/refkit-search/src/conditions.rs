//! Native condition builder: translates the simple filters of a validated
//! query into the store's conjunctive query primitive and executes it.
//!
//! Anything the native executor cannot express (tag combinations, ranges,
//! operator filters) is deliberately left to the in-memory stages.

use tracing::debug;

use refkit_core::{LibraryId, NativeCondition, RecordId, RecordKind, RecordStore, Result,
    SearchQuery, TagMatch, TagMode};

/// Outcome of building the native conditions.
#[derive(Debug, PartialEq, Eq)]
pub enum ConditionPlan {
    /// Conditions ready for execution.
    Query(Vec<NativeCondition>),
    /// A referenced collection key did not resolve. This is a legitimate
    /// "no results" case, not a malformed query: short-circuit to an
    /// empty page.
    EmptyPage,
}

/// Translate the query's simple filters into native conditions, resolving
/// the collection key through the store.
pub async fn build(
    store: &dyn RecordStore,
    library: LibraryId,
    query: &SearchQuery,
) -> Result<ConditionPlan> {
    let mut conditions = Vec::new();

    if let Some(q) = &query.q {
        conditions.push(NativeCondition::QuickSearch(q.clone()));
    }
    if let Some(title) = &query.title {
        conditions.push(NativeCondition::TitleContains(title.clone()));
    }
    if let Some(creator) = &query.creator {
        conditions.push(NativeCondition::CreatorContains(creator.clone()));
    }
    if let Some(year) = query.year {
        conditions.push(NativeCondition::YearIs(year));
    }
    if let Some(item_type) = &query.item_type {
        conditions.push(NativeCondition::ItemTypeIs(item_type.clone()));
    }
    if let Some(doi) = &query.doi {
        conditions.push(NativeCondition::DoiIs(doi.clone()));
    }
    if let Some(isbn) = &query.isbn {
        conditions.push(NativeCondition::IsbnIs(isbn.clone()));
    }

    // Legacy single-tag prefilter: the native executor only knows exact
    // single-tag equality, so it applies only to the simplest tag query.
    // The tag filter stage still runs for match reporting.
    if query.tags.len() == 1
        && query.tag_match == TagMatch::Exact
        && query.tag_mode != TagMode::None
    {
        conditions.push(NativeCondition::TagIs(query.tags[0].clone()));
    }

    if let Some(key) = &query.collection {
        match store.resolve_collection(library, key).await? {
            Some(id) => conditions.push(NativeCondition::InCollection(id)),
            None => {
                debug!(
                    stage = "native_query",
                    collection = %key,
                    "collection key did not resolve; returning empty page"
                );
                return Ok(ConditionPlan::EmptyPage);
            }
        }
    }

    if query.has_attachment {
        conditions.push(NativeCondition::HasChild(RecordKind::Attachment));
    }
    if query.has_note {
        conditions.push(NativeCondition::HasChild(RecordKind::Note));
    }
    if query.exclude_attachments {
        conditions.push(NativeCondition::ExcludeKind(RecordKind::Attachment));
    }
    if query.exclude_notes {
        conditions.push(NativeCondition::ExcludeKind(RecordKind::Note));
    }

    Ok(ConditionPlan::Query(conditions))
}

/// Build and execute the native query. Returns `None` for the fail-soft
/// empty page. A store failure here propagates: a broken primary query
/// makes the whole response meaningless.
pub async fn run(
    store: &dyn RecordStore,
    library: LibraryId,
    query: &SearchQuery,
) -> Result<Option<Vec<RecordId>>> {
    let conditions = match build(store, library, query).await? {
        ConditionPlan::Query(c) => c,
        ConditionPlan::EmptyPage => return Ok(None),
    };

    let ids = store.native_query(library, &conditions).await?;
    debug!(
        stage = "native_query",
        condition_count = conditions.len(),
        result_count = ids.len(),
        "native query executed"
    );
    Ok(Some(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use refkit_core::{RawSearchQuery, SearchQuery};
    use refkit_store::fixtures;

    fn normalize(raw: RawSearchQuery) -> SearchQuery {
        SearchQuery::normalize(raw, fixtures::LIBRARY).unwrap()
    }

    #[tokio::test]
    async fn test_build_maps_simple_filters() {
        let store = fixtures::sample_store();
        let query = normalize(RawSearchQuery {
            q: Some("consensus".to_string()),
            item_type: Some("journalArticle".to_string()),
            year: Some("2021".to_string()),
            ..Default::default()
        });
        let plan = build(&store, fixtures::LIBRARY, &query).await.unwrap();
        match plan {
            ConditionPlan::Query(conditions) => {
                assert!(conditions.contains(&NativeCondition::QuickSearch("consensus".into())));
                assert!(conditions.contains(&NativeCondition::YearIs(2021)));
                assert!(
                    conditions.contains(&NativeCondition::ItemTypeIs("journalArticle".into()))
                );
            }
            ConditionPlan::EmptyPage => panic!("expected conditions"),
        }
    }

    #[tokio::test]
    async fn test_single_exact_tag_gets_native_prefilter() {
        let store = fixtures::sample_store();
        let query = normalize(RawSearchQuery {
            tag: vec!["consensus".to_string()],
            ..Default::default()
        });
        let ConditionPlan::Query(conditions) =
            build(&store, fixtures::LIBRARY, &query).await.unwrap()
        else {
            panic!("expected conditions");
        };
        assert!(conditions.contains(&NativeCondition::TagIs("consensus".into())));
    }

    #[tokio::test]
    async fn test_multi_tag_stays_in_memory() {
        let store = fixtures::sample_store();
        let query = normalize(RawSearchQuery {
            tag: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        });
        let ConditionPlan::Query(conditions) =
            build(&store, fixtures::LIBRARY, &query).await.unwrap()
        else {
            panic!("expected conditions");
        };
        assert!(!conditions
            .iter()
            .any(|c| matches!(c, NativeCondition::TagIs(_))));
    }

    #[tokio::test]
    async fn test_none_tag_mode_never_prefilters() {
        let store = fixtures::sample_store();
        let query = normalize(RawSearchQuery {
            tag: vec!["consensus".to_string()],
            tag_mode: Some("none".to_string()),
            ..Default::default()
        });
        let ConditionPlan::Query(conditions) =
            build(&store, fixtures::LIBRARY, &query).await.unwrap()
        else {
            panic!("expected conditions");
        };
        assert!(conditions.is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_collection_is_empty_page() {
        let store = fixtures::sample_store();
        let query = normalize(RawSearchQuery {
            collection: Some("ZZZZ9999".to_string()),
            ..Default::default()
        });
        let plan = build(&store, fixtures::LIBRARY, &query).await.unwrap();
        assert_eq!(plan, ConditionPlan::EmptyPage);

        let executed = run(&store, fixtures::LIBRARY, &query).await.unwrap();
        assert!(executed.is_none());
    }

    #[tokio::test]
    async fn test_collection_resolves_and_filters() {
        let store = fixtures::sample_store();
        let query = normalize(RawSearchQuery {
            collection: Some(fixtures::KEY_COLLECTION.to_string()),
            ..Default::default()
        });
        let ids = run(&store, fixtures::LIBRARY, &query).await.unwrap().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&fixtures::id_consensus()));
        assert!(ids.contains(&fixtures::id_ml_basics()));
    }

    #[tokio::test]
    async fn test_exclusion_toggles() {
        let store = fixtures::sample_store();
        let query = normalize(RawSearchQuery {
            exclude_attachments: Some(refkit_core::FlexibleBool(true)),
            exclude_notes: Some(refkit_core::FlexibleBool(true)),
            ..Default::default()
        });
        let ids = run(&store, fixtures::LIBRARY, &query).await.unwrap().unwrap();
        assert_eq!(ids.len(), 5); // the five item-kind records
    }
}
