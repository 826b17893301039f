//! Fulltext matcher over attachment and note content.
//!
//! Runs independently of the native store query: enumerates content-bearing
//! records, matches the fulltext operator against their text, resolves each
//! hit to its owning parent record (or itself when orphaned), and extracts
//! one contextual snippet per matched item. Store or content failures on
//! this path degrade to an empty match set rather than aborting the query.

use std::collections::HashMap;

use regex::Regex;
use tracing::{debug, warn};

use refkit_core::defaults::{SNIPPET_CONTEXT, SNIPPET_ELLIPSIS};
use refkit_core::{
    ContentSource, FulltextOperator, FulltextQuery, LibraryId, NativeCondition, RecordId,
    RecordKind, RecordStore,
};
use serde::Serialize;

/// One extracted excerpt from a matched attachment or note.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    /// Id of the content-bearing child record the excerpt came from.
    pub record_id: RecordId,
    pub excerpt: String,
}

/// Per-owner fulltext match detail, merged into the final output.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FulltextMatchDetail {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachment_snippets: Vec<Snippet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub note_snippets: Vec<Snippet>,
    /// Local score: total number of operator matches across this owner's
    /// content items.
    pub match_count: usize,
}

/// Result of the fulltext stage: deduplicated owner ids in first-hit order
/// plus the per-owner detail map.
#[derive(Debug, Default)]
pub struct FulltextOutcome {
    pub owner_ids: Vec<RecordId>,
    pub details: HashMap<RecordId, FulltextMatchDetail>,
}

/// Run the fulltext sub-search.
pub async fn run(
    store: &dyn RecordStore,
    content: &dyn ContentSource,
    library: LibraryId,
    ft: &FulltextQuery,
) -> FulltextOutcome {
    let matcher = match Matcher::new(ft) {
        Some(m) => m,
        // An uncompilable regex matches nothing.
        None => return FulltextOutcome::default(),
    };

    let mut outcome = FulltextOutcome::default();

    if ft.mode.includes_attachments() {
        scan_kind(
            store,
            content,
            library,
            RecordKind::Attachment,
            &matcher,
            &mut outcome,
        )
        .await;
    }
    if ft.mode.includes_notes() {
        scan_kind(
            store,
            content,
            library,
            RecordKind::Note,
            &matcher,
            &mut outcome,
        )
        .await;
    }

    debug!(
        stage = "fulltext",
        fulltext_hits = outcome.owner_ids.len(),
        "fulltext matching complete"
    );
    outcome
}

async fn scan_kind(
    store: &dyn RecordStore,
    content: &dyn ContentSource,
    library: LibraryId,
    kind: RecordKind,
    matcher: &Matcher<'_>,
    outcome: &mut FulltextOutcome,
) {
    let ids = match store
        .native_query(library, &[NativeCondition::KindIs(kind)])
        .await
    {
        Ok(ids) => ids,
        Err(e) => {
            warn!(stage = "fulltext", error = %e, "store query failed; degrading to empty match set");
            return;
        }
    };

    for id in ids {
        let text = match fetch_text(content, id, kind).await {
            Some(t) => t,
            None => continue,
        };
        // Notes are matched and excerpted against the cleaned text; raw
        // attachment text is used as-is.
        let text = match kind {
            RecordKind::Note => strip_html(&text),
            _ => text,
        };

        let Some(hit) = matcher.first_match(&text) else {
            continue;
        };
        let count = matcher.count_matches(&text);
        let excerpt = extract_snippet(&text, hit.0, hit.1 - hit.0);

        let owner = match store.get_record(id).await {
            Ok(Some(record)) => record.parent_id.unwrap_or(id),
            Ok(None) => id,
            Err(e) => {
                warn!(stage = "fulltext", error = %e, "record hydration failed; skipping hit");
                continue;
            }
        };

        if !outcome.details.contains_key(&owner) {
            outcome.owner_ids.push(owner);
        }
        let detail = outcome.details.entry(owner).or_default();
        detail.match_count += count;
        let snippet = Snippet {
            record_id: id,
            excerpt,
        };
        match kind {
            RecordKind::Note => detail.note_snippets.push(snippet),
            _ => detail.attachment_snippets.push(snippet),
        }
    }
}

async fn fetch_text(content: &dyn ContentSource, id: RecordId, kind: RecordKind) -> Option<String> {
    let fetched = match kind {
        RecordKind::Note => content.note_html(id).await,
        _ => content.attachment_text(id).await,
    };
    match fetched {
        Ok(text) => text,
        Err(e) => {
            warn!(stage = "fulltext", error = %e, "content retrieval failed; skipping record");
            None
        }
    }
}

/// Operator matching, with the regex compiled once per query.
struct Matcher<'a> {
    operator: FulltextOperator,
    query: &'a str,
    query_lower: String,
    regex: Option<Regex>,
}

impl<'a> Matcher<'a> {
    /// Returns `None` when a regex operator fails to compile.
    fn new(ft: &'a FulltextQuery) -> Option<Self> {
        let regex = match ft.operator {
            FulltextOperator::Regex => match Regex::new(&ft.query) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(stage = "fulltext", error = %e, "invalid fulltext regex; treating as non-matching");
                    return None;
                }
            },
            _ => None,
        };
        Some(Self {
            operator: ft.operator,
            query: &ft.query,
            query_lower: ft.query.to_lowercase(),
            regex,
        })
    }

    /// Byte range of the first match, if any.
    fn first_match(&self, text: &str) -> Option<(usize, usize)> {
        match self.operator {
            FulltextOperator::Contains => find_ci(text, &self.query_lower),
            FulltextOperator::Exact => {
                if text.trim().eq_ignore_ascii_case(self.query.trim()) {
                    Some((0, text.len()))
                } else {
                    None
                }
            }
            FulltextOperator::Regex => self
                .regex
                .as_ref()
                .and_then(|re| re.find(text))
                .map(|m| (m.start(), m.end())),
        }
    }

    fn count_matches(&self, text: &str) -> usize {
        match self.operator {
            FulltextOperator::Contains => {
                if self.query_lower.is_empty() {
                    0
                } else {
                    text.to_lowercase().matches(&self.query_lower).count()
                }
            }
            FulltextOperator::Exact => usize::from(self.first_match(text).is_some()),
            FulltextOperator::Regex => self
                .regex
                .as_ref()
                .map(|re| re.find_iter(text).count())
                .unwrap_or(0),
        }
    }
}

/// First case-insensitive occurrence of `needle_lower` in `haystack`, as a
/// byte range into the original text.
///
/// Lowercasing can change byte lengths (`İ` lowers to a two-char sequence),
/// so the lowered search text is built alongside a map from each of its
/// bytes back to the originating char's offset; the match position is
/// translated through that map instead of being reused directly.
fn find_ci(haystack: &str, needle_lower: &str) -> Option<(usize, usize)> {
    if needle_lower.is_empty() {
        return None;
    }
    let mut lowered = String::with_capacity(haystack.len());
    let mut origin = Vec::with_capacity(haystack.len());
    for (offset, c) in haystack.char_indices() {
        for lc in c.to_lowercase() {
            lowered.push(lc);
            origin.extend(std::iter::repeat(offset).take(lc.len_utf8()));
        }
    }

    let pos = lowered.find(needle_lower)?;
    let start = origin[pos];
    // Last original char touched by the match, extended to its end.
    let last_char_start = origin[pos + needle_lower.len() - 1];
    let end = last_char_start
        + haystack[last_char_start..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(0);
    Some((start, end))
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Extract a snippet around a match: up to [`SNIPPET_CONTEXT`] characters of
/// context on each side, truncated edges wrapped with ellipses.
pub fn extract_snippet(text: &str, match_start: usize, match_len: usize) -> String {
    let match_start = floor_char_boundary(text, match_start);
    let match_end = floor_char_boundary(text, match_start + match_len);

    let mut start = match_start;
    for _ in 0..SNIPPET_CONTEXT {
        if start == 0 {
            break;
        }
        start = floor_char_boundary(text, start - 1);
    }
    let mut end = match_end;
    for _ in 0..SNIPPET_CONTEXT {
        if end >= text.len() {
            break;
        }
        end += 1;
        end = ceil_char_boundary(text, end);
    }

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str(SNIPPET_ELLIPSIS);
    }
    snippet.push_str(&text[start..end]);
    if end < text.len() {
        snippet.push_str(SNIPPET_ELLIPSIS);
    }
    snippet
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Strip HTML tags, decode common entities, and collapse whitespace runs.
/// Offsets for note snippet extraction are computed against this cleaned
/// form, never the raw markup.
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }

    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
