use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::types::Citation;
use crate::models::KbDocument;

/// Inline evidence marker, e.g. `[KB:kb-cramps]`.
static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s?\[KB:\s*([^\]\s]+)\s*\]").expect("valid regex"));

/// Ids cited in a response, in first-cited order, without duplicates.
pub fn extract_cited_ids(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for cap in CITATION_RE.captures_iter(text) {
        let id = &cap[1];
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Remove markers whose id is not in `allowed`; keep the rest verbatim.
pub fn strip_unknown_citations(text: &str, allowed: &[String]) -> String {
    CITATION_RE
        .replace_all(text, |caps: &Captures<'_>| {
            if allowed.iter().any(|id| id == &caps[1]) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Remove every marker for display.
pub fn clean_citations_for_display(text: &str) -> String {
    CITATION_RE.replace_all(text, "").into_owned()
}

/// Map evidence ids back to knowledge-base documents by exact id match.
/// Ids with no matching document are dropped.
pub fn resolve_citations(ids: &[String], docs: &[KbDocument]) -> Vec<Citation> {
    ids.iter()
        .filter_map(|id| match docs.iter().find(|d| &d.id == id) {
            Some(doc) => Some(Citation::from(doc)),
            None => {
                tracing::warn!(document_id = %id, "Citation references unknown document, removed");
                None
            }
        })
        .collect()
}
