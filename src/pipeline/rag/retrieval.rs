use std::sync::LazyLock;

use regex::Regex;

use super::synonyms::synonyms_for;
use super::types::{RagEvidence, RetrievedChunk, Scored};
use crate::analytics::PatternCard;
use crate::models::KbDocument;

pub const DEFAULT_TOP_N: usize = 8;
pub const DEFAULT_RELEVANCE_THRESHOLD: u32 = 2;

const TITLE_WEIGHT: u32 = 3;
const TAG_WEIGHT: u32 = 2;
const BODY_WEIGHT: u32 = 1;
const EXCERPT_SENTENCES: usize = 4;

static SENTENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+(?:[.!?]+|$)").expect("valid regex"));

/// Lower-case, split on whitespace, and add every synonym of every term.
/// Edge punctuation is trimmed. Order is first appearance; duplicates are
/// dropped.
pub fn expand_query(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    let mut push = |t: &str| {
        if !terms.iter().any(|existing| existing == t) {
            terms.push(t.to_string());
        }
    };

    let lower = text.to_lowercase();
    for raw in lower.split_whitespace() {
        let term = raw.trim_matches(|c: char| !c.is_alphanumeric());
        if term.is_empty() {
            continue;
        }
        push(term);
        for synonym in synonyms_for(term) {
            push(synonym);
        }
    }
    terms
}

/// Weighted keyword score: title hits x3, overlapping tags x2, body hits x1.
pub fn score_document(doc: &KbDocument, terms: &[String]) -> u32 {
    let title = doc.title.to_lowercase();
    let body = doc.text.to_lowercase();
    let tags: Vec<String> = doc.tags.iter().map(|t| t.to_lowercase()).collect();

    terms
        .iter()
        .map(|term| {
            let title_hits = title.matches(term.as_str()).count() as u32;
            let tag_hits = tags
                .iter()
                .filter(|tag| {
                    !tag.is_empty() && (tag.contains(term.as_str()) || term.contains(tag.as_str()))
                })
                .count() as u32;
            let body_hits = body.matches(term.as_str()).count() as u32;
            title_hits * TITLE_WEIGHT + tag_hits * TAG_WEIGHT + body_hits * BODY_WEIGHT
        })
        .sum()
}

/// Rank documents against a free-text query. Zero-score documents are
/// dropped; ties keep document order.
pub fn retrieve_kb_documents(query: &str, docs: &[KbDocument], top_n: usize) -> Vec<RetrievedChunk> {
    let terms = expand_query(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(u32, &KbDocument)> = docs
        .iter()
        .map(|doc| (score_document(doc, &terms), doc))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let chunks: Vec<RetrievedChunk> = scored
        .into_iter()
        .take(top_n)
        .map(|(score, doc)| RetrievedChunk::from_document(doc, score))
        .collect();

    tracing::debug!(
        terms = terms.len(),
        candidates = docs.len(),
        returned = chunks.len(),
        top_score = chunks.first().map_or(0, |c| c.score),
        "Knowledge base retrieval"
    );

    chunks
}

/// The user message enriched with the card's top symptoms, top tags and
/// most severe phase.
pub fn build_enhanced_query(user_message: &str, card: &PatternCard) -> String {
    let mut parts: Vec<&str> = vec![user_message];
    parts.extend(card.top_symptom_names(3));
    parts.extend(card.top_tag_names(3));
    if let Some(phase) = card.cycle_association.highest_severity_phase {
        parts.push(phase.as_str());
    }
    parts.join(" ")
}

pub fn retrieve_evidence(
    user_message: &str,
    card: &PatternCard,
    docs: &[KbDocument],
    top_n: usize,
) -> Vec<RagEvidence> {
    let query = build_enhanced_query(user_message, card);
    retrieve_kb_documents(&query, docs, top_n)
        .iter()
        .map(to_evidence)
        .collect()
}

pub fn to_evidence(chunk: &RetrievedChunk) -> RagEvidence {
    let sentences = split_sentences(&chunk.text);
    let claim = match sentences.first() {
        Some(first) => format!("{}: {}", chunk.title, first),
        None => chunk.title.clone(),
    };
    RagEvidence {
        id: chunk.id.clone(),
        title: chunk.title.clone(),
        source: chunk.source.clone(),
        url: chunk.url.clone(),
        claim,
        excerpt: sentences
            .iter()
            .take(EXCERPT_SENTENCES)
            .copied()
            .collect::<Vec<_>>()
            .join(" "),
        score: chunk.score,
    }
}

/// True when at least one result reaches `threshold`.
pub fn has_sufficient_relevance<T: Scored>(items: &[T], threshold: u32) -> bool {
    items.iter().any(|i| i.score() >= threshold)
}

/// Sentences with their terminal punctuation kept.
fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::build_pattern_card;
    use crate::models::enums::CyclePhase;
    use crate::models::Log;
    use chrono::NaiveDate;

    fn doc(id: &str, title: &str, tags: &[&str], text: &str) -> KbDocument {
        KbDocument {
            id: id.into(),
            title: title.into(),
            source: "NHS".into(),
            url: format!("https://example.org/{id}"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            text: text.into(),
        }
    }

    fn corpus() -> Vec<KbDocument> {
        vec![
            doc(
                "kb-cycle",
                "Understanding the menstrual cycle",
                &["menstrual", "cycle"],
                "The menstrual cycle averages 28 days. Length varies between people! \
                 Tracking helps spot changes. Hormones shift across phases. Ovulation happens mid-cycle.",
            ),
            doc(
                "kb-migraine",
                "Migraine and hormones",
                &["headache"],
                "Some migraines are linked to falling estrogen. Keeping a diary can help.",
            ),
            doc("kb-uti", "Urinary tract infections", &["uti"], "UTIs cause burning when peeing."),
        ]
    }

    #[test]
    fn expansion_lowercases_and_adds_synonyms() {
        let terms = expand_query("PERIOD pain?");
        assert_eq!(terms[0], "period");
        assert!(terms.contains(&"menstrual".to_string()));
        assert!(terms.contains(&"pain".to_string()));
        assert!(terms.contains(&"ache".to_string()));
    }

    #[test]
    fn expansion_keeps_every_term_once() {
        let terms = expand_query("what about my cramps and cramps");
        assert_eq!(terms.iter().filter(|t| *t == "cramps").count(), 1);
        assert!(terms.contains(&"what".to_string()));
        assert!(terms.contains(&"my".to_string()));
    }

    #[test]
    fn short_and_common_words_are_scored() {
        let terms = expand_query("my last 7 days feel off");
        for word in ["my", "last", "7", "days", "feel", "off"] {
            assert!(terms.contains(&word.to_string()), "missing {word}");
        }
        assert_eq!(expand_query("is it ok"), vec!["is", "it", "ok"]);
        assert!(expand_query(" ?! ").is_empty());

        let d = doc("d", "Feeling tired lately", &[], "Tiredness over days.");
        // "feeling" in the title x3, "days" in the body x1.
        assert!(score_document(&d, &expand_query("feeling days")) >= 4);
    }

    #[test]
    fn synonym_expansion_finds_menstrual_docs() {
        let chunks = retrieve_kb_documents("period", &corpus(), DEFAULT_TOP_N);
        assert_eq!(chunks[0].id, "kb-cycle");
        assert!(!corpus()[0].text.to_lowercase().contains("period"));
    }

    #[test]
    fn scoring_weights() {
        let d = doc("d", "Cramps", &["cramps relief"], "cramps cramps");
        // "cramps": title 1x3 + tag 1x2 + body 2x1 = 7.
        assert_eq!(score_document(&d, &["cramps".to_string()]), 7);
        // Tag shorter than term still counts.
        let d = doc("d", "", &["cramp"], "");
        assert_eq!(score_document(&d, &["cramping".to_string()]), 2);
    }

    #[test]
    fn zero_scores_are_never_returned() {
        let chunks = retrieve_kb_documents("giraffe zebra", &corpus(), DEFAULT_TOP_N);
        assert!(chunks.is_empty());
        let chunks = retrieve_kb_documents("migraine", &corpus(), DEFAULT_TOP_N);
        assert!(chunks.iter().all(|c| c.score > 0));
        assert!(chunks.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn top_n_truncates() {
        let chunks = retrieve_kb_documents("cycle hormones urinary", &corpus(), 1);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn evidence_excerpt_and_claim() {
        let chunk = RetrievedChunk::from_document(&corpus()[0], 9);
        let ev = to_evidence(&chunk);
        assert_eq!(
            ev.claim,
            "Understanding the menstrual cycle: The menstrual cycle averages 28 days."
        );
        assert_eq!(
            ev.excerpt,
            "The menstrual cycle averages 28 days. Length varies between people! \
             Tracking helps spot changes. Hormones shift across phases."
        );
        assert_eq!(ev.score, 9);
    }

    #[test]
    fn enhanced_query_uses_card_highlights() {
        let mut log = Log::new(
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap().and_hms_opt(9, 0, 0).unwrap(),
            "Headache",
            6,
        );
        log.tags = vec!["screen time".into()];
        log.cycle_phase = Some(CyclePhase::Luteal);
        let card = build_pattern_card(&[log], None);

        let query = build_enhanced_query("why now?", &card);
        assert_eq!(query, "why now? Headache screen time luteal");

        let evidence = retrieve_evidence("why now?", &card, &corpus(), DEFAULT_TOP_N);
        assert_eq!(evidence[0].id, "kb-migraine");
    }

    #[test]
    fn relevance_threshold() {
        let mut chunk = RetrievedChunk::from_document(&corpus()[2], 1);
        assert!(!has_sufficient_relevance(&[chunk.clone()], DEFAULT_RELEVANCE_THRESHOLD));
        chunk.score = 2;
        assert!(has_sufficient_relevance(&[chunk], DEFAULT_RELEVANCE_THRESHOLD));
        assert!(!has_sufficient_relevance::<RetrievedChunk>(&[], DEFAULT_RELEVANCE_THRESHOLD));
    }
}
