use chrono::NaiveDate;

use super::types::RagEvidence;
use crate::analytics::pattern::{LabelCount, LabelSummary};
use crate::analytics::{LogStatistics, PatternCard};
use crate::models::enums::{ChatIntent, MessageRole};
use crate::models::{Log, Message};
use crate::pipeline::safety::redact_pii_at;

pub const CHAT_SYSTEM_PROMPT: &str = r#"You are Cadence, a private assistant that helps a person make sense of their own symptom logs. You are NOT a doctor.

ABSOLUTE RULES:
1. Ground every statement in the data sections supplied with the message.
2. When PRECOMPUTED_STATISTICS is present, it is the only source for counts, averages and severities in a review. Do not recompute them and NEVER ask the user for more information or for more logs.
3. PATTERN_CARD describes the long-horizon picture. Use it for trend and pattern questions, not for summarizing the last few days.
4. NEVER diagnose. NEVER say "you have [condition]". Describe what the logs show and suggest discussing it with a clinician.
5. Cite evidence only when it directly supports a sentence, using [KB:<id>] with an id from the EVIDENCE section. NEVER invent ids. If EVIDENCE says none is supplied, do not cite anything.
6. Use plain, warm language. Keep answers short.
7. If a red flag appears in the data, mention it calmly and suggest contacting a healthcare provider."#;

/// Everything one chat turn hands to the generator.
pub struct PromptInput<'a> {
    pub user_message: &'a str,
    pub intent: ChatIntent,
    pub card: &'a PatternCard,
    /// Individual entries to render, if the turn needs them.
    pub logs: Option<&'a [Log]>,
    pub stats: Option<&'a LogStatistics>,
    /// Empty when evidence was withheld for low relevance.
    pub evidence: &'a [RagEvidence],
    /// Already windowed by the caller.
    pub history: &'a [Message],
    pub today: NaiveDate,
}

/// Assemble the user-turn prompt. Free text (notes, history, the message
/// itself) and user-entered labels (symptom types, tags, triggers) are
/// redacted before they are embedded.
pub fn build_chat_prompt(input: &PromptInput<'_>) -> String {
    let mut prompt = String::new();

    if !input.history.is_empty() {
        prompt.push_str("<CONVERSATION_HISTORY>\n");
        for msg in input.history {
            let role = match msg.role {
                MessageRole::User => "User",
                MessageRole::Assistant => "Cadence",
            };
            prompt.push_str(&format!("{role}: {}\n", redact_pii_at(&msg.content, input.today)));
        }
        prompt.push_str("</CONVERSATION_HISTORY>\n\n");
    }

    prompt.push_str("<PATTERN_CARD>\n");
    if input.card.is_empty() {
        prompt.push_str("No symptoms have been logged yet.\n");
    } else {
        prompt.push_str(&to_json(&redact_card(input.card, input.today)));
        prompt.push('\n');
    }
    prompt.push_str("</PATTERN_CARD>\n\n");

    if let Some(logs) = input.logs {
        prompt.push_str("<RECENT_LOGS>\n");
        prompt.push_str(&format_logs(logs, input.today));
        prompt.push_str("</RECENT_LOGS>\n\n");
    }

    if let Some(stats) = input.stats {
        prompt.push_str("<PRECOMPUTED_STATISTICS>\n");
        prompt.push_str(&to_json(&redact_stats(stats, input.today)));
        prompt.push_str("\n</PRECOMPUTED_STATISTICS>\n\n");
    }

    prompt.push_str("<EVIDENCE>\n");
    if input.evidence.is_empty() {
        prompt.push_str("None supplied. Do not cite sources.\n");
    } else {
        for ev in input.evidence {
            prompt.push_str(&format!(
                "[KB:{}] {}\n  Excerpt: {}\n  Source: {}\n",
                ev.id, ev.claim, ev.excerpt, ev.source
            ));
        }
    }
    prompt.push_str("</EVIDENCE>\n\n");

    prompt.push_str(&format!(
        "User message: {}\n\n",
        redact_pii_at(input.user_message, input.today)
    ));
    prompt.push_str(intent_instruction(input.intent, input.stats.is_some()));

    prompt
}

fn intent_instruction(intent: ChatIntent, has_stats: bool) -> &'static str {
    match intent {
        ChatIntent::ReviewRecent if has_stats => {
            "Summarize the recent window using ONLY PRECOMPUTED_STATISTICS and RECENT_LOGS. Do not ask for more information."
        }
        ChatIntent::ReviewRecent => {
            "Summarize the recent logs. If there are none, say so plainly."
        }
        ChatIntent::UnderstandPatterns => {
            "Describe the patterns visible in PATTERN_CARD and RECENT_LOGS, including any cycle-phase association."
        }
        ChatIntent::ComparePeriod => {
            "Compare the recent window in PRECOMPUTED_STATISTICS with the longer history in PATTERN_CARD."
        }
        ChatIntent::AddDetail => {
            "Acknowledge the added detail briefly and relate it to the existing data. Do not invent new entries."
        }
        ChatIntent::General => "Answer the message using the data above where relevant.",
    }
}

/// Copy of the card with every user-entered label redacted.
fn redact_card(card: &PatternCard, today: NaiveDate) -> PatternCard {
    let mut card = card.clone();
    for symptom in &mut card.top_symptoms {
        symptom.name = redact_pii_at(&symptom.name, today);
    }
    for bucket in card.cycle_association.by_phase.values_mut() {
        redact_counts(&mut bucket.top_symptoms, today);
    }
    redact_summary(&mut card.context_tags, today);
    redact_summary(&mut card.triggers, today);
    for bullet in &mut card.narrative_bullets {
        *bullet = redact_pii_at(bullet, today);
    }
    card
}

fn redact_summary(summary: &mut LabelSummary, today: NaiveDate) {
    redact_counts(&mut summary.top, today);
    for link in &mut summary.symptom_links {
        link.label = redact_pii_at(&link.label, today);
        link.symptom = redact_pii_at(&link.symptom, today);
    }
}

fn redact_counts(counts: &mut [LabelCount], today: NaiveDate) {
    for count in counts {
        count.name = redact_pii_at(&count.name, today);
    }
}

fn redact_stats(stats: &LogStatistics, today: NaiveDate) -> LogStatistics {
    let mut stats = stats.clone();
    for stat in &mut stats.symptom_stats {
        stat.symptom_type = redact_pii_at(&stat.symptom_type, today);
    }
    if let Some(name) = stats.max_severity_symptom.as_mut() {
        *name = redact_pii_at(name, today);
    }
    stats
}

fn redact_labels(labels: &[String], today: NaiveDate) -> String {
    labels
        .iter()
        .map(|l| redact_pii_at(l, today))
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to serialize prompt section");
        String::from("{}")
    })
}

/// Entries grouped by calendar day, newest day first and newest entry
/// first within a day.
pub fn format_logs(logs: &[Log], today: NaiveDate) -> String {
    if logs.is_empty() {
        return "No entries in this window.\n".to_string();
    }

    let mut ordered: Vec<&Log> = logs.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut out = String::new();
    let mut current: Option<NaiveDate> = None;
    for log in ordered {
        let date = log.date();
        if current != Some(date) {
            out.push_str(&format!("{}:\n", day_label(date, today)));
            current = Some(date);
        }
        out.push_str(&format!("- {}\n", format_entry(log, today)));
    }
    out
}

fn format_entry(log: &Log, today: NaiveDate) -> String {
    let severity = log.clamped_severity();
    let mut entry = format!(
        "{} {} ({}/10)",
        severity_adjective(severity),
        redact_pii_at(&log.symptom_type, today),
        severity
    );
    if let Some(phase) = log.cycle_phase.filter(|p| p.is_tracked()) {
        entry.push_str(&format!(", {phase} phase"));
    }
    if let Some(notes) = log.trimmed_notes() {
        entry.push_str(&format!("; notes: {}", redact_pii_at(notes, today)));
    }
    if !log.triggers.is_empty() {
        entry.push_str(&format!("; triggers: {}", redact_labels(&log.triggers, today)));
    }
    if !log.tags.is_empty() {
        entry.push_str(&format!("; tags: {}", redact_labels(&log.tags, today)));
    }
    if let Some(mins) = log.duration_mins {
        entry.push_str(&format!("; lasted {}", format_duration(mins)));
    }
    entry
}

pub fn severity_adjective(severity: i32) -> &'static str {
    match severity {
        i32::MIN..=0 => "No",
        1..=3 => "Mild",
        4..=6 => "Moderate",
        7..=8 => "Severe",
        _ => "Very severe",
    }
}

pub fn format_duration(mins: u32) -> String {
    match (mins / 60, mins % 60) {
        (0, m) => format!("{m} min"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    match (today - date).num_days() {
        d if d <= 0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        d => format!("{d} days ago"),
    }
}
