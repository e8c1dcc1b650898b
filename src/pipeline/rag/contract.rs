//! Post-hoc enforcement of the output contract encoded in the system prompt.
//!
//! A free-text instruction cannot bind the generator, so every response is
//! checked against the same rules before it is shown.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::citation::extract_cited_ids;
use crate::analytics::LogStatistics;

/// What the generator was given for this turn.
#[derive(Debug, Clone, Copy)]
pub struct ContractContext<'a> {
    pub stats_supplied: bool,
    /// Exact ids of the evidence entries placed in the prompt.
    pub evidence_ids: &'a [String],
    pub evidence_withheld: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContractViolation {
    /// Asked the user for more data although statistics were supplied.
    InformationRequest,
    /// Cited an id that was not in the evidence list.
    UnknownCitation { id: String },
    /// Cited anything while evidence was withheld.
    CitationWithoutEvidence,
    DiagnosticLanguage,
}

impl ContractViolation {
    /// Instruction appended to the prompt when regenerating.
    pub fn correction(&self) -> &'static str {
        match self {
            ContractViolation::InformationRequest => {
                "Do not ask the user for more information; the statistics provided are complete."
            }
            ContractViolation::UnknownCitation { .. } => {
                "Only cite ids listed in the EVIDENCE section."
            }
            ContractViolation::CitationWithoutEvidence => {
                "No evidence was supplied; remove all [KB:...] citations."
            }
            ContractViolation::DiagnosticLanguage => {
                "Do not diagnose; describe what the logs show instead."
            }
        }
    }
}

static INFORMATION_REQUEST_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(?:could|can|would)\s+you\s+(?:please\s+)?(?:tell|share|provide|give|send|log)\b",
        r"(?i)\bplease\s+(?:provide|share|tell\s+me|log|send)\b",
        r"(?i)\bi\s+(?:would\s+)?need\s+(?:more|additional|some)\s+(?:information|details|data|logs)\b",
        r"(?i)\b(?:do|did)\s+you\s+have\s+(?:any\s+)?(?:more|other|additional)\s+(?:logs|data|entries|details)\b",
        r"(?i)\bwithout\s+more\s+(?:information|data|logs)\b",
        r"(?i)\bif\s+you\s+(?:could|can)\s+(?:share|provide|log)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static DIAGNOSTIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\byou\s+(?:likely|probably|definitely|clearly|possibly)\s+have\b",
        r"(?i)\bthis\s+(?:means|confirms|indicates|proves)\s+(?:that\s+)?you\s+have\b",
        r"(?i)\byou\s+(?:are|have\s+been)\s+diagnosed\b",
        r"(?i)\byour\s+diagnosis\s+is\b",
        r"(?i)\byou\s+(?:have|are\s+suffering\s+from|suffer\s+from)\s+(?:an?\s+)?(?:endometriosis|pcos|polycystic|pmdd|adenomyosis|fibroids|infection|uti|cancer|anemia|anaemia|thyroid\s+disease|depression|anxiety\s+disorder)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Every contract rule the response breaks, in a fixed order.
pub fn validate_response(text: &str, ctx: &ContractContext<'_>) -> Vec<ContractViolation> {
    let mut violations = Vec::new();

    if ctx.stats_supplied && INFORMATION_REQUEST_PATTERNS.iter().any(|p| p.is_match(text)) {
        violations.push(ContractViolation::InformationRequest);
    }

    let cited = extract_cited_ids(text);
    if ctx.evidence_withheld && !cited.is_empty() {
        violations.push(ContractViolation::CitationWithoutEvidence);
    } else {
        for id in cited {
            if !ctx.evidence_ids.contains(&id) {
                violations.push(ContractViolation::UnknownCitation { id });
            }
        }
    }

    if DIAGNOSTIC_PATTERNS.iter().any(|p| p.is_match(text)) {
        violations.push(ContractViolation::DiagnosticLanguage);
    }

    violations
}

/// Deterministic review summary built straight from the statistics. Used
/// when the generator keeps breaking the contract on a review turn.
pub fn fallback_review_summary(stats: &LogStatistics) -> String {
    if stats.is_empty() {
        return "There are no logged symptoms in this window yet.".to_string();
    }

    let days = stats.total_days;
    let entries = stats.total_logs();
    let mut lines = vec![format!(
        "Here is a summary of your last {days} logged {} ({entries} {}):",
        if days == 1 { "day" } else { "days" },
        if entries == 1 { "entry" } else { "entries" },
    )];

    for s in &stats.symptom_stats {
        let range = if s.min_severity == s.max_severity {
            format!("severity {}/10", s.max_severity)
        } else {
            format!(
                "average severity {}/10, ranging from {} to {}",
                s.avg_severity, s.min_severity, s.max_severity
            )
        };
        lines.push(format!(
            "- {}: {} {}, {range}.",
            s.symptom_type,
            s.count,
            if s.count == 1 { "entry" } else { "entries" },
        ));
    }

    if let Some(symptom) = &stats.max_severity_symptom {
        lines.push(format!(
            "The highest severity logged was {}/10 ({symptom}).",
            stats.max_severity_overall
        ));
    }
    if let Some(phase) = stats.phase_with_max_severity {
        lines.push(format!(
            "Across symptoms, severity was highest on average during the {phase} phase."
        ));
    }

    lines.join("\n")
}
