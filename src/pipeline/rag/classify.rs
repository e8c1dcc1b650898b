use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::enums::ChatIntent;

pub const DEFAULT_REVIEW_DAYS: u32 = 3;
pub const DEFAULT_PATTERN_DAYS: u32 = 7;
pub const DEFAULT_COMPARISON_DAYS: u32 = 7;

/// One classification rule: any matching pattern selects the intent.
struct IntentRule {
    intent: ChatIntent,
    patterns: Vec<Regex>,
}

fn rule(intent: ChatIntent, patterns: &[&str]) -> IntentRule {
    IntentRule {
        intent,
        patterns: patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("valid regex"))
            .collect(),
    }
}

/// Rules in priority order. `UnderstandPatterns` precedes `ReviewRecent`
/// because the "Understand my symptom patterns" button label also matches
/// the broader review phrasings.
static INTENT_RULES: LazyLock<Vec<IntentRule>> = LazyLock::new(|| {
    vec![
        rule(
            ChatIntent::UnderstandPatterns,
            &[
                r"\bunderstand\s+(?:my\s+)?(?:symptom\s+)?patterns?\b",
                r"\bhelp\s+me\s+understand\b",
                r"\bwhat\s+(?:is|are)\s+(?:causing|driving|behind)\b",
                r"\bwhy\s+(?:do|does|am|is)\s+(?:i|my)\b",
                r"\b(?:link|connection|correlation|relationship)s?\s+between\b",
                r"\b(?:is|are)\s+(?:my\s+)?\w+\s+(?:linked|related|connected)\s+to\b",
                r"\b\d+\s+logged?\s+days?\b",
                r"\bexplain\s+(?:my\s+)?(?:symptoms?|patterns?|trends?)\b",
            ],
        ),
        rule(
            ChatIntent::ReviewRecent,
            &[
                r"\b(?:review|summari[sz]e|analy[sz]e|recap|go\s+over)\s+(?:my\s+)?(?:recent\s+|latest\s+)?(?:symptoms?|logs?|entries|data)\b",
                r"\bwhat\s+patterns\s+do\s+you\s+see\b",
                r"\b(?:last|past)\s+\d+\s+(?:days?|hours?)\b",
                r"\bhow\s+(?:have\s+i\s+been|was\s+my\s+week|am\s+i\s+doing)\b",
                r"\b(?:recent|latest)\s+(?:symptoms?|logs?|entries)\b",
                r"\breview\s+my\b",
                r"\bsummary\s+of\s+my\b",
            ],
        ),
        rule(
            ChatIntent::ComparePeriod,
            &[
                r"\bcompare\b",
                r"\bcomparison\b",
                r"\b(?:vs\.?|versus)\b",
                r"\b(?:better|worse)\s+than\s+(?:last|before|usual|previous)\b",
                r"\b(?:full|entire|whole|all)\s+(?:of\s+my\s+)?history\b",
                r"\bchanged?\s+(?:since|from|over)\b",
                r"\bdifferent\s+from\b",
            ],
        ),
        rule(
            ChatIntent::AddDetail,
            &[
                r"\b(?:add|adding)\s+(?:a\s+|some\s+)?(?:details?|notes?|context|info(?:rmation)?)\b",
                r"\bi\s+(?:forgot|forget)\s+to\s+(?:log|mention|add)\b",
                r"\b(?:also|additionally)\s+(?:had|have|felt|noticed|took)\b",
                r"\bupdate\s+(?:my\s+)?(?:log|entry|notes?)\b",
                r"\bi\s+want\s+to\s+(?:add|mention|note)\b",
                r"\bfor\s+context\b",
            ],
        ),
    ]
});

static REVIEW_DAYS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)last\s+(\d+)\s+days?").expect("valid regex"));

static PATTERN_DAYS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+logged?\s+days?").expect("valid regex"));

static FULL_HISTORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:full|entire|all|whole)\s+(?:of\s+my\s+)?history\b").expect("valid regex")
});

static ANY_DAYS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+days?").expect("valid regex"));

/// Window a comparison turn measures against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonPeriod {
    Full,
    Days(u32),
}

/// Classify a chat message. The first matching rule wins.
pub fn classify_intent(message: &str) -> ChatIntent {
    INTENT_RULES
        .iter()
        .find(|r| r.patterns.iter().any(|p| p.is_match(message)))
        .map_or(ChatIntent::General, |r| r.intent)
}

/// "last N days" in a review request, else the default.
pub fn extract_days_from_review_request(message: &str) -> u32 {
    review_days_or(message, DEFAULT_REVIEW_DAYS)
}

/// "N logged days" in a pattern request, else the default.
pub fn extract_days_for_understand_patterns(message: &str) -> u32 {
    pattern_days_or(message, DEFAULT_PATTERN_DAYS)
}

pub fn extract_comparison_period(message: &str) -> ComparisonPeriod {
    comparison_period_or(message, DEFAULT_COMPARISON_DAYS)
}

pub fn review_days_or(message: &str, default: u32) -> u32 {
    capture_days(&REVIEW_DAYS_RE, message).unwrap_or(default)
}

pub fn pattern_days_or(message: &str, default: u32) -> u32 {
    capture_days(&PATTERN_DAYS_RE, message).unwrap_or(default)
}

pub fn comparison_period_or(message: &str, default_days: u32) -> ComparisonPeriod {
    if FULL_HISTORY_RE.is_match(message) {
        return ComparisonPeriod::Full;
    }
    ComparisonPeriod::Days(capture_days(&ANY_DAYS_RE, message).unwrap_or(default_days))
}

fn capture_days(re: &Regex, message: &str) -> Option<u32> {
    re.captures(message)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|&d| d > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_label_is_understand_patterns() {
        assert_eq!(
            classify_intent("Understand my symptom patterns"),
            ChatIntent::UnderstandPatterns
        );
    }

    #[test]
    fn review_with_day_count() {
        let msg = "review my last 7 days";
        assert_eq!(classify_intent(msg), ChatIntent::ReviewRecent);
        assert_eq!(extract_days_from_review_request(msg), 7);
    }

    #[test]
    fn review_phrasings() {
        for msg in [
            "Can you summarize my recent symptoms?",
            "What patterns do you see?",
            "analyze my logs",
            "how was my week",
            "past 48 hours please",
        ] {
            assert_eq!(classify_intent(msg), ChatIntent::ReviewRecent, "{msg}");
        }
    }

    #[test]
    fn compare_full_history() {
        let msg = "compare to full history";
        assert_eq!(classify_intent(msg), ChatIntent::ComparePeriod);
        assert_eq!(extract_comparison_period(msg), ComparisonPeriod::Full);
    }

    #[test]
    fn comparison_days_and_default() {
        assert_eq!(
            extract_comparison_period("compare this with the previous 14 days"),
            ComparisonPeriod::Days(14)
        );
        assert_eq!(extract_comparison_period("compare please"), ComparisonPeriod::Days(7));
    }

    #[test]
    fn add_detail_phrasings() {
        for msg in [
            "I forgot to log my headache",
            "I want to add some context",
            "also had nausea this morning",
        ] {
            assert_eq!(classify_intent(msg), ChatIntent::AddDetail, "{msg}");
        }
    }

    #[test]
    fn understand_with_logged_days() {
        let msg = "look at my 10 logged days";
        assert_eq!(classify_intent(msg), ChatIntent::UnderstandPatterns);
        assert_eq!(extract_days_for_understand_patterns(msg), 10);
        assert_eq!(extract_days_for_understand_patterns("why do I get cramps"), 7);
    }

    #[test]
    fn everything_else_is_general() {
        assert_eq!(classify_intent("hello there"), ChatIntent::General);
        assert_eq!(classify_intent(""), ChatIntent::General);
    }

    #[test]
    fn extraction_defaults() {
        assert_eq!(extract_days_from_review_request("review my symptoms"), 3);
        assert_eq!(extract_days_from_review_request("last 0 days"), 3);
        assert_eq!(extract_days_from_review_request("last 1 day"), 1);
    }

    #[test]
    fn configured_defaults() {
        assert_eq!(review_days_or("review my symptoms", 5), 5);
        assert_eq!(review_days_or("review my last 2 days", 5), 2);
        assert_eq!(pattern_days_or("why do I get cramps", 14), 14);
        assert_eq!(comparison_period_or("compare please", 30), ComparisonPeriod::Days(30));
        assert_eq!(comparison_period_or("compare my entire history", 30), ComparisonPeriod::Full);
    }

    #[test]
    fn every_rule_compiles() {
        assert_eq!(INTENT_RULES.len(), 4);
        assert!(INTENT_RULES.iter().all(|r| !r.patterns.is_empty()));
    }
}
