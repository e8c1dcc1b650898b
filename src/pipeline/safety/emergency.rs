use std::sync::LazyLock;

use regex::Regex;

/// A compiled danger phrase with a short label for logging.
struct EmergencyPattern {
    regex: Regex,
    label: &'static str,
}

static EMERGENCY_PATTERNS: LazyLock<Vec<EmergencyPattern>> = LazyLock::new(|| {
    vec![
        pattern(r"(?i)\bchest\s+(?:pain|pressure|tightness)\b", "chest pain"),
        pattern(
            r"(?i)\b(?:can'?t|cannot|can\s+not|unable\s+to|struggling\s+to)\s+breathe?\b|\b(?:trouble|difficulty)\s+breathing\b",
            "breathing difficulty",
        ),
        pattern(
            r"(?i)\b(?:severe|heavy|uncontrolled|profuse)\s+bleeding\b|\bbleeding\s+(?:heavily|won'?t\s+stop)\b|\bsoak(?:ing|ed)?\s+(?:a|one|through)\s+(?:pad|tampon)s?\s+(?:an|every|each)\s+hour\b",
            "severe bleeding",
        ),
        pattern(
            r"(?i)\bsuicid(?:e|al)\b|\bkill(?:ing)?\s+myself\b|\bend\s+my\s+life\b|\bself[-\s]?harm\b",
            "suicidal ideation",
        ),
        pattern(
            r"(?i)\bunconscious\b|\bpass(?:ed|ing)?\s+out\b|\blost\s+consciousness\b|\bunresponsive\b",
            "unconsciousness",
        ),
        pattern(r"(?i)\bseizures?\b|\bconvuls(?:ion|ions|ing)\b", "seizure"),
        pattern(r"(?i)\bstroke\b|\bface\s+(?:is\s+)?droop(?:ing|s)?\b|\bslurred\s+speech\b", "stroke"),
        pattern(r"(?i)\bheart\s+attack\b", "heart attack"),
        pattern(r"(?i)\boverdos(?:e|ed|ing)\b|\btook\s+too\s+many\s+pills\b", "overdose"),
        pattern(
            r"(?i)\banaphyla(?:xis|ctic)\b|\b(?:throat|tongue)\s+(?:is\s+)?(?:swelling|closing)\b",
            "anaphylaxis",
        ),
        pattern(r"(?i)\bectopic\b", "ectopic pregnancy"),
        pattern(r"(?i)\bmiscarr(?:iage|ying|ied)\b", "miscarriage"),
    ]
});

fn pattern(re: &str, label: &'static str) -> EmergencyPattern {
    EmergencyPattern {
        regex: Regex::new(re).expect("valid regex"),
        label,
    }
}

/// Whether the text mentions any danger phrase that warrants an emergency
/// alert. Performs no redaction.
pub fn detect_emergency_symptoms(text: &str) -> bool {
    EMERGENCY_PATTERNS.iter().any(|p| p.regex.is_match(text))
}

/// Labels of every danger phrase category present, in list order.
pub fn emergency_labels(text: &str) -> Vec<&'static str> {
    EMERGENCY_PATTERNS
        .iter()
        .filter(|p| p.regex.is_match(text))
        .map(|p| p.label)
        .collect()
}
