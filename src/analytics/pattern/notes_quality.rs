use super::types::NotesQuality;
use crate::analytics::round1;
use crate::models::enums::PiiRisk;
use crate::models::Log;
use crate::pipeline::safety::patterns::{
    EMAIL_RE, LOOSE_ADDRESS_RE, LOOSE_PERSON_RE, LOOSE_PHONE_RE,
};

pub fn assess_notes_quality(logs: &[Log]) -> NotesQuality {
    if logs.is_empty() {
        return NotesQuality {
            pct_present: 0.0,
            pii_risk: PiiRisk::Low,
        };
    }

    let notes: Vec<&str> = logs.iter().filter_map(Log::trimmed_notes).collect();
    let pct_present = round1(notes.len() as f64 * 100.0 / logs.len() as f64);

    NotesQuality {
        pct_present,
        pii_risk: pii_risk(&notes.join(" ")),
    }
}

/// Heuristic score over concatenated notes: email +2, phone-like digit run
/// +2, street address +2, doctor or relation name +1.
pub fn pii_risk(text: &str) -> PiiRisk {
    let mut score = 0;
    if EMAIL_RE.is_match(text) {
        score += 2;
    }
    if LOOSE_PHONE_RE.is_match(text) {
        score += 2;
    }
    if LOOSE_ADDRESS_RE.is_match(text) {
        score += 2;
    }
    if LOOSE_PERSON_RE.is_match(text) {
        score += 1;
    }

    match score {
        s if s >= 4 => PiiRisk::High,
        s if s >= 2 => PiiRisk::Medium,
        _ => PiiRisk::Low,
    }
}
