//! Compiled PII detectors shared by redaction, validation and the
//! notes-quality heuristic.

use std::sync::LazyLock;

use regex::Regex;

pub(crate) static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}")
        .expect("valid regex")
});

/// US-style phone numbers with optional country code and separators.
pub(crate) static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?(?:\(\d{3}\)|\b\d{3})[-.\s]?\d{3}[-.\s]?\d{4}\b")
        .expect("valid regex")
});

pub(crate) static SSN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid regex"));

pub(crate) static MRN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:MRN|medical\s+record(?:\s+(?:number|no\.?|num|#))?)\s*[:#]?\s*[A-Z0-9][A-Z0-9-]{4,}\b",
    )
    .expect("valid regex")
});

pub(crate) static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\d{1,5}\s+(?:[A-Z][A-Za-z]*\s+){1,3}(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive|Dr|Court|Ct|Way|Place|Pl|Terrace|Circle)\b\.?",
    )
    .expect("valid regex")
});

pub(crate) static ZIP_PLUS_FOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{5}-\d{4}\b").expect("valid regex"));

pub(crate) static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("valid regex"));

pub(crate) static US_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b").expect("valid regex")
});

pub(crate) static LONG_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b",
    )
    .expect("valid regex")
});

/// "Dr. Smith", "Doctor Patel". Case-sensitive so the "my doctor"
/// replacement is never matched again.
pub(crate) static DOCTOR_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Dr\.?|Doctor)\s+[A-Z][A-Za-z'-]+").expect("valid regex")
});

pub(crate) static TITLED_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Mr|Mrs|Ms|Miss|Mx)\.?\s+[A-Z][A-Za-z'-]+").expect("valid regex")
});

/// "husband John", "my sister Maria".
pub(crate) static RELATION_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b((?i:husband|wife|partner|boyfriend|girlfriend|fianc[eé]e?|mother|mom|mum|father|dad|sister|brother|son|daughter|friend|boss|coworker|roommate|aunt|uncle|cousin|grandma|grandpa))\s+[A-Z][a-z'-]+\b",
    )
    .expect("valid regex")
});

pub(crate) static FACILITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:[A-Z][A-Za-z'.]*\s+){1,3}(?:Hospital|Clinic|Medical\s+Center|Health\s+Center|Urgent\s+Care|Pharmacy|Medical\s+Group)\b",
    )
    .expect("valid regex")
});

/// Loose street-address shape used by the notes-quality heuristic.
pub(crate) static LOOSE_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\d{1,5}\s+\w+(?:\s+\w+)?\s+(?:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|court|ct|way)\b",
    )
    .expect("valid regex")
});

/// Loose digit run that looks like a phone number.
pub(crate) static LOOSE_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{3}[-.\s]?\d{3}[-.\s]?\d{4}").expect("valid regex"));

/// Doctor or relation followed by a capitalised name, any casing on the prefix.
pub(crate) static LOOSE_PERSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:(?i:dr\.?|doctor)|(?i:my\s+(?:husband|wife|partner|boyfriend|girlfriend|mother|mom|father|dad|sister|brother|friend)))\s+[A-Z][a-z]+",
    )
    .expect("valid regex")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_variants_match() {
        for phone in ["555-123-4567", "(555) 123-4567", "555.123.4567", "+1 555 123 4567", "5551234567"] {
            assert!(PHONE_RE.is_match(phone), "{phone} should match");
        }
    }

    #[test]
    fn phone_does_not_match_dates_or_zip() {
        assert!(!PHONE_RE.is_match("2026-01-15"));
        assert!(!PHONE_RE.is_match("12345-6789"));
        assert!(!PHONE_RE.is_match("bp 120/80"));
    }

    #[test]
    fn ssn_and_zip_are_distinct() {
        assert!(SSN_RE.is_match("123-45-6789"));
        assert!(!SSN_RE.is_match("12345-6789"));
        assert!(ZIP_PLUS_FOUR_RE.is_match("12345-6789"));
    }

    #[test]
    fn doctor_pattern_is_case_sensitive_on_prefix() {
        assert!(DOCTOR_NAME_RE.is_match("saw Dr. Smith today"));
        assert!(DOCTOR_NAME_RE.is_match("Doctor Patel said"));
        assert!(!DOCTOR_NAME_RE.is_match("my doctor Said so"));
    }

    #[test]
    fn loose_person_pattern_ignores_prefix_case() {
        assert!(LOOSE_PERSON_RE.is_match("told my Husband John"));
        assert!(LOOSE_PERSON_RE.is_match("dr Jones"));
    }
}
