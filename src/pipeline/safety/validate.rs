use serde::{Deserialize, Serialize};

use super::patterns::{
    ADDRESS_RE, DOCTOR_NAME_RE, EMAIL_RE, MRN_RE, PHONE_RE, SSN_RE, TITLED_NAME_RE,
};

/// Advisory result of a pre-send PII check. Never blocks sending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiiValidation {
    pub safe: bool,
    pub warnings: Vec<String>,
}

/// Re-run the high-confidence detectors over text that is about to leave
/// the device. Warnings name the category only, never the matched text.
pub fn validate_no_obvious_pii(text: &str) -> PiiValidation {
    let checks = [
        (&*EMAIL_RE, "Email address detected"),
        (&*PHONE_RE, "Phone number detected"),
        (&*SSN_RE, "Social security number detected"),
        (&*MRN_RE, "Medical record number detected"),
        (&*ADDRESS_RE, "Street address detected"),
        (&*DOCTOR_NAME_RE, "Doctor name detected"),
        (&*TITLED_NAME_RE, "Personal name detected"),
    ];

    let warnings: Vec<String> = checks
        .iter()
        .filter(|(re, _)| re.is_match(text))
        .map(|(_, warning)| warning.to_string())
        .collect();

    if !warnings.is_empty() {
        tracing::debug!(warnings = warnings.len(), "Pre-send PII check raised warnings");
    }

    PiiValidation {
        safe: warnings.is_empty(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::safety::redact::redact_pii;

    #[test]
    fn clean_text_is_safe() {
        let result = validate_no_obvious_pii("cramps were a 6 today, better after rest");
        assert!(result.safe);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn each_category_gets_one_warning() {
        let result = validate_no_obvious_pii(
            "email me at a@b.com or a2@b.com, call 555-123-4567, Dr. Lee agreed",
        );
        assert!(!result.safe);
        assert_eq!(
            result.warnings,
            vec![
                "Email address detected",
                "Phone number detected",
                "Doctor name detected",
            ]
        );
    }

    #[test]
    fn warnings_never_echo_the_match() {
        let result = validate_no_obvious_pii("ssn 123-45-6789");
        assert!(result.warnings.iter().all(|w| !w.contains("6789")));
    }

    #[test]
    fn redacted_text_passes() {
        let redacted = redact_pii("Mr. Jones at 14 Birch Lane, jones@mail.org, 555 123 4567");
        assert!(validate_no_obvious_pii(&redacted).safe, "{redacted}");
    }
}
