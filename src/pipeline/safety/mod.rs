//! Sanitizer: PII redaction, emergency phrase detection and pre-send checks.
//!
//! Everything that touches raw notes passes through here before the text
//! is aggregated into a prompt.

pub(crate) mod patterns;
pub mod redact;
pub mod emergency;
pub mod validate;
pub mod sanitized;

pub use emergency::{detect_emergency_symptoms, emergency_labels};
pub use redact::{redact_pii, redact_pii_at, relative_time_bucket};
pub use sanitized::{sanitize_log, sanitize_logs, SanitizedLogData, SanitizedSymptom};
pub use validate::{validate_no_obvious_pii, PiiValidation};
