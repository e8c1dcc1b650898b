use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use super::redact::{redact_pii_at, relative_time_bucket};
use crate::models::enums::CyclePhase;
use crate::models::Log;

/// Read-only projection of a [`Log`] that is safe to hand to a remote
/// generator. Dates are relative, notes are redacted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizedSymptom {
    pub id: Uuid,
    pub when: String,
    pub symptom_type: String,
    pub severity: i32,
    pub cycle_phase: CyclePhase,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub triggers: Vec<String>,
    pub medications: Vec<String>,
    pub duration_mins: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizedLogData {
    pub symptoms: Vec<SanitizedSymptom>,
    pub total_logs: usize,
    /// Relative bucket of the oldest entry.
    pub earliest: Option<String>,
    /// Relative bucket of the newest entry.
    pub latest: Option<String>,
}

pub fn sanitize_log(log: &Log, today: NaiveDate) -> SanitizedSymptom {
    SanitizedSymptom {
        id: log.id,
        when: relative_time_bucket(log.date(), today),
        symptom_type: redact_pii_at(&log.symptom_type, today),
        severity: log.clamped_severity(),
        cycle_phase: log.phase(),
        notes: log.trimmed_notes().map(|n| redact_pii_at(n, today)),
        tags: redact_all(&log.tags, today),
        triggers: redact_all(&log.triggers, today),
        medications: log.medications.clone(),
        duration_mins: log.duration_mins,
    }
}

/// Sanitize a collection, newest entry first.
pub fn sanitize_logs(logs: &[Log], today: NaiveDate) -> SanitizedLogData {
    let mut ordered: Vec<&Log> = logs.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    SanitizedLogData {
        symptoms: ordered.iter().map(|l| sanitize_log(l, today)).collect(),
        total_logs: logs.len(),
        earliest: ordered.last().map(|l| relative_time_bucket(l.date(), today)),
        latest: ordered.first().map(|l| relative_time_bucket(l.date(), today)),
    }
}

fn redact_all(items: &[String], today: NaiveDate) -> Vec<String> {
    items.iter().map(|s| redact_pii_at(s, today)).collect()
}
