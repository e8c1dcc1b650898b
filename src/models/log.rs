use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::CyclePhase;

/// Current on-disk schema version for log records.
pub const LOG_SCHEMA_VERSION: u32 = 1;

pub const MIN_SEVERITY: i32 = 0;
pub const MAX_SEVERITY: i32 = 10;

/// A single symptom entry written by the logging UI.
///
/// `created_at` is local wall-clock time. Aggregation reads logs but never
/// mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    pub id: Uuid,
    pub created_at: NaiveDateTime,
    pub symptom_type: String,
    pub severity: i32,
    #[serde(default)]
    pub cycle_phase: Option<CyclePhase>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub duration_mins: Option<u32>,
}

impl Log {
    /// New entry with a fresh id and every optional field empty.
    pub fn new(created_at: NaiveDateTime, symptom_type: &str, severity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            symptom_type: symptom_type.to_string(),
            severity,
            cycle_phase: None,
            notes: None,
            tags: Vec::new(),
            triggers: Vec::new(),
            medications: Vec::new(),
            duration_mins: None,
        }
    }

    /// Calendar day of the entry (local midnight normalization).
    pub fn date(&self) -> NaiveDate {
        self.created_at.date()
    }

    /// Severity clamped into [0, 10]. Out-of-range records are clamped
    /// rather than rejected so one bad entry cannot abort a window.
    pub fn clamped_severity(&self) -> i32 {
        self.severity.clamp(MIN_SEVERITY, MAX_SEVERITY)
    }

    /// Phase bucket, defaulting to `Unknown` when absent.
    pub fn phase(&self) -> CyclePhase {
        self.cycle_phase.unwrap_or(CyclePhase::Unknown)
    }

    /// Notes with surrounding whitespace removed, `None` when blank.
    pub fn trimmed_notes(&self) -> Option<&str> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}
