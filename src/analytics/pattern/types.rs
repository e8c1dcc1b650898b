use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::enums::{CyclePhase, PiiRisk, RedFlagEvidence};

pub const MAX_TOP_SYMPTOMS: usize = 10;
pub const MAX_TOP_LABELS: usize = 10;
pub const MAX_SYMPTOM_LINKS: usize = 15;
pub const MAX_MEDS: usize = 10;
pub const MAX_PHASE_SYMPTOMS: usize = 3;
pub const MAX_NARRATIVE_BULLETS: usize = 5;

/// Full-window aggregate over a log set. Recomputed per analysis, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternCard {
    pub time_window_days: u32,
    pub top_symptoms: Vec<TopSymptom>,
    pub cycle_association: CycleAssociation,
    pub context_tags: LabelSummary,
    pub triggers: LabelSummary,
    pub meds: Vec<LabelCount>,
    pub red_flags_detected: Vec<RedFlag>,
    pub notes_quality: NotesQuality,
    pub narrative_bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopSymptom {
    pub name: String,
    pub freq: usize,
    pub freq_per_week: f64,
    pub avg_severity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_duration_mins: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleAssociation {
    /// Fraction of logs with a phase other than `Unknown`.
    pub tracked_ratio: f64,
    /// Always holds all five phase buckets.
    pub by_phase: BTreeMap<CyclePhase, PhaseBucket>,
    /// Simple per-phase average; ignores `Unknown` and empty buckets.
    pub highest_severity_phase: Option<CyclePhase>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseBucket {
    pub count: usize,
    pub avg_severity: f64,
    pub top_symptoms: Vec<LabelCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub name: String,
    pub count: usize,
}

/// Co-occurrence of a tag or trigger with a symptom type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymptomLink {
    pub label: String,
    pub symptom: String,
    pub count: usize,
    pub avg_severity: f64,
}

/// Shared shape for context tags and triggers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelSummary {
    pub top: Vec<LabelCount>,
    pub symptom_links: Vec<SymptomLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedFlag {
    pub flag: String,
    pub evidence: RedFlagEvidence,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotesQuality {
    /// Percentage in [0, 100] of logs with non-blank notes.
    pub pct_present: f64,
    pub pii_risk: PiiRisk,
}

impl PatternCard {
    /// The canonical card for an empty log set. Prompt assembly branches on
    /// this exact shape.
    pub fn empty() -> Self {
        Self {
            time_window_days: 0,
            top_symptoms: Vec::new(),
            cycle_association: CycleAssociation {
                tracked_ratio: 0.0,
                by_phase: CyclePhase::ALL
                    .into_iter()
                    .map(|p| (p, PhaseBucket::default()))
                    .collect(),
                highest_severity_phase: None,
            },
            context_tags: LabelSummary::default(),
            triggers: LabelSummary::default(),
            meds: Vec::new(),
            red_flags_detected: Vec::new(),
            notes_quality: NotesQuality {
                pct_present: 0.0,
                pii_risk: PiiRisk::Low,
            },
            narrative_bullets: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top_symptoms.is_empty()
    }

    /// Names of up to `n` top symptoms, most frequent first.
    pub fn top_symptom_names(&self, n: usize) -> impl Iterator<Item = &str> {
        self.top_symptoms.iter().take(n).map(|s| s.name.as_str())
    }

    /// Up to `n` top context tags, most frequent first.
    pub fn top_tag_names(&self, n: usize) -> impl Iterator<Item = &str> {
        self.context_tags.top.iter().take(n).map(|t| t.name.as_str())
    }
}
