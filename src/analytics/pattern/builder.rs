use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use super::narrative::narrative_bullets;
use super::notes_quality::assess_notes_quality;
use super::red_flags::detect_red_flags;
use super::types::*;
use crate::analytics::round1;
use crate::models::enums::CyclePhase;
use crate::models::Log;

const SECONDS_PER_DAY: i64 = 86_400;

/// Build the pattern card for a log set.
///
/// `window_days` overrides the window derived from the oldest and newest
/// timestamps.
pub fn build_pattern_card(logs: &[Log], window_days: Option<u32>) -> PatternCard {
    if logs.is_empty() {
        return PatternCard::empty();
    }

    let time_window_days = window_days.unwrap_or_else(|| derive_window_days(logs));

    let mut card = PatternCard {
        time_window_days,
        top_symptoms: top_symptoms(logs, time_window_days),
        cycle_association: cycle_association(logs),
        context_tags: label_summary(logs, |l| &l.tags),
        triggers: label_summary(logs, |l| &l.triggers),
        meds: medication_counts(logs),
        red_flags_detected: detect_red_flags(logs),
        notes_quality: assess_notes_quality(logs),
        narrative_bullets: Vec::new(),
    };
    card.narrative_bullets = narrative_bullets(&card);

    tracing::debug!(
        logs = logs.len(),
        window_days = time_window_days,
        symptoms = card.top_symptoms.len(),
        red_flags = card.red_flags_detected.len(),
        "Pattern card built"
    );

    card
}

/// Whole days between the oldest and newest entry, rounded up, at least 1.
fn derive_window_days(logs: &[Log]) -> u32 {
    let newest = logs.iter().map(|l| l.created_at).max();
    let oldest = logs.iter().map(|l| l.created_at).min();
    let span_secs = match (newest, oldest) {
        (Some(n), Some(o)) => (n - o).num_seconds(),
        _ => 0,
    };
    let days = (span_secs + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
    u32::try_from(days).unwrap_or(u32::MAX).max(1)
}

/// Insertion-ordered counter. Sorting afterwards is stable, so ties keep
/// first-seen order.
struct Tally<K> {
    entries: Vec<(K, usize, i64)>,
    index: HashMap<K, usize>,
}

impl<K: Eq + Hash + Clone> Tally<K> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn add(&mut self, key: K, severity: i32) {
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.entries.push((key.clone(), 0, 0));
                self.index.insert(key, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[slot];
        entry.1 += 1;
        entry.2 += i64::from(severity);
    }

    /// (key, count, severity sum), sorted by count descending.
    fn ranked(mut self) -> Vec<(K, usize, i64)> {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries
    }
}

fn average(sum: i64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        round1(sum as f64 / count as f64)
    }
}

fn top_symptoms(logs: &[Log], window_days: u32) -> Vec<TopSymptom> {
    let mut tally: Tally<&str> = Tally::new();
    let mut durations: HashMap<&str, (u64, usize)> = HashMap::new();

    for log in logs {
        tally.add(&log.symptom_type, log.clamped_severity());
        if let Some(mins) = log.duration_mins {
            let d = durations.entry(&log.symptom_type).or_default();
            d.0 += u64::from(mins);
            d.1 += 1;
        }
    }

    let weeks = f64::from(window_days) / 7.0;
    tally
        .ranked()
        .into_iter()
        .take(MAX_TOP_SYMPTOMS)
        .map(|(name, freq, sev_sum)| TopSymptom {
            name: name.to_string(),
            freq,
            freq_per_week: if weeks > 0.0 {
                round1(freq as f64 / weeks)
            } else {
                0.0
            },
            avg_severity: average(sev_sum, freq),
            avg_duration_mins: durations
                .get(name)
                .map(|&(total, n)| round1(total as f64 / n as f64)),
        })
        .collect()
}

fn cycle_association(logs: &[Log]) -> CycleAssociation {
    let mut buckets: BTreeMap<CyclePhase, (usize, i64, Tally<&str>)> = CyclePhase::ALL
        .into_iter()
        .map(|p| (p, (0, 0, Tally::new())))
        .collect();

    for log in logs {
        if let Some(bucket) = buckets.get_mut(&log.phase()) {
            let severity = log.clamped_severity();
            bucket.0 += 1;
            bucket.1 += i64::from(severity);
            bucket.2.add(log.symptom_type.as_str(), severity);
        }
    }

    let tracked = logs.iter().filter(|l| l.phase().is_tracked()).count();
    let tracked_ratio = tracked as f64 / logs.len() as f64;

    let by_phase: BTreeMap<CyclePhase, PhaseBucket> = buckets
        .into_iter()
        .map(|(phase, (count, sev_sum, symptoms))| {
            let top_symptoms = symptoms
                .ranked()
                .into_iter()
                .take(MAX_PHASE_SYMPTOMS)
                .map(|(name, count, _)| LabelCount {
                    name: name.to_string(),
                    count,
                })
                .collect();
            (
                phase,
                PhaseBucket {
                    count,
                    avg_severity: average(sev_sum, count),
                    top_symptoms,
                },
            )
        })
        .collect();

    CycleAssociation {
        tracked_ratio,
        highest_severity_phase: simple_max_phase(&by_phase),
        by_phase,
    }
}

/// Tracked phase with the greatest plain average severity. Earlier phases
/// win ties.
fn simple_max_phase(by_phase: &BTreeMap<CyclePhase, PhaseBucket>) -> Option<CyclePhase> {
    let mut best: Option<(CyclePhase, f64)> = None;
    for phase in CyclePhase::TRACKED {
        let Some(bucket) = by_phase.get(&phase) else {
            continue;
        };
        if bucket.count == 0 {
            continue;
        }
        if best.map_or(true, |(_, top)| bucket.avg_severity > top) {
            best = Some((phase, bucket.avg_severity));
        }
    }
    best.map(|(phase, _)| phase)
}

fn clean_labels(labels: &[String]) -> impl Iterator<Item = &str> {
    labels.iter().map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn label_summary<F>(logs: &[Log], labels_of: F) -> LabelSummary
where
    F: Fn(&Log) -> &Vec<String>,
{
    let mut labels: Tally<&str> = Tally::new();
    let mut links: Tally<(&str, &str)> = Tally::new();

    for log in logs {
        let severity = log.clamped_severity();
        for label in clean_labels(labels_of(log)) {
            labels.add(label, severity);
            links.add((label, log.symptom_type.as_str()), severity);
        }
    }

    LabelSummary {
        top: labels
            .ranked()
            .into_iter()
            .take(MAX_TOP_LABELS)
            .map(|(name, count, _)| LabelCount {
                name: name.to_string(),
                count,
            })
            .collect(),
        symptom_links: links
            .ranked()
            .into_iter()
            .take(MAX_SYMPTOM_LINKS)
            .map(|((label, symptom), count, sev_sum)| SymptomLink {
                label: label.to_string(),
                symptom: symptom.to_string(),
                count,
                avg_severity: average(sev_sum, count),
            })
            .collect(),
    }
}

fn medication_counts(logs: &[Log]) -> Vec<LabelCount> {
    let mut meds: Tally<&str> = Tally::new();
    for log in logs {
        for med in clean_labels(&log.medications) {
            meds.add(med, 0);
        }
    }
    meds.ranked()
        .into_iter()
        .take(MAX_MEDS)
        .map(|(name, count, _)| LabelCount {
            name: name.to_string(),
            count,
        })
        .collect()
}
