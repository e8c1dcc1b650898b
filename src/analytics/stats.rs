use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use super::round1;
use crate::models::enums::CyclePhase;
use crate::models::Log;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseStat {
    pub count: usize,
    pub avg_severity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymptomStat {
    pub symptom_type: String,
    pub count: usize,
    pub avg_severity: f64,
    pub max_severity: i32,
    pub min_severity: i32,
    pub phases: BTreeMap<CyclePhase, PhaseStat>,
}

/// Deterministic statistics over a short window of logged days.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogStatistics {
    /// Sorted by count, descending.
    pub symptom_stats: Vec<SymptomStat>,
    pub max_severity_overall: i32,
    pub max_severity_symptom: Option<String>,
    /// Phase with the highest count-weighted average severity across all
    /// symptoms. Never `Unknown`.
    pub phase_with_max_severity: Option<CyclePhase>,
    pub total_days: usize,
}

impl LogStatistics {
    pub fn is_empty(&self) -> bool {
        self.symptom_stats.is_empty()
    }

    pub fn total_logs(&self) -> usize {
        self.symptom_stats.iter().map(|s| s.count).sum()
    }
}

/// Distinct calendar days present in the logs, most recent first.
pub fn get_unique_dates(logs: &[Log]) -> Vec<NaiveDate> {
    let dates: BTreeSet<NaiveDate> = logs.iter().map(Log::date).collect();
    dates.into_iter().rev().collect()
}

/// All logs that fall on the `n` most recent logged days.
///
/// Days without entries do not count toward `n`.
pub fn get_logs_from_last_n_days(logs: &[Log], n: usize) -> Vec<Log> {
    let keep: BTreeSet<NaiveDate> = get_unique_dates(logs).into_iter().take(n).collect();
    logs.iter()
        .filter(|l| keep.contains(&l.date()))
        .cloned()
        .collect()
}

#[derive(Default)]
struct SeverityAcc {
    count: usize,
    sum: i64,
}

impl SeverityAcc {
    fn add(&mut self, severity: i32) {
        self.count += 1;
        self.sum += i64::from(severity);
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }
}

struct SymptomGroup {
    symptom_type: String,
    all: SeverityAcc,
    max: i32,
    min: i32,
    phases: BTreeMap<CyclePhase, SeverityAcc>,
}

pub fn compute_log_statistics(logs: &[Log]) -> LogStatistics {
    if logs.is_empty() {
        return LogStatistics::default();
    }

    let mut groups: Vec<SymptomGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for log in logs {
        let severity = log.clamped_severity();
        let slot = *index.entry(log.symptom_type.as_str()).or_insert_with(|| {
            groups.push(SymptomGroup {
                symptom_type: log.symptom_type.clone(),
                all: SeverityAcc::default(),
                max: severity,
                min: severity,
                phases: BTreeMap::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.all.add(severity);
        group.max = group.max.max(severity);
        group.min = group.min.min(severity);
        group.phases.entry(log.phase()).or_default().add(severity);
    }

    // First-seen symptom wins ties on the single highest severity.
    let mut max_severity_overall = 0;
    let mut max_severity_symptom = None;
    for group in &groups {
        if max_severity_symptom.is_none() || group.max > max_severity_overall {
            max_severity_overall = group.max;
            max_severity_symptom = Some(group.symptom_type.clone());
        }
    }

    let phase_with_max_severity = weighted_max_phase(&groups);

    let mut symptom_stats: Vec<SymptomStat> = groups
        .into_iter()
        .map(|g| SymptomStat {
            symptom_type: g.symptom_type,
            count: g.all.count,
            avg_severity: round1(g.all.avg()),
            max_severity: g.max,
            min_severity: g.min,
            phases: g
                .phases
                .iter()
                .map(|(phase, acc)| {
                    (
                        *phase,
                        PhaseStat {
                            count: acc.count,
                            avg_severity: round1(acc.avg()),
                        },
                    )
                })
                .collect(),
        })
        .collect();
    symptom_stats.sort_by(|a, b| b.count.cmp(&a.count));

    LogStatistics {
        symptom_stats,
        max_severity_overall,
        max_severity_symptom,
        phase_with_max_severity,
        total_days: get_unique_dates(logs).len(),
    }
}

/// Combine each symptom's per-phase averages weighted by their counts, then
/// pick the tracked phase with the highest result.
fn weighted_max_phase(groups: &[SymptomGroup]) -> Option<CyclePhase> {
    let mut best: Option<(CyclePhase, f64)> = None;
    for phase in CyclePhase::TRACKED {
        let (weighted_sum, count) = groups
            .iter()
            .filter_map(|g| g.phases.get(&phase))
            .fold((0.0, 0usize), |(sum, n), acc| {
                (sum + acc.avg() * acc.count as f64, n + acc.count)
            });
        if count == 0 {
            continue;
        }
        let avg = weighted_sum / count as f64;
        if best.map_or(true, |(_, top)| avg > top) {
            best = Some((phase, avg));
        }
    }
    best.map(|(phase, _)| phase)
}
