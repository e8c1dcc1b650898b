//! Aggregation over symptom logs: short-window statistics for chat review
//! turns and the full-window pattern card.

pub mod pattern;
pub mod stats;

pub use pattern::{build_pattern_card, PatternCard};
pub use stats::{
    compute_log_statistics, get_logs_from_last_n_days, get_unique_dates, LogStatistics,
    PhaseStat, SymptomStat,
};

/// Round to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round1_rounds_half_away_from_zero() {
        assert_eq!(round1(5.333), 5.3);
        assert_eq!(round1(2.25), 2.3);
        assert_eq!(round1(0.0), 0.0);
    }
}
