use std::collections::HashMap;

use super::types::RedFlag;
use crate::models::enums::RedFlagEvidence;
use crate::models::Log;

/// Keywords that warrant a clinician's attention when they recur in logs.
pub const RED_FLAG_KEYWORDS: [&str; 12] = [
    "bleeding",
    "blood",
    "hemorrhage",
    "fainting",
    "fainted",
    "fever",
    "unexplained weight loss",
    "severe pain",
    "difficulty breathing",
    "shortness of breath",
    "chest pain",
    "vision loss",
];

/// Count red-flag keyword hits per log. A keyword found in the notes is
/// recorded as `notes_match`; otherwise a hit in any tag is a `tag_match`.
/// Sorted by count, descending; ties keep first-detection order.
pub fn detect_red_flags(logs: &[Log]) -> Vec<RedFlag> {
    let mut flags: Vec<RedFlag> = Vec::new();
    let mut index: HashMap<(&'static str, RedFlagEvidence), usize> = HashMap::new();

    for log in logs {
        let notes = log.notes.as_deref().unwrap_or_default().to_lowercase();
        let tags: Vec<String> = log.tags.iter().map(|t| t.to_lowercase()).collect();

        for keyword in RED_FLAG_KEYWORDS {
            let evidence = if notes.contains(keyword) {
                RedFlagEvidence::NotesMatch
            } else if tags.iter().any(|t| t.contains(keyword)) {
                RedFlagEvidence::TagMatch
            } else {
                continue;
            };

            let slot = *index.entry((keyword, evidence)).or_insert_with(|| {
                flags.push(RedFlag {
                    flag: keyword.to_string(),
                    evidence,
                    count: 0,
                });
                flags.len() - 1
            });
            flags[slot].count += 1;
        }
    }

    flags.sort_by(|a, b| b.count.cmp(&a.count));
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn log(notes: Option<&str>, tags: &[&str]) -> Log {
        let mut log = Log::new(
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap().and_hms_opt(9, 0, 0).unwrap(),
            "Cramps",
            5,
        );
        log.notes = notes.map(str::to_string);
        log.tags = tags.iter().map(|t| t.to_string()).collect();
        log
    }

    #[test]
    fn notes_take_precedence_over_tags() {
        let flags = detect_red_flags(&[log(Some("Had a FEVER overnight"), &["fever"])]);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].flag, "fever");
        assert_eq!(flags[0].evidence, RedFlagEvidence::NotesMatch);
    }

    #[test]
    fn tag_only_hits_are_tag_matches() {
        let flags = detect_red_flags(&[log(None, &["Chest Pain"])]);
        assert_eq!(flags[0].flag, "chest pain");
        assert_eq!(flags[0].evidence, RedFlagEvidence::TagMatch);
    }

    #[test]
    fn counts_are_sorted_descending() {
        let logs = vec![
            log(Some("dizzy, nearly fainted"), &[]),
            log(Some("blood clots"), &[]),
            log(Some("more blood today"), &[]),
            log(None, &["blood"]),
        ];
        let flags = detect_red_flags(&logs);
        assert_eq!(flags[0].flag, "blood");
        assert_eq!(flags[0].evidence, RedFlagEvidence::NotesMatch);
        assert_eq!(flags[0].count, 2);
        assert!(flags.windows(2).all(|w| w[0].count >= w[1].count));
        assert!(flags
            .iter()
            .any(|f| f.flag == "blood" && f.evidence == RedFlagEvidence::TagMatch && f.count == 1));
    }

    #[test]
    fn nothing_found() {
        assert!(detect_red_flags(&[log(Some("mild bloating"), &["work"])]).is_empty());
        assert!(detect_red_flags(&[]).is_empty());
    }
}
