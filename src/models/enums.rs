use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

// Declaration order is the canonical bucket order used by every aggregate.
str_enum!(CyclePhase {
    Menstrual => "menstrual",
    Follicular => "follicular",
    Ovulation => "ovulation",
    Luteal => "luteal",
    Unknown => "unknown",
});

impl CyclePhase {
    pub const ALL: [CyclePhase; 5] = [
        CyclePhase::Menstrual,
        CyclePhase::Follicular,
        CyclePhase::Ovulation,
        CyclePhase::Luteal,
        CyclePhase::Unknown,
    ];

    /// Phases that count as "tracked".
    pub const TRACKED: [CyclePhase; 4] = [
        CyclePhase::Menstrual,
        CyclePhase::Follicular,
        CyclePhase::Ovulation,
        CyclePhase::Luteal,
    ];

    pub fn is_tracked(&self) -> bool {
        !matches!(self, CyclePhase::Unknown)
    }
}

str_enum!(ChatIntent {
    ReviewRecent => "review_recent",
    UnderstandPatterns => "understand_patterns",
    ComparePeriod => "compare_period",
    AddDetail => "add_detail",
    General => "general",
});

str_enum!(PiiRisk {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(RedFlagEvidence {
    NotesMatch => "notes_match",
    TagMatch => "tag_match",
});

str_enum!(MessageRole {
    User => "user",
    Assistant => "assistant",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn cycle_phase_round_trip() {
        for (variant, s) in [
            (CyclePhase::Menstrual, "menstrual"),
            (CyclePhase::Follicular, "follicular"),
            (CyclePhase::Ovulation, "ovulation"),
            (CyclePhase::Luteal, "luteal"),
            (CyclePhase::Unknown, "unknown"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(CyclePhase::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn chat_intent_round_trip() {
        for (variant, s) in [
            (ChatIntent::ReviewRecent, "review_recent"),
            (ChatIntent::UnderstandPatterns, "understand_patterns"),
            (ChatIntent::ComparePeriod, "compare_period"),
            (ChatIntent::AddDetail, "add_detail"),
            (ChatIntent::General, "general"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(ChatIntent::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn phase_serializes_as_snake_case_string() {
        let json = serde_json::to_string(&CyclePhase::Luteal).unwrap();
        assert_eq!(json, "\"luteal\"");
        let risk: PiiRisk = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(risk, PiiRisk::Medium);
    }

    #[test]
    fn phase_ordering_follows_canonical_buckets() {
        let mut phases = vec![CyclePhase::Unknown, CyclePhase::Luteal, CyclePhase::Menstrual];
        phases.sort();
        assert_eq!(
            phases,
            vec![CyclePhase::Menstrual, CyclePhase::Luteal, CyclePhase::Unknown]
        );
        assert!(!CyclePhase::Unknown.is_tracked());
        assert!(CyclePhase::Ovulation.is_tracked());
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(CyclePhase::from_str("invalid").is_err());
        assert!(ChatIntent::from_str("").is_err());
        assert!(PiiRisk::from_str("HIGH").is_err());
    }
}
