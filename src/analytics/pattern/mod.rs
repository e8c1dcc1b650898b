pub mod types;
pub mod builder;
pub mod red_flags;
pub mod notes_quality;
pub mod narrative;

pub use builder::build_pattern_card;
pub use types::*;
