use super::types::{PatternCard, MAX_NARRATIVE_BULLETS};

/// Summary sentences in fixed order; each is emitted only when its data
/// is present.
pub fn narrative_bullets(card: &PatternCard) -> Vec<String> {
    let mut bullets = Vec::new();

    if let Some(top) = card.top_symptoms.first() {
        bullets.push(format!(
            "{} was the most frequent symptom, logged {} {} (about {} per week) with an average severity of {}/10.",
            top.name,
            top.freq,
            plural(top.freq, "time", "times"),
            top.freq_per_week,
            top.avg_severity,
        ));
    }

    let cycle = &card.cycle_association;
    if cycle.tracked_ratio > 0.5 {
        if let Some(phase) = cycle.highest_severity_phase {
            let avg = cycle.by_phase.get(&phase).map_or(0.0, |b| b.avg_severity);
            bullets.push(format!(
                "Symptoms were most severe during the {phase} phase (average severity {avg}/10)."
            ));
        }
    }

    if let Some(tag) = card.context_tags.top.first() {
        bullets.push(format!(
            "The most common context was \"{}\", noted in {} {}.",
            tag.name,
            tag.count,
            plural(tag.count, "log", "logs"),
        ));
    }

    if let Some(trigger) = card.triggers.top.first() {
        bullets.push(format!(
            "The most frequently reported trigger was \"{}\" ({} {}).",
            trigger.name,
            trigger.count,
            plural(trigger.count, "time", "times"),
        ));
    }

    if !card.meds.is_empty() {
        let list = card
            .meds
            .iter()
            .take(3)
            .map(|m| format!("{} ({})", m.name, m.count))
            .collect::<Vec<_>>()
            .join(", ");
        bullets.push(format!("Medications mentioned: {list}."));
    }

    bullets.truncate(MAX_NARRATIVE_BULLETS);
    bullets
}

fn plural(n: usize, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 {
        one
    } else {
        many
    }
}
