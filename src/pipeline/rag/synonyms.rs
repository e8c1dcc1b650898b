use std::collections::HashMap;
use std::sync::LazyLock;

/// Women's-health term clusters. Every term in a cluster expands to every
/// other term in the same cluster.
pub const SYNONYM_CLUSTERS: &[&[&str]] = &[
    &["period", "periods", "menstrual", "menstruation", "menses", "cycle"],
    &["uti", "urinary", "bladder", "urination", "cystitis"],
    &["pelvic", "pelvis", "lower abdomen", "abdominal"],
    &["cramp", "cramps", "cramping", "dysmenorrhea"],
    &["pms", "premenstrual", "pmdd"],
    &["endometriosis", "endo"],
    &["pcos", "polycystic", "ovarian cysts"],
    &["fatigue", "tired", "tiredness", "exhaustion", "exhausted", "energy"],
    &["mood", "moods", "anxiety", "depression", "irritability", "irritable"],
    &["headache", "headaches", "migraine", "migraines"],
    &["bloating", "bloated", "water retention"],
    &["nausea", "nauseous", "vomiting", "queasy"],
    &["bleeding", "blood", "spotting", "flow", "clots"],
    &["breast", "breasts", "breast tenderness", "tender", "breast pain"],
    &["back", "backache", "back pain", "lower back"],
    &["joint", "joints", "joint pain", "arthralgia", "stiffness"],
    &["sleep", "insomnia", "sleeping", "sleepless"],
    &["digestive", "digestion", "constipation", "diarrhea", "bowel", "stomach"],
    &["pain", "ache", "aching", "sore", "discomfort"],
    &["hormone", "hormones", "hormonal", "estrogen", "progesterone"],
    &["ovulation", "ovulating", "ovulatory", "fertile"],
    &["acne", "breakout", "breakouts", "pimples"],
    &["dizzy", "dizziness", "lightheaded", "vertigo"],
    &["menopause", "perimenopause", "hot flashes", "night sweats"],
    &["discharge", "vaginal", "yeast", "thrush"],
    &["contraception", "contraceptive", "birth control", "pill", "iud"],
];

/// term -> indices of the clusters containing it.
static TERM_INDEX: LazyLock<HashMap<&'static str, Vec<usize>>> = LazyLock::new(|| {
    let mut index: HashMap<&'static str, Vec<usize>> = HashMap::new();
    for (i, cluster) in SYNONYM_CLUSTERS.iter().enumerate() {
        for &term in cluster.iter() {
            index.entry(term).or_default().push(i);
        }
    }
    index
});

/// Every synonym of `term`, in cluster order, excluding the term itself.
pub fn synonyms_for(term: &str) -> Vec<&'static str> {
    let Some(clusters) = TERM_INDEX.get(term) else {
        return Vec::new();
    };
    clusters
        .iter()
        .flat_map(|&i| SYNONYM_CLUSTERS[i].iter().copied())
        .filter(|s| *s != term)
        .collect()
}
