use regex::Regex;

use super::types::{DuelEntry, RotationEntry};

/// Rotation event roots and the duel keywords that count toward the same score
pub const OVERLAP_MAP: [(&str, &[&str]); 6] = [
    ("Base", &["Building Power", "Construction Speedup", "Building", "Construction"]),
    ("Tech", &["Tech Power", "Research Speedup", "Research"]),
    ("Hero", &["Hero Recruitment", "Hero EXP", "Hero Shard", "Hero", "Recruitment"]),
    ("Unit", &["Train T8 Unit", "Training Speedup", "Training", "Train", "Unit"]),
    ("Drone", &["Drone Data Point", "Drone Component", "Drone Part", "Stamina", "Drone"]),
    ("All-Rounder", &["Hero", "Building", "Research", "Train", "Construction", "Drone"]),
];

const BUILDING_WORDS: [&str; 2] = ["building", "construction"];

/// Checks if keyword appears as a whole word in text (case-insensitive)
pub fn word_in_text(keyword: &str, text: &str) -> bool {
    let pattern = format!(r"\b{}\b", regex::escape(&keyword.to_lowercase()));
    Regex::new(&pattern)
        .map(|re| re.is_match(&text.to_lowercase()))
        .unwrap_or(false)
}

/// Keywords for a rotation event, keyed by its first word
pub fn keywords_for(event: &str) -> Vec<String> {
    let root = event.split_whitespace().next().unwrap_or("");
    OVERLAP_MAP
        .iter()
        .find(|(key, _)| *key == root)
        .map(|(_, words)| words.iter().map(|w| w.to_string()).collect())
        .unwrap_or_else(|| vec![root.to_lowercase()])
}

/// Duel events that score alongside a rotation slot, without duplicates.
///
/// `rotation` holds every task row of the slot; the first row names the event.
pub fn overlapping_duel_events(rotation: &[RotationEntry], duel: &[DuelEntry]) -> Vec<String> {
    let Some(first) = rotation.first() else {
        return Vec::new();
    };

    let keywords = keywords_for(&first.event);
    let all_tasks: Vec<&str> = rotation.iter().map(|row| row.task.as_str()).collect();
    let rotation_text = format!("{} {}", first.event, all_tasks.join(" ")).to_lowercase();
    let rotation_builds = BUILDING_WORDS.iter().any(|w| word_in_text(w, &rotation_text));

    let mut skills: Vec<String> = Vec::new();
    for row in duel {
        let hits = |word: &str| word_in_text(word, &row.event) || word_in_text(word, &row.task);
        let keyword_match = keywords.iter().any(|kw| hits(kw.as_str()));
        let building_match = rotation_builds && BUILDING_WORDS.iter().any(|w| hits(*w));

        if (keyword_match || building_match) && !skills.contains(&row.event) {
            skills.push(row.event.clone());
        }
    }
    skills
}

/// Point multiplier of a slot window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplier {
    Single,
    Double,
}

impl Multiplier {
    pub fn for_slot(rotation: &[RotationEntry], duel: &[DuelEntry]) -> Self {
        if overlapping_duel_events(rotation, duel).is_empty() {
            Multiplier::Single
        } else {
            Multiplier::Double
        }
    }
}

impl std::fmt::Display for Multiplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Multiplier::Single => f.write_str("1×"),
            Multiplier::Double => f.write_str("⭐ 2×"),
        }
    }
}
