//! Lexicon-based subjectivity scoring.
//!
//! Each known word carries a subjectivity in `[0, 1]` and an intensity
//! multiplier. Words whose intensity differs from `1.0` ("very", "slightly")
//! modify the lexicon word that follows them; when no such word follows they
//! count on their own. The score of a text is the mean subjectivity of the
//! assessments it contains.

use std::collections::HashMap;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    subjectivity: f64,
    intensity: f64,
}

impl Entry {
    fn is_modifier(&self) -> bool {
        (self.intensity - 1.0).abs() > f64::EPSILON
    }
}

lazy_static::lazy_static! {
    static ref LEXICON: HashMap<&'static str, Entry> =
        parse_lexicon(include_str!("../data/subjectivity.tsv"));
}

fn parse_lexicon(raw: &'static str) -> HashMap<&'static str, Entry> {
    let mut lexicon = HashMap::new();
    for (line_no, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split('\t');
        let parsed = match (fields.next(), fields.next(), fields.next()) {
            (Some(word), Some(subjectivity), Some(intensity)) => subjectivity
                .parse::<f64>()
                .ok()
                .zip(intensity.parse::<f64>().ok())
                .map(|(subjectivity, intensity)| (word, Entry { subjectivity, intensity })),
            _ => None,
        };
        match parsed {
            Some((word, entry)) => {
                lexicon.insert(word, entry);
            }
            None => warn!(line = line_no + 1, "Skipping malformed subjectivity lexicon entry"),
        }
    }
    lexicon
}

/// Forces the lexicon to load. Call during startup so the first message doesn't pay for it.
pub fn init() -> usize {
    LEXICON.len()
}

/// Returns the subjectivity of `text` in `[0, 1]`; `0.0` when no lexicon word is present.
pub fn subjectivity(text: &str) -> f64 {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
        .map(|w| w.trim_matches(|c| c == '\'' || c == '-'))
        .filter(|w| !w.is_empty())
        .collect();

    let mut scores: Vec<f64> = Vec::new();
    // Modifiers waiting for the word they apply to.
    let mut pending: Vec<Entry> = Vec::new();

    for word in words {
        match LEXICON.get(word) {
            Some(entry) if entry.is_modifier() => pending.push(*entry),
            Some(entry) => {
                // Stacked modifiers ("really very") compound.
                let boost: f64 = pending.drain(..).map(|m| m.intensity).product();
                scores.push((entry.subjectivity * boost).clamp(0.0, 1.0));
            }
            None => flush_unattached(&mut pending, &mut scores),
        }
    }
    flush_unattached(&mut pending, &mut scores);

    let assessments = scores.len();
    let total: f64 = scores.iter().sum();
    if assessments == 0 {
        0.0
    } else {
        (total / assessments as f64).clamp(0.0, 1.0)
    }
}

/// A modifier with nothing to modify is scored as a word of its own ("a pretty day").
/// Modifiers with zero subjectivity ("so", "too") are dropped.
fn flush_unattached(pending: &mut Vec<Entry>, scores: &mut Vec<f64>) {
    scores.extend(
        pending
            .drain(..)
            .filter(|m| m.subjectivity > 0.0)
            .map(|m| m.subjectivity.clamp(0.0, 1.0)),
    );
}
