//! Sentiment summary of a user message: VADER polarity plus lexicon subjectivity.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use vader_sentiment::SentimentIntensityAnalyzer;

use crate::error::{ChatError, ChatResult};
use crate::subjectivity;

/// Compound scores inside `(-NEUTRAL_BAND, NEUTRAL_BAND)` are neutral.
pub const NEUTRAL_BAND: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn from_compound(compound: f64) -> Self {
        if compound >= NEUTRAL_BAND {
            SentimentLabel::Positive
        } else if compound <= -NEUTRAL_BAND {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

/// Raw VADER scores.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolarityScores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub overall: SentimentLabel,
    pub intensity: f64,
    pub subjectivity: f64,
    pub scores: PolarityScores,
}

impl SentimentSummary {
    fn from_scores(scores: PolarityScores, subjectivity: f64) -> Self {
        Self {
            overall: SentimentLabel::from_compound(scores.compound),
            intensity: scores.compound.abs().min(1.0),
            subjectivity: subjectivity.clamp(0.0, 1.0),
            scores,
        }
    }
}

// Rendered into the prompt as compact JSON so field names stay legible to the model.
impl fmt::Display for SentimentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Holds the process-wide lexicons. Build once at startup and share by `Arc`.
pub struct SentimentAnalyzer {
    vader: SentimentIntensityAnalyzer<'static>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        let entries = subjectivity::init();
        debug!(subjectivity_entries = entries, "Sentiment lexicons loaded");
        Self {
            vader: SentimentIntensityAnalyzer::new(),
        }
    }

    #[instrument(skip(self, text), fields(len = text.len()))]
    pub fn analyze(&self, text: &str) -> ChatResult<SentimentSummary> {
        validate_text(text)?;

        let raw = self.vader.polarity_scores(text);
        let score = |key: &str| raw.get(key).copied().unwrap_or(0.0);
        let scores = PolarityScores {
            neg: score("neg"),
            neu: score("neu"),
            pos: score("pos"),
            compound: score("compound"),
        };

        let summary = SentimentSummary::from_scores(scores, subjectivity::subjectivity(text));
        debug!(overall = ?summary.overall, intensity = summary.intensity, "Sentiment analyzed");
        Ok(summary)
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejects strings carrying control characters other than whitespace, which only
/// show up when binary data has been forced into a text field.
fn validate_text(text: &str) -> ChatResult<()> {
    match text.chars().find(|c| c.is_control() && !c.is_whitespace()) {
        Some(c) => Err(ChatError::InvalidInput(format!(
            "message contains non-text character U+{:04X}",
            c as u32
        ))),
        None => Ok(()),
    }
}
