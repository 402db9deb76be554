use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::resolution::VendorOverride;

/// Scores at or beyond this magnitude are classified as polar.
pub const SENTIMENT_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentimentType {
    Positive,
    Neutral,
    Negative,
    Mixed,
}

impl SentimentType {
    /// Classify a score in `[-1.0, 1.0]`, as returned by score-based vendors.
    pub fn from_score(score: f32) -> Self {
        if score >= SENTIMENT_THRESHOLD {
            SentimentType::Positive
        } else if score <= -SENTIMENT_THRESHOLD {
            SentimentType::Negative
        } else {
            SentimentType::Neutral
        }
    }
}

impl Display for SentimentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SentimentType::Positive => write!(f, "POSITIVE"),
            SentimentType::Neutral => write!(f, "NEUTRAL"),
            SentimentType::Negative => write!(f, "NEGATIVE"),
            SentimentType::Mixed => write!(f, "MIXED"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SentimentRequest {
    pub input_location: String,
    pub language_code: String,
    pub overrides: VendorOverride,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: SentimentType,
}
