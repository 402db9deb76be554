use serde::{Deserialize, Serialize};

use crate::features::FeatureRequestSet;
use crate::resolution::VendorOverride;

#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub input_location: String,
    pub sample_rate_hertz: u32,
    pub language_code: String,
    pub channel_count: u16,
    pub features: FeatureRequestSet,
    pub overrides: VendorOverride,
}

impl RecognitionRequest {
    pub fn new(input_location: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            input_location: input_location.into(),
            sample_rate_hertz: 16_000,
            language_code: language_code.into(),
            channel_count: 1,
            features: FeatureRequestSet::empty(),
            overrides: VendorOverride::default(),
        }
    }

    /// Same request carrying a different feature subset.
    pub fn with_features(&self, features: FeatureRequestSet) -> Self {
        Self {
            features,
            ..self.clone()
        }
    }
}

/// One recognized token. Punctuation tokens carry no timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub content: String,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub full_transcript: String,
    pub words: Vec<Word>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srt_subtitles: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vtt_subtitles: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_to_noise_ratio: Option<f32>,
}
