//! Recognition feature flags and vendor membership
//!
//! Each vendor serves a fixed subset of optional recognition features.
//! Punctuation and profanity filtering are served by two vendors; ties are
//! settled by a precedence list.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::vendor::Vendor;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionFeature {
    SrtSubtitles,
    VttSubtitles,
    ProfanityFilter,
    SpokenEmoji,
    SpokenPunctuation,
    NoiseRatio,
}

const AWS_FEATURES: &[RecognitionFeature] = &[
    RecognitionFeature::SrtSubtitles,
    RecognitionFeature::VttSubtitles,
];
const GCP_FEATURES: &[RecognitionFeature] = &[
    RecognitionFeature::SpokenPunctuation,
    RecognitionFeature::ProfanityFilter,
    RecognitionFeature::SpokenEmoji,
];
const AZURE_FEATURES: &[RecognitionFeature] = &[
    RecognitionFeature::SpokenPunctuation,
    RecognitionFeature::ProfanityFilter,
    RecognitionFeature::NoiseRatio,
];

/// Features `vendor` can serve.
pub fn vendor_features(vendor: Vendor) -> &'static [RecognitionFeature] {
    match vendor {
        Vendor::Aws => AWS_FEATURES,
        Vendor::Gcp => GCP_FEATURES,
        Vendor::Azure => AZURE_FEATURES,
    }
}

impl RecognitionFeature {
    pub const ALL: [RecognitionFeature; 6] = [
        RecognitionFeature::SrtSubtitles,
        RecognitionFeature::VttSubtitles,
        RecognitionFeature::ProfanityFilter,
        RecognitionFeature::SpokenEmoji,
        RecognitionFeature::SpokenPunctuation,
        RecognitionFeature::NoiseRatio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecognitionFeature::SrtSubtitles => "srt_subtitles",
            RecognitionFeature::VttSubtitles => "vtt_subtitles",
            RecognitionFeature::ProfanityFilter => "profanity_filter",
            RecognitionFeature::SpokenEmoji => "spoken_emoji",
            RecognitionFeature::SpokenPunctuation => "spoken_punctuation",
            RecognitionFeature::NoiseRatio => "noise_ratio",
        }
    }

    pub fn supported_by(&self, vendor: Vendor) -> bool {
        vendor_features(vendor).contains(self)
    }

    pub fn is_subtitle(&self) -> bool {
        matches!(
            self,
            RecognitionFeature::SrtSubtitles | RecognitionFeature::VttSubtitles
        )
    }
}

impl FromStr for RecognitionFeature {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "srt" | "srt_subtitles" => Ok(RecognitionFeature::SrtSubtitles),
            "vtt" | "vtt_subtitles" => Ok(RecognitionFeature::VttSubtitles),
            "profanity" | "profanity_filter" => Ok(RecognitionFeature::ProfanityFilter),
            "emoji" | "spoken_emoji" => Ok(RecognitionFeature::SpokenEmoji),
            "punctuation" | "spoken_punctuation" => Ok(RecognitionFeature::SpokenPunctuation),
            "snr" | "noise_ratio" => Ok(RecognitionFeature::NoiseRatio),
            _ => Err(anyhow::anyhow!("Invalid recognition feature: {}", s)),
        }
    }
}

impl Display for RecognitionFeature {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// The feature flags a caller asked for. Immutable after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FeatureRequestSet(BTreeSet<RecognitionFeature>);

impl FeatureRequestSet {
    pub fn new(features: impl IntoIterator<Item = RecognitionFeature>) -> Self {
        Self(features.into_iter().collect())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, feature: RecognitionFeature) -> bool {
        self.0.contains(&feature)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = RecognitionFeature> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<RecognitionFeature> for FeatureRequestSet {
    fn from_iter<I: IntoIterator<Item = RecognitionFeature>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Result of [`plan_features`]: which vendor runs which features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturePlan {
    assignments: BTreeMap<Vendor, FeatureRequestSet>,
    primary: Option<Vendor>,
    dropped: Vec<RecognitionFeature>,
}

impl FeaturePlan {
    /// Vendors to invoke, in `Vendor` order.
    pub fn vendors(&self) -> Vec<Vendor> {
        self.assignments.keys().copied().collect()
    }

    /// Features assigned to `vendor` (empty for a primary-only branch).
    pub fn features_for(&self, vendor: Vendor) -> FeatureRequestSet {
        self.assignments.get(&vendor).cloned().unwrap_or_default()
    }

    /// Vendor whose response carries the transcript and words.
    pub fn primary(&self) -> Option<Vendor> {
        self.primary
    }

    /// Vendor that was assigned `feature`, if any.
    pub fn owner_of(&self, feature: RecognitionFeature) -> Option<Vendor> {
        self.assignments
            .iter()
            .find(|(_, features)| features.contains(feature))
            .map(|(vendor, _)| *vendor)
    }

    /// Requested features no candidate vendor can serve.
    pub fn dropped(&self) -> &[RecognitionFeature] {
        &self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn is_combined(&self) -> bool {
        self.assignments.len() > 1
    }
}

fn rank(precedence: &[Vendor], vendor: Vendor) -> usize {
    precedence
        .iter()
        .position(|v| *v == vendor)
        .unwrap_or(precedence.len() + vendor as usize)
}

/// Assign every requested feature to a vendor.
///
/// Only `candidates` (vendors with a registered recognizer) are considered.
/// A feature with a single candidate pins that vendor. A shared feature goes
/// to the highest-precedence pinned vendor that serves it, otherwise to the
/// highest-precedence candidate overall. Features nobody serves are dropped.
/// When more than one vendor is pinned, `configured_primary` joins the plan
/// (if it is a candidate) to supply the bulk transcript.
pub fn plan_features(
    requested: &FeatureRequestSet,
    candidates: &[Vendor],
    precedence: &[Vendor],
    configured_primary: Vendor,
) -> FeaturePlan {
    let mut ordered: Vec<Vendor> = candidates.to_vec();
    ordered.sort_by_key(|v| rank(precedence, *v));
    ordered.dedup();

    let mut assignments: BTreeMap<Vendor, BTreeSet<RecognitionFeature>> = BTreeMap::new();
    let mut shared = Vec::new();
    let mut dropped = Vec::new();

    for feature in requested.iter() {
        let owners: Vec<Vendor> = ordered
            .iter()
            .copied()
            .filter(|v| feature.supported_by(*v))
            .collect();
        match owners.as_slice() {
            [] => dropped.push(feature),
            [only] => {
                assignments.entry(*only).or_default().insert(feature);
            }
            _ => shared.push((feature, owners)),
        }
    }

    for (feature, owners) in shared {
        let owner = owners
            .iter()
            .copied()
            .find(|v| assignments.contains_key(v))
            .unwrap_or(owners[0]);
        assignments.entry(owner).or_default().insert(feature);
    }

    if !dropped.is_empty() {
        tracing::warn!(
            dropped = ?dropped.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
            "No registered vendor serves some requested features; dropping them"
        );
    }

    if assignments.len() > 1 && ordered.contains(&configured_primary) {
        assignments.entry(configured_primary).or_default();
    }

    let primary = if assignments.contains_key(&configured_primary) {
        Some(configured_primary)
    } else {
        ordered
            .iter()
            .copied()
            .find(|v| assignments.contains_key(v))
    };

    FeaturePlan {
        assignments: assignments
            .into_iter()
            .map(|(vendor, features)| (vendor, FeatureRequestSet(features)))
            .collect(),
        primary,
        dropped,
    }
}
