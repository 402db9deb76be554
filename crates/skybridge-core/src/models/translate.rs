use serde::{Deserialize, Serialize};

use crate::resolution::VendorOverride;

#[derive(Debug, Clone, Default)]
pub struct TranslationRequest {
    pub input_location: String,
    /// BCP-47 code of the language to translate into.
    pub target_language: String,
    pub overrides: VendorOverride,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub text: String,
}
