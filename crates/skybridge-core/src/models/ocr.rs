use serde::{Deserialize, Serialize};

use crate::resolution::VendorOverride;

#[derive(Debug, Clone, Default)]
pub struct TextExtractionRequest {
    pub input_location: String,
    pub overrides: VendorOverride,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
}
