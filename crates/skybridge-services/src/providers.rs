//! Vendor provider traits
//!
//! One trait per cognitive operation. Vendor implementations receive the
//! already resolved target and an [`OperationContext`] carrying the shared
//! storage, staging and job collaborators. They report failures as
//! `anyhow::Error`; a `SkybridgeError` inside the chain is preserved when the
//! service maps the failure back into the unified taxonomy.

use async_trait::async_trait;
use skybridge_core::models::{
    ExtractedText, RecognitionRequest, SentimentRequest, SentimentResult, SynthesisRequest,
    SynthesizedAudio, TextExtractionRequest, Transcript, Translation, TranslationRequest,
};
use skybridge_core::{ResolvedTarget, SkybridgeError, Vendor};
use skybridge_jobs::JobDriver;
use skybridge_storage::{StagingManager, StorageFacade};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared collaborators handed to every vendor call.
#[derive(Clone)]
pub struct OperationContext {
    pub storage: Arc<StorageFacade>,
    pub staging: StagingManager,
    pub jobs: JobDriver,
    pub cancel: CancellationToken,
}

impl OperationContext {
    /// Same collaborators observing a different cancellation token.
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    fn vendor(&self) -> Vendor;

    async fn extract_text(
        &self,
        ctx: &OperationContext,
        target: &ResolvedTarget,
        request: &TextExtractionRequest,
    ) -> anyhow::Result<ExtractedText>;
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// Recognize speech honoring only `request.features`, which the caller
    /// has already narrowed to what this vendor supports.
    async fn recognize(
        &self,
        ctx: &OperationContext,
        target: &ResolvedTarget,
        request: &RecognitionRequest,
    ) -> anyhow::Result<Transcript>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn vendor(&self) -> Vendor;

    async fn synthesize(
        &self,
        ctx: &OperationContext,
        target: &ResolvedTarget,
        request: &SynthesisRequest,
    ) -> anyhow::Result<SynthesizedAudio>;
}

#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    fn vendor(&self) -> Vendor;

    async fn detect_sentiment(
        &self,
        ctx: &OperationContext,
        target: &ResolvedTarget,
        request: &SentimentRequest,
    ) -> anyhow::Result<SentimentResult>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    fn vendor(&self) -> Vendor;

    async fn translate(
        &self,
        ctx: &OperationContext,
        target: &ResolvedTarget,
        request: &TranslationRequest,
    ) -> anyhow::Result<Translation>;
}

/// Map a vendor failure into the unified taxonomy.
///
/// Errors that already are a `SkybridgeError` (staging, job and storage
/// failures surfaced through the adapter) keep their kind.
pub fn vendor_error(vendor: Vendor, error: anyhow::Error) -> SkybridgeError {
    match error.downcast::<SkybridgeError>() {
        Ok(e) => e,
        Err(e) => SkybridgeError::Vendor {
            vendor,
            message: format!("{:#}", e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_vendor_error_keeps_taxonomy_errors() {
        let inner: anyhow::Error = SkybridgeError::JobFailed {
            job_id: Some("j-1".to_string()),
            message: "bad audio".to_string(),
        }
        .into();
        let mapped = vendor_error(Vendor::Aws, inner);
        assert!(matches!(mapped, SkybridgeError::JobFailed { .. }));
    }

    #[test]
    fn test_vendor_error_wraps_plain_failures() {
        let plain: anyhow::Result<()> = Err(anyhow::anyhow!("HTTP 503")).context("calling vendor");
        let mapped = vendor_error(Vendor::Azure, plain.unwrap_err());
        match mapped {
            SkybridgeError::Vendor { vendor, message } => {
                assert_eq!(vendor, Vendor::Azure);
                assert_eq!(message, "calling vendor: HTTP 503");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
