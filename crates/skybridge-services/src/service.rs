//! Cognitive service
//!
//! Vendor-neutral entry point for every operation. Each call parses its input
//! location, resolves the target vendor/region from request overrides and
//! the resolution policy, dispatches to the registered vendor implementation
//! and wraps the output with the vendor and region actually used.

use crate::combinator::{self, Branch};
use crate::providers::{vendor_error, OperationContext};
use crate::registry::ServiceRegistry;
use skybridge_core::models::{
    ExtractedText, OperationResponse, RecognitionRequest, SentimentRequest, SentimentResult,
    SynthesisRequest, SynthesizedAudio, TextExtractionRequest, Transcript, Translation,
    TranslationRequest,
};
use skybridge_core::{
    plan_features, resolve_for_read, resolve_with_overrides, Config, FeatureRequestSet,
    LocationDescriptor, ResolvedTarget, SkybridgeError, SkybridgeResult, Vendor, VendorOverride,
};
use skybridge_jobs::{JobDriver, JobDriverConfig};
use skybridge_storage::{StagingManager, StorageFacade};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct CognitiveService {
    config: Config,
    storage: Arc<StorageFacade>,
    staging: StagingManager,
    jobs: JobDriver,
    registry: ServiceRegistry,
}

fn elapsed_millis(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

impl CognitiveService {
    pub fn new(config: Config, storage: Arc<StorageFacade>, registry: ServiceRegistry) -> Self {
        let jobs = JobDriver::new(JobDriverConfig::from_config(&config));
        Self {
            staging: StagingManager::new(storage.clone())
                .with_azure_account(config.azure_storage_account.clone()),
            config,
            storage,
            jobs,
            registry,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &Arc<StorageFacade> {
        &self.storage
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    fn context(&self, cancel: &CancellationToken) -> OperationContext {
        OperationContext {
            storage: self.storage.clone(),
            staging: self.staging.clone(),
            jobs: self.jobs.clone(),
            cancel: cancel.clone(),
        }
    }

    fn by_precedence(&self, vendors: &[Vendor]) -> Vec<Vendor> {
        let precedence = &self.config.vendor_precedence;
        let mut ordered = vendors.to_vec();
        ordered.sort_by_key(|v| precedence.iter().position(|p| p == v).unwrap_or(precedence.len()));
        ordered
    }

    /// Resolve the target, steering away from vendors that cannot serve the
    /// operation unless the caller pinned the vendor.
    async fn resolve_capable(
        &self,
        descriptor: &LocationDescriptor,
        overrides: &VendorOverride,
        preferred: Option<Vendor>,
        capable: &[Vendor],
    ) -> SkybridgeResult<ResolvedTarget> {
        let target = resolve_with_overrides(
            descriptor,
            overrides,
            preferred,
            &self.config.execution,
            &self.config.defaults,
            self.storage.as_ref(),
        )
        .await?;

        if overrides.vendor.is_some() || capable.contains(&target.vendor) {
            return Ok(target);
        }

        match self.by_precedence(capable).first() {
            Some(fallback) => {
                tracing::debug!(
                    resolved = %target.vendor,
                    fallback = %fallback,
                    "Resolved vendor has no implementation; using next capable vendor"
                );
                resolve_for_read(
                    descriptor,
                    Some(*fallback),
                    &self.config.execution,
                    &self.config.defaults,
                    self.storage.as_ref(),
                )
                .await
            }
            None => Ok(target),
        }
    }

    fn respond<T>(&self, output: T, target: ResolvedTarget, start: Instant) -> OperationResponse<T> {
        OperationResponse {
            output,
            vendor_used: target.vendor,
            region_used: target.region,
            elapsed_millis: elapsed_millis(start),
        }
    }

    #[tracing::instrument(skip(self, request, cancel), fields(input = %request.input_location))]
    pub async fn extract_text(
        &self,
        request: &TextExtractionRequest,
        cancel: &CancellationToken,
    ) -> SkybridgeResult<OperationResponse<ExtractedText>> {
        let start = Instant::now();
        let descriptor = LocationDescriptor::parse(&request.input_location)?;
        let target = self
            .resolve_capable(&descriptor, &request.overrides, None, &self.registry.extractor_vendors())
            .await?;
        let provider = self.registry.extractor(target.vendor)?;

        let output = provider
            .extract_text(&self.context(cancel), &target, request)
            .await
            .map_err(|e| vendor_error(target.vendor, e))?;

        tracing::info!(
            vendor = %target.vendor,
            region = %target.region,
            text_length = output.text.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Text extracted"
        );
        Ok(self.respond(output, target, start))
    }

    /// Recognize speech, combining vendors when the requested features span
    /// more than one of them.
    #[tracing::instrument(skip(self, request, cancel), fields(input = %request.input_location))]
    pub async fn recognize_speech(
        &self,
        request: &RecognitionRequest,
        cancel: &CancellationToken,
    ) -> SkybridgeResult<OperationResponse<Transcript>> {
        let start = Instant::now();
        let descriptor = LocationDescriptor::parse(&request.input_location)?;
        let candidates = self.registry.recognizer_vendors();

        if request.overrides.vendor.is_none() {
            let plan = plan_features(
                &request.features,
                &candidates,
                &self.config.vendor_precedence,
                self.config.recognition_primary_vendor,
            );

            if plan.is_combined() {
                let mut branches = Vec::new();
                for vendor in plan.vendors() {
                    let target = resolve_for_read(
                        &descriptor,
                        Some(vendor),
                        &self.config.execution,
                        &self.config.defaults,
                        self.storage.as_ref(),
                    )
                    .await?;
                    branches.push(Branch {
                        recognizer: self.registry.recognizer(vendor)?,
                        request: request.with_features(plan.features_for(vendor)),
                        target,
                    });
                }

                tracing::info!(
                    vendors = ?plan.vendors(),
                    primary = ?plan.primary(),
                    "Fanning out combined recognition"
                );
                let partials = combinator::fan_out(&self.context(cancel), branches).await?;
                let (transcript, target) = combinator::merge(&plan, &partials)?;
                return Ok(self.respond(transcript, target, start));
            }

            if let Some(vendor) = plan.primary() {
                let overrides = VendorOverride {
                    vendor: Some(vendor),
                    region: None,
                };
                let target = self
                    .resolve_capable(&descriptor, &overrides, None, &candidates)
                    .await?;
                let narrowed = request.with_features(plan.features_for(vendor));
                return self.recognize_single(&narrowed, target, cancel, start).await;
            }
        }

        let target = self
            .resolve_capable(&descriptor, &request.overrides, None, &candidates)
            .await?;
        let supported = FeatureRequestSet::new(
            request
                .features
                .iter()
                .filter(|f| f.supported_by(target.vendor)),
        );
        if supported.len() < request.features.len() {
            tracing::warn!(
                vendor = %target.vendor,
                requested = request.features.len(),
                kept = supported.len(),
                "Pinned vendor does not support every requested feature"
            );
        }
        self.recognize_single(&request.with_features(supported), target, cancel, start)
            .await
    }

    async fn recognize_single(
        &self,
        request: &RecognitionRequest,
        target: ResolvedTarget,
        cancel: &CancellationToken,
        start: Instant,
    ) -> SkybridgeResult<OperationResponse<Transcript>> {
        let provider = self.registry.recognizer(target.vendor)?;
        let transcript = provider
            .recognize(&self.context(cancel), &target, request)
            .await
            .map_err(|e| vendor_error(target.vendor, e))?;

        tracing::info!(
            vendor = %target.vendor,
            region = %target.region,
            words = transcript.words.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Speech recognized"
        );
        Ok(self.respond(transcript, target, start))
    }

    /// Synthesize speech. A format only one vendor can produce pins that
    /// vendor unless the caller overrides it.
    #[tracing::instrument(skip(self, request, cancel), fields(input = %request.input_location, format = %request.audio_format))]
    pub async fn synthesize_speech(
        &self,
        request: &SynthesisRequest,
        cancel: &CancellationToken,
    ) -> SkybridgeResult<OperationResponse<SynthesizedAudio>> {
        let start = Instant::now();
        let descriptor = LocationDescriptor::parse(&request.input_location)?;
        let format = request.audio_format;
        let capable: Vec<Vendor> = self
            .registry
            .synthesizer_vendors()
            .into_iter()
            .filter(|v| format.supported_by(*v))
            .collect();

        let target = self
            .resolve_capable(&descriptor, &request.overrides, format.exclusive_vendor(), &capable)
            .await?;
        if !format.supported_by(target.vendor) {
            return Err(SkybridgeError::InvalidInput(format!(
                "audio format {} is not supported by {}",
                format, target.vendor
            )));
        }
        let provider = self.registry.synthesizer(target.vendor)?;

        let output = provider
            .synthesize(&self.context(cancel), &target, request)
            .await
            .map_err(|e| vendor_error(target.vendor, e))?;

        if let Some(location) = request.output_location.as_deref() {
            self.storage.write(output.audio.clone(), location).await?;
            tracing::info!(output = %location, size_bytes = output.audio.len(), "Synthesized audio written");
        }

        tracing::info!(
            vendor = %target.vendor,
            region = %target.region,
            size_bytes = output.audio.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Speech synthesized"
        );
        Ok(self.respond(output, target, start))
    }

    #[tracing::instrument(skip(self, request, cancel), fields(input = %request.input_location))]
    pub async fn detect_sentiment(
        &self,
        request: &SentimentRequest,
        cancel: &CancellationToken,
    ) -> SkybridgeResult<OperationResponse<SentimentResult>> {
        let start = Instant::now();
        let descriptor = LocationDescriptor::parse(&request.input_location)?;
        let target = self
            .resolve_capable(&descriptor, &request.overrides, None, &self.registry.sentiment_vendors())
            .await?;
        let provider = self.registry.sentiment_analyzer(target.vendor)?;

        let output = provider
            .detect_sentiment(&self.context(cancel), &target, request)
            .await
            .map_err(|e| vendor_error(target.vendor, e))?;

        tracing::info!(
            vendor = %target.vendor,
            region = %target.region,
            sentiment = %output.sentiment,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Sentiment detected"
        );
        Ok(self.respond(output, target, start))
    }

    #[tracing::instrument(skip(self, request, cancel), fields(input = %request.input_location, target_language = %request.target_language))]
    pub async fn translate(
        &self,
        request: &TranslationRequest,
        cancel: &CancellationToken,
    ) -> SkybridgeResult<OperationResponse<Translation>> {
        let start = Instant::now();
        if request.target_language.trim().is_empty() {
            return Err(SkybridgeError::InvalidInput(
                "target language must not be empty".to_string(),
            ));
        }
        let descriptor = LocationDescriptor::parse(&request.input_location)?;
        let target = self
            .resolve_capable(&descriptor, &request.overrides, None, &self.registry.translator_vendors())
            .await?;
        let provider = self.registry.translator(target.vendor)?;

        let output = provider
            .translate(&self.context(cancel), &target, request)
            .await
            .map_err(|e| vendor_error(target.vendor, e))?;

        tracing::info!(
            vendor = %target.vendor,
            region = %target.region,
            text_length = output.text.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Text translated"
        );
        Ok(self.respond(output, target, start))
    }
}
