//! Multi-vendor recognition combinator
//!
//! Runs one recognition branch per planned vendor concurrently and folds the
//! partial transcripts into one. The fold never mutates a partial: the
//! primary supplies the transcript and words, every other field comes from
//! the vendor that was assigned the corresponding feature.

use crate::providers::{OperationContext, SpeechRecognizer};
use skybridge_core::models::{RecognitionRequest, Transcript};
use skybridge_core::{
    FeaturePlan, RecognitionFeature, ResolvedTarget, SkybridgeError, SkybridgeResult, Vendor,
    VendorFailure,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// One sub-request of a combined recognition.
pub struct Branch {
    pub target: ResolvedTarget,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub request: RecognitionRequest,
}

/// A successful branch outcome.
#[derive(Debug, Clone)]
pub struct PartialTranscript {
    pub target: ResolvedTarget,
    pub transcript: Transcript,
}

/// Run every branch concurrently and wait for all of them.
///
/// Cancelling `ctx.cancel` aborts the remaining branches; any staging they
/// hold is released by its guard. If any branch fails the whole call fails
/// with [`SkybridgeError::PartialCombinationFailure`] listing every failure.
pub async fn fan_out(
    ctx: &OperationContext,
    branches: Vec<Branch>,
) -> SkybridgeResult<Vec<PartialTranscript>> {
    let mut set = JoinSet::new();
    let mut vendors_by_task = HashMap::new();

    for branch in branches {
        let vendor = branch.target.vendor;
        let ctx = ctx.clone();
        let handle = set.spawn(async move {
            let start = Instant::now();
            let result = branch
                .recognizer
                .recognize(&ctx, &branch.target, &branch.request)
                .await;
            tracing::info!(
                vendor = %branch.target.vendor,
                region = %branch.target.region,
                features = ?branch.request.features.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
                success = result.is_ok(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Recognition branch finished"
            );
            (branch.target, result)
        });
        vendors_by_task.insert(handle.id(), vendor);
    }

    let mut partials = Vec::new();
    let mut failures = Vec::new();

    loop {
        let joined = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                tracing::info!(in_flight = set.len(), "Combined recognition cancelled; aborting branches");
                set.abort_all();
                while set.join_next().await.is_some() {}
                return Err(SkybridgeError::JobCancelled { job_id: None });
            }
            joined = set.join_next_with_id() => joined,
        };

        match joined {
            None => break,
            Some(Ok((_, (target, Ok(transcript))))) => {
                partials.push(PartialTranscript { target, transcript });
            }
            Some(Ok((_, (target, Err(e))))) => failures.push(VendorFailure {
                vendor: target.vendor,
                message: format!("{:#}", e),
            }),
            Some(Err(e)) => {
                let vendor = vendors_by_task.get(&e.id()).copied();
                tracing::error!(vendor = ?vendor, error = %e, "Recognition branch aborted");
                if let Some(vendor) = vendor {
                    failures.push(VendorFailure {
                        vendor,
                        message: format!("branch did not complete: {}", e),
                    });
                }
            }
        }
    }

    if failures.is_empty() {
        return Ok(partials);
    }

    failures.sort_by_key(|f| f.vendor);
    let mut succeeded: Vec<Vendor> = partials.iter().map(|p| p.target.vendor).collect();
    succeeded.sort();
    tracing::warn!(
        failed = ?failures.iter().map(|f| f.vendor).collect::<Vec<_>>(),
        succeeded = ?succeeded,
        "Combined recognition partially failed"
    );
    Err(SkybridgeError::PartialCombinationFailure {
        failures,
        succeeded,
    })
}

/// Fold partial transcripts according to `plan`.
///
/// Returns the merged transcript and the primary's target.
pub fn merge(
    plan: &FeaturePlan,
    partials: &[PartialTranscript],
) -> SkybridgeResult<(Transcript, ResolvedTarget)> {
    let find = |vendor: Option<Vendor>| {
        vendor.and_then(|v| partials.iter().find(|p| p.target.vendor == v))
    };

    let primary = find(plan.primary()).ok_or_else(|| {
        SkybridgeError::InvalidInput("combined recognition produced no primary transcript".to_string())
    })?;
    let from_owner = |feature: RecognitionFeature| find(plan.owner_of(feature)).map(|p| &p.transcript);

    let merged = Transcript {
        full_transcript: primary.transcript.full_transcript.clone(),
        words: primary.transcript.words.clone(),
        srt_subtitles: from_owner(RecognitionFeature::SrtSubtitles)
            .and_then(|t| t.srt_subtitles.clone()),
        vtt_subtitles: from_owner(RecognitionFeature::VttSubtitles)
            .and_then(|t| t.vtt_subtitles.clone()),
        signal_to_noise_ratio: from_owner(RecognitionFeature::NoiseRatio)
            .and_then(|t| t.signal_to_noise_ratio),
    };

    Ok((merged, primary.target.clone()))
}
