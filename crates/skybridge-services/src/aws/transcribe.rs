//! Aws speech recognition via Transcribe
//!
//! Transcribe only reads media from S3, so input living anywhere else is
//! staged into a temporary bucket in the resolved region first. The job
//! itself runs through the async job driver; the transcript and any
//! subtitle files are downloaded over HTTPS once it completes.

use crate::providers::{vendor_error, OperationContext, SpeechRecognizer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_transcribe::types::{
    LanguageCode, Media, Settings, SubtitleFormat, Subtitles, TranscriptionJob,
    TranscriptionJobStatus,
};
use aws_sdk_transcribe::Client as TranscribeClient;
use serde::Deserialize;
use skybridge_core::models::{RecognitionRequest, Transcript, Word};
use skybridge_core::{
    LocationDescriptor, RecognitionFeature, RemoteLocation, ResolvedTarget, Vendor,
};
use skybridge_jobs::JobOperations;
use skybridge_storage::StagedLocation;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct TranscriptionResult {
    results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptResults {
    transcripts: Vec<TranscriptText>,
    #[serde(default)]
    items: Vec<TranscriptItem>,
}

#[derive(Debug, Deserialize)]
struct TranscriptText {
    transcript: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptItem {
    #[serde(rename = "type")]
    kind: String,
    start_time: Option<String>,
    end_time: Option<String>,
    alternatives: Vec<ItemAlternative>,
}

/// Transcribe reports confidences as strings.
#[derive(Debug, Deserialize)]
struct ItemAlternative {
    content: Option<String>,
    confidence: Option<String>,
}

fn parse_seconds(value: Option<&String>) -> Option<f64> {
    value.and_then(|v| v.parse::<f64>().ok())
}

fn into_transcript(result: TranscriptionResult) -> Transcript {
    let full_transcript = result
        .results
        .transcripts
        .into_iter()
        .filter_map(|t| t.transcript)
        .collect::<Vec<_>>()
        .join(" ");

    let words = result
        .results
        .items
        .iter()
        .filter_map(|item| {
            let alternative = item.alternatives.first()?;
            let timed = item.kind == "pronunciation";
            Some(Word {
                content: alternative.content.clone().unwrap_or_default(),
                confidence: alternative
                    .confidence
                    .as_deref()
                    .and_then(|c| c.parse::<f32>().ok())
                    .unwrap_or(0.0),
                start_time: parse_seconds(item.start_time.as_ref()).filter(|_| timed),
                end_time: parse_seconds(item.end_time.as_ref()).filter(|_| timed),
            })
        })
        .collect();

    Transcript {
        full_transcript,
        words,
        ..Transcript::default()
    }
}

/// One Transcribe job, driven by [`skybridge_jobs::JobDriver`].
struct TranscribeJob {
    client: TranscribeClient,
    job_name: String,
    media_uri: String,
    language_code: String,
    sample_rate_hertz: u32,
    channel_count: u16,
    subtitles: Vec<SubtitleFormat>,
}

#[async_trait]
impl JobOperations for TranscribeJob {
    type Status = TranscriptionJob;

    async fn submit(&self) -> Result<String> {
        let media = Media::builder().media_file_uri(&self.media_uri).build();
        let mut request = self
            .client
            .start_transcription_job()
            .transcription_job_name(&self.job_name)
            .media(media)
            .language_code(LanguageCode::from(self.language_code.as_str()))
            .media_sample_rate_hertz(self.sample_rate_hertz as i32);

        if self.channel_count > 1 {
            request = request.settings(Settings::builder().channel_identification(true).build());
        }

        if !self.subtitles.is_empty() {
            request = request.subtitles(
                Subtitles::builder()
                    .set_formats(Some(self.subtitles.clone()))
                    .output_start_index(1)
                    .build(),
            );
        }

        request
            .send()
            .await
            .context("Failed to start transcription job")?;

        tracing::info!(
            job_id = %self.job_name,
            media_uri = %self.media_uri,
            "Transcription job started"
        );
        Ok(self.job_name.clone())
    }

    async fn poll(&self, job_id: &str) -> Result<TranscriptionJob> {
        let response = self
            .client
            .get_transcription_job()
            .transcription_job_name(job_id)
            .send()
            .await
            .context("Failed to get transcription job status")?;

        response
            .transcription_job()
            .cloned()
            .context("Transcription job not found in response")
    }

    fn is_terminal(&self, status: &TranscriptionJob) -> bool {
        matches!(
            status.transcription_job_status(),
            Some(TranscriptionJobStatus::Completed) | Some(TranscriptionJobStatus::Failed)
        )
    }

    fn is_success(&self, status: &TranscriptionJob) -> bool {
        matches!(
            status.transcription_job_status(),
            Some(TranscriptionJobStatus::Completed)
        )
    }

    fn failure_message(&self, status: &TranscriptionJob) -> String {
        status
            .failure_reason()
            .unwrap_or("Unknown error")
            .to_string()
    }

    /// Transcribe cannot stop a running job; deleting it is the closest thing.
    async fn cancel(&self, job_id: &str) -> Result<()> {
        self.client
            .delete_transcription_job()
            .transcription_job_name(job_id)
            .send()
            .await
            .context("Failed to delete transcription job")?;
        Ok(())
    }
}

/// Aws speech recognizer
pub struct AwsTranscribeRecognizer {
    http: reqwest::Client,
}

impl Default for AwsTranscribeRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for AwsTranscribeRecognizer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AwsTranscribeRecognizer").finish()
    }
}

impl AwsTranscribeRecognizer {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Create Transcribe client for the given region
    async fn create_client(region: &str) -> TranscribeClient {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        TranscribeClient::new(&config)
    }

    async fn download(&self, uri: &str) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(uri)
            .send()
            .await
            .context("Failed to download transcription output")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Failed to download transcription output: HTTP {}",
                response.status()
            ));
        }
        Ok(response)
    }

    /// Run a job against media already in S3.
    async fn transcribe(
        &self,
        ctx: &OperationContext,
        target: &ResolvedTarget,
        request: &RecognitionRequest,
        media_uri: String,
    ) -> Result<Transcript> {
        let mut subtitles = Vec::new();
        if request.features.contains(RecognitionFeature::SrtSubtitles) {
            subtitles.push(SubtitleFormat::Srt);
        }
        if request.features.contains(RecognitionFeature::VttSubtitles) {
            subtitles.push(SubtitleFormat::Vtt);
        }

        let job = TranscribeJob {
            client: Self::create_client(&target.region).await,
            job_name: format!("skybridge-{}", Uuid::new_v4().simple()),
            media_uri,
            language_code: request.language_code.clone(),
            sample_rate_hertz: request.sample_rate_hertz,
            channel_count: request.channel_count,
            subtitles,
        };

        let finished = ctx.jobs.run_to_completion(&job, &ctx.cancel).await?;
        let status = finished
            .status
            .context("Completed transcription job carried no status")?;

        let transcript_uri = status
            .transcript()
            .and_then(|t| t.transcript_file_uri())
            .context("Transcript URI not found")?;
        let result: TranscriptionResult = self
            .download(transcript_uri)
            .await?
            .json()
            .await
            .context("Failed to parse transcript JSON")?;

        let mut transcript = into_transcript(result);

        let subtitle_uris = status
            .subtitles
            .as_ref()
            .and_then(|s| s.subtitle_file_uris.clone())
            .unwrap_or_default();
        for uri in subtitle_uris {
            let path = uri.split('?').next().unwrap_or(&uri);
            let text = self
                .download(&uri)
                .await?
                .text()
                .await
                .context("Failed to read subtitle file")?;
            if path.ends_with(".srt") {
                transcript.srt_subtitles = Some(text);
            } else if path.ends_with(".vtt") {
                transcript.vtt_subtitles = Some(text);
            }
        }

        if let Err(e) = job.cancel(&finished.id).await {
            tracing::debug!(job_id = %finished.id, error = %e, "Could not delete finished transcription job");
        }

        tracing::info!(
            job_id = %finished.id,
            polls = finished.polls,
            words = transcript.words.len(),
            text_length = transcript.full_transcript.len(),
            "Transcription completed successfully"
        );
        Ok(transcript)
    }
}

fn s3_uri(remote: &RemoteLocation) -> String {
    format!("s3://{}/{}", remote.container, remote.key)
}

fn staged_uri(staged: &StagedLocation) -> String {
    format!("s3://{}/{}", staged.resource.container_name, staged.object_key)
}

#[async_trait]
impl SpeechRecognizer for AwsTranscribeRecognizer {
    fn vendor(&self) -> Vendor {
        Vendor::Aws
    }

    async fn recognize(
        &self,
        ctx: &OperationContext,
        target: &ResolvedTarget,
        request: &RecognitionRequest,
    ) -> Result<Transcript> {
        tracing::info!(
            input = %request.input_location,
            region = %target.region,
            language = %request.language_code,
            "Executing Aws Transcribe recognition"
        );

        let descriptor = LocationDescriptor::parse(&request.input_location)?;
        if let Some(remote) = descriptor.as_remote().filter(|r| r.vendor == Vendor::Aws) {
            return self.transcribe(ctx, target, request, s3_uri(remote)).await;
        }

        let transcript = ctx
            .staging
            .with_staged_copy(
                &request.input_location,
                Vendor::Aws,
                &target.region,
                &ctx.cancel,
                |staged| async move {
                    self.transcribe(ctx, target, request, staged_uri(&staged))
                        .await
                        .map_err(|e| vendor_error(Vendor::Aws, e))
                },
            )
            .await?;
        Ok(transcript)
    }
}
