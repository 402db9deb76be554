//! Combined recognition: feature routing, merge provenance and failure
//! reporting across several vendors.

mod helpers;

use helpers::{StubBehavior, StubRecognizer, TestEnv};
use skybridge_core::models::RecognitionRequest;
use skybridge_core::{Config, FeatureRequestSet, RecognitionFeature, SkybridgeError, Vendor};
use skybridge_services::ServiceRegistry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct Stubs {
    aws: Arc<StubRecognizer>,
    gcp: Arc<StubRecognizer>,
    azure: Arc<StubRecognizer>,
}

impl Stubs {
    fn new(aws: StubRecognizer, gcp: StubRecognizer, azure: StubRecognizer) -> Self {
        Self {
            aws: Arc::new(aws),
            gcp: Arc::new(gcp),
            azure: Arc::new(azure),
        }
    }

    fn all_succeeding() -> Self {
        Self::new(
            StubRecognizer::new(Vendor::Aws),
            StubRecognizer::new(Vendor::Gcp),
            StubRecognizer::new(Vendor::Azure),
        )
    }

    fn registry(&self) -> ServiceRegistry {
        let mut registry = ServiceRegistry::new();
        registry.register_recognizer(self.aws.clone());
        registry.register_recognizer(self.gcp.clone());
        registry.register_recognizer(self.azure.clone());
        registry
    }
}

fn request(url: &str, features: &[RecognitionFeature]) -> RecognitionRequest {
    RecognitionRequest::new(url, "en-US").with_features(FeatureRequestSet::new(features.iter().copied()))
}

async fn seeded_audio(env: &TestEnv) -> String {
    env.seed(Vendor::Gcp, "audio-in", "us-central1", "talk.wav", b"RIFF....WAVE")
        .await
}

#[tokio::test]
async fn test_fields_come_from_their_assigned_vendors() {
    let env = TestEnv::new();
    let url = seeded_audio(&env).await;
    let stubs = Stubs::all_succeeding();
    let service = env.service(Config::default(), stubs.registry());

    let response = service
        .recognize_speech(
            &request(&url, &[RecognitionFeature::SrtSubtitles, RecognitionFeature::NoiseRatio]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.vendor_used, Vendor::Gcp);
    assert_eq!(response.region_used, "us-central1");
    let transcript = response.output;
    assert_eq!(transcript.full_transcript, "gcp transcript");
    assert_eq!(transcript.words[0].content, "gcp");
    assert_eq!(transcript.srt_subtitles.as_deref(), Some("aws srt"));
    assert_eq!(transcript.vtt_subtitles, None);
    assert_eq!(transcript.signal_to_noise_ratio, Some(3.0));

    let aws = stubs.aws.calls();
    assert_eq!(aws.len(), 1);
    assert_eq!(aws[0].features, FeatureRequestSet::new([RecognitionFeature::SrtSubtitles]));
    assert_eq!(aws[0].region, "us-east-1");

    let azure = stubs.azure.calls();
    assert_eq!(azure[0].features, FeatureRequestSet::new([RecognitionFeature::NoiseRatio]));
    assert_eq!(azure[0].region, "germanywestcentral");

    let gcp = stubs.gcp.calls();
    assert!(gcp[0].features.is_empty());
}

#[tokio::test]
async fn test_shared_feature_goes_to_highest_precedence_capable_vendor() {
    let env = TestEnv::new();
    let url = seeded_audio(&env).await;
    let stubs = Stubs::all_succeeding();
    let service = env.service(Config::default(), stubs.registry());

    let response = service
        .recognize_speech(
            &request(
                &url,
                &[
                    RecognitionFeature::SrtSubtitles,
                    RecognitionFeature::VttSubtitles,
                    RecognitionFeature::SpokenPunctuation,
                ],
            ),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.vendor_used, Vendor::Gcp);
    assert_eq!(response.output.srt_subtitles.as_deref(), Some("aws srt"));
    assert_eq!(response.output.vtt_subtitles.as_deref(), Some("aws vtt"));
    assert_eq!(response.output.signal_to_noise_ratio, None);

    assert_eq!(
        stubs.gcp.calls()[0].features,
        FeatureRequestSet::new([RecognitionFeature::SpokenPunctuation])
    );
    assert!(stubs.azure.calls().is_empty());
}

#[tokio::test]
async fn test_precedence_changes_shared_feature_owner() {
    let env = TestEnv::new();
    let url = seeded_audio(&env).await;
    let stubs = Stubs::all_succeeding();
    let config = Config {
        vendor_precedence: vec![Vendor::Azure, Vendor::Gcp, Vendor::Aws],
        ..Config::default()
    };
    let service = env.service(config, stubs.registry());

    service
        .recognize_speech(
            &request(
                &url,
                &[RecognitionFeature::NoiseRatio, RecognitionFeature::ProfanityFilter],
            ),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    // Azure is pinned by NoiseRatio and also serves ProfanityFilter.
    assert_eq!(
        stubs.azure.calls()[0].features,
        FeatureRequestSet::new([RecognitionFeature::NoiseRatio, RecognitionFeature::ProfanityFilter])
    );
    assert!(stubs.gcp.calls().is_empty());
    assert!(stubs.aws.calls().is_empty());
}

#[tokio::test]
async fn test_single_vendor_plan_does_not_fan_out() {
    let env = TestEnv::new();
    let url = seeded_audio(&env).await;
    let stubs = Stubs::all_succeeding();
    let service = env.service(Config::default(), stubs.registry());

    let response = service
        .recognize_speech(
            &request(&url, &[RecognitionFeature::VttSubtitles]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.vendor_used, Vendor::Aws);
    assert_eq!(response.region_used, "us-east-1");
    assert_eq!(response.output.full_transcript, "aws transcript");
    assert!(stubs.gcp.calls().is_empty());
    assert!(stubs.azure.calls().is_empty());
}

#[tokio::test]
async fn test_no_features_follows_resolution_policy() {
    let env = TestEnv::new();
    let url = seeded_audio(&env).await;
    let stubs = Stubs::all_succeeding();
    let service = env.service(Config::default(), stubs.registry());

    let response = service
        .recognize_speech(&request(&url, &[]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.vendor_used, Vendor::Gcp);
    assert_eq!(response.region_used, "us-central1");
    assert_eq!(stubs.gcp.calls().len(), 1);
}

#[tokio::test]
async fn test_failed_branch_reports_every_failure() {
    let env = TestEnv::new();
    let url = seeded_audio(&env).await;
    let stubs = Stubs::new(
        StubRecognizer::new(Vendor::Aws),
        StubRecognizer::new(Vendor::Gcp),
        StubRecognizer::new(Vendor::Azure).with_behavior(StubBehavior::Fail),
    );
    let service = env.service(Config::default(), stubs.registry());

    let err = service
        .recognize_speech(
            &request(&url, &[RecognitionFeature::SrtSubtitles, RecognitionFeature::NoiseRatio]),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match err {
        SkybridgeError::PartialCombinationFailure { failures, succeeded } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].vendor, Vendor::Azure);
            assert!(failures[0].message.contains("service unavailable"));
            assert_eq!(succeeded, vec![Vendor::Aws, Vendor::Gcp]);
        }
        other => panic!("expected PartialCombinationFailure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancelled_fan_out_releases_branch_staging() {
    let env = TestEnv::new();
    let url = seeded_audio(&env).await;
    let stubs = Stubs::new(
        StubRecognizer::new(Vendor::Aws)
            .staging()
            .with_behavior(StubBehavior::Hang),
        StubRecognizer::new(Vendor::Gcp),
        StubRecognizer::new(Vendor::Azure),
    );
    let service = env.service(Config::default(), stubs.registry());
    let cancel = CancellationToken::new();

    let aws = stubs.aws.clone();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        aws.entered.notified().await;
        trigger.cancel();
    });

    let err = service
        .recognize_speech(&request(&url, &[RecognitionFeature::SrtSubtitles, RecognitionFeature::SpokenEmoji]), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, SkybridgeError::JobCancelled { .. }));
    let staged = stubs.aws.calls()[0].staged_container.clone().unwrap();
    assert!(env.wait_for_no_staging(Vendor::Aws).await.is_empty());
    assert!(!env.backend(Vendor::Aws).inner.container_exists(&staged).await);
}

#[tokio::test]
async fn test_vendor_override_bypasses_combination() {
    let env = TestEnv::new();
    let url = seeded_audio(&env).await;
    let stubs = Stubs::all_succeeding();
    let service = env.service(Config::default(), stubs.registry());

    let mut req = request(&url, &[RecognitionFeature::SrtSubtitles, RecognitionFeature::NoiseRatio]);
    req.overrides.vendor = Some(Vendor::Azure);
    let response = service
        .recognize_speech(&req, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.vendor_used, Vendor::Azure);
    assert_eq!(
        stubs.azure.calls()[0].features,
        FeatureRequestSet::new([RecognitionFeature::NoiseRatio])
    );
    assert!(stubs.aws.calls().is_empty());
}
