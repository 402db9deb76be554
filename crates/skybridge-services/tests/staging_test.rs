//! Staging lifecycle: the transient container is released on every exit path.

mod helpers;

use async_trait::async_trait;
use helpers::{TestEnv, AZURE_ACCOUNT};
use skybridge_core::{LocationDescriptor, SkybridgeError, Vendor};
use skybridge_jobs::{JobDriver, JobDriverConfig, JobOperations};
use skybridge_storage::StagingManager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A vendor job that stays in progress until it is cancelled.
#[derive(Default)]
struct EndlessJob {
    vendor_cancelled: AtomicBool,
}

#[async_trait]
impl JobOperations for EndlessJob {
    type Status = &'static str;

    async fn submit(&self) -> anyhow::Result<String> {
        Ok("stt-job-1".to_string())
    }

    async fn poll(&self, _job_id: &str) -> anyhow::Result<Self::Status> {
        Ok("IN_PROGRESS")
    }

    fn is_terminal(&self, _status: &Self::Status) -> bool {
        false
    }

    fn is_success(&self, _status: &Self::Status) -> bool {
        false
    }

    async fn cancel(&self, _job_id: &str) -> anyhow::Result<()> {
        self.vendor_cancelled.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_staged_copy_is_readable_and_released_on_success() {
    let env = TestEnv::new();
    let source = env
        .seed(Vendor::Gcp, "recordings", "europe-west3", "calls/talk.wav", b"RIFF....")
        .await;
    let cancel = CancellationToken::new();
    let storage = env.storage.clone();

    let (container, copied) = env
        .staging()
        .with_staged_copy(&source, Vendor::Aws, "eu-central-1", &cancel, |staged| async move {
            assert!(staged.object_key.ends_with(".wav"));
            assert_eq!(staged.descriptor.vendor(), Some(Vendor::Aws));
            let copied = storage.read(&staged.url).await?;
            Ok((staged.resource.container_name, copied))
        })
        .await
        .unwrap();

    assert_eq!(&copied[..], b"RIFF....");
    assert!(!env.backend(Vendor::Aws).inner.container_exists(&container).await);
    assert!(env.backend(Vendor::Aws).staging_containers().await.is_empty());
}

#[tokio::test]
async fn test_staging_container_released_when_body_fails() {
    let env = TestEnv::new();
    let source = env.seed_local("input/clip.mp3", b"ID3").await;
    let cancel = CancellationToken::new();

    let err = env
        .staging()
        .with_staged_copy(&source, Vendor::Azure, "westeurope", &cancel, |_staged| async {
            Err::<(), _>(SkybridgeError::Vendor {
                vendor: Vendor::Azure,
                message: "recognizer rejected audio".to_string(),
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, SkybridgeError::Vendor { .. }));
    assert!(env.backend(Vendor::Azure).staging_containers().await.is_empty());
}

#[tokio::test]
async fn test_cleanup_failure_does_not_mask_result() {
    let env = TestEnv::new();
    let source = env.seed_local("input/note.txt", b"hello").await;
    env.backend(Vendor::Aws)
        .fail_delete_container
        .store(true, Ordering::SeqCst);
    let cancel = CancellationToken::new();

    let value = env
        .staging()
        .with_staged_copy(&source, Vendor::Aws, "us-west-2", &cancel, |_staged| async { Ok(42) })
        .await
        .unwrap();
    assert_eq!(value, 42);

    let err = env
        .staging()
        .with_staged_copy(&source, Vendor::Aws, "us-west-2", &cancel, |_staged| async {
            Err::<(), _>(SkybridgeError::InvalidInput("body error".to_string()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SkybridgeError::InvalidInput(ref m) if m == "body error"));
}

#[tokio::test]
async fn test_creation_failure_skips_body_and_cleanup() {
    let env = TestEnv::new();
    let source = env.seed_local("input/clip.flac", b"fLaC").await;
    env.backend(Vendor::Gcp).fail_create.store(true, Ordering::SeqCst);
    let ran = AtomicBool::new(false);
    let ran_flag = &ran;
    let cancel = CancellationToken::new();

    let err = env
        .staging()
        .with_staged_copy(&source, Vendor::Gcp, "us", &cancel, move |_staged| async move {
            ran_flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, SkybridgeError::StagingFailure { vendor: Vendor::Gcp, .. }));
    assert!(!ran.load(Ordering::SeqCst));
    assert!(env.backend(Vendor::Gcp).inner.container_names().await.is_empty());
}

#[tokio::test]
async fn test_copy_in_failure_still_releases_container() {
    let env = TestEnv::new();
    let cancel = CancellationToken::new();
    let ran = AtomicBool::new(false);
    let ran_flag = &ran;

    let err = env
        .staging()
        .with_staged_copy("input/missing.wav", Vendor::Aws, "us-east-1", &cancel, move |_staged| async move {
            ran_flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "STAGING_FAILURE");
    assert!(!ran.load(Ordering::SeqCst));
    assert!(env.backend(Vendor::Aws).staging_containers().await.is_empty());
}

#[tokio::test]
async fn test_cancelled_before_body_releases_container() {
    let env = TestEnv::new();
    let source = env.seed_local("input/clip.wav", b"RIFF").await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = env
        .staging()
        .with_staged_copy(&source, Vendor::Aws, "us-east-1", &cancel, |_staged| async { Ok(()) })
        .await
        .unwrap_err();

    assert!(matches!(err, SkybridgeError::JobCancelled { job_id: None }));
    assert!(env.backend(Vendor::Aws).staging_containers().await.is_empty());
}

#[tokio::test]
async fn test_cancel_during_body_releases_container() {
    let env = TestEnv::new();
    let source = env.seed_local("input/clip.wav", b"RIFF").await;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let err = env
        .staging()
        .with_staged_copy(&source, Vendor::Gcp, "us", &cancel, |_staged| async move {
            trigger.cancel();
            trigger.cancelled().await;
            Err::<(), _>(SkybridgeError::JobCancelled {
                job_id: Some("gcp-op-9".to_string()),
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, SkybridgeError::JobCancelled { job_id: Some(ref id) } if id == "gcp-op-9"));
    assert!(env.backend(Vendor::Gcp).staging_containers().await.is_empty());
}

#[tokio::test]
async fn test_cancel_reaches_nested_job_before_release() {
    let env = TestEnv::new();
    let source = env.seed(Vendor::Gcp, "calls", "us", "daily/standup.wav", b"RIFF").await;
    let cancel = CancellationToken::new();
    let jobs = JobDriver::new(JobDriverConfig {
        poll_interval: Duration::from_millis(10),
        max_poll_errors: 3,
    });
    let job = EndlessJob::default();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let (jobs_ref, job_ref, cancel_ref) = (&jobs, &job, &cancel);
    let err = env
        .staging()
        .with_staged_copy(&source, Vendor::Aws, "us-east-1", &cancel, move |_staged| async move {
            jobs_ref.run_to_completion(job_ref, cancel_ref).await.map(|_| ())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, SkybridgeError::JobCancelled { job_id: Some(ref id) } if id == "stt-job-1"));
    assert!(job.vendor_cancelled.load(Ordering::SeqCst));
    assert!(env.backend(Vendor::Aws).staging_containers().await.is_empty());
}

#[tokio::test]
async fn test_azure_staging_addresses_configured_account() {
    let env = TestEnv::new();
    let source = env.seed_local("input/clip.mp3", b"ID3").await;
    let cancel = CancellationToken::new();
    let storage = env.storage.clone();

    let (url, region, container_region) = env
        .staging()
        .with_staged_copy(&source, Vendor::Azure, "westeurope", &cancel, |staged| async move {
            let container = skybridge_core::container_url(
                Vendor::Azure,
                None,
                Some(AZURE_ACCOUNT),
                &staged.resource.container_name,
            )?;
            let container_region = storage.container_region(&container).await?;
            Ok((staged.url, staged.resource.region, container_region))
        })
        .await
        .unwrap();

    assert!(url.starts_with(&format!("https://{}.blob.core.windows.net/", AZURE_ACCOUNT)));
    assert_eq!(region, "westeurope");
    assert_eq!(container_region, "westeurope");
    assert!(env.backend(Vendor::Azure).staging_containers().await.is_empty());
}

#[tokio::test]
async fn test_azure_staging_without_account_creates_nothing() {
    let env = TestEnv::new();
    let source = env.seed_local("input/clip.mp3", b"ID3").await;
    let cancel = CancellationToken::new();

    let err = StagingManager::new(env.storage.clone())
        .with_staged_copy(&source, Vendor::Azure, "westeurope", &cancel, |_staged| async { Ok(()) })
        .await
        .unwrap_err();

    assert!(matches!(err, SkybridgeError::StagingFailure { vendor: Vendor::Azure, .. }));
    assert!(env.backend(Vendor::Azure).inner.container_names().await.is_empty());
}

#[tokio::test]
async fn test_aborted_task_releases_container_in_background() {
    let env = Arc::new(TestEnv::new());
    let source = env.seed_local("input/long.wav", b"RIFF").await;
    let started = Arc::new(tokio::sync::Notify::new());

    let task = {
        let env = env.clone();
        let started = started.clone();
        tokio::spawn(async move {
            let cancel = CancellationToken::new();
            env.staging()
                .with_staged_copy(&source, Vendor::Aws, "eu-west-1", &cancel, |_staged| async move {
                    started.notify_one();
                    std::future::pending::<Result<(), SkybridgeError>>().await
                })
                .await
        })
    };

    started.notified().await;
    assert_eq!(env.backend(Vendor::Aws).staging_containers().await.len(), 1);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert!(env.wait_for_no_staging(Vendor::Aws).await.is_empty());
}

#[tokio::test]
async fn test_staged_descriptor_points_at_staging_vendor() {
    let env = TestEnv::new();
    let source = env.seed(Vendor::Aws, "media", "ap-south-1", "a/b/c.ogg", b"OggS").await;
    let cancel = CancellationToken::new();

    let descriptor = env
        .staging()
        .with_staged_copy(&source, Vendor::Gcp, "asia-south1", &cancel, |staged| async move {
            Ok(staged.descriptor)
        })
        .await
        .unwrap();

    match descriptor {
        LocationDescriptor::Remote(remote) => {
            assert_eq!(remote.vendor, Vendor::Gcp);
            assert!(remote.container.starts_with(skybridge_storage::STAGING_PREFIX));
            assert!(remote.key.ends_with(".ogg"));
        }
        other => panic!("expected remote descriptor, got {:?}", other),
    }
}
