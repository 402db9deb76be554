//! Test helpers: in-memory vendor storage and scripted vendor stubs.
//!
//! Run from workspace root: `cargo test -p skybridge-services`.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use skybridge_core::models::{
    RecognitionRequest, SynthesisRequest, SynthesizedAudio, Transcript, Translation,
    TranslationRequest, Word,
};
use skybridge_core::{
    object_url, Config, FeatureRequestSet, RemoteLocation, ResolvedTarget, SkybridgeError, Vendor,
};
use skybridge_jobs::{JobDriver, JobDriverConfig};
use skybridge_services::{
    CognitiveService, OperationContext, ServiceRegistry, SpeechRecognizer, SpeechSynthesizer,
    Translator,
};
use skybridge_storage::{
    BackendRegistry, InMemoryStorage, LocalFilesystem, StagingManager, StorageError,
    StorageFacade, StorageResult, VendorStorage, STAGING_PREFIX,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Storage account every Azure URL in the tests lives under.
pub const AZURE_ACCOUNT: &str = "skybridgetest";

/// In-memory backend whose container lifecycle can be made to fail.
pub struct FlakyStorage {
    pub inner: InMemoryStorage,
    pub fail_create: AtomicBool,
    pub fail_delete_container: AtomicBool,
}

impl FlakyStorage {
    pub fn new(vendor: Vendor) -> Self {
        Self {
            inner: InMemoryStorage::new(vendor),
            fail_create: AtomicBool::new(false),
            fail_delete_container: AtomicBool::new(false),
        }
    }

    /// Staging containers that currently exist.
    pub async fn staging_containers(&self) -> Vec<String> {
        self.inner
            .container_names()
            .await
            .into_iter()
            .filter(|name| name.starts_with(STAGING_PREFIX))
            .collect()
    }
}

#[async_trait]
impl VendorStorage for FlakyStorage {
    fn vendor(&self) -> Vendor {
        self.inner.vendor()
    }

    async fn read(&self, location: &RemoteLocation) -> StorageResult<Bytes> {
        self.inner.read(location).await
    }

    async fn write(&self, location: &RemoteLocation, data: Bytes) -> StorageResult<()> {
        self.inner.write(location, data).await
    }

    async fn delete(&self, location: &RemoteLocation) -> StorageResult<bool> {
        self.inner.delete(location).await
    }

    async fn create_container(&self, name: &str, region: &str) -> StorageResult<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(StorageError::BackendError("quota exceeded".to_string()));
        }
        self.inner.create_container(name, region).await
    }

    async fn delete_container(&self, name: &str, region: &str) -> StorageResult<()> {
        if self.fail_delete_container.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed("access denied".to_string()));
        }
        self.inner.delete_container(name, region).await
    }

    async fn list_objects(&self, container: &RemoteLocation) -> StorageResult<Vec<String>> {
        self.inner.list_objects(container).await
    }

    async fn container_region(&self, container: &RemoteLocation) -> StorageResult<Option<String>> {
        self.inner.container_region(container).await
    }
}

/// Storage for every vendor plus a temp-dir local filesystem.
pub struct TestEnv {
    pub backends: HashMap<Vendor, Arc<FlakyStorage>>,
    pub storage: Arc<StorageFacade>,
    pub temp_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut registry = BackendRegistry::new();
        let mut backends = HashMap::new();
        for vendor in Vendor::ALL {
            let backend = Arc::new(FlakyStorage::new(vendor));
            registry.register(backend.clone());
            backends.insert(vendor, backend);
        }
        let storage = Arc::new(StorageFacade::with_local(
            registry,
            LocalFilesystem::with_root(temp_dir.path()),
        ));
        Self {
            backends,
            storage,
            temp_dir,
        }
    }

    pub fn backend(&self, vendor: Vendor) -> &FlakyStorage {
        &self.backends[&vendor]
    }

    /// Create `container` in `region` and store `data` under `key`.
    /// Returns the object's canonical URL.
    pub async fn seed(
        &self,
        vendor: Vendor,
        container: &str,
        region: &str,
        key: &str,
        data: &[u8],
    ) -> String {
        self.storage
            .create_container(vendor, container, region)
            .await
            .expect("Failed to create container");
        let region_in_url = match vendor {
            Vendor::Aws => Some(region),
            Vendor::Gcp | Vendor::Azure => None,
        };
        let url = object_url(vendor, region_in_url, Some(AZURE_ACCOUNT), container, key)
            .expect("Failed to build URL");
        self.storage
            .write(Bytes::copy_from_slice(data), &url)
            .await
            .expect("Failed to seed object");
        url
    }

    /// Seed a local file relative to the temp dir; returns its relative path.
    pub async fn seed_local(&self, path: &str, data: &[u8]) -> String {
        self.storage
            .write(Bytes::copy_from_slice(data), path)
            .await
            .expect("Failed to seed local file");
        path.to_string()
    }

    pub fn staging(&self) -> StagingManager {
        StagingManager::new(self.storage.clone()).with_azure_account(Some(AZURE_ACCOUNT.to_string()))
    }

    pub fn context(&self, cancel: &CancellationToken) -> OperationContext {
        OperationContext {
            storage: self.storage.clone(),
            staging: self.staging(),
            jobs: JobDriver::new(JobDriverConfig::default()),
            cancel: cancel.clone(),
        }
    }

    pub fn service(&self, mut config: Config, registry: ServiceRegistry) -> CognitiveService {
        config
            .azure_storage_account
            .get_or_insert_with(|| AZURE_ACCOUNT.to_string());
        CognitiveService::new(config, self.storage.clone(), registry)
    }

    /// Wait until no staging container remains for `vendor`. Background
    /// cleanup after a task abort runs on a spawned task.
    pub async fn wait_for_no_staging(&self, vendor: Vendor) -> Vec<String> {
        for _ in 0..100 {
            let left = self.backend(vendor).staging_containers().await;
            if left.is_empty() {
                return left;
            }
            tokio::task::yield_now().await;
        }
        self.backend(vendor).staging_containers().await
    }
}

/// A transcript whose every field names the vendor that produced it.
pub fn transcript_from(vendor: Vendor) -> Transcript {
    Transcript {
        full_transcript: format!("{} transcript", vendor),
        words: vec![Word {
            content: vendor.to_string(),
            confidence: 0.9,
            start_time: Some(0.0),
            end_time: Some(0.4),
        }],
        srt_subtitles: Some(format!("{} srt", vendor)),
        vtt_subtitles: Some(format!("{} vtt", vendor)),
        signal_to_noise_ratio: Some(match vendor {
            Vendor::Aws => 1.0,
            Vendor::Gcp => 2.0,
            Vendor::Azure => 3.0,
        }),
    }
}

#[derive(Debug, Clone)]
pub struct RecognitionCall {
    pub features: FeatureRequestSet,
    pub region: String,
    pub staged_container: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubBehavior {
    Succeed,
    Fail,
    /// Never finish on its own; only cancellation ends the call.
    Hang,
}

/// Scripted recognizer that can stage its input the way a real vendor does.
pub struct StubRecognizer {
    vendor: Vendor,
    behavior: StubBehavior,
    stage: bool,
    pub calls: Mutex<Vec<RecognitionCall>>,
    pub entered: tokio::sync::Notify,
}

impl StubRecognizer {
    pub fn new(vendor: Vendor) -> Self {
        Self {
            vendor,
            behavior: StubBehavior::Succeed,
            stage: false,
            calls: Mutex::new(Vec::new()),
            entered: tokio::sync::Notify::new(),
        }
    }

    pub fn with_behavior(mut self, behavior: StubBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn staging(mut self) -> Self {
        self.stage = true;
        self
    }

    pub fn calls(&self) -> Vec<RecognitionCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    async fn respond(&self) -> anyhow::Result<Transcript> {
        self.entered.notify_one();
        match self.behavior {
            StubBehavior::Succeed => Ok(transcript_from(self.vendor)),
            StubBehavior::Fail => Err(anyhow::anyhow!("{} service unavailable", self.vendor)),
            StubBehavior::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl SpeechRecognizer for StubRecognizer {
    fn vendor(&self) -> Vendor {
        self.vendor
    }

    async fn recognize(
        &self,
        ctx: &OperationContext,
        target: &ResolvedTarget,
        request: &RecognitionRequest,
    ) -> anyhow::Result<Transcript> {
        let mut call = RecognitionCall {
            features: request.features.clone(),
            region: target.region.clone(),
            staged_container: None,
        };

        if !self.stage {
            self.calls.lock().expect("calls lock poisoned").push(call);
            return self.respond().await;
        }

        let transcript = ctx
            .staging
            .with_staged_copy(
                &request.input_location,
                self.vendor,
                &target.region,
                &ctx.cancel,
                |staged| async move {
                    call.staged_container = Some(staged.resource.container_name.clone());
                    self.calls.lock().expect("calls lock poisoned").push(call);
                    self.respond().await.map_err(|e| SkybridgeError::Vendor {
                        vendor: self.vendor,
                        message: e.to_string(),
                    })
                },
            )
            .await?;
        Ok(transcript)
    }
}

/// Translator that upper-cases the input text.
pub struct ShoutingTranslator(pub Vendor);

#[async_trait]
impl Translator for ShoutingTranslator {
    fn vendor(&self) -> Vendor {
        self.0
    }

    async fn translate(
        &self,
        ctx: &OperationContext,
        _target: &ResolvedTarget,
        request: &TranslationRequest,
    ) -> anyhow::Result<Translation> {
        let data = ctx.storage.read(&request.input_location).await?;
        Ok(Translation {
            text: format!(
                "[{}] {}",
                request.target_language,
                String::from_utf8_lossy(&data).to_uppercase()
            ),
        })
    }
}

/// Synthesizer that returns the input text bytes as "audio".
pub struct EchoSynthesizer(pub Vendor);

#[async_trait]
impl SpeechSynthesizer for EchoSynthesizer {
    fn vendor(&self) -> Vendor {
        self.0
    }

    async fn synthesize(
        &self,
        ctx: &OperationContext,
        _target: &ResolvedTarget,
        request: &SynthesisRequest,
    ) -> anyhow::Result<SynthesizedAudio> {
        let text = ctx.storage.read(&request.input_location).await?;
        Ok(SynthesizedAudio {
            audio: text,
            format: request.audio_format,
        })
    }
}

pub fn translators_for(vendors: &[Vendor]) -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    for vendor in vendors {
        registry.register_translator(Arc::new(ShoutingTranslator(*vendor)));
    }
    registry
}
