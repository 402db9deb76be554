//! Staging resource manager
//!
//! Copies input into a short-lived container owned by the vendor that will
//! process it, runs a body against the copy, and deletes the container on
//! every exit path. The container is owned by a guard from creation until
//! explicit cleanup; if the enclosing future is dropped the guard hands the
//! deletion to the current tokio runtime.
//!
//! The body receives the same cancellation token and is always awaited to
//! its end, so a nested job gets to stop its vendor-side work before the
//! container goes away.

use crate::facade::StorageFacade;
use chrono::{DateTime, Utc};
use skybridge_core::{object_url, LocationDescriptor, SkybridgeError, SkybridgeResult, Vendor};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const STAGING_PREFIX: &str = "skybridge-stg-";

/// A transient container. Exclusively owned by the call that created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingResource {
    pub vendor: Vendor,
    pub region: String,
    pub container_name: String,
    pub created_at: DateTime<Utc>,
}

/// The staged copy handed to the body.
#[derive(Debug, Clone)]
pub struct StagedLocation {
    pub resource: StagingResource,
    pub object_key: String,
    /// Canonical vendor URL of the staged object.
    pub url: String,
    pub descriptor: LocationDescriptor,
}

/// Collision-resistant container name, valid for S3, GCS and Azure.
pub fn staging_container_name() -> String {
    format!("{}{}", STAGING_PREFIX, Uuid::new_v4().simple())
}

fn staging_object_key(source: &LocationDescriptor) -> String {
    match source.file_extension() {
        Some(ext) => format!("{}.{}", Uuid::new_v4().simple(), ext),
        None => Uuid::new_v4().simple().to_string(),
    }
}

struct StagingGuard {
    facade: Arc<StorageFacade>,
    resource: Option<StagingResource>,
}

impl StagingGuard {
    /// Delete the container now. Runs at most once per guard.
    async fn release(&mut self) -> SkybridgeResult<()> {
        let Some(resource) = self.resource.take() else {
            return Ok(());
        };
        let start = std::time::Instant::now();
        self.facade
            .delete_container(resource.vendor, &resource.container_name, &resource.region)
            .await?;
        tracing::info!(
            vendor = %resource.vendor,
            region = %resource.region,
            container = %resource.container_name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Staging container released"
        );
        Ok(())
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        let Some(resource) = self.resource.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(
                    vendor = %resource.vendor,
                    container = %resource.container_name,
                    "Staged operation dropped; releasing container in background"
                );
                let facade = self.facade.clone();
                handle.spawn(async move {
                    if let Err(e) = facade
                        .delete_container(resource.vendor, &resource.container_name, &resource.region)
                        .await
                    {
                        tracing::warn!(
                            error = %e,
                            vendor = %resource.vendor,
                            container = %resource.container_name,
                            "Background staging cleanup failed"
                        );
                    }
                });
            }
            Err(_) => tracing::error!(
                vendor = %resource.vendor,
                container = %resource.container_name,
                "No runtime available; staging container leaked"
            ),
        }
    }
}

#[derive(Clone)]
pub struct StagingManager {
    facade: Arc<StorageFacade>,
    azure_account: Option<String>,
}

impl StagingManager {
    pub fn new(facade: Arc<StorageFacade>) -> Self {
        Self {
            facade,
            azure_account: None,
        }
    }

    /// Storage account that Azure staging containers live in.
    pub fn with_azure_account(mut self, account: Option<String>) -> Self {
        self.azure_account = account;
        self
    }

    pub fn facade(&self) -> &Arc<StorageFacade> {
        &self.facade
    }

    /// Run `body` against a copy of `source` staged in `vendor`/`region`.
    ///
    /// If creating the container fails the body never runs and nothing is
    /// cleaned up. Otherwise the container is deleted exactly once whatever
    /// the outcome; a cleanup failure is logged and never replaces the body's
    /// result. Cancellation is checked after copy-in; after that the body
    /// owns it and is expected to return once `cancel` fires.
    pub async fn with_staged_copy<F, Fut, T>(
        &self,
        source: &str,
        vendor: Vendor,
        region: &str,
        cancel: &CancellationToken,
        body: F,
    ) -> SkybridgeResult<T>
    where
        F: FnOnce(StagedLocation) -> Fut,
        Fut: Future<Output = SkybridgeResult<T>>,
    {
        let source = LocationDescriptor::parse(source)?;
        let container_name = staging_container_name();
        let object_key = staging_object_key(&source);
        let url = object_url(
            vendor,
            Some(region),
            self.azure_account.as_deref(),
            &container_name,
            &object_key,
        )
        .map_err(|e| SkybridgeError::StagingFailure {
            vendor,
            reason: format!("addressing staged copy: {}", e),
        })?;
        let descriptor = LocationDescriptor::parse(&url)?;

        self.facade
            .create_container(vendor, &container_name, region)
            .await
            .map_err(|e| SkybridgeError::StagingFailure {
                vendor,
                reason: format!("creating container {}: {}", container_name, e),
            })?;

        let resource = StagingResource {
            vendor,
            region: region.to_string(),
            container_name,
            created_at: Utc::now(),
        };
        tracing::info!(
            vendor = %vendor,
            region = %region,
            container = %resource.container_name,
            source = %source,
            "Staging container created"
        );

        let mut guard = StagingGuard {
            facade: self.facade.clone(),
            resource: Some(resource.clone()),
        };

        let staged = StagedLocation {
            resource,
            object_key,
            url,
            descriptor,
        };
        let outcome = self.run_staged(&source, staged, cancel, body).await;

        if let Err(e) = guard.release().await {
            tracing::warn!(
                error = %e,
                vendor = %vendor,
                region = %region,
                "Staging cleanup failed"
            );
        }

        outcome
    }

    async fn run_staged<F, Fut, T>(
        &self,
        source: &LocationDescriptor,
        staged: StagedLocation,
        cancel: &CancellationToken,
        body: F,
    ) -> SkybridgeResult<T>
    where
        F: FnOnce(StagedLocation) -> Fut,
        Fut: Future<Output = SkybridgeResult<T>>,
    {
        let vendor = staged.resource.vendor;

        let copy_in = async {
            let data = self.facade.read_descriptor(source).await?;
            let size = data.len();
            self.facade.write_descriptor(data, &staged.descriptor).await?;
            Ok::<usize, SkybridgeError>(size)
        };
        let size = copy_in
            .await
            .map_err(|e| SkybridgeError::StagingFailure {
                vendor,
                reason: format!("copying {} into {}: {}", source, staged.url, e),
            })?;

        tracing::debug!(
            vendor = %vendor,
            container = %staged.resource.container_name,
            key = %staged.object_key,
            size_bytes = size,
            "Staged input copied"
        );

        if cancel.is_cancelled() {
            return Err(SkybridgeError::JobCancelled { job_id: None });
        }

        body(staged).await
    }
}
