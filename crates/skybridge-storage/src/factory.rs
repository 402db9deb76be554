use crate::facade::StorageFacade;
use crate::memory::InMemoryStorage;
use crate::registry::BackendRegistry;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::StorageResult;
use skybridge_core::{Config, Vendor};
use std::sync::Arc;

/// Build the backend registry for this process
///
/// With `storage-s3`, Aws is served by S3. Gcp and Azure backends are
/// registered by the embedding application through [`BackendRegistry::register`].
pub async fn create_registry(config: &Config) -> StorageResult<BackendRegistry> {
    #[allow(unused_mut)]
    let mut registry = BackendRegistry::new();

    #[cfg(feature = "storage-s3")]
    {
        let storage = S3Storage::new(config.defaults.region_for(Vendor::Aws)).await?;
        registry.register(Arc::new(storage));
    }

    #[cfg(not(feature = "storage-s3"))]
    tracing::warn!(
        environment = %config.environment,
        "No vendor storage compiled in (storage-s3 feature not enabled)"
    );

    Ok(registry)
}

/// Registry with an in-memory emulator for every vendor, for dry runs.
pub fn create_in_memory_registry() -> BackendRegistry {
    Vendor::ALL
        .into_iter()
        .fold(BackendRegistry::new(), |registry, vendor| {
            registry.with(Arc::new(InMemoryStorage::new(vendor)))
        })
}

pub async fn create_storage_facade(config: &Config, dry_run: bool) -> StorageResult<StorageFacade> {
    let registry = if dry_run {
        create_in_memory_registry()
    } else {
        create_registry(config).await?
    };
    Ok(StorageFacade::new(registry))
}
