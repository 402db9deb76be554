//! Storage facade
//!
//! Uniform operations over local paths and vendor URLs. Every call parses its
//! location first; local paths go to [`LocalFilesystem`], remote ones to the
//! backend registered for the descriptor's vendor.

use crate::local::LocalFilesystem;
use crate::registry::BackendRegistry;
use crate::traits::VendorStorage;
use async_trait::async_trait;
use bytes::Bytes;
use skybridge_core::{
    LocationDescriptor, RegionLookup, RemoteLocation, SkybridgeError, SkybridgeResult, Vendor,
};
use std::sync::Arc;

pub struct StorageFacade {
    registry: BackendRegistry,
    local: LocalFilesystem,
}

impl StorageFacade {
    pub fn new(registry: BackendRegistry) -> Self {
        Self::with_local(registry, LocalFilesystem::new())
    }

    pub fn with_local(registry: BackendRegistry, local: LocalFilesystem) -> Self {
        Self { registry, local }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    fn backend(&self, vendor: Vendor) -> SkybridgeResult<Arc<dyn VendorStorage>> {
        self.registry.get(vendor)
    }

    pub async fn read(&self, location: &str) -> SkybridgeResult<Bytes> {
        self.read_descriptor(&LocationDescriptor::parse(location)?)
            .await
    }

    pub async fn read_descriptor(&self, descriptor: &LocationDescriptor) -> SkybridgeResult<Bytes> {
        match descriptor {
            LocationDescriptor::Local { path } => {
                self.local.read(path).await.map_err(|e| e.into_skybridge(None))
            }
            LocationDescriptor::Remote(remote) => self
                .backend(remote.vendor)?
                .read(remote)
                .await
                .map_err(|e| e.into_skybridge(Some(remote.vendor))),
        }
    }

    pub async fn write(&self, data: Bytes, location: &str) -> SkybridgeResult<()> {
        self.write_descriptor(data, &LocationDescriptor::parse(location)?)
            .await
    }

    pub async fn write_descriptor(
        &self,
        data: Bytes,
        descriptor: &LocationDescriptor,
    ) -> SkybridgeResult<()> {
        match descriptor {
            LocationDescriptor::Local { path } => self
                .local
                .write(path, &data)
                .await
                .map_err(|e| e.into_skybridge(None)),
            LocationDescriptor::Remote(remote) => self
                .backend(remote.vendor)?
                .write(remote, data)
                .await
                .map_err(|e| e.into_skybridge(Some(remote.vendor))),
        }
    }

    /// Delete an object. A missing object yields `false`, not an error.
    pub async fn delete(&self, location: &str) -> SkybridgeResult<bool> {
        match LocationDescriptor::parse(location)? {
            LocationDescriptor::Local { path } => {
                self.local.delete(&path).await.map_err(|e| e.into_skybridge(None))
            }
            LocationDescriptor::Remote(remote) => self
                .backend(remote.vendor)?
                .delete(&remote)
                .await
                .map_err(|e| e.into_skybridge(Some(remote.vendor))),
        }
    }

    pub async fn create_container(
        &self,
        vendor: Vendor,
        name: &str,
        region: &str,
    ) -> SkybridgeResult<String> {
        validate_container_args(name, region)?;
        self.backend(vendor)?
            .create_container(name, region)
            .await
            .map_err(|e| e.into_skybridge(Some(vendor)))?;
        Ok(name.to_string())
    }

    /// Delete a container and its contents. A missing container raises
    /// [`SkybridgeError::ContainerNotFound`].
    pub async fn delete_container(
        &self,
        vendor: Vendor,
        name: &str,
        region: &str,
    ) -> SkybridgeResult<String> {
        validate_container_args(name, region)?;
        self.backend(vendor)?
            .delete_container(name, region)
            .await
            .map_err(|e| e.into_skybridge(Some(vendor)))?;
        Ok(name.to_string())
    }

    /// Keys in a container (or file names in a local directory).
    /// An existing empty container yields an empty list.
    pub async fn list_objects(&self, container_url: &str) -> SkybridgeResult<Vec<String>> {
        match LocationDescriptor::parse(container_url)? {
            LocationDescriptor::Local { path } => {
                self.local.list(&path).await.map_err(|e| e.into_skybridge(None))
            }
            LocationDescriptor::Remote(remote) => self
                .backend(remote.vendor)?
                .list_objects(&remote)
                .await
                .map_err(|e| e.into_skybridge(Some(remote.vendor))),
        }
    }

    pub async fn container_region(&self, container_url: &str) -> SkybridgeResult<String> {
        let remote = match LocationDescriptor::parse(container_url)? {
            LocationDescriptor::Remote(remote) => remote,
            LocationDescriptor::Local { path } => {
                return Err(SkybridgeError::InvalidInput(format!(
                    "local path {} has no container region",
                    path
                )))
            }
        };

        let region = self
            .backend(remote.vendor)?
            .container_region(&remote)
            .await
            .map_err(|e| e.into_skybridge(Some(remote.vendor)))?;

        region
            .or_else(|| remote.region.clone())
            .ok_or_else(|| SkybridgeError::RegionLookupFailed {
                vendor: remote.vendor,
                container: remote.container.clone(),
                reason: "backend reported no region".to_string(),
            })
    }
}

fn validate_container_args(name: &str, region: &str) -> SkybridgeResult<()> {
    if name.trim().is_empty() {
        return Err(SkybridgeError::InvalidInput(
            "container name must not be empty".to_string(),
        ));
    }
    if region.trim().is_empty() {
        return Err(SkybridgeError::InvalidInput(
            "container region must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl RegionLookup for StorageFacade {
    fn has_backend(&self, vendor: Vendor) -> bool {
        self.registry.contains(vendor)
    }

    async fn container_region(&self, location: &RemoteLocation) -> SkybridgeResult<Option<String>> {
        self.backend(location.vendor)?
            .container_region(location)
            .await
            .map_err(|e| e.into_skybridge(Some(location.vendor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStorage;

    fn facade() -> StorageFacade {
        StorageFacade::new(
            BackendRegistry::new()
                .with(Arc::new(InMemoryStorage::new(Vendor::Aws)))
                .with(Arc::new(InMemoryStorage::new(Vendor::Gcp))),
        )
    }

    #[tokio::test]
    async fn test_remote_round_trip_and_listing() {
        let facade = facade();
        facade
            .create_container(Vendor::Aws, "media", "eu-west-1")
            .await
            .unwrap();
        assert!(facade.list_objects("s3://media").await.unwrap().is_empty());

        facade
            .write(Bytes::from_static(b"abc"), "s3://media/x/y.bin")
            .await
            .unwrap();
        let data = facade
            .read("https://media.s3.eu-west-1.amazonaws.com/x/y.bin")
            .await
            .unwrap();
        assert_eq!(&data[..], b"abc");
        assert_eq!(facade.list_objects("s3://media/").await.unwrap(), vec!["x/y.bin"]);
        assert_eq!(facade.container_region("s3://media").await.unwrap(), "eu-west-1");

        assert!(facade.delete("s3://media/x/y.bin").await.unwrap());
        assert!(!facade.delete("s3://media/x/y.bin").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_container_is_distinguishable() {
        let facade = facade();
        let err = facade
            .delete_container(Vendor::Gcp, "ghost", "us")
            .await
            .unwrap_err();
        assert!(err.is_container_not_found());
    }

    #[tokio::test]
    async fn test_unregistered_vendor_is_unsupported() {
        let facade = facade();
        let err = facade
            .read("https://acct.blob.core.windows.net/box/a.txt")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VENDOR_UNSUPPORTED");
    }

    #[tokio::test]
    async fn test_local_paths_bypass_backends() {
        let tmp = tempfile::tempdir().unwrap();
        let facade = StorageFacade::with_local(
            BackendRegistry::new(),
            LocalFilesystem::with_root(tmp.path()),
        );

        facade.write(Bytes::from_static(b"hi"), "out/a.txt").await.unwrap();
        assert_eq!(&facade.read("out/a.txt").await.unwrap()[..], b"hi");
        assert!(matches!(
            facade.container_region("out").await,
            Err(SkybridgeError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_create_existing_container_fails() {
        let facade = facade();
        facade.create_container(Vendor::Gcp, "b", "us").await.unwrap();
        let err = facade.create_container(Vendor::Gcp, "b", "us").await.unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_ERROR");
    }
}
