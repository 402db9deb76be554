//! Storage abstraction trait
//!
//! This module defines the `VendorStorage` trait that every vendor backend
//! implements, and the backend-level error type.

use async_trait::async_trait;
use bytes::Bytes;
use skybridge_core::{RemoteLocation, SkybridgeError, Vendor};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Container already exists: {0}")]
    ContainerAlreadyExists(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Lift into the unified taxonomy. `ContainerNotFound` stays
    /// distinguishable; everything else becomes a `Storage` failure.
    pub fn into_skybridge(self, vendor: Option<Vendor>) -> SkybridgeError {
        match (self, vendor) {
            (StorageError::ContainerNotFound(container), Some(vendor)) => {
                SkybridgeError::ContainerNotFound { vendor, container }
            }
            (other, vendor) => SkybridgeError::Storage {
                vendor,
                message: other.to_string(),
            },
        }
    }
}

/// Storage abstraction trait
///
/// One implementation per vendor. Locations handed to a backend always carry
/// that backend's vendor; `region` may be absent, in which case the backend
/// works it out (or does not need it).
#[async_trait]
pub trait VendorStorage: Send + Sync {
    /// Vendor this backend serves
    fn vendor(&self) -> Vendor;

    /// Read a whole object
    async fn read(&self, location: &RemoteLocation) -> StorageResult<Bytes>;

    /// Write a whole object, replacing any existing one
    async fn write(&self, location: &RemoteLocation, data: Bytes) -> StorageResult<()>;

    /// Delete an object. Returns `false` if it did not exist.
    async fn delete(&self, location: &RemoteLocation) -> StorageResult<bool>;

    /// Create a container in `region`. Fails if the name is taken.
    async fn create_container(&self, name: &str, region: &str) -> StorageResult<()>;

    /// Delete a container and everything in it
    async fn delete_container(&self, name: &str, region: &str) -> StorageResult<()>;

    /// Keys of every object in the container addressed by `container`
    async fn list_objects(&self, container: &RemoteLocation) -> StorageResult<Vec<String>>;

    /// Region the container lives in, if the vendor reports one
    async fn container_region(&self, container: &RemoteLocation) -> StorageResult<Option<String>>;
}
