//! Region-aware in-memory backend
//!
//! Emulates a vendor's object store for tests and dry runs. Any vendor can be
//! emulated; containers remember the region they were created in.

use crate::traits::{StorageError, StorageResult, VendorStorage};
use async_trait::async_trait;
use bytes::Bytes;
use skybridge_core::{RemoteLocation, Vendor};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Container {
    region: String,
    objects: BTreeMap<String, Bytes>,
}

pub struct InMemoryStorage {
    vendor: Vendor,
    containers: RwLock<HashMap<String, Container>>,
}

impl InMemoryStorage {
    pub fn new(vendor: Vendor) -> Self {
        Self {
            vendor,
            containers: RwLock::new(HashMap::new()),
        }
    }

    /// Whether a container with this name currently exists.
    pub async fn container_exists(&self, name: &str) -> bool {
        self.containers.read().await.contains_key(name)
    }

    /// Names of all containers, sorted.
    pub async fn container_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.containers.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    fn missing(name: &str) -> StorageError {
        StorageError::ContainerNotFound(name.to_string())
    }
}

#[async_trait]
impl VendorStorage for InMemoryStorage {
    fn vendor(&self) -> Vendor {
        self.vendor
    }

    async fn read(&self, location: &RemoteLocation) -> StorageResult<Bytes> {
        let containers = self.containers.read().await;
        let container = containers
            .get(&location.container)
            .ok_or_else(|| Self::missing(&location.container))?;
        let data = container
            .objects
            .get(&location.key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(location.raw_url.clone()))?;

        tracing::debug!(
            vendor = %self.vendor,
            container = %location.container,
            key = %location.key,
            size_bytes = data.len(),
            "In-memory read"
        );
        Ok(data)
    }

    async fn write(&self, location: &RemoteLocation, data: Bytes) -> StorageResult<()> {
        if location.key.is_empty() {
            return Err(StorageError::InvalidKey(location.raw_url.clone()));
        }
        let mut containers = self.containers.write().await;
        let container = containers
            .get_mut(&location.container)
            .ok_or_else(|| Self::missing(&location.container))?;

        tracing::debug!(
            vendor = %self.vendor,
            container = %location.container,
            key = %location.key,
            size_bytes = data.len(),
            "In-memory write"
        );
        container.objects.insert(location.key.clone(), data);
        Ok(())
    }

    async fn delete(&self, location: &RemoteLocation) -> StorageResult<bool> {
        let mut containers = self.containers.write().await;
        Ok(containers
            .get_mut(&location.container)
            .map(|c| c.objects.remove(&location.key).is_some())
            .unwrap_or(false))
    }

    async fn create_container(&self, name: &str, region: &str) -> StorageResult<()> {
        let mut containers = self.containers.write().await;
        if containers.contains_key(name) {
            return Err(StorageError::ContainerAlreadyExists(name.to_string()));
        }
        containers.insert(
            name.to_string(),
            Container {
                region: region.to_string(),
                objects: BTreeMap::new(),
            },
        );
        tracing::debug!(vendor = %self.vendor, container = %name, region = %region, "In-memory container created");
        Ok(())
    }

    async fn delete_container(&self, name: &str, _region: &str) -> StorageResult<()> {
        let removed = self.containers.write().await.remove(name);
        match removed {
            Some(container) => {
                tracing::debug!(
                    vendor = %self.vendor,
                    container = %name,
                    objects = container.objects.len(),
                    "In-memory container deleted"
                );
                Ok(())
            }
            None => Err(Self::missing(name)),
        }
    }

    async fn list_objects(&self, container: &RemoteLocation) -> StorageResult<Vec<String>> {
        let containers = self.containers.read().await;
        let found = containers
            .get(&container.container)
            .ok_or_else(|| Self::missing(&container.container))?;
        Ok(found
            .objects
            .keys()
            .filter(|k| k.starts_with(&container.key))
            .cloned()
            .collect())
    }

    async fn container_region(&self, container: &RemoteLocation) -> StorageResult<Option<String>> {
        let containers = self.containers.read().await;
        containers
            .get(&container.container)
            .map(|c| Some(c.region.clone()))
            .ok_or_else(|| Self::missing(&container.container))
    }
}
