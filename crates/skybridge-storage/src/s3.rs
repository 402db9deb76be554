use crate::traits::{StorageError, StorageResult, VendorStorage};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use skybridge_core::{RemoteLocation, Vendor};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Region S3 reports as an empty location constraint.
const LEGACY_DEFAULT_REGION: &str = "us-east-1";
/// `DeleteObjects` accepts at most this many keys per call.
const DELETE_BATCH: usize = 1000;

/// S3 storage implementation
///
/// Buckets live in different regions, so one client is kept per region and
/// bucket regions are cached after the first lookup.
pub struct S3Storage {
    sdk_config: SdkConfig,
    default_region: String,
    clients: RwLock<HashMap<String, Client>>,
    bucket_regions: RwLock<HashMap<String, String>>,
}

impl S3Storage {
    /// Create a new S3Storage from the ambient AWS credential chain
    ///
    /// # Arguments
    /// * `default_region` - Region used for calls that are not bucket-scoped
    pub async fn new(default_region: impl Into<String>) -> StorageResult<Self> {
        let default_region = default_region.into();
        if default_region.trim().is_empty() {
            return Err(StorageError::ConfigError(
                "S3 default region must not be empty".to_string(),
            ));
        }
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(default_region.clone()))
            .load()
            .await;

        Ok(Self {
            sdk_config,
            default_region,
            clients: RwLock::new(HashMap::new()),
            bucket_regions: RwLock::new(HashMap::new()),
        })
    }

    async fn client(&self, region: &str) -> Client {
        if let Some(client) = self.clients.read().await.get(region) {
            return client.clone();
        }
        let conf = aws_sdk_s3::config::Builder::from(&self.sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        let client = Client::from_conf(conf);
        self.clients
            .write()
            .await
            .insert(region.to_string(), client.clone());
        client
    }

    /// Region of `bucket`, from the URL when encoded, else looked up once.
    async fn region_of(&self, location: &RemoteLocation) -> StorageResult<String> {
        if let Some(region) = location.region.as_deref() {
            return Ok(region.to_string());
        }
        if let Some(region) = self.bucket_regions.read().await.get(&location.container) {
            return Ok(region.clone());
        }
        self.lookup_bucket_region(&location.container).await
    }

    async fn lookup_bucket_region(&self, bucket: &str) -> StorageResult<String> {
        let start = std::time::Instant::now();
        let client = self.client(&self.default_region).await;
        let out = client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| match e.code() {
                Some("NoSuchBucket") => StorageError::ContainerNotFound(bucket.to_string()),
                _ => StorageError::BackendError(DisplayErrorContext(&e).to_string()),
            })?;

        let region = match out.location_constraint().map(|c| c.as_str()) {
            None | Some("") => LEGACY_DEFAULT_REGION.to_string(),
            Some("EU") => "eu-west-1".to_string(),
            Some(region) => region.to_string(),
        };

        tracing::debug!(
            bucket = %bucket,
            region = %region,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 bucket region resolved"
        );

        self.bucket_regions
            .write()
            .await
            .insert(bucket.to_string(), region.clone());
        Ok(region)
    }

    async fn all_keys(&self, client: &Client, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut pages = client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| match e.code() {
                Some("NoSuchBucket") => StorageError::ContainerNotFound(bucket.to_string()),
                _ => StorageError::ReadFailed(DisplayErrorContext(&e).to_string()),
            })?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );
        }
        Ok(keys)
    }
}

#[async_trait]
impl VendorStorage for S3Storage {
    fn vendor(&self) -> Vendor {
        Vendor::Aws
    }

    async fn read(&self, location: &RemoteLocation) -> StorageResult<Bytes> {
        let region = self.region_of(location).await?;
        let client = self.client(&region).await;
        let start = std::time::Instant::now();

        let out = client
            .get_object()
            .bucket(&location.container)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| match e.code() {
                Some("NoSuchKey") => StorageError::NotFound(location.raw_url.clone()),
                Some("NoSuchBucket") => StorageError::ContainerNotFound(location.container.clone()),
                _ => {
                    tracing::error!(
                        error = %DisplayErrorContext(&e),
                        bucket = %location.container,
                        key = %location.key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 download failed"
                    );
                    StorageError::ReadFailed(DisplayErrorContext(&e).to_string())
                }
            })?;

        let data = out
            .body
            .collect()
            .await
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?
            .into_bytes();

        tracing::info!(
            bucket = %location.container,
            key = %location.key,
            region = %region,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(data)
    }

    async fn write(&self, location: &RemoteLocation, data: Bytes) -> StorageResult<()> {
        if location.key.is_empty() {
            return Err(StorageError::InvalidKey(location.raw_url.clone()));
        }
        let region = self.region_of(location).await?;
        let client = self.client(&region).await;
        let size = data.len();
        let start = std::time::Instant::now();

        client
            .put_object()
            .bucket(&location.container)
            .key(&location.key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %location.container,
                    key = %location.key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                match e.code() {
                    Some("NoSuchBucket") => StorageError::ContainerNotFound(location.container.clone()),
                    _ => StorageError::WriteFailed(DisplayErrorContext(&e).to_string()),
                }
            })?;

        tracing::info!(
            bucket = %location.container,
            key = %location.key,
            region = %region,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn delete(&self, location: &RemoteLocation) -> StorageResult<bool> {
        let region = match self.region_of(location).await {
            Ok(region) => region,
            Err(StorageError::ContainerNotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        let client = self.client(&region).await;
        let start = std::time::Instant::now();

        // DeleteObject succeeds for missing keys, so probe first.
        match client
            .head_object()
            .bucket(&location.container)
            .key(&location.key)
            .send()
            .await
        {
            Ok(_) => {}
            Err(e) if e.as_service_error().map(|s| s.is_not_found()).unwrap_or(false) => {
                return Ok(false)
            }
            Err(e) => match e.code() {
                Some("NotFound") | Some("NoSuchKey") | Some("NoSuchBucket") => return Ok(false),
                _ => return Err(StorageError::DeleteFailed(DisplayErrorContext(&e).to_string())),
            },
        }

        client
            .delete_object()
            .bucket(&location.container)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(DisplayErrorContext(&e).to_string()))?;

        tracing::info!(
            bucket = %location.container,
            key = %location.key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(true)
    }

    async fn create_container(&self, name: &str, region: &str) -> StorageResult<()> {
        let client = self.client(region).await;
        let start = std::time::Instant::now();

        let mut request = client.create_bucket().bucket(name);
        if region != LEGACY_DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        request.send().await.map_err(|e| match e.code() {
            Some("BucketAlreadyExists") | Some("BucketAlreadyOwnedByYou") => {
                StorageError::ContainerAlreadyExists(name.to_string())
            }
            _ => StorageError::BackendError(DisplayErrorContext(&e).to_string()),
        })?;

        self.bucket_regions
            .write()
            .await
            .insert(name.to_string(), region.to_string());

        tracing::info!(
            bucket = %name,
            region = %region,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 bucket created"
        );

        Ok(())
    }

    async fn delete_container(&self, name: &str, region: &str) -> StorageResult<()> {
        let client = self.client(region).await;
        let start = std::time::Instant::now();

        let keys = self.all_keys(&client, name, "").await?;
        for batch in keys.chunks(DELETE_BATCH) {
            let objects = batch
                .iter()
                .map(|key| {
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(|e| StorageError::BackendError(e.to_string()))
                })
                .collect::<StorageResult<Vec<_>>>()?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| StorageError::BackendError(e.to_string()))?;

            client
                .delete_objects()
                .bucket(name)
                .delete(delete)
                .send()
                .await
                .map_err(|e| StorageError::DeleteFailed(DisplayErrorContext(&e).to_string()))?;
        }

        client
            .delete_bucket()
            .bucket(name)
            .send()
            .await
            .map_err(|e| match e.code() {
                Some("NoSuchBucket") => StorageError::ContainerNotFound(name.to_string()),
                _ => StorageError::DeleteFailed(DisplayErrorContext(&e).to_string()),
            })?;

        self.bucket_regions.write().await.remove(name);

        tracing::info!(
            bucket = %name,
            region = %region,
            objects_deleted = keys.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 bucket deleted"
        );

        Ok(())
    }

    async fn list_objects(&self, container: &RemoteLocation) -> StorageResult<Vec<String>> {
        let region = self.region_of(container).await?;
        let client = self.client(&region).await;
        self.all_keys(&client, &container.container, &container.key)
            .await
    }

    async fn container_region(&self, container: &RemoteLocation) -> StorageResult<Option<String>> {
        if let Some(region) = self.bucket_regions.read().await.get(&container.container) {
            return Ok(Some(region.clone()));
        }
        self.lookup_bucket_region(&container.container)
            .await
            .map(Some)
    }
}
