//! Skybridge Storage Library
//!
//! Vendor storage backends behind one trait, the facade that dispatches to
//! them (and to the local filesystem), and the staging manager built on top.
//!
//! # Location handling
//!
//! Every facade call takes a location string and parses it into a
//! `LocationDescriptor`. Backends only ever see locations for their own vendor.

pub mod facade;
pub mod factory;
pub mod local;
pub mod memory;
pub mod registry;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod staging;
pub mod traits;

// Re-export commonly used types
pub use facade::StorageFacade;
pub use factory::{create_in_memory_registry, create_registry, create_storage_facade};
pub use local::LocalFilesystem;
pub use memory::InMemoryStorage;
pub use registry::BackendRegistry;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use staging::{StagedLocation, StagingManager, StagingResource, STAGING_PREFIX};
pub use traits::{StorageError, StorageResult, VendorStorage};
