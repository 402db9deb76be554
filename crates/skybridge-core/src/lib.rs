//! Skybridge Core Library
//!
//! Vendor-neutral types shared by every skybridge crate: vendors, location
//! descriptors, the resolution policy, recognition feature planning,
//! configuration, the error taxonomy and operation models.

pub mod config;
pub mod error;
pub mod features;
pub mod location;
pub mod models;
pub mod resolution;
pub mod vendor;

pub use config::{Config, LogFormat};
pub use error::{LogLevel, SkybridgeError, SkybridgeResult, VendorFailure};
pub use features::{plan_features, vendor_features, FeaturePlan, FeatureRequestSet, RecognitionFeature};
pub use location::{container_url, object_url, LocationDescriptor, RemoteLocation};
pub use resolution::{
    resolve_explicit, resolve_for_read, resolve_with_overrides, ExecutionContext, RegionLookup,
    ResolutionDefaults, ResolvedTarget, VendorOverride,
};
pub use vendor::Vendor;
