//! Vendor/region resolution policy
//!
//! Decides where a one-shot operation should run. The rules, in order:
//! run where the data is, run where the data's container actually lives,
//! run where this process runs, then fall back to the configured default.
//! Only a URL-encoded region counts for the first rule; an Azure storage
//! account does not name a region, so Azure data always takes the lookup.
//! Resolution is a pure function of its inputs plus the region lookup.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{SkybridgeError, SkybridgeResult};
use crate::location::{LocationDescriptor, RemoteLocation};
use crate::vendor::Vendor;

/// Where the calling process is running, when known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    pub current_vendor: Option<Vendor>,
    pub current_region: Option<String>,
}

impl ExecutionContext {
    pub fn new(vendor: Vendor, region: impl Into<String>) -> Self {
        Self {
            current_vendor: Some(vendor),
            current_region: Some(region.into()),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }
}

/// The vendor and region that will service a request. `region` is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedTarget {
    pub vendor: Vendor,
    pub region: String,
}

/// Static fallback vendor and per-vendor default regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionDefaults {
    pub default_vendor: Vendor,
    pub aws_region: String,
    pub gcp_region: String,
    pub azure_region: String,
}

impl Default for ResolutionDefaults {
    fn default() -> Self {
        Self {
            default_vendor: Vendor::Aws,
            aws_region: "us-east-1".to_string(),
            gcp_region: "us".to_string(),
            azure_region: "germanywestcentral".to_string(),
        }
    }
}

impl ResolutionDefaults {
    pub fn region_for(&self, vendor: Vendor) -> &str {
        match vendor {
            Vendor::Aws => &self.aws_region,
            Vendor::Gcp => &self.gcp_region,
            Vendor::Azure => &self.azure_region,
        }
    }
}

/// Caller-supplied routing overrides on an operation request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorOverride {
    pub vendor: Option<Vendor>,
    pub region: Option<String>,
}

/// Answers "which region is this container in" for vendors with a backend.
#[async_trait]
pub trait RegionLookup: Send + Sync {
    /// Whether a storage backend is registered for `vendor`.
    fn has_backend(&self, vendor: Vendor) -> bool;

    /// Query the backend for the container's region. `Ok(None)` means the
    /// backend answered without a region.
    async fn container_region(&self, location: &RemoteLocation) -> SkybridgeResult<Option<String>>;
}

/// Which rule produced a [`ResolvedTarget`]. Logged with every decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    DataLocation,
    ContainerLookup,
    ExecutionContext,
    Default,
}

impl Rule {
    fn as_str(&self) -> &'static str {
        match self {
            Rule::DataLocation => "data_location",
            Rule::ContainerLookup => "container_lookup",
            Rule::ExecutionContext => "execution_context",
            Rule::Default => "default",
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Pick the vendor/region that should read `descriptor`.
///
/// `desired_vendor` pins the target vendor without pinning a region. When it
/// is absent the data's vendor is preferred (if it has a backend), then the
/// execution context's vendor, then the configured default.
pub async fn resolve_for_read(
    descriptor: &LocationDescriptor,
    desired_vendor: Option<Vendor>,
    context: &ExecutionContext,
    defaults: &ResolutionDefaults,
    lookup: &dyn RegionLookup,
) -> SkybridgeResult<ResolvedTarget> {
    let remote = descriptor.as_remote();
    let target = desired_vendor
        .or_else(|| {
            remote
                .map(|r| r.vendor)
                .filter(|vendor| lookup.has_backend(*vendor))
        })
        .or(context.current_vendor)
        .unwrap_or(defaults.default_vendor);

    let (region, rule) = match remote.filter(|r| r.vendor == target) {
        Some(remote) => match non_blank(remote.region.as_deref()) {
            Some(region) => (region.to_string(), Rule::DataLocation),
            None if lookup.has_backend(target) => {
                (lookup_region(remote, lookup).await?, Rule::ContainerLookup)
            }
            None => fallback_region(target, context, defaults),
        },
        None => fallback_region(target, context, defaults),
    };

    tracing::debug!(
        location = %descriptor,
        vendor = %target,
        region = %region,
        rule = rule.as_str(),
        "Resolved operation target"
    );

    Ok(ResolvedTarget {
        vendor: target,
        region,
    })
}

async fn lookup_region(remote: &RemoteLocation, lookup: &dyn RegionLookup) -> SkybridgeResult<String> {
    let failed = |reason: String| SkybridgeError::RegionLookupFailed {
        vendor: remote.vendor,
        container: remote.container.clone(),
        reason,
    };

    match lookup.container_region(remote).await {
        Ok(region) => non_blank(region.as_deref())
            .map(str::to_string)
            .ok_or_else(|| failed("backend returned no region".to_string())),
        Err(e @ SkybridgeError::RegionLookupFailed { .. }) => Err(e),
        Err(e) => Err(failed(e.to_string())),
    }
}

fn fallback_region(
    target: Vendor,
    context: &ExecutionContext,
    defaults: &ResolutionDefaults,
) -> (String, Rule) {
    if context.current_vendor == Some(target) {
        if let Some(region) = non_blank(context.current_region.as_deref()) {
            return (region.to_string(), Rule::ExecutionContext);
        }
    }
    (defaults.region_for(target).to_string(), Rule::Default)
}

/// Bypass the policy when the caller pins both vendor and region.
pub fn resolve_explicit(vendor: Vendor, region: &str) -> SkybridgeResult<ResolvedTarget> {
    let region = non_blank(Some(region)).ok_or_else(|| {
        SkybridgeError::InvalidInput(format!("explicit region for {} must not be blank", vendor))
    })?;
    Ok(ResolvedTarget {
        vendor,
        region: region.to_string(),
    })
}

/// Pick the entry point from request overrides.
///
/// Vendor and region → explicit. Vendor only → policy with that vendor.
/// Neither → policy with `preferred` (an operation-level preference, e.g.
/// the only vendor supporting a requested audio format).
pub async fn resolve_with_overrides(
    descriptor: &LocationDescriptor,
    overrides: &VendorOverride,
    preferred: Option<Vendor>,
    context: &ExecutionContext,
    defaults: &ResolutionDefaults,
    lookup: &dyn RegionLookup,
) -> SkybridgeResult<ResolvedTarget> {
    match (overrides.vendor, overrides.region.as_deref()) {
        (Some(vendor), Some(region)) => resolve_explicit(vendor, region),
        (Some(vendor), None) => {
            resolve_for_read(descriptor, Some(vendor), context, defaults, lookup).await
        }
        (None, Some(_)) => Err(SkybridgeError::InvalidInput(
            "a region override requires a vendor override".to_string(),
        )),
        (None, None) => resolve_for_read(descriptor, preferred, context, defaults, lookup).await,
    }
}
