//! Location descriptors
//!
//! A location string is either a local path or a vendor storage URL. Parsing
//! classifies it against the vendor URL shapes below, first match wins. The
//! shapes are host-distinguishing so at most one can match a real URL.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{SkybridgeError, SkybridgeResult};
use crate::vendor::Vendor;

const FILE_SCHEME: &str = "file://";

struct UrlShape {
    vendor: Vendor,
    pattern: Regex,
}

// Order matters only for readability; hosts never overlap.
static URL_SHAPES: LazyLock<Result<Vec<UrlShape>, regex::Error>> = LazyLock::new(|| {
    let shapes = [
        (
            Vendor::Aws,
            r"^https?://(?P<container>[^/]+?)\.s3(?:\.(?P<region>[^/]*?))?\.amazonaws\.com(?:/(?P<key>.*))?$",
        ),
        (Vendor::Aws, r"^s3://(?P<container>[^/]+)(?:/(?P<key>.*))?$"),
        (
            Vendor::Gcp,
            r"^https?://storage\.(?:cloud\.google|googleapis)\.com/(?P<container>[^/]+)(?:/(?P<key>.*))?$",
        ),
        (Vendor::Gcp, r"^gs://(?P<container>[^/]+)(?:/(?P<key>.*))?$"),
        (
            Vendor::Azure,
            r"^https?://(?P<account>[^./]*)\.blob\.core\.windows\.net/(?P<container>[a-z0-9][a-z0-9\-]*)(?:/(?P<key>.*))?$",
        ),
    ];
    shapes
        .into_iter()
        .map(|(vendor, pattern)| {
            Ok(UrlShape {
                vendor,
                pattern: Regex::new(pattern)?,
            })
        })
        .collect()
});

static SCHEME_PREFIX: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://"));

fn compiled<T>(cell: &'static Result<T, regex::Error>) -> SkybridgeResult<&'static T> {
    cell.as_ref()
        .map_err(|e| SkybridgeError::Config(format!("location pattern failed to compile: {}", e)))
}

/// A parsed remote storage location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteLocation {
    pub vendor: Vendor,
    /// Region, when the URL encodes one. Only Aws URLs do.
    pub region: Option<String>,
    /// Azure storage account from the host. Names the account, not a region.
    pub account: Option<String>,
    pub container: String,
    /// Object key, byte-exact. Empty for container URLs.
    pub key: String,
    pub raw_url: String,
}

/// Vendor-neutral description of where some bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LocationDescriptor {
    Local { path: String },
    Remote(RemoteLocation),
}

impl LocationDescriptor {
    /// Parse a location string.
    ///
    /// Local paths never fail. A string carrying a `scheme://` prefix must
    /// match one of the vendor shapes or it is rejected with
    /// [`SkybridgeError::UnrecognizedLocation`].
    pub fn parse(location: &str) -> SkybridgeResult<Self> {
        if location.is_empty() {
            return Err(SkybridgeError::UnrecognizedLocation(
                "empty location".to_string(),
            ));
        }

        if let Some(path) = location.strip_prefix(FILE_SCHEME) {
            if path.is_empty() {
                return Err(SkybridgeError::UnrecognizedLocation(location.to_string()));
            }
            return Ok(LocationDescriptor::Local {
                path: path.to_string(),
            });
        }

        for shape in compiled(&URL_SHAPES)? {
            if let Some(caps) = shape.pattern.captures(location) {
                let container = caps
                    .name("container")
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                if container.is_empty() {
                    return Err(SkybridgeError::UnrecognizedLocation(location.to_string()));
                }
                let region = caps.name("region").and_then(|m| normalize_host_part(m.as_str()));
                let account = caps.name("account").and_then(|m| normalize_host_part(m.as_str()));
                let key = caps
                    .name("key")
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();

                return Ok(LocationDescriptor::Remote(RemoteLocation {
                    vendor: shape.vendor,
                    region,
                    account,
                    container,
                    key,
                    raw_url: location.to_string(),
                }));
            }
        }

        if compiled(&SCHEME_PREFIX)?.is_match(location) {
            return Err(SkybridgeError::UnrecognizedLocation(location.to_string()));
        }

        Ok(LocationDescriptor::Local {
            path: location.to_string(),
        })
    }

    pub fn is_local(&self) -> bool {
        matches!(self, LocationDescriptor::Local { .. })
    }

    pub fn as_remote(&self) -> Option<&RemoteLocation> {
        match self {
            LocationDescriptor::Remote(remote) => Some(remote),
            LocationDescriptor::Local { .. } => None,
        }
    }

    pub fn vendor(&self) -> Option<Vendor> {
        self.as_remote().map(|r| r.vendor)
    }

    pub fn region(&self) -> Option<&str> {
        self.as_remote().and_then(|r| r.region.as_deref())
    }

    pub fn container_name(&self) -> Option<&str> {
        self.as_remote().map(|r| r.container.as_str())
    }

    pub fn object_key(&self) -> Option<&str> {
        self.as_remote().map(|r| r.key.as_str())
    }

    /// The string this descriptor was parsed from (local paths without `file://`).
    pub fn raw(&self) -> &str {
        match self {
            LocationDescriptor::Local { path } => path,
            LocationDescriptor::Remote(remote) => &remote.raw_url,
        }
    }

    /// Extension of the last path segment, without the dot.
    pub fn file_extension(&self) -> Option<&str> {
        let tail = match self {
            LocationDescriptor::Local { path } => path.as_str(),
            LocationDescriptor::Remote(remote) => remote.key.as_str(),
        };
        let name = tail.rsplit(['/', '\\']).next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            None
        } else {
            Some(ext)
        }
    }
}

impl FromStr for LocationDescriptor {
    type Err = SkybridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LocationDescriptor::parse(s)
    }
}

impl Display for LocationDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.raw())
    }
}

fn normalize_host_part(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('.').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Canonical URL of a container in `vendor`.
///
/// Aws uses `region`, Azure requires `account`, Gcp ignores both.
pub fn container_url(
    vendor: Vendor,
    region: Option<&str>,
    account: Option<&str>,
    container: &str,
) -> SkybridgeResult<String> {
    object_url(vendor, region, account, container, "")
}

/// Canonical URL of an object in `vendor`. An empty key yields the container URL.
pub fn object_url(
    vendor: Vendor,
    region: Option<&str>,
    account: Option<&str>,
    container: &str,
    key: &str,
) -> SkybridgeResult<String> {
    if container.is_empty() {
        return Err(SkybridgeError::InvalidInput(
            "container name must not be empty".to_string(),
        ));
    }
    let region = region.map(str::trim).filter(|r| !r.is_empty());
    let account = account.map(str::trim).filter(|a| !a.is_empty());
    let url = match vendor {
        Vendor::Aws => match region {
            Some(region) => format!("https://{container}.s3.{region}.amazonaws.com/{key}"),
            None => format!("https://{container}.s3.amazonaws.com/{key}"),
        },
        Vendor::Gcp => format!("https://storage.cloud.google.com/{container}/{key}"),
        Vendor::Azure => {
            let account = account.ok_or_else(|| {
                SkybridgeError::InvalidInput("azure URLs need a storage account".to_string())
            })?;
            format!("https://{account}.blob.core.windows.net/{container}/{key}")
        }
    };
    Ok(url)
}
