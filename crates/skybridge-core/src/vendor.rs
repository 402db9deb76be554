use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Cloud vendors a request can be routed to.
///
/// The set is closed: adding a vendor means adding a variant here and one
/// entry in each dispatch table (storage backends, service registry).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Aws,
    Gcp,
    Azure,
}

impl Vendor {
    /// Every vendor, in declaration order.
    pub const ALL: [Vendor; 3] = [Vendor::Aws, Vendor::Gcp, Vendor::Azure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Aws => "aws",
            Vendor::Gcp => "gcp",
            Vendor::Azure => "azure",
        }
    }
}

impl FromStr for Vendor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aws" | "amazon" => Ok(Vendor::Aws),
            "gcp" | "google" => Ok(Vendor::Gcp),
            "azure" | "microsoft" => Ok(Vendor::Azure),
            _ => Err(anyhow::anyhow!("Invalid vendor: {}", s)),
        }
    }
}

impl Display for Vendor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
