//! Error types module
//!
//! Every public operation either returns a complete response or fails with one
//! of the `SkybridgeError` kinds below. Backend crates keep their own narrower
//! error enums and convert into this one at the facade boundary.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::vendor::Vendor;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like malformed input
    Debug,
    /// Warning level - for recoverable or caller-initiated outcomes
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// One failed branch of a multi-vendor fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorFailure {
    pub vendor: Vendor,
    pub message: String,
}

impl Display for VendorFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", self.vendor, self.message)
    }
}

fn join_failures(failures: &[VendorFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum SkybridgeError {
    #[error("Unrecognized location: {0}")]
    UnrecognizedLocation(String),

    #[error("Region lookup failed for {vendor} container '{container}': {reason}")]
    RegionLookupFailed {
        vendor: Vendor,
        container: String,
        reason: String,
    },

    #[error("No {capability} backend registered for vendor {vendor}")]
    VendorUnsupported {
        vendor: Vendor,
        capability: &'static str,
    },

    #[error("Container '{container}' not found in {vendor}")]
    ContainerNotFound { vendor: Vendor, container: String },

    #[error("Staging into {vendor} failed: {reason}")]
    StagingFailure { vendor: Vendor, reason: String },

    #[error("Job {} failed: {message}", job_id.as_deref().unwrap_or("<unsubmitted>"))]
    JobFailed {
        job_id: Option<String>,
        message: String,
    },

    #[error("Job {} cancelled", job_id.as_deref().unwrap_or("<unsubmitted>"))]
    JobCancelled { job_id: Option<String> },

    #[error("Combined request failed for {}", join_failures(failures))]
    PartialCombinationFailure {
        failures: Vec<VendorFailure>,
        succeeded: Vec<Vendor>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error ({}): {message}", vendor.map(|v| v.as_str()).unwrap_or("local"))]
    Storage {
        vendor: Option<Vendor>,
        message: String,
    },

    #[error("{vendor} call failed: {message}")]
    Vendor { vendor: Vendor, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type used across skybridge crates
pub type SkybridgeResult<T> = Result<T, SkybridgeError>;

impl SkybridgeError {
    /// Machine-readable error code (e.g., "CONTAINER_NOT_FOUND")
    pub fn error_code(&self) -> &'static str {
        match self {
            SkybridgeError::UnrecognizedLocation(_) => "UNRECOGNIZED_LOCATION",
            SkybridgeError::RegionLookupFailed { .. } => "REGION_LOOKUP_FAILED",
            SkybridgeError::VendorUnsupported { .. } => "VENDOR_UNSUPPORTED",
            SkybridgeError::ContainerNotFound { .. } => "CONTAINER_NOT_FOUND",
            SkybridgeError::StagingFailure { .. } => "STAGING_FAILURE",
            SkybridgeError::JobFailed { .. } => "JOB_FAILED",
            SkybridgeError::JobCancelled { .. } => "JOB_CANCELLED",
            SkybridgeError::PartialCombinationFailure { .. } => "PARTIAL_COMBINATION_FAILURE",
            SkybridgeError::InvalidInput(_) => "INVALID_INPUT",
            SkybridgeError::Storage { .. } => "STORAGE_ERROR",
            SkybridgeError::Vendor { .. } => "VENDOR_ERROR",
            SkybridgeError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether retrying the whole operation may succeed.
    ///
    /// Parsing and resolution errors are never recoverable; they are surfaced
    /// to the caller as-is.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SkybridgeError::StagingFailure { .. }
                | SkybridgeError::Storage { .. }
                | SkybridgeError::Vendor { .. }
                | SkybridgeError::PartialCombinationFailure { .. }
        )
    }

    /// Log level for this error
    pub fn log_level(&self) -> LogLevel {
        match self {
            SkybridgeError::UnrecognizedLocation(_)
            | SkybridgeError::InvalidInput(_)
            | SkybridgeError::ContainerNotFound { .. } => LogLevel::Debug,
            SkybridgeError::JobCancelled { .. } | SkybridgeError::VendorUnsupported { .. } => {
                LogLevel::Warn
            }
            _ => LogLevel::Error,
        }
    }

    /// True for the variant callers may treat as a non-fatal outcome.
    pub fn is_container_not_found(&self) -> bool {
        matches!(self, SkybridgeError::ContainerNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_names_every_vendor() {
        let err = SkybridgeError::PartialCombinationFailure {
            failures: vec![
                VendorFailure {
                    vendor: Vendor::Aws,
                    message: "throttled".to_string(),
                },
                VendorFailure {
                    vendor: Vendor::Azure,
                    message: "timeout".to_string(),
                },
            ],
            succeeded: vec![Vendor::Gcp],
        };
        let msg = err.to_string();
        assert!(msg.contains("aws: throttled"));
        assert!(msg.contains("azure: timeout"));
        assert_eq!(err.error_code(), "PARTIAL_COMBINATION_FAILURE");
    }

    #[test]
    fn test_job_errors_render_missing_id() {
        let err = SkybridgeError::JobFailed {
            job_id: None,
            message: "submit rejected".to_string(),
        };
        assert_eq!(err.to_string(), "Job <unsubmitted> failed: submit rejected");

        let err = SkybridgeError::JobCancelled {
            job_id: Some("job-1".to_string()),
        };
        assert_eq!(err.to_string(), "Job job-1 cancelled");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_parse_and_resolution_errors_are_not_recoverable() {
        assert!(!SkybridgeError::UnrecognizedLocation("x".into()).is_recoverable());
        assert!(!SkybridgeError::RegionLookupFailed {
            vendor: Vendor::Aws,
            container: "b".into(),
            reason: "access denied".into()
        }
        .is_recoverable());
        assert!(SkybridgeError::Storage {
            vendor: None,
            message: "disk".into()
        }
        .is_recoverable());
        assert!(SkybridgeError::ContainerNotFound {
            vendor: Vendor::Gcp,
            container: "b".into()
        }
        .is_container_not_found());
    }
}
