//! Telemetry initialization
//!
//! Installs the global tracing subscriber. Exactly one of the two init
//! modules is compiled, selected by the `observability-opentelemetry`
//! feature; both expose the same `init_telemetry` / `shutdown_telemetry`.

#[cfg(feature = "observability-opentelemetry")]
mod init_opentelemetry;

#[cfg(not(feature = "observability-opentelemetry"))]
mod init_basic;

#[cfg(feature = "observability-opentelemetry")]
pub use init_opentelemetry::{init_telemetry, shutdown_telemetry};

#[cfg(not(feature = "observability-opentelemetry"))]
pub use init_basic::{init_telemetry, shutdown_telemetry};

use std::env;
use tracing_subscriber::EnvFilter;

pub(crate) const DEFAULT_FILTER: &str = "skybridge=debug";

/// OTLP export settings. Ignored unless built with
/// `observability-opentelemetry`.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub service_name: String,
    pub service_version: String,
    /// `grpc` (default) or `http`.
    pub protocol: String,
    /// `always_on`, `always_off` or `trace_id_ratio`.
    pub sampler: String,
    pub sample_ratio: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            service_name: "skybridge".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol: "grpc".to_string(),
            sampler: "always_on".to_string(),
            sample_ratio: 1.0,
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fallback = Self::default();
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let enabled = match non_empty("OTEL_ENABLED") {
            Some(v) => v
                .parse::<bool>()
                .map_err(|e| anyhow::anyhow!("OTEL_ENABLED must be true or false: {}", e))?,
            None => fallback.enabled,
        };

        let sample_ratio = match non_empty("OTEL_SAMPLE_RATIO") {
            Some(v) => v
                .parse::<f64>()
                .map_err(|e| anyhow::anyhow!("OTEL_SAMPLE_RATIO must be a number: {}", e))?,
            None => fallback.sample_ratio,
        };

        Ok(Self {
            enabled,
            endpoint: non_empty("OTEL_ENDPOINT"),
            service_name: non_empty("OTEL_SERVICE_NAME").unwrap_or(fallback.service_name),
            service_version: fallback.service_version,
            protocol: non_empty("OTEL_PROTOCOL").unwrap_or(fallback.protocol),
            sampler: non_empty("OTEL_SAMPLER").unwrap_or(fallback.sampler),
            sample_ratio,
        })
    }
}

pub(crate) fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}
