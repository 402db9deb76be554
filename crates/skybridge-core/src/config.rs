//! Configuration module
//!
//! Process-wide, read-only settings loaded once at start-up and passed
//! explicitly to the components that need them.

use std::env;
use std::time::Duration;

use crate::resolution::{ExecutionContext, ResolutionDefaults};
use crate::vendor::Vendor;

const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_MAX_POLL_ERRORS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub defaults: ResolutionDefaults,
    pub execution: ExecutionContext,
    /// Azure storage account that staging containers are created in.
    pub azure_storage_account: Option<String>,
    pub recognition_primary_vendor: Vendor,
    pub vendor_precedence: Vec<Vendor>,
    pub job_poll_interval: Duration,
    pub job_max_poll_errors: u32,
    pub environment: String,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            defaults: ResolutionDefaults::default(),
            execution: ExecutionContext::unknown(),
            azure_storage_account: None,
            recognition_primary_vendor: Vendor::Gcp,
            vendor_precedence: vec![Vendor::Gcp, Vendor::Azure, Vendor::Aws],
            job_poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            job_max_poll_errors: DEFAULT_MAX_POLL_ERRORS,
            environment: "development".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. `from_env` delegates here.
    pub fn from_lookup<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fallback = Config::default();
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let default_vendor = match non_empty("DEFAULT_VENDOR") {
            Some(v) => v.parse::<Vendor>()?,
            None => fallback.defaults.default_vendor,
        };

        let defaults = ResolutionDefaults {
            default_vendor,
            aws_region: var("DEFAULT_REGION_AWS").unwrap_or(fallback.defaults.aws_region),
            gcp_region: var("DEFAULT_REGION_GCP").unwrap_or(fallback.defaults.gcp_region),
            azure_region: var("DEFAULT_REGION_AZURE").unwrap_or(fallback.defaults.azure_region),
        };

        let execution = match non_empty("EXECUTION_VENDOR") {
            Some(v) => ExecutionContext {
                current_vendor: Some(v.parse::<Vendor>()?),
                current_region: non_empty("EXECUTION_REGION"),
            },
            None => detect_execution_context(&non_empty),
        };

        let recognition_primary_vendor = match non_empty("RECOGNITION_PRIMARY_VENDOR") {
            Some(v) => v.parse::<Vendor>()?,
            None => fallback.recognition_primary_vendor,
        };

        let vendor_precedence = match non_empty("VENDOR_PRECEDENCE") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<Vendor>())
                .collect::<Result<Vec<_>, _>>()?,
            None => fallback.vendor_precedence,
        };

        let job_poll_interval = Duration::from_millis(
            non_empty("JOB_POLL_INTERVAL_MS")
                .unwrap_or_else(|| DEFAULT_POLL_INTERVAL_MS.to_string())
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("JOB_POLL_INTERVAL_MS must be an integer: {}", e))?,
        );

        let job_max_poll_errors = non_empty("JOB_MAX_POLL_ERRORS")
            .unwrap_or_else(|| DEFAULT_MAX_POLL_ERRORS.to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("JOB_MAX_POLL_ERRORS must be an integer: {}", e))?;

        let log_format = match non_empty("LOG_FORMAT") {
            Some(v) => v.parse::<LogFormat>()?,
            None => LogFormat::Text,
        };

        Ok(Self {
            defaults,
            execution,
            azure_storage_account: non_empty("AZURE_STORAGE_ACCOUNT").map(|a| a.trim().to_string()),
            recognition_primary_vendor,
            vendor_precedence,
            job_poll_interval,
            job_max_poll_errors,
            environment: non_empty("ENVIRONMENT").unwrap_or(fallback.environment),
            log_format,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for vendor in Vendor::ALL {
            if self.defaults.region_for(vendor).trim().is_empty() {
                return Err(anyhow::anyhow!(
                    "DEFAULT_REGION_{} must not be blank",
                    vendor.as_str().to_uppercase()
                ));
            }
            if !self.vendor_precedence.contains(&vendor) {
                return Err(anyhow::anyhow!(
                    "VENDOR_PRECEDENCE must list every vendor, missing {}",
                    vendor
                ));
            }
        }

        if self.job_poll_interval.is_zero() {
            return Err(anyhow::anyhow!("JOB_POLL_INTERVAL_MS must be greater than 0"));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Infer the hosting vendor from variables its serverless runtimes set.
fn detect_execution_context<F>(var: &F) -> ExecutionContext
where
    F: Fn(&str) -> Option<String>,
{
    if var("AWS_LAMBDA_FUNCTION_NAME").is_some() {
        return ExecutionContext {
            current_vendor: Some(Vendor::Aws),
            current_region: var("AWS_REGION"),
        };
    }
    if var("K_SERVICE").is_some() || var("FUNCTION_TARGET").is_some() {
        return ExecutionContext {
            current_vendor: Some(Vendor::Gcp),
            current_region: var("FUNCTION_REGION"),
        };
    }
    if var("WEBSITE_SITE_NAME").is_some() {
        return ExecutionContext {
            current_vendor: Some(Vendor::Azure),
            current_region: var("REGION_NAME"),
        };
    }
    ExecutionContext::unknown()
}
