use super::{env_filter, TelemetryConfig};
use skybridge_core::{Config, LogFormat};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize basic tracing (without OpenTelemetry)
pub fn init_telemetry(config: &Config, _telemetry: &TelemetryConfig) -> anyhow::Result<()> {
    let (text, json) = match config.log_format {
        LogFormat::Text => (Some(fmt::layer()), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(text)
        .with(json)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::debug!(
        environment = %config.environment,
        "OpenTelemetry feature not enabled, using standard tracing"
    );
    Ok(())
}

pub async fn shutdown_telemetry() {
    tracing::debug!("Telemetry shutdown (OpenTelemetry feature not enabled)");
}
