use super::{env_filter, TelemetryConfig};
use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{self as sdktrace, BatchConfig, BatchSpanProcessor, RandomIdGenerator, Sampler},
    Resource,
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use skybridge_core::{Config, LogFormat};
use std::env;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn sampler_for(telemetry: &TelemetryConfig) -> Sampler {
    match telemetry.sampler.as_str() {
        "always_off" => Sampler::AlwaysOff,
        "trace_id_ratio" => {
            let ratio = telemetry.sample_ratio.clamp(0.0, 1.0);
            if ratio <= 0.0 {
                Sampler::AlwaysOff
            } else if ratio >= 1.0 {
                Sampler::AlwaysOn
            } else {
                Sampler::TraceIdRatioBased(ratio)
            }
        }
        _ => Sampler::AlwaysOn,
    }
}

/// Initialize tracing with an OTLP trace exporter.
///
/// Falls back to plain tracing when export is disabled or no endpoint is set.
pub fn init_telemetry(config: &Config, telemetry: &TelemetryConfig) -> anyhow::Result<()> {
    let (text, json) = match config.log_format {
        LogFormat::Text => (Some(fmt::layer()), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };

    let endpoint = match (&telemetry.endpoint, telemetry.enabled) {
        (Some(endpoint), true) => endpoint.clone(),
        _ => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(text)
                .with(json)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;
            tracing::info!("OpenTelemetry disabled, using standard tracing");
            return Ok(());
        }
    };

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.to_str().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    let instance_id =
        env::var("OTEL_SERVICE_INSTANCE_ID").unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());

    let resource = Resource::new(vec![
        KeyValue::new(SERVICE_NAME, telemetry.service_name.clone()),
        KeyValue::new(SERVICE_VERSION, telemetry.service_version.clone()),
        KeyValue::new("deployment.environment", config.environment.clone()),
        KeyValue::new("host.name", hostname.clone()),
        KeyValue::new("service.instance.id", instance_id.clone()),
    ]);

    let span_exporter = if telemetry.protocol == "http" {
        opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(&endpoint)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP span exporter: {}", e))?
    } else {
        opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&endpoint)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build gRPC span exporter: {}", e))?
    };

    let batch_processor =
        BatchSpanProcessor::builder(span_exporter, opentelemetry_sdk::runtime::Tokio)
            .with_batch_config(BatchConfig::default())
            .build();

    let tracer_provider = sdktrace::TracerProvider::builder()
        .with_span_processor(batch_processor)
        .with_sampler(sampler_for(telemetry))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build();

    let tracer = tracer_provider.tracer(telemetry.service_name.clone());
    opentelemetry::global::set_tracer_provider(tracer_provider);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(text)
        .with(json)
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!(
        endpoint = %endpoint,
        protocol = %telemetry.protocol,
        environment = %config.environment,
        sampler = %telemetry.sampler,
        sample_ratio = telemetry.sample_ratio,
        hostname = %hostname,
        instance_id = %instance_id,
        "OpenTelemetry initialized successfully"
    );

    Ok(())
}

pub async fn shutdown_telemetry() {
    tracing::info!("Shutting down OpenTelemetry...");
    opentelemetry::global::shutdown_tracer_provider();
    tracing::info!("OpenTelemetry shutdown complete");
}
