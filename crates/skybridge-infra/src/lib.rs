//! Skybridge Infrastructure Library
//!
//! Process-level concerns shared by skybridge binaries. Currently this is
//! tracing setup: a `tracing-subscriber` registry with an env filter and a
//! text or JSON formatter, plus an OTLP trace exporter when built with
//! `observability-opentelemetry`.

pub mod telemetry;

pub use telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};
