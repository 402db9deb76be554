//! Skybridge CLI: storage and recognition operations across cloud vendors.
//!
//! Configuration comes from the environment (and `.env`). With `--dry-run`
//! every vendor is served by an empty in-memory emulator.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use skybridge_core::models::RecognitionRequest;
use skybridge_core::{
    resolve_with_overrides, Config, FeatureRequestSet, LocationDescriptor, RecognitionFeature,
    Vendor, VendorOverride,
};
use skybridge_infra::{init_telemetry, shutdown_telemetry, TelemetryConfig};
use skybridge_services::{create_service_registry, CognitiveService};
use skybridge_storage::{create_storage_facade, StorageFacade};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "skybridge", about = "Vendor-neutral cloud storage and cognitive operations")]
struct Cli {
    /// Serve every vendor from an in-memory emulator
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a location into its descriptor
    Parse {
        location: String,
    },
    /// Show which vendor and region would process a location
    Resolve {
        location: String,
        #[arg(long)]
        vendor: Option<Vendor>,
        #[arg(long)]
        region: Option<String>,
    },
    /// Write an object's bytes to stdout
    Cat {
        location: String,
    },
    /// Copy an object between any two locations
    Cp {
        from: String,
        to: String,
    },
    /// Delete an object
    Rm {
        location: String,
    },
    /// List the keys in a container or local directory
    Ls {
        container_url: String,
    },
    /// Print the region a container lives in
    Region {
        container_url: String,
    },
    /// Create a container
    Mb {
        vendor: Vendor,
        name: String,
        region: String,
    },
    /// Delete a container and everything in it
    Rb {
        vendor: Vendor,
        name: String,
        region: String,
    },
    /// Transcribe speech, combining vendors when features require it
    Recognize {
        location: String,
        #[arg(long, default_value = "en-US")]
        language: String,
        #[arg(long, default_value = "16000")]
        sample_rate: u32,
        #[arg(long, default_value = "1")]
        channels: u16,
        /// Feature to request (repeatable): srt, vtt, profanity, emoji, punctuation, snr
        #[arg(long = "feature")]
        features: Vec<RecognitionFeature>,
        #[arg(long)]
        vendor: Option<Vendor>,
        #[arg(long)]
        region: Option<String>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Token cancelled on Ctrl-C so in-flight jobs and staging wind down.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; cancelling");
            trigger.cancel();
        }
    });
    token
}

async fn run(cli: Cli, config: Config, storage: Arc<StorageFacade>) -> anyhow::Result<()> {
    match cli.command {
        Commands::Parse { location } => {
            print_json(&LocationDescriptor::parse(&location)?)?;
        }
        Commands::Resolve {
            location,
            vendor,
            region,
        } => {
            let descriptor = LocationDescriptor::parse(&location)?;
            let target = resolve_with_overrides(
                &descriptor,
                &VendorOverride { vendor, region },
                None,
                &config.execution,
                &config.defaults,
                storage.as_ref(),
            )
            .await?;
            print_json(&target)?;
        }
        Commands::Cat { location } => {
            let data = storage.read(&location).await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&data).await.context("Write to stdout")?;
            stdout.flush().await.context("Flush stdout")?;
        }
        Commands::Cp { from, to } => {
            let data = storage.read(&from).await?;
            let size = data.len();
            storage.write(data, &to).await?;
            print_json(&serde_json::json!({ "from": from, "to": to, "size_bytes": size }))?;
        }
        Commands::Rm { location } => {
            let deleted = storage.delete(&location).await?;
            print_json(&serde_json::json!({ "location": location, "deleted": deleted }))?;
        }
        Commands::Ls { container_url } => {
            print_json(&storage.list_objects(&container_url).await?)?;
        }
        Commands::Region { container_url } => {
            let region = storage.container_region(&container_url).await?;
            print_json(&serde_json::json!({ "container": container_url, "region": region }))?;
        }
        Commands::Mb {
            vendor,
            name,
            region,
        } => {
            let created = storage.create_container(vendor, &name, &region).await?;
            print_json(&serde_json::json!({ "vendor": vendor, "created": created, "region": region }))?;
        }
        Commands::Rb {
            vendor,
            name,
            region,
        } => {
            let deleted = storage.delete_container(vendor, &name, &region).await?;
            print_json(&serde_json::json!({ "vendor": vendor, "deleted": deleted }))?;
        }
        Commands::Recognize {
            location,
            language,
            sample_rate,
            channels,
            features,
            vendor,
            region,
        } => {
            let mut request = RecognitionRequest::new(location, language)
                .with_features(FeatureRequestSet::new(features));
            request.sample_rate_hertz = sample_rate;
            request.channel_count = channels;
            request.overrides = VendorOverride { vendor, region };

            let service = CognitiveService::new(config, storage, create_service_registry());
            let response = service
                .recognize_speech(&request, &shutdown_token())
                .await?;
            print_json(&response)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;
    let telemetry = TelemetryConfig::from_env()?;
    init_telemetry(&config, &telemetry)?;
    let storage = Arc::new(
        create_storage_facade(&config, cli.dry_run)
            .await
            .context("Failed to initialize storage backends")?,
    );

    let result = run(cli, config, storage).await;
    if let Err(e) = &result {
        tracing::error!(error = %format!("{:#}", e), "Command failed");
    }
    shutdown_telemetry().await;
    result
}
