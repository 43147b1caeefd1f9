//! Command-line entry point for assetcat.

mod commands;

use anyhow::{Context, Result};
use assetcat_core::config::AppConfig;
use assetcat_core::{MatchMode, RecordType};
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// assetcat - catalog of downloaded file assets
#[derive(Parser, Debug)]
#[command(name = "assetcat")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "ASSETCAT_CONFIG",
        default_value = "config/assetcat.toml"
    )]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest manifest or deletion records (JSON lines) into the catalog
    Ingest {
        /// Which write path the batch goes through
        #[arg(long, default_value = "asset")]
        record_type: RecordType,
        /// How incoming assets are matched against the catalog
        #[arg(long, default_value = "filename")]
        mode: MatchMode,
        /// Upload each asset's local file to object storage before recording it
        #[arg(long, default_value_t = false)]
        upload: bool,
        /// Input file (default: stdin)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Print catalogued filenames missing from the latest manifest
    DetectDeletions {
        /// Latest manifest (JSON lines with local_file)
        #[arg(long)]
        manifest: PathBuf,
        /// Known filenames, one per line
        #[arg(long, required_unless_present = "from_catalog", conflicts_with = "from_catalog")]
        dbassets: Option<PathBuf>,
        /// Read known filenames from the catalog's live rows
        #[arg(long, default_value_t = false)]
        from_catalog: bool,
    },
    /// Forward only records whose campaign or feed id is catalogued
    FilterFeed {
        /// Record source: impact or partnerize
        #[arg(long)]
        source: String,
        /// Input file (default: stdin)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Connect to the catalog and object storage and report health
    Check,
}

fn init_tracing() {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load configuration. The file is optional; `ASSETCAT_` environment
/// variables override it, with `__` separating nested keys.
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if Path::new(path).exists() {
        tracing::debug!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("ASSETCAT_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest {
            record_type,
            mode,
            upload,
            input,
        } => commands::ingest(&config, record_type, mode, upload, input.as_deref()).await,
        Commands::DetectDeletions {
            manifest,
            dbassets,
            from_catalog,
        } => commands::detect_deletions(&config, &manifest, dbassets.as_deref(), from_catalog).await,
        Commands::FilterFeed { source, input } => {
            commands::filter_feed(&config, &source, input.as_deref()).await
        }
        Commands::Check => commands::check(&config).await,
    }
}
