//! Subcommand implementations.

use anyhow::{Context, Result};
use assetcat_core::config::AppConfig;
use assetcat_core::{ManifestIndex, MatchMode, RecordType, read_filename_list};
use assetcat_metadata::{
    AssetWriter, CatalogStore, DedupFilter, FeedFilter, FileAssetRepo, IngestPipeline,
    RecordSource,
};
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

async fn connect_catalog(config: &AppConfig) -> Result<Arc<dyn CatalogStore>> {
    let store = assetcat_metadata::from_config(&config.metadata, &config.connect)
        .await
        .context("failed to connect to catalog")?;
    tracing::info!(backend = store.backend_name(), "catalog ready");
    Ok(store)
}

/// Read the whole input, from a file or stdin.
async fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

pub async fn ingest(
    config: &AppConfig,
    record_type: RecordType,
    mode: MatchMode,
    upload: bool,
    input: Option<&Path>,
) -> Result<()> {
    let store = connect_catalog(config).await?;

    let mut writer = AssetWriter::new(store.clone(), config.assets.clone());
    if upload {
        let objects = assetcat_storage::from_config(&config.storage)
            .await
            .context("failed to initialize storage")?;
        writer = writer.with_object_store(objects);
    }
    let pipeline = IngestPipeline::new(DedupFilter::new(store, mode), writer);

    let text = read_input(input).await?;
    let report = pipeline
        .run_batch(text.lines(), record_type, |ack| {
            println!("{}", serde_json::json!({ "metahash": ack }));
        })
        .await
        .context("ingest aborted")?;

    if report.failed > 0 {
        tracing::warn!(failed = report.failed, "some records were not ingested");
    }
    Ok(())
}

pub async fn detect_deletions(
    config: &AppConfig,
    manifest: &Path,
    dbassets: Option<&Path>,
    from_catalog: bool,
) -> Result<()> {
    let file = std::fs::File::open(manifest)
        .with_context(|| format!("failed to open manifest {}", manifest.display()))?;
    let index = ManifestIndex::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to read manifest {}", manifest.display()))?;

    let known = match dbassets {
        Some(path) if !from_catalog => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            read_filename_list(BufReader::new(file))?
        }
        _ => connect_catalog(config).await?.list_live_filenames().await?,
    };

    let deleted = assetcat_core::detect_deletions(known, &index);
    tracing::info!(
        manifest_files = index.len(),
        deletions = deleted.len(),
        "deletion detection complete"
    );
    for filename in deleted {
        println!("{filename}");
    }
    Ok(())
}

pub async fn filter_feed(config: &AppConfig, source: &str, input: Option<&Path>) -> Result<()> {
    let source: RecordSource = source.parse()?;

    let store = connect_catalog(config).await?;
    let filter = FeedFilter::load(store.as_ref(), &config.lookups).await?;

    let text = read_input(input).await?;
    for line in filter.filter_lines(source, text.lines()) {
        println!("{line}");
    }
    Ok(())
}

pub async fn check(config: &AppConfig) -> Result<()> {
    let store = connect_catalog(config).await?;
    store
        .health_check()
        .await
        .context("catalog health check failed")?;
    println!("catalog: ok ({})", store.backend_name());

    let objects = assetcat_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    objects
        .health_check()
        .await
        .context("storage health check failed")?;
    println!("storage: ok ({})", objects.backend_name());
    Ok(())
}
