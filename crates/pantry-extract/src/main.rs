//! Pantry - product dump download and extraction tool

use anyhow::{Context, Result};
use clap::Parser;
use pantry_common::checksum::verify_file_checksum;
use pantry_common::logging::{init_logging, LogConfig, LogLevel};
use pantry_common::types::MANIFEST_FILE_NAME;
use pantry_common::{Datasource, Language, Manifest};
use pantry_extract::config::ExtractConfig;
use pantry_extract::download::{DownloadRequest, Downloader};
use pantry_extract::normalize::{NutritionPrivacyProduct, OpenFoodFactsProduct, RecordNormalizer};
use pantry_extract::pipeline::{ExtractError, ExtractionPipeline, ExtractionReport, TracingProgress};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const ALL_SOURCES: [Datasource; 2] = [Datasource::NutritionPrivacy, Datasource::OpenFoodFacts];

#[derive(Parser, Debug)]
#[command(name = "pantry")]
#[command(author, version, about = "Product dump download and extraction tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Download provider dumps into the download directory
    Download {
        /// Datasources to fetch (off, np); all when omitted
        #[arg(short, long, value_delimiter = ',')]
        sources: Vec<Datasource>,

        /// Download directory
        #[arg(short, long, env = "PANTRY_DOWNLOAD_DIR")]
        dir: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Extract downloaded dumps into per-language shards
    Extract {
        /// Datasources to extract (off, np); all when omitted
        #[arg(short, long, value_delimiter = ',')]
        sources: Vec<Datasource>,

        /// Dump to read instead of the downloaded file (single source only)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, env = "PANTRY_OUTPUT_DIR")]
        output: Option<PathBuf>,

        /// Languages to produce shards for (en, de); all when omitted
        #[arg(short, long, value_delimiter = ',')]
        languages: Vec<Language>,

        /// Split shards into parts of at most this many bytes
        #[arg(long, env = "PANTRY_MAX_PART_SIZE")]
        max_part_size: Option<u64>,
    },

    /// Check every shard listed in the manifest against its digest
    Verify {
        /// Output directory holding the manifest
        #[arg(short, long, env = "PANTRY_OUTPUT_DIR")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::new(log_level).file_prefix("pantry").merge_env()?;

    let _guard = init_logging(&log_config)?;

    let mut config = ExtractConfig::load()?;

    match cli.command {
        Command::Download {
            sources,
            dir,
            no_progress,
        } => {
            if let Some(dir) = dir {
                config.download_dir = dir;
            }
            download(&config, &with_default(sources, &ALL_SOURCES), !no_progress).await?;
        },
        Command::Extract {
            sources,
            input,
            output,
            languages,
            max_part_size,
        } => {
            if let Some(output) = output {
                config.output_dir = output;
            }
            if max_part_size.is_some() {
                config.max_part_size = max_part_size;
            }
            config.validate()?;

            let sources = with_default(sources, &ALL_SOURCES);
            if input.is_some() && sources.len() != 1 {
                anyhow::bail!("--input requires exactly one --sources entry");
            }
            extract(config, sources, input, with_default(languages, &Language::ALL)).await?;
        },
        Command::Verify { output } => {
            verify(&output.unwrap_or(config.output_dir))?;
        },
    }

    Ok(())
}

fn with_default<T: Copy>(values: Vec<T>, default: &[T]) -> Vec<T> {
    if values.is_empty() {
        default.to_vec()
    } else {
        values
    }
}

async fn download(config: &ExtractConfig, sources: &[Datasource], show_progress: bool) -> Result<()> {
    let mut requests = Vec::new();
    for &source in sources {
        let destination = config.source_path(source);
        if destination.exists() {
            info!(path = %destination.display(), "Found cached file, skipping download");
            continue;
        }
        requests.push(DownloadRequest::new(config.source_url(source), destination));
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling downloads");
            on_interrupt.cancel();
        }
    });

    let downloader = Downloader::new(config.retry_policy()).show_progress(show_progress);
    let results = downloader.download_all(&requests, &cancel).await;

    let mut failed = 0;
    for (request, result) in requests.iter().zip(results) {
        if let Err(e) = result {
            error!(url = %request.url, error = %e, "Download failed");
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} downloads failed", failed, requests.len());
    }
    info!("Downloads complete");
    Ok(())
}

async fn extract(
    config: ExtractConfig,
    sources: Vec<Datasource>,
    input: Option<PathBuf>,
    languages: Vec<Language>,
) -> Result<()> {
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    let manifest_path = config.output_dir.join(MANIFEST_FILE_NAME);
    let mut manifest = if manifest_path.exists() {
        Manifest::load(&manifest_path).context("Failed to read existing manifest")?
    } else {
        Manifest::new()
    };

    for datasource in sources {
        let source = input.clone().unwrap_or_else(|| config.source_path(datasource));
        let job_config = config.clone();
        let job_languages = languages.clone();

        let report = tokio::task::spawn_blocking(move || {
            extract_source(&job_config, datasource, &source, &job_languages)
        })
        .await
        .context("Extraction task panicked")??;

        info!(
            %datasource,
            extracted = report.stats.extracted,
            skipped = report.stats.skipped,
            "Datasource extracted"
        );
        manifest.remove_source(datasource);
        manifest.merge(report.packages);
    }

    manifest.save(&manifest_path)?;
    info!(path = %manifest_path.display(), "Manifest written");
    Ok(())
}

fn verify(output_dir: &Path) -> Result<()> {
    let manifest = Manifest::load(output_dir.join(MANIFEST_FILE_NAME)).context("Failed to read manifest")?;

    let mut checked = 0;
    for package in manifest.packages() {
        for file in &package.files {
            verify_file_checksum(output_dir.join(&file.name), &file.sha256)?;
            checked += 1;
        }
    }

    info!(files = checked, "All shards match the manifest");
    Ok(())
}

fn extract_source(
    config: &ExtractConfig,
    datasource: Datasource,
    source: &Path,
    languages: &[Language],
) -> std::result::Result<ExtractionReport, ExtractError> {
    match datasource {
        Datasource::OpenFoodFacts => run_pipeline::<OpenFoodFactsProduct>(config, datasource, source, languages),
        Datasource::NutritionPrivacy => run_pipeline::<NutritionPrivacyProduct>(config, datasource, source, languages),
    }
}

fn run_pipeline<N: RecordNormalizer>(
    config: &ExtractConfig,
    datasource: Datasource,
    source: &Path,
    languages: &[Language],
) -> std::result::Result<ExtractionReport, ExtractError> {
    let pipeline = ExtractionPipeline::<N>::new()
        .with_progress_every(config.progress_every)
        .with_chunk_size(config.chunk_size);

    match config.max_part_size {
        Some(max_part_size) => pipeline.run_chunked(
            source,
            &config.output_dir,
            datasource,
            languages,
            &TracingProgress,
            max_part_size,
        ),
        None => pipeline.run(source, &config.output_dir, datasource, languages, &TracingProgress),
    }
}
