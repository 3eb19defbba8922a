//! Skyband CLI: reduce the Gaia catalog into declination-band pointing files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use skyband::{Config, HttpSource, Pipeline, PipelineError};

#[derive(Debug, Parser)]
#[command(name = "skyband", about = "Gaia catalog reduction pipeline")]
struct CliArgs {
    /// Path to a YAML configuration file.
    #[arg(long, env = "SKYBAND_CONFIG")]
    config: Option<PathBuf>,

    /// Override the catalog archive URL.
    #[arg(long)]
    url: Option<String>,

    /// Override the working directory.
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Cap sustained download bandwidth (bytes per second).
    #[arg(long)]
    throttle: Option<u64>,

    /// Process only the first partition.
    #[arg(long)]
    test_one: bool,

    /// Re-download raw partitions instead of reusing local copies, and
    /// remove them after reduction.
    #[arg(long)]
    discard_raw: bool,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    init_tracing();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(url) = args.url {
        config.catalog.url = url;
    }
    if let Some(working_dir) = args.working_dir {
        config.working_dir = working_dir;
    }
    if let Some(throttle) = args.throttle {
        config.catalog.throttle_bytes_per_sec = Some(throttle);
    }
    if args.test_one {
        config.reduce.test_one = true;
    }
    if args.discard_raw {
        config.reduce.use_existing = false;
    }
    config.validate()?;

    let source = HttpSource::new(
        &config.catalog.url,
        Duration::from_secs(config.catalog.timeout_secs),
    )?;

    info!(
        url = %config.catalog.url,
        working_dir = %config.working_dir.display(),
        "Starting skyband pipeline"
    );

    let pipeline = Pipeline::new(config, Arc::new(source));
    let stats = pipeline.run().await?;
    info!(
        reduced = stats.reduced,
        skipped = stats.skipped,
        empty = stats.empty,
        bands = stats.bands,
        "Run finished"
    );
    Ok(())
}
