//! Pipeline orchestration: list, reduce, route, finalize.
//!
//! Partitions are processed strictly one at a time, in listing order. The
//! order does not affect final band contents (routing is per-row by
//! declination and finalize re-sorts); it only determines which partitions
//! a resumed run skips.

use std::path::PathBuf;
use std::sync::Arc;

use snafu::prelude::*;
use tracing::info;

use crate::bands::declination_bands;
use crate::config::Config;
use crate::error::{PipelineError, WorkingDirSnafu};
use crate::finalize::finalize;
use crate::reduce::{ReduceOutcome, Reducer, raw_file_name};
use crate::route::route;
use crate::source::CatalogSource;

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Partitions listed by the archive.
    pub listed: usize,
    /// Partitions considered this run (after the test-one cutoff).
    pub processed: usize,
    /// Partitions reduced with at least one qualifying row.
    pub reduced: usize,
    /// Partitions skipped because their reduced output already existed.
    pub skipped: usize,
    /// Partitions committed as empty placeholders.
    pub empty: usize,
    /// Band files produced.
    pub bands: usize,
}

/// The full catalog pipeline.
pub struct Pipeline {
    config: Config,
    source: Arc<dyn CatalogSource>,
}

impl Pipeline {
    pub fn new(config: Config, source: Arc<dyn CatalogSource>) -> Self {
        Self { config, source }
    }

    /// Run the pipeline to completion: reduce every partition, route the
    /// reduced records into bands, then sort each band.
    pub async fn run(&self) -> Result<PipelineStats, PipelineError> {
        std::fs::create_dir_all(&self.config.working_dir).context(WorkingDirSnafu {
            path: &self.config.working_dir,
        })?;

        let files = self.source.list(&self.config.catalog.extension).await?;
        info!(partitions = files.len(), "Partitions in the remote catalog");

        let mut stats = PipelineStats {
            listed: files.len(),
            ..Default::default()
        };

        let reducer = Reducer::new(&self.config, self.source.as_ref());
        let mut reduced_paths: Vec<PathBuf> = Vec::new();

        for (index, url) in files.iter().enumerate() {
            if self.config.reduce.test_one && index > 0 {
                break;
            }
            info!(
                partition = raw_file_name(url),
                "Processing partition {} of {}",
                index + 1,
                files.len()
            );
            match reducer.reduce(url).await? {
                ReduceOutcome::AlreadyReduced => stats.skipped += 1,
                ReduceOutcome::Written { .. } => stats.reduced += 1,
                ReduceOutcome::NoQualifyingRows => stats.empty += 1,
            }
            stats.processed += 1;
            reduced_paths.push(reducer.reduced_path(url));
        }

        let bands = declination_bands(&self.config.bands);
        stats.bands = bands.len();

        route(&reduced_paths, &bands, &self.config.working_dir)?;
        finalize(&bands, &self.config.working_dir)?;

        info!(
            processed = stats.processed,
            reduced = stats.reduced,
            skipped = stats.skipped,
            empty = stats.empty,
            bands = stats.bands,
            "Pipeline complete"
        );
        Ok(stats)
    }
}
