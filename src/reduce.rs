//! Partition reduction: raw catalog partition to reduced record table.
//!
//! Each partition is materialized locally through the transfer engine,
//! parsed, photometrically converted, filtered, and written as a reduced
//! Parquet table. The committed reduced file doubles as the progress
//! marker: if it exists the partition is skipped outright, with no network
//! access. A partition whose rows all fail the filters commits a zero-byte
//! placeholder so the skip rule still applies.

use std::path::{Path, PathBuf};

use snafu::prelude::*;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ReduceError, RemoveRawSnafu};
use crate::record::CatalogRecord;
use crate::source::{CatalogSource, read_raw_partition};
use crate::table;
use crate::transfer::transfer;

/// What a single reduce call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOutcome {
    /// The reduced output already existed; nothing was done.
    AlreadyReduced,
    /// Records were written to the reduced table.
    Written { rows: usize },
    /// Every row failed the filters; a placeholder was committed.
    NoQualifyingRows,
}

/// File name of a remote partition URL (everything after the last `/`).
pub fn raw_file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Reduced-table file name for a partition: base name up to the first `.`,
/// with the reduced-format extension.
pub fn reduced_file_name(url: &str) -> String {
    let base = raw_file_name(url);
    let stem = base.split('.').next().unwrap_or(base);
    format!("{stem}.parquet")
}

/// Reduces raw catalog partitions one at a time.
pub struct Reducer<'a> {
    config: &'a Config,
    source: &'a dyn CatalogSource,
}

impl<'a> Reducer<'a> {
    pub fn new(config: &'a Config, source: &'a dyn CatalogSource) -> Self {
        Self { config, source }
    }

    /// Path of the reduced table for a partition URL.
    pub fn reduced_path(&self, url: &str) -> PathBuf {
        self.config.working_dir.join(reduced_file_name(url))
    }

    /// Reduce one partition, skipping entirely if its output exists.
    pub async fn reduce(&self, url: &str) -> Result<ReduceOutcome, ReduceError> {
        let reduced = self.reduced_path(url);
        if reduced.exists() {
            debug!(partition = raw_file_name(url), "Reduced table exists, skipping");
            return Ok(ReduceOutcome::AlreadyReduced);
        }

        let raw = self.config.working_dir.join(raw_file_name(url));
        if raw.exists() && !self.config.reduce.use_existing {
            std::fs::remove_file(&raw).context(RemoveRawSnafu { path: &raw })?;
        }
        if !raw.exists() {
            info!(partition = raw_file_name(url), "Downloading partition");
            transfer(
                self.source,
                url,
                &raw,
                self.config.catalog.throttle_bytes_per_sec,
            )
            .await?;
        }

        let outcome = self.reduce_local(&raw, &reduced)?;

        if !self.config.reduce.use_existing {
            std::fs::remove_file(&raw).context(RemoveRawSnafu { path: &raw })?;
        }
        Ok(outcome)
    }

    /// Parse, convert, filter, and write one locally materialized partition.
    fn reduce_local(&self, raw: &Path, reduced: &Path) -> Result<ReduceOutcome, ReduceError> {
        let rows = read_raw_partition(raw)?;
        info!(sources = rows.len(), "Sources in this partition");

        let mag_limit = self.config.reduce.mag_limit;
        let dec_floor = self.config.reduce.dec_floor;

        // Both predicates are independent per-row conjuncts; the split
        // mirrors the per-stage counts reported to the operator.
        let with_mags: Vec<_> = rows
            .iter()
            .map(|row| (row, self.config.photometry.derive(row.g_mag, row.bp_rp)))
            .filter(|(_, mags)| mags.vmag <= mag_limit)
            .collect();
        info!(sources = with_mags.len(), "Sources after magnitude limit");

        let accepted: Vec<_> = with_mags
            .into_iter()
            .filter(|(row, _)| row.dec > dec_floor)
            .collect();
        info!(sources = accepted.len(), "Sources after declination limit");

        if accepted.is_empty() {
            table::write_placeholder(reduced)?;
            info!("No qualifying sources, committed placeholder");
            return Ok(ReduceOutcome::NoQualifyingRows);
        }

        log_range("R.A.", accepted.iter().map(|(r, _)| r.ra));
        log_range("Dec.", accepted.iter().map(|(r, _)| r.dec));
        log_range("Vmag", accepted.iter().map(|(_, m)| m.vmag));

        let records: Vec<CatalogRecord> = accepted
            .into_iter()
            .map(|(row, mags)| CatalogRecord {
                source_id: row.source_id,
                ra: row.ra,
                dec: row.dec,
                epoch: row.ref_epoch as f32,
                pmra: row.pmra as f32,
                pmdec: row.pmdec as f32,
                vmag: mags.vmag as f32,
                rmag: mags.rmag as f32,
                imag: mags.imag as f32,
                g_mag: row.g_mag as f32,
                bp_mag: row.bp_mag as f32,
                rp_mag: row.rp_mag as f32,
            })
            .collect();

        table::write_records(reduced, &records)?;
        Ok(ReduceOutcome::Written {
            rows: records.len(),
        })
    }
}

/// Log the min/max of a quantity over the accepted rows, ignoring NaN.
fn log_range(label: &str, values: impl Iterator<Item = f64>) {
    let (min, max) = values
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min <= max {
        info!("{label} range: {min:.4} - {max:.4}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_file_name() {
        assert_eq!(
            raw_file_name("http://host/dir/GaiaSource_000000-003111.csv.gz"),
            "GaiaSource_000000-003111.csv.gz"
        );
        assert_eq!(raw_file_name("bare.csv.gz"), "bare.csv.gz");
    }

    #[test]
    fn test_reduced_file_name_strips_all_extensions() {
        assert_eq!(
            reduced_file_name("http://host/dir/GaiaSource_000000-003111.csv.gz"),
            "GaiaSource_000000-003111.parquet"
        );
        assert_eq!(reduced_file_name("http://host/plain"), "plain.parquet");
    }
}
