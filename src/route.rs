//! Routing reduced records into declination bands.
//!
//! One full pass over every reduced partition per run. Bands are pre-created
//! empty (truncating any contents from an interrupted earlier pass, which is
//! what makes the pass safely re-runnable), then each partition's rows are
//! appended to every band its declination span touches via read-append-
//! rewrite. Progress is partition-count only; there is no per-band marker.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::bands::Band;
use crate::error::{RouteError, TableError};
use crate::record::CatalogRecord;
use crate::table;

/// Route all reduced partitions into the band files under `dir`.
pub fn route(reduced: &[PathBuf], bands: &[Band], dir: &Path) -> Result<(), RouteError> {
    // Truncate-on-create: a previous interrupted pass may have left bands
    // with partial appends that cannot be told apart from complete ones.
    for band in bands {
        let path = band.path(dir);
        table::write_records(&path, &[]).map_err(|source| RouteError::Band { path, source })?;
    }
    info!(
        bands = bands.len(),
        partitions = reduced.len(),
        "Routing reduced partitions into declination bands"
    );

    for (index, partition) in reduced.iter().enumerate() {
        let records = match table::read_records(partition) {
            Ok(records) => records,
            Err(TableError::Missing { .. } | TableError::Empty { .. }) => {
                debug!(partition = %partition.display(), "No rows to route");
                continue;
            }
            Err(e) => {
                warn!(
                    partition = %partition.display(),
                    error = %e,
                    "Unreadable reduced partition, contributes no rows"
                );
                continue;
            }
        };
        if records.is_empty() {
            continue;
        }

        let (min_dec, max_dec) = dec_span(&records);
        for band in bands.iter().filter(|b| b.intersects(min_dec, max_dec)) {
            let subset: Vec<CatalogRecord> = records
                .iter()
                .filter(|r| band.contains(r.dec))
                .copied()
                .collect();
            if subset.is_empty() {
                continue;
            }
            append_to_band(band, dir, &subset)?;
        }

        info!("Routed partition {} of {}", index + 1, reduced.len());
    }
    Ok(())
}

/// Observed declination span of a partition's records.
fn dec_span(records: &[CatalogRecord]) -> (f64, f64) {
    records
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
            (lo.min(r.dec), hi.max(r.dec))
        })
}

/// Read-append-rewrite one band file. Any failure here is fatal to the pass.
fn append_to_band(band: &Band, dir: &Path, subset: &[CatalogRecord]) -> Result<(), RouteError> {
    let path = band.path(dir);
    let mut contents = table::read_records(&path).map_err(|source| RouteError::Band {
        path: path.clone(),
        source,
    })?;
    contents.extend_from_slice(subset);
    table::write_records(&path, &contents).map_err(|source| RouteError::Band { path, source })?;
    Ok(())
}
