//! Final per-band sort.
//!
//! Runs once after routing: each band file is loaded, sorted ascending by
//! right ascension with `source_id` as the deterministic tiebreak, and
//! rewritten in place.

use std::path::Path;

use tracing::info;

use crate::bands::Band;
use crate::error::FinalizeError;
use crate::table;

/// Sort every band file by (RA, source_id) ascending.
pub fn finalize(bands: &[Band], dir: &Path) -> Result<(), FinalizeError> {
    for band in bands {
        let path = band.path(dir);
        let mut records = table::read_records(&path).map_err(|source| FinalizeError::Rewrite {
            path: path.clone(),
            source,
        })?;

        records.sort_unstable_by(|a, b| {
            a.ra.total_cmp(&b.ra)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });

        table::write_records(&path, &records)
            .map_err(|source| FinalizeError::Rewrite { path, source })?;
        info!(
            band = %band.file_name(),
            sources = records.len(),
            "Finalized band"
        );
    }
    Ok(())
}
