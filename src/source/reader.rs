//! Raw catalog partition parsing.
//!
//! Partitions are comma-delimited text, gzip-compressed on the archive.
//! Only the handful of columns the pointing database needs are pulled out;
//! missing or unparseable numeric fields become NaN (they then fail the
//! acceptance filters), while a bad `source_id` is treated as a malformed
//! partition.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use snafu::prelude::*;

use crate::error::{CsvSnafu, MissingColumnSnafu, OpenRawSnafu, ReduceError};

/// The raw columns retained from one catalog row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawRow {
    pub source_id: u64,
    pub ra: f64,
    pub dec: f64,
    pub ref_epoch: f64,
    pub pmra: f64,
    pub pmdec: f64,
    pub g_mag: f64,
    pub bp_rp: f64,
    pub bp_mag: f64,
    pub rp_mag: f64,
}

const COLUMNS: [&str; 10] = [
    "source_id",
    "ra",
    "dec",
    "ref_epoch",
    "pmra",
    "pmdec",
    "phot_g_mean_mag",
    "bp_rp",
    "phot_bp_mean_mag",
    "phot_rp_mean_mag",
];

/// Read a raw partition into typed rows, decompressing transparently when
/// the file name ends in `.gz`.
pub fn read_raw_partition(path: &Path) -> Result<Vec<RawRow>, ReduceError> {
    let file = File::open(path).context(OpenRawSnafu { path })?;
    let is_gzip = path.extension().is_some_and(|e| e == "gz");
    let reader: Box<dyn Read> = if is_gzip {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(reader));

    let headers = csv_reader.headers().context(CsvSnafu { path })?.clone();
    let mut indexes = [0usize; COLUMNS.len()];
    for (slot, column) in indexes.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == column)
            .context(MissingColumnSnafu { path, column })?;
    }
    let [id, ra, dec, epoch, pmra, pmdec, g_mag, bp_rp, bp_mag, rp_mag] = indexes;

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.context(CsvSnafu { path })?;
        let line = record.position().map_or(0, |p| p.line());

        let id_field = record.get(id).unwrap_or("");
        let source_id = id_field
            .trim()
            .parse::<u64>()
            .map_err(|_| ReduceError::MalformedId {
                path: path.to_path_buf(),
                line,
                value: id_field.to_string(),
            })?;

        rows.push(RawRow {
            source_id,
            ra: float_field(&record, ra),
            dec: float_field(&record, dec),
            ref_epoch: float_field(&record, epoch),
            pmra: float_field(&record, pmra),
            pmdec: float_field(&record, pmdec),
            g_mag: float_field(&record, g_mag),
            bp_rp: float_field(&record, bp_rp),
            bp_mag: float_field(&record, bp_mag),
            rp_mag: float_field(&record, rp_mag),
        });
    }
    Ok(rows)
}

/// Parse a numeric field, filling anything unparseable with NaN.
fn float_field(record: &csv::StringRecord, index: usize) -> f64 {
    record
        .get(index)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}
