//! Record table I/O.
//!
//! Reduced partitions and band files are Parquet tables with the shared
//! [`crate::record::schema`]. Every write goes through a temp file in the
//! destination directory followed by an atomic rename, so a half-written
//! table is never visible under its final name.
//!
//! A zero-byte file is the "processed, zero qualifying rows" placeholder.
//! [`read_records`] reports it as [`TableError::Empty`] so callers can treat
//! it as a legitimate no-rows table rather than corruption.

use std::fs::File;
use std::path::Path;

use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use snafu::prelude::*;
use tempfile::NamedTempFile;

use crate::error::{ArrowSnafu, IoSnafu, ParquetSnafu, TableError};
use crate::record::{self, CatalogRecord};

/// Read all records from a table file.
pub fn read_records(path: &Path) -> Result<Vec<CatalogRecord>, TableError> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TableError::Missing {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(TableError::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    if metadata.len() == 0 {
        return Err(TableError::Empty {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).context(IoSnafu { path })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context(ParquetSnafu { path })?
        .build()
        .context(ParquetSnafu { path })?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch.context(ArrowSnafu { path })?;
        records.extend(record::batch_to_records(&batch).context(ArrowSnafu { path })?);
    }
    Ok(records)
}

/// Write records to a table file, replacing any previous contents.
///
/// An empty slice produces a valid zero-row table, which is how band files
/// are pre-created before routing.
pub fn write_records(path: &Path, records: &[CatalogRecord]) -> Result<(), TableError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp = NamedTempFile::new_in(parent).context(IoSnafu { path })?;

    let handle = temp.as_file().try_clone().context(IoSnafu { path })?;
    let mut writer =
        ArrowWriter::try_new(handle, record::schema(), None).context(ParquetSnafu { path })?;
    if !records.is_empty() {
        let batch = record::records_to_batch(records).context(ArrowSnafu { path })?;
        writer.write(&batch).context(ParquetSnafu { path })?;
    }
    writer.close().context(ParquetSnafu { path })?;

    temp.persist(path).map_err(|e| TableError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Commit a zero-byte placeholder marking a partition as processed with no
/// qualifying rows.
pub fn write_placeholder(path: &Path) -> Result<(), TableError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp = NamedTempFile::new_in(parent).context(IoSnafu { path })?;
    temp.persist(path).map_err(|e| TableError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}
