//! Error types for the skyband catalog pipeline.

use std::path::PathBuf;

use snafu::prelude::*;

/// Errors raised while talking to the remote catalog archive.
///
/// Connectivity failures are retried inside the transfer engine and never
/// reach the caller; they exist as values so the engine can log them.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// Failed to construct the HTTP client.
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild { source: reqwest::Error },

    /// The request could not be issued or the connection dropped.
    #[snafu(display("Request to {url} failed: {source}"))]
    Request { url: String, source: reqwest::Error },

    /// The archive answered with a non-success status.
    #[snafu(display("Unexpected HTTP status {status} from {url}"))]
    HttpStatus { url: String, status: u16 },

    /// The byte stream ended abnormally mid-transfer.
    #[snafu(display("Connection interrupted: {message}"))]
    Interrupted { message: String },
}

/// Catastrophic local I/O failures during a transfer.
///
/// Network trouble is handled by retrying from byte zero; only conditions
/// like a full disk or missing permissions surface through this type.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransferError {
    /// Failed to create the staging file.
    #[snafu(display("Failed to create staging file {}: {source}", path.display()))]
    Stage {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write to the staging file.
    #[snafu(display("Failed to write staging file {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to flush the staging file before commit.
    #[snafu(display("Failed to sync staging file {}: {source}", path.display()))]
    Sync {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to rename the staging file into place.
    #[snafu(display("Failed to commit transferred file {}: {source}", path.display()))]
    Commit {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors reading or writing record table files.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TableError {
    /// The table file does not exist.
    #[snafu(display("Table file does not exist: {}", path.display()))]
    Missing { path: PathBuf },

    /// The file is a zero-byte placeholder, not a readable table.
    #[snafu(display("Table file is an empty placeholder: {}", path.display()))]
    Empty { path: PathBuf },

    /// Filesystem I/O failure.
    #[snafu(display("I/O error on table file {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not a recognizable Parquet table.
    #[snafu(display("Failed to read Parquet table {}: {source}", path.display()))]
    Parquet {
        path: PathBuf,
        source: parquet::errors::ParquetError,
    },

    /// Arrow-level conversion failure (unexpected schema or column type).
    #[snafu(display("Arrow error on table file {}: {source}", path.display()))]
    Arrow {
        path: PathBuf,
        source: arrow::error::ArrowError,
    },
}

/// Errors reducing a single raw catalog partition.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReduceError {
    /// The transfer engine hit a catastrophic local failure.
    #[snafu(display("Transfer failed: {source}"))]
    Transfer { source: TransferError },

    /// Failed to open the raw partition file.
    #[snafu(display("Failed to open raw partition {}: {source}", path.display()))]
    OpenRaw {
        path: PathBuf,
        source: std::io::Error,
    },

    /// CSV-level read failure in the raw partition.
    #[snafu(display("Failed to read raw partition {}: {source}", path.display()))]
    Csv { path: PathBuf, source: csv::Error },

    /// A required column is absent from the partition header.
    #[snafu(display("Raw partition {} has no '{column}' column", path.display()))]
    MissingColumn { path: PathBuf, column: String },

    /// A source identifier failed to parse as an unsigned integer.
    #[snafu(display(
        "Malformed source_id {value:?} at line {line} of {}", path.display()
    ))]
    MalformedId {
        path: PathBuf,
        line: u64,
        value: String,
    },

    /// Failed to remove the raw partition after reduction.
    #[snafu(display("Failed to remove raw partition {}: {source}", path.display()))]
    RemoveRaw {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the reduced output table.
    #[snafu(display("Failed to write reduced partition: {source}"))]
    Table { source: TableError },
}

/// Errors routing reduced records into declination bands.
///
/// Any failure on a band file is fatal: a partially appended band cannot be
/// distinguished from a complete one, so the whole pass must be re-run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RouteError {
    /// A band file could not be read or rewritten.
    #[snafu(display("Band file {} failed during routing: {source}", path.display()))]
    Band { path: PathBuf, source: TableError },
}

/// Errors during the final per-band sort.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FinalizeError {
    /// A band file could not be loaded or rewritten.
    #[snafu(display("Band file {} failed during finalize: {source}", path.display()))]
    Rewrite { path: PathBuf, source: TableError },
}

/// Configuration loading and validation errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[snafu(display("Failed to read config file: {source}"))]
    ReadFile { source: std::io::Error },

    /// Failed to parse the configuration YAML.
    #[snafu(display("Failed to parse config YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// The catalog URL is empty.
    #[snafu(display("Catalog URL must not be empty"))]
    EmptyCatalogUrl,

    /// The band range is inverted or degenerate.
    #[snafu(display("Invalid declination band range [{min}, {max})"))]
    InvalidBandRange { min: f64, max: f64 },

    /// The band width is zero or negative.
    #[snafu(display("Band width must be positive, got {width}"))]
    InvalidBandWidth { width: f64 },

    /// Two bands round to the same file name.
    #[snafu(display("Band width {width} produces colliding band file names"))]
    AmbiguousBandNames { width: f64 },

    /// A photometric polynomial has no coefficients.
    #[snafu(display("Photometric polynomial '{name}' has no coefficients"))]
    EmptyPolynomial { name: String },
}

/// Top-level pipeline errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Remote listing failed.
    #[snafu(display("Catalog listing failed: {source}"))]
    Source { source: SourceError },

    /// A partition failed to reduce.
    #[snafu(display("Reduce error: {source}"))]
    Reduce { source: ReduceError },

    /// Routing failed.
    #[snafu(display("Route error: {source}"))]
    Route { source: RouteError },

    /// Finalization failed.
    #[snafu(display("Finalize error: {source}"))]
    Finalize { source: FinalizeError },

    /// Working directory could not be created.
    #[snafu(display("Failed to create working directory {}: {source}", path.display()))]
    WorkingDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<ConfigError> for PipelineError {
    fn from(source: ConfigError) -> Self {
        PipelineError::Config { source }
    }
}

impl From<SourceError> for PipelineError {
    fn from(source: SourceError) -> Self {
        PipelineError::Source { source }
    }
}

impl From<ReduceError> for PipelineError {
    fn from(source: ReduceError) -> Self {
        PipelineError::Reduce { source }
    }
}

impl From<RouteError> for PipelineError {
    fn from(source: RouteError) -> Self {
        PipelineError::Route { source }
    }
}

impl From<FinalizeError> for PipelineError {
    fn from(source: FinalizeError) -> Self {
        PipelineError::Finalize { source }
    }
}

impl From<TransferError> for ReduceError {
    fn from(source: TransferError) -> Self {
        ReduceError::Transfer { source }
    }
}

impl From<TableError> for ReduceError {
    fn from(source: TableError) -> Self {
        ReduceError::Table { source }
    }
}
