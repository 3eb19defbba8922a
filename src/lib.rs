//! Skyband: reduces the Gaia EDR3 source catalog into declination-band
//! pointing files.
//!
//! This crate handles:
//! - Listing catalog partitions from the archive's HTTP index
//! - Throttled, retry-from-zero streaming downloads with atomic commit
//! - Reducing each partition to the columns a pointing database needs,
//!   with Gaia-to-Johnson photometric conversion and brightness/declination
//!   filtering
//! - Re-partitioning the reduced records into fixed-width declination bands
//! - Sorting each band by right ascension once routing completes
//!
//! A run is resumable: the committed reduced table per partition is the
//! progress marker, and routing is a clean single pass that truncates its
//! outputs on start.

pub mod bands;
pub mod config;
pub mod error;
pub mod finalize;
pub mod photometry;
pub mod pipeline;
pub mod record;
pub mod reduce;
pub mod route;
pub mod source;
pub mod table;
pub mod transfer;

pub use bands::{Band, declination_bands};
pub use config::Config;
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineStats};
pub use record::CatalogRecord;
pub use source::{CatalogSource, HttpSource, RemoteRead};
