//! Fixed-width declination bands.
//!
//! The final re-partitioning scheme: contiguous, non-overlapping, half-open
//! ranges `[lo, hi)` covering the full retained declination domain. A source
//! sitting exactly on a boundary belongs to the band whose range starts at
//! that boundary. The topmost band additionally includes its upper edge, so
//! a source sitting exactly on the domain ceiling still lands in a band.

use std::path::{Path, PathBuf};

use crate::config::BandConfig;

/// One declination band, identified by its range in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Lower edge (inclusive).
    pub lo: f64,
    /// Upper edge (exclusive unless `closed`).
    pub hi: f64,
    /// Upper edge is inclusive. Set only on the topmost band, which owns
    /// the domain ceiling.
    pub closed: bool,
}

impl Band {
    /// Whether a declination falls inside this band (lower-inclusive).
    pub fn contains(&self, dec: f64) -> bool {
        dec >= self.lo && (dec < self.hi || (self.closed && dec == self.hi))
    }

    /// Whether this band overlaps an observed declination span `[min, max]`.
    pub fn intersects(&self, min: f64, max: f64) -> bool {
        max >= self.lo && (min < self.hi || (self.closed && min == self.hi))
    }

    /// Deterministic band file name, range encoded with explicit signs.
    pub fn file_name(&self) -> String {
        format!(
            "band_dec{:+03}{:+03}.parquet",
            self.lo.round() as i64,
            self.hi.round() as i64
        )
    }

    /// Full path of this band's file inside the working directory.
    pub fn path(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

/// Build the fixed band set from the configured geometry.
pub fn declination_bands(config: &BandConfig) -> Vec<Band> {
    let mut bands = Vec::new();
    let mut lo = config.dec_min;
    // Tolerance keeps float accumulation from emitting a sliver band at the
    // top edge.
    let epsilon = config.width * 1e-9;
    while lo < config.dec_max - epsilon {
        let hi = (lo + config.width).min(config.dec_max);
        bands.push(Band {
            lo,
            hi,
            closed: false,
        });
        lo = hi;
    }
    if let Some(top) = bands.last_mut() {
        top.closed = true;
    }
    bands
}
