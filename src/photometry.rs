//! Gaia-to-Johnson photometric conversions.
//!
//! Derives Johnson-Cousins V, R, and I magnitudes from Gaia G and the
//! BP−RP color via the polynomial fits of Riello et al. 2021, A&A 649,
//! A3, Table C2. Each fit gives `G − X = f(BP − RP)`.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Polynomial coefficients for the Gaia-to-Johnson conversions.
///
/// Coefficients are ordered from the constant term upward. The defaults are
/// the published Table C2 fits; they are configuration so a newer data
/// release can swap them without touching code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotometryConfig {
    /// G − V as a function of BP − RP.
    #[serde(default = "default_g_minus_v")]
    pub g_minus_v: Vec<f64>,
    /// G − R as a function of BP − RP.
    #[serde(default = "default_g_minus_r")]
    pub g_minus_r: Vec<f64>,
    /// G − I as a function of BP − RP.
    #[serde(default = "default_g_minus_i")]
    pub g_minus_i: Vec<f64>,
}

fn default_g_minus_v() -> Vec<f64> {
    vec![-0.02704, 0.01424, -0.2156, 0.01426]
}

fn default_g_minus_r() -> Vec<f64> {
    vec![-0.02275, 0.3961, -0.1243, -0.01396, 0.003775]
}

fn default_g_minus_i() -> Vec<f64> {
    vec![0.01753, 0.76, -0.0991]
}

impl Default for PhotometryConfig {
    fn default() -> Self {
        Self {
            g_minus_v: default_g_minus_v(),
            g_minus_r: default_g_minus_r(),
            g_minus_i: default_g_minus_i(),
        }
    }
}

/// Johnson-Cousins magnitudes derived from one Gaia source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMags {
    /// Johnson V, the primary brightness used for filtering.
    pub vmag: f64,
    /// Cousins R.
    pub rmag: f64,
    /// Cousins I.
    pub imag: f64,
}

impl PhotometryConfig {
    /// Derive Johnson-Cousins magnitudes from Gaia G and BP−RP.
    ///
    /// NaN inputs (missing photometry in the source catalog) propagate to
    /// NaN outputs, which then fail the brightness filter downstream.
    pub fn derive(&self, g_mag: f64, bp_rp: f64) -> DerivedMags {
        DerivedMags {
            vmag: g_mag - polynomial(&self.g_minus_v, bp_rp),
            rmag: g_mag - polynomial(&self.g_minus_r, bp_rp),
            imag: g_mag - polynomial(&self.g_minus_i, bp_rp),
        }
    }

    /// Check that every polynomial has at least one coefficient.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, coeffs) in [
            ("g_minus_v", &self.g_minus_v),
            ("g_minus_r", &self.g_minus_r),
            ("g_minus_i", &self.g_minus_i),
        ] {
            if coeffs.is_empty() {
                return Err(ConfigError::EmptyPolynomial {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Evaluate a polynomial with coefficients ordered constant-first.
fn polynomial(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}
