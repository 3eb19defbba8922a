//! The reduced catalog record and its Arrow schema.

use std::sync::Arc;

use arrow::array::{Array, Float32Array, Float64Array, RecordBatch, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;

/// One reduced catalog source, the unit retained for the pointing database.
///
/// Numeric widths follow the downstream schema: identity is 64-bit unsigned,
/// coordinates are double precision, everything else single precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogRecord {
    /// Gaia source identifier, unique within the catalog.
    pub source_id: u64,
    /// Right ascension (degrees).
    pub ra: f64,
    /// Declination (degrees).
    pub dec: f64,
    /// Reference epoch (Julian year).
    pub epoch: f32,
    /// Proper motion in RA times cos(dec) (mas/yr).
    pub pmra: f32,
    /// Proper motion in declination (mas/yr).
    pub pmdec: f32,
    /// Derived Johnson V, the primary brightness.
    pub vmag: f32,
    /// Derived Cousins R.
    pub rmag: f32,
    /// Derived Cousins I.
    pub imag: f32,
    /// Gaia G mean magnitude the derivation started from.
    pub g_mag: f32,
    /// Gaia BP mean magnitude.
    pub bp_mag: f32,
    /// Gaia RP mean magnitude.
    pub rp_mag: f32,
}

/// Arrow schema shared by reduced partitions and band files.
pub fn schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("source_id", DataType::UInt64, false),
        Field::new("ra", DataType::Float64, false),
        Field::new("dec", DataType::Float64, false),
        Field::new("epoch", DataType::Float32, false),
        Field::new("pmra", DataType::Float32, false),
        Field::new("pmdec", DataType::Float32, false),
        Field::new("vmag", DataType::Float32, false),
        Field::new("rmag", DataType::Float32, false),
        Field::new("imag", DataType::Float32, false),
        Field::new("g_mag", DataType::Float32, false),
        Field::new("bp_mag", DataType::Float32, false),
        Field::new("rp_mag", DataType::Float32, false),
    ]))
}

/// Convert records into a single Arrow batch.
pub fn records_to_batch(records: &[CatalogRecord]) -> Result<RecordBatch, ArrowError> {
    RecordBatch::try_new(
        schema(),
        vec![
            Arc::new(UInt64Array::from_iter_values(
                records.iter().map(|r| r.source_id),
            )),
            Arc::new(Float64Array::from_iter_values(
                records.iter().map(|r| r.ra),
            )),
            Arc::new(Float64Array::from_iter_values(
                records.iter().map(|r| r.dec),
            )),
            Arc::new(Float32Array::from_iter_values(
                records.iter().map(|r| r.epoch),
            )),
            Arc::new(Float32Array::from_iter_values(
                records.iter().map(|r| r.pmra),
            )),
            Arc::new(Float32Array::from_iter_values(
                records.iter().map(|r| r.pmdec),
            )),
            Arc::new(Float32Array::from_iter_values(
                records.iter().map(|r| r.vmag),
            )),
            Arc::new(Float32Array::from_iter_values(
                records.iter().map(|r| r.rmag),
            )),
            Arc::new(Float32Array::from_iter_values(
                records.iter().map(|r| r.imag),
            )),
            Arc::new(Float32Array::from_iter_values(
                records.iter().map(|r| r.g_mag),
            )),
            Arc::new(Float32Array::from_iter_values(
                records.iter().map(|r| r.bp_mag),
            )),
            Arc::new(Float32Array::from_iter_values(
                records.iter().map(|r| r.rp_mag),
            )),
        ],
    )
}

/// Convert an Arrow batch back into records.
pub fn batch_to_records(batch: &RecordBatch) -> Result<Vec<CatalogRecord>, ArrowError> {
    let source_id = u64_column(batch, "source_id")?;
    let ra = f64_column(batch, "ra")?;
    let dec = f64_column(batch, "dec")?;
    let epoch = f32_column(batch, "epoch")?;
    let pmra = f32_column(batch, "pmra")?;
    let pmdec = f32_column(batch, "pmdec")?;
    let vmag = f32_column(batch, "vmag")?;
    let rmag = f32_column(batch, "rmag")?;
    let imag = f32_column(batch, "imag")?;
    let g_mag = f32_column(batch, "g_mag")?;
    let bp_mag = f32_column(batch, "bp_mag")?;
    let rp_mag = f32_column(batch, "rp_mag")?;

    Ok((0..batch.num_rows())
        .map(|i| CatalogRecord {
            source_id: source_id.value(i),
            ra: ra.value(i),
            dec: dec.value(i),
            epoch: epoch.value(i),
            pmra: pmra.value(i),
            pmdec: pmdec.value(i),
            vmag: vmag.value(i),
            rmag: rmag.value(i),
            imag: imag.value(i),
            g_mag: g_mag.value(i),
            bp_mag: bp_mag.value(i),
            rp_mag: rp_mag.value(i),
        })
        .collect())
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a dyn Array, ArrowError> {
    batch
        .column_by_name(name)
        .map(|c| c.as_ref())
        .ok_or_else(|| ArrowError::SchemaError(format!("missing column '{name}'")))
}

fn u64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt64Array, ArrowError> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<UInt64Array>()
        .ok_or_else(|| ArrowError::SchemaError(format!("column '{name}' is not UInt64")))
}

fn f64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array, ArrowError> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| ArrowError::SchemaError(format!("column '{name}' is not Float64")))
}

fn f32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float32Array, ArrowError> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Float32Array>()
        .ok_or_else(|| ArrowError::SchemaError(format!("column '{name}' is not Float32")))
}

#[cfg(test)]
pub(crate) fn test_record(source_id: u64, ra: f64, dec: f64, vmag: f32) -> CatalogRecord {
    CatalogRecord {
        source_id,
        ra,
        dec,
        epoch: 2016.0,
        pmra: 0.0,
        pmdec: 0.0,
        vmag,
        rmag: vmag,
        imag: vmag,
        g_mag: vmag,
        bp_mag: vmag,
        rp_mag: vmag,
    }
}
