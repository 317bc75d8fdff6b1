//! Data preprocessing utilities for WGAN-GP training
//!
//! This module provides functions for:
//! - Normalizing table columns to [-1, 1] (the generator's tanh range)
//! - Mapping generated rows back to the original scale
//! - Reading and writing numeric CSV tables

use std::path::Path;

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WganError};

/// Normalization parameters for denormalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub min_vals: Vec<f64>,
    pub max_vals: Vec<f64>,
}

impl NormalizationParams {
    /// Load parameters saved with [`NormalizationParams::save_json`]
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save parameters as JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Scale every column into the generator's [-1, 1] output range
///
/// The column minimum lands on -1 and the maximum on 1; a column holding a
/// single repeated value collapses to 0. The returned bounds invert the
/// mapping through [`denormalize_data`].
pub fn normalize_data(data: &Array2<f64>) -> (Array2<f64>, NormalizationParams) {
    let params = NormalizationParams {
        min_vals: data.fold_axis(Axis(0), f64::INFINITY, |&lo, &v| lo.min(v)).to_vec(),
        max_vals: data.fold_axis(Axis(0), f64::NEG_INFINITY, |&hi, &v| hi.max(v)).to_vec(),
    };

    let mut scaled = data.to_owned();
    for (mut column, (&lo, &hi)) in scaled
        .columns_mut()
        .into_iter()
        .zip(params.min_vals.iter().zip(&params.max_vals))
    {
        let span = hi - lo;
        if span > 0.0 {
            column.mapv_inplace(|v| (v - lo) / span * 2.0 - 1.0);
        } else {
            column.fill(0.0);
        }
    }

    (scaled, params)
}

/// Map rows in [-1, 1] back onto the column bounds recorded by [`normalize_data`]
pub fn denormalize_data(data: &Array2<f64>, params: &NormalizationParams) -> Array2<f64> {
    let mut restored = data.to_owned();
    for (mut column, (&lo, &hi)) in restored
        .columns_mut()
        .into_iter()
        .zip(params.min_vals.iter().zip(&params.max_vals))
    {
        let half_span = (hi - lo) / 2.0;
        column.mapv_inplace(|v| lo + (v + 1.0) * half_span);
    }

    restored
}

/// Load a numeric CSV table with a header row
///
/// # Returns
///
/// Tuple of (column names, N x D matrix)
pub fn load_csv_matrix<P: AsRef<Path>>(path: P) -> Result<(Vec<String>, Array2<f64>)> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let num_features = headers.len();

    let mut values = Vec::new();
    let mut num_rows = 0;
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() != num_features {
            return Err(WganError::InvalidConfig(format!(
                "row {} has {} fields, expected {}",
                line + 1,
                record.len(),
                num_features
            )));
        }
        for field in record.iter() {
            let value: f64 = field.trim().parse().map_err(|_| {
                WganError::InvalidConfig(format!("row {}: '{}' is not a number", line + 1, field))
            })?;
            values.push(value);
        }
        num_rows += 1;
    }

    let matrix = Array2::from_shape_vec((num_rows, num_features), values)
        .map_err(|e| WganError::InvalidConfig(e.to_string()))?;

    Ok((headers, matrix))
}

/// Write a numeric table to CSV with the given header
pub fn save_csv_matrix<P: AsRef<Path>>(path: P, headers: &[String], data: &Array2<f64>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;

    for row in data.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    #[test]
    fn test_scaling_hits_range_ends_and_inverts() {
        let table = array![[-4.0, 10.0, 7.0], [2.0, 30.0, 1.0], [8.0, 20.0, 4.0]];

        let (scaled, params) = normalize_data(&table);
        assert_eq!(params.min_vals, vec![-4.0, 10.0, 1.0]);
        assert_eq!(params.max_vals, vec![8.0, 30.0, 7.0]);

        assert_eq!(scaled.column(0).to_vec(), vec![-1.0, 0.0, 1.0]);
        assert_eq!(scaled.column(1).to_vec(), vec![-1.0, 1.0, 0.0]);
        assert!(scaled.iter().all(|v| (-1.0..=1.0).contains(v)));

        let restored = denormalize_data(&scaled, &params);
        for (orig, back) in table.iter().zip(restored.iter()) {
            assert!((orig - back).abs() < 1e-10);
        }
    }

    #[test]
    fn test_normalize_constant_column() {
        let data = array![[3.0, 1.0], [3.0, 2.0]];
        let (normalized, _) = normalize_data(&data);

        assert_eq!(normalized[[0, 0]], 0.0);
        assert_eq!(normalized[[1, 0]], 0.0);
    }

    #[test]
    fn test_csv_matrix_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let headers = vec!["a".to_string(), "b".to_string()];
        let data = array![[1.5, -2.0], [0.25, 4.0], [8.0, 0.0]];

        save_csv_matrix(&path, &headers, &data).unwrap();
        let (loaded_headers, loaded) = load_csv_matrix(&path).unwrap();

        assert_eq!(loaded_headers, headers);
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_csv_matrix_rejects_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a,b\n1.0,oops\n").unwrap();

        assert!(load_csv_matrix(&path).is_err());
    }
}
