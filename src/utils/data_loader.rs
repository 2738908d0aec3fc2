//! Data loading utilities
//!
//! Reads the fire-weather CSV into a polars frame, maps the categorical
//! `Classes` column onto binary labels and converts frames to ndarray
//! matrices for the numeric kernels.

use crate::error::{FireError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// A labeled feature table: numeric features plus binary fire labels
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    /// Feature columns only (label column removed), all Float64
    pub features: DataFrame,
    /// Feature column names in file order
    pub feature_names: Vec<String>,
    /// Labels, 1.0 = fire, 0.0 = not fire
    pub labels: Array1<f64>,
}

impl LabeledDataset {
    /// Number of rows
    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    /// Number of feature columns
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Count of fire / not-fire rows
    pub fn class_counts(&self) -> (usize, usize) {
        let fire = self.labels.iter().filter(|&&v| v > 0.5).count();
        (fire, self.labels.len() - fire)
    }

    /// Split a frame that still contains the label column
    pub fn from_frame(df: DataFrame, label_column: &str) -> Result<Self> {
        let label_series = df
            .column(label_column)
            .map_err(|_| FireError::FeatureNotFound(label_column.to_string()))?
            .as_materialized_series()
            .clone();
        let labels = map_fire_labels(&label_series)?;

        let features = df.drop(label_column)?;
        let feature_names: Vec<String> = features
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        if feature_names.is_empty() {
            return Err(FireError::DataError(
                "dataset has no feature columns besides the label".to_string(),
            ));
        }

        let mut casted = Vec::with_capacity(feature_names.len());
        for name in &feature_names {
            let series = features.column(name)?.as_materialized_series();
            let as_f64 = series.cast(&DataType::Float64)?;
            if as_f64.null_count() > 0 {
                return Err(FireError::DataError(format!(
                    "column {} has {} missing or non-numeric values",
                    name,
                    as_f64.null_count()
                )));
            }
            casted.push(as_f64.into());
        }
        let features = DataFrame::new(casted)?;

        Ok(Self {
            features,
            feature_names,
            labels,
        })
    }

    /// Feature matrix in `feature_names` order
    pub fn feature_matrix(&self) -> Result<Array2<f64>> {
        let names: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        frame_to_array(&self.features, &names)
    }
}

/// Load the fire dataset CSV and split off the label column
pub fn load_fire_csv(path: &Path, label_column: &str) -> Result<LabeledDataset> {
    let start = Instant::now();

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    // Headers in the published dataset carry stray spaces (" RH", " Ws")
    let trimmed: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.trim().to_string())
        .collect();
    df.set_column_names(trimmed)?;

    debug!(rows = df.height(), cols = df.width(), "CSV parsed");

    let dataset = LabeledDataset::from_frame(df, label_column)?;
    let (fire, not_fire) = dataset.class_counts();
    info!(
        path = %path.display(),
        rows = dataset.n_samples(),
        features = dataset.n_features(),
        fire,
        not_fire,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Dataset loaded"
    );

    Ok(dataset)
}

/// Map the label column to 1.0 (fire) / 0.0 (not fire).
///
/// String labels are trimmed and compared case-insensitively; numeric
/// labels must already be 0 or 1.
pub fn map_fire_labels(series: &Series) -> Result<Array1<f64>> {
    if let Ok(ca) = series.str() {
        return ca
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                let raw = value.ok_or_else(|| {
                    FireError::DataError(format!("missing label at row {}", row))
                })?;
                match raw.trim().to_ascii_lowercase().as_str() {
                    "fire" => Ok(1.0),
                    "not fire" => Ok(0.0),
                    other => Err(FireError::DataError(format!(
                        "unknown label {:?} at row {}",
                        other, row
                    ))),
                }
            })
            .collect();
    }

    let as_f64 = series.cast(&DataType::Float64)?;
    let ca = as_f64.f64()?;
    ca.into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v == 0.0 || v == 1.0 => Ok(v),
            Some(v) => Err(FireError::DataError(format!(
                "numeric label {} at row {} is not 0 or 1",
                v, row
            ))),
            None => Err(FireError::DataError(format!("missing label at row {}", row))),
        })
        .collect()
}

/// Gather the named Float64 columns into a row-major matrix
pub fn frame_to_array(df: &DataFrame, columns: &[&str]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let mut x = Array2::zeros((n_rows, columns.len()));

    for (j, name) in columns.iter().enumerate() {
        let column = df
            .column(name)
            .map_err(|_| FireError::FeatureNotFound(name.to_string()))?;
        let series = column.as_materialized_series().cast(&DataType::Float64)?;
        let ca = series.f64()?;
        for (i, value) in ca.into_iter().enumerate() {
            x[[i, j]] = value.ok_or_else(|| {
                FireError::DataError(format!("null value in column {} at row {}", name, i))
            })?;
        }
    }

    Ok(x)
}

/// Build a Float64 frame from a matrix and column names
pub fn array_to_frame(x: &Array2<f64>, columns: &[String]) -> Result<DataFrame> {
    if x.ncols() != columns.len() {
        return Err(FireError::ShapeError {
            expected: format!("{} columns", columns.len()),
            actual: format!("{} columns", x.ncols()),
        });
    }

    let cols: Vec<Column> = columns
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let values: Vec<f64> = x.column(j).to_vec();
            Series::new(name.as_str().into(), values).into()
        })
        .collect();

    Ok(DataFrame::new(cols)?)
}
