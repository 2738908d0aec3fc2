//! Feature scaling implementations

use crate::error::{FireError, Result};
use crate::export::{load_json, save_json};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// Robust scaling using median and IQR
    Robust,
}

impl std::str::FromStr for ScalerType {
    type Err = FireError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "minmax" => Ok(Self::MinMax),
            "robust" => Ok(Self::Robust),
            other => Err(FireError::ConfigError(format!("unknown scaler type: {}", other))),
        }
    }
}

/// Parameters for one fitted column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    name: String,
    center: f64, // mean, min, or median
    scale: f64,  // std, range, or IQR
}

/// Feature scaler.
///
/// Column order at fit time is the scaler's schema: array transforms assume
/// it, frame transforms look columns up by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fitted column names, in fit order
    pub fn columns(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    /// Fit the scaler to the data
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut params = Vec::with_capacity(columns.len());
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| FireError::FeatureNotFound(col_name.to_string()))?;
            let series = column.as_materialized_series().cast(&DataType::Float64)?;

            params.push(self.compute_params(col_name, &series)?);
        }

        self.params = params;
        self.is_fitted = true;
        Ok(self)
    }

    /// Transform every fitted column; all of them must be present
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let columns = self.columns();
        let names: Vec<&str> = columns.iter().map(String::as_str).collect();
        self.transform_selected(df, &names)
    }

    /// Transform only the named columns, leaving the rest of the frame as is.
    /// Every named column must have been fitted.
    pub fn transform_selected(&self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(FireError::ModelNotFitted);
        }

        // Build all scaled columns first, then apply them in one pass
        let replacements: Vec<Series> = columns
            .iter()
            .map(|name| {
                let params = self.params_for(name)?;
                let column = df
                    .column(name)
                    .map_err(|_| FireError::FeatureNotFound(name.to_string()))?;
                self.scale_series(column.as_materialized_series(), params)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result.with_column(scaled)?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Inverse transform every fitted column present in the frame
    pub fn inverse_transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(FireError::ModelNotFitted);
        }

        let replacements: Vec<Series> = self
            .params
            .iter()
            .map(|params| {
                let column = df
                    .column(&params.name)
                    .map_err(|_| FireError::FeatureNotFound(params.name.clone()))?;
                self.unscale_series(column.as_materialized_series(), params)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for unscaled in replacements {
            result.with_column(unscaled)?;
        }

        Ok(result)
    }

    /// Scale a matrix whose columns follow the fit order
    pub fn transform_array(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(x)?;
        let mut out = x.clone();
        for (mut col, params) in out.columns_mut().into_iter().zip(&self.params) {
            col.mapv_inplace(|v| (v - params.center) / params.scale);
        }
        Ok(out)
    }

    /// Undo `transform_array`
    pub fn inverse_transform_array(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(x)?;
        let mut out = x.clone();
        for (mut col, params) in out.columns_mut().into_iter().zip(&self.params) {
            col.mapv_inplace(|v| v * params.scale + params.center);
        }
        Ok(out)
    }

    /// Persist as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if !self.is_fitted {
            return Err(FireError::ModelNotFitted);
        }
        save_json(self, path)
    }

    /// Load a scaler written by [`Scaler::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let scaler: Self = load_json(path)?;
        if !scaler.is_fitted || scaler.params.is_empty() {
            return Err(FireError::PreprocessingError(format!(
                "{} does not hold a fitted scaler",
                path.display()
            )));
        }
        Ok(scaler)
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if !self.is_fitted {
            return Err(FireError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(FireError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(())
    }

    fn params_for(&self, name: &str) -> Result<&ScalerParams> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| FireError::FeatureNotFound(format!("{} (not fitted by scaler)", name)))
    }

    fn compute_params(&self, name: &str, series: &Series) -> Result<ScalerParams> {
        let ca = series.f64()?;
        if ca.null_count() > 0 {
            return Err(FireError::PreprocessingError(format!(
                "cannot fit scaler on column {} with missing values",
                name
            )));
        }

        let (center, scale) = match self.scaler_type {
            ScalerType::Standard => {
                // Population std, as the usual standard scaler does
                let mean = ca.mean().unwrap_or(0.0);
                let std = ca.std(0).unwrap_or(1.0);
                (mean, std)
            }
            ScalerType::MinMax => {
                let min = ca.min().unwrap_or(0.0);
                let max = ca.max().unwrap_or(1.0);
                (min, max - min)
            }
            ScalerType::Robust => {
                let median = ca.median().unwrap_or(0.0);
                let q1 = ca.quantile(0.25, QuantileMethod::Linear)?.unwrap_or(0.0);
                let q3 = ca.quantile(0.75, QuantileMethod::Linear)?.unwrap_or(1.0);
                (median, q3 - q1)
            }
        };

        Ok(ScalerParams {
            name: name.to_string(),
            center,
            scale: if scale == 0.0 { 1.0 } else { scale },
        })
    }

    fn scale_series(&self, series: &Series, params: &ScalerParams) -> Result<Series> {
        let as_f64 = series.cast(&DataType::Float64)?;
        let ca = as_f64.f64()?;

        let scaled: Float64Chunked = ca
            .into_iter()
            .map(|opt| opt.map(|v| (v - params.center) / params.scale))
            .collect();

        Ok(scaled.with_name(series.name().clone()).into_series())
    }

    fn unscale_series(&self, series: &Series, params: &ScalerParams) -> Result<Series> {
        let as_f64 = series.cast(&DataType::Float64)?;
        let ca = as_f64.f64()?;

        let unscaled: Float64Chunked = ca
            .into_iter()
            .map(|opt| opt.map(|v| v * params.scale + params.center))
            .collect();

        Ok(unscaled.with_name(series.name().clone()).into_series())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        df!(
            "a" => &[1.0, 2.0, 3.0, 4.0, 5.0],
            "b" => &[10.0, 20.0, 30.0, 40.0, 1000.0]
        )
        .unwrap()
    }

    #[test]
    fn test_standard_scaler() {
        let df = sample_df();
        let mut scaler = Scaler::new(ScalerType::Standard);
        let result = scaler.fit_transform(&df, &["a"]).unwrap();

        let col = result.column("a").unwrap().f64().unwrap();
        let mean: f64 = col.mean().unwrap();
        assert!(mean.abs() < 1e-10); // Mean should be ~0
        let std: f64 = col.std(0).unwrap();
        assert!((std - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_minmax_scaler() {
        let df = sample_df();
        let mut scaler = Scaler::new(ScalerType::MinMax);
        let result = scaler.fit_transform(&df, &["a"]).unwrap();

        let col = result.column("a").unwrap().f64().unwrap();
        assert!((col.min().unwrap() - 0.0).abs() < 1e-10);
        assert!((col.max().unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_robust_scaler_uses_median_and_iqr() {
        let df = sample_df();
        let mut scaler = Scaler::new(ScalerType::Robust);
        let result = scaler.fit_transform(&df, &["b"]).unwrap();

        // median 30, q1 20, q3 40 -> (x - 30) / 20; the outlier does not move the center
        let col = result.column("b").unwrap().f64().unwrap();
        assert!((col.get(2).unwrap() - 0.0).abs() < 1e-10);
        assert!((col.get(0).unwrap() + 1.0).abs() < 1e-10);
        assert!((col.get(3).unwrap() - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_inverse_transform() {
        let df = sample_df();
        let mut scaler = Scaler::new(ScalerType::Robust);
        let scaled = scaler.fit_transform(&df, &["a", "b"]).unwrap();
        let unscaled = scaler.inverse_transform(&scaled).unwrap();

        for name in ["a", "b"] {
            let original = df.column(name).unwrap().f64().unwrap();
            let restored = unscaled.column(name).unwrap().f64().unwrap();
            for (o, r) in original.into_iter().zip(restored.into_iter()) {
                assert!((o.unwrap() - r.unwrap()).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_array_roundtrip_matches_frame_transform() {
        let df = sample_df();
        let mut scaler = Scaler::new(ScalerType::Standard);
        let scaled_df = scaler.fit_transform(&df, &["a", "b"]).unwrap();

        let x = crate::utils::frame_to_array(&df, &["a", "b"]).unwrap();
        let scaled = scaler.transform_array(&x).unwrap();
        let from_df = crate::utils::frame_to_array(&scaled_df, &["a", "b"]).unwrap();
        assert!((&scaled - &from_df).iter().all(|d| d.abs() < 1e-12));

        let restored = scaler.inverse_transform_array(&scaled).unwrap();
        assert!((&restored - &x).iter().all(|d| d.abs() < 1e-9));
    }

    #[test]
    fn test_missing_fitted_column_is_an_error() {
        let df = sample_df();
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit(&df, &["a", "b"]).unwrap();

        let partial = df!("a" => &[1.0, 2.0]).unwrap();
        assert!(matches!(
            scaler.transform(&partial),
            Err(FireError::FeatureNotFound(_))
        ));
        assert!(scaler.transform_selected(&partial, &["a"]).is_ok());
    }

    #[test]
    fn test_constant_column_gets_unit_scale() {
        let df = df!("c" => &[3.0, 3.0, 3.0]).unwrap();
        let mut scaler = Scaler::new(ScalerType::Standard);
        let out = scaler.fit_transform(&df, &["c"]).unwrap();
        let col = out.column("c").unwrap().f64().unwrap();
        assert!(col.into_iter().all(|v| v == Some(0.0)));
    }

    #[test]
    fn test_unfitted_transform_fails() {
        let scaler = Scaler::new(ScalerType::Robust);
        assert!(matches!(
            scaler.transform(&sample_df()),
            Err(FireError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");

        let mut scaler = Scaler::new(ScalerType::Robust);
        scaler.fit(&sample_df(), &["a", "b"]).unwrap();
        scaler.save(&path).unwrap();

        let loaded = Scaler::load(&path).unwrap();
        assert_eq!(loaded.columns(), vec!["a", "b"]);
        assert_eq!(loaded.scaler_type(), ScalerType::Robust);
    }

    #[test]
    fn test_scaler_type_from_str() {
        assert_eq!("Robust".parse::<ScalerType>().unwrap(), ScalerType::Robust);
        assert!("maxabs".parse::<ScalerType>().is_err());
    }
}
