//! Model explainability module
//!
//! Provides Shapley-value attributions for the boosted-tree model, a
//! per-feature summary, and CSV export of the raw attribution matrix.

mod shap;

pub use shap::{shap_matrix, FeatureContribution, LocalExplanation, ShapExplainer, ShapSummary};

use crate::error::{FireError, Result};
use crate::utils::array_to_frame;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

/// Write one row per explained instance, one column per feature
pub fn write_shap_csv(path: &Path, explanations: &[LocalExplanation]) -> Result<()> {
    let first = explanations
        .first()
        .ok_or_else(|| FireError::InvalidInput("no explanations to write".to_string()))?;
    let names: Vec<String> = first
        .contributions
        .iter()
        .map(|c| c.feature_name.clone())
        .collect();

    let mut df = array_to_frame(&shap_matrix(explanations), &names)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;

    info!(path = %path.display(), rows = df.height(), "Wrote SHAP values");
    Ok(())
}
