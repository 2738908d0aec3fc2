//! Importance-based feature selection
//!
//! Scores come from an already fitted model (boosted-tree importances); the
//! selector ranks them and keeps a subset.

use crate::error::{FireError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Feature selection method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SelectionMethod {
    /// Keep the k highest-scoring features
    TopK { k: usize },
    /// Keep features whose score exceeds the threshold
    ImportanceThreshold { threshold: f64 },
}

/// One row of the ranking report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedFeature {
    /// 1 = most important
    pub rank: usize,
    /// Column index in the input matrix
    pub index: usize,
    pub name: String,
    pub importance: f64,
    pub selected: bool,
}

/// Feature selector for dimensionality reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSelector {
    method: SelectionMethod,
    selected_features: Option<Vec<usize>>,
    feature_scores: Option<Vec<f64>>,
    feature_names: Option<Vec<String>>,
}

impl FeatureSelector {
    /// Create a new feature selector with the given method
    pub fn new(method: SelectionMethod) -> Self {
        Self {
            method,
            selected_features: None,
            feature_scores: None,
            feature_names: None,
        }
    }

    /// Create a top-k selector
    pub fn top_k(k: usize) -> Self {
        Self::new(SelectionMethod::TopK { k })
    }

    /// Create importance threshold selector
    pub fn importance_threshold(threshold: f64) -> Self {
        Self::new(SelectionMethod::ImportanceThreshold { threshold })
    }

    /// Set feature names
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    /// Fit from per-feature importance scores.
    ///
    /// Selected indices are ordered by descending importance; equal scores
    /// keep their column order (stable sort).
    pub fn fit_importances(&mut self, importances: &Array1<f64>) -> Result<()> {
        if importances.is_empty() {
            return Err(FireError::PreprocessingError(
                "no feature importances to select from".to_string(),
            ));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != importances.len() {
                return Err(FireError::ShapeError {
                    expected: format!("{} importances", names.len()),
                    actual: format!("{} importances", importances.len()),
                });
            }
        }
        if importances.iter().any(|v| !v.is_finite()) {
            return Err(FireError::PreprocessingError(
                "feature importances contain non-finite values".to_string(),
            ));
        }

        let scores = importances.to_vec();
        let order = descending_order(&scores);

        let selected: Vec<usize> = match &self.method {
            SelectionMethod::TopK { k } => {
                if *k == 0 {
                    return Err(FireError::ConfigError("top_k must be at least 1".to_string()));
                }
                order.iter().copied().take(*k).collect()
            }
            SelectionMethod::ImportanceThreshold { threshold } => order
                .iter()
                .copied()
                .filter(|&i| scores[i] > *threshold)
                .collect(),
        };

        if selected.is_empty() {
            return Err(FireError::PreprocessingError(
                "No features selected".to_string(),
            ));
        }

        self.feature_scores = Some(scores);
        self.selected_features = Some(selected);
        Ok(())
    }

    /// Transform data by selecting features
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let selected = self.selected_features.as_ref().ok_or(FireError::ModelNotFitted)?;

        let n_in = self.feature_scores.as_ref().map_or(0, Vec::len);
        if x.ncols() != n_in {
            return Err(FireError::ShapeError {
                expected: format!("{} columns", n_in),
                actual: format!("{} columns", x.ncols()),
            });
        }

        Ok(x.select(Axis(1), selected))
    }

    /// Get selected feature indices
    pub fn selected_indices(&self) -> Option<&[usize]> {
        self.selected_features.as_deref()
    }

    /// Get feature scores
    pub fn scores(&self) -> Option<&[f64]> {
        self.feature_scores.as_deref()
    }

    /// Get selected feature names
    pub fn selected_names(&self) -> Option<Vec<String>> {
        let indices = self.selected_features.as_ref()?;
        let names = self.feature_names.as_ref()?;

        Some(
            indices
                .iter()
                .filter_map(|&i| names.get(i).cloned())
                .collect(),
        )
    }

    /// Get feature ranking (1 = best)
    pub fn ranking(&self) -> Option<Vec<usize>> {
        let scores = self.feature_scores.as_ref()?;

        let mut ranking = vec![0; scores.len()];
        for (rank, idx) in descending_order(scores).into_iter().enumerate() {
            ranking[idx] = rank + 1;
        }

        Some(ranking)
    }

    /// Full report: every feature, best first
    pub fn report(&self) -> Option<Vec<RankedFeature>> {
        let scores = self.feature_scores.as_ref()?;
        let selected = self.selected_features.as_ref()?;

        Some(
            descending_order(scores)
                .into_iter()
                .enumerate()
                .map(|(rank, index)| RankedFeature {
                    rank: rank + 1,
                    index,
                    name: self
                        .feature_names
                        .as_ref()
                        .and_then(|n| n.get(index).cloned())
                        .unwrap_or_else(|| format!("f{}", index)),
                    importance: scores[index],
                    selected: selected.contains(&index),
                })
                .collect(),
        )
    }
}

fn descending_order(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}
