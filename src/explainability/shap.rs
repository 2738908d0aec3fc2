//! Sampling-based Shapley attributions
//!
//! Each sample draws a random feature permutation and a random background
//! row, then walks the permutation switching features from the background
//! value to the instance value. The change in model output at each switch is
//! that feature's marginal contribution. Per permutation the contributions
//! telescope to `f(x) - f(background row)`.

use crate::error::{FireError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Feature contribution to a prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature_index: usize,
    pub feature_name: String,
    /// Feature value for this instance
    pub feature_value: f64,
    /// Shapley value estimate
    pub contribution: f64,
}

/// Attribution of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalExplanation {
    pub instance_index: usize,
    /// Mean model output over the background set
    pub base_value: f64,
    pub prediction: f64,
    pub contributions: Vec<FeatureContribution>,
}

impl LocalExplanation {
    pub fn sum_contributions(&self) -> f64 {
        self.contributions.iter().map(|c| c.contribution).sum()
    }

    /// Contributions by absolute value, largest first
    pub fn sorted_contributions(&self) -> Vec<&FeatureContribution> {
        let mut sorted: Vec<&FeatureContribution> = self.contributions.iter().collect();
        sorted.sort_by(|a, b| {
            b.contribution
                .abs()
                .partial_cmp(&a.contribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    pub fn top_k_contributors(&self, k: usize) -> Vec<&FeatureContribution> {
        self.sorted_contributions().into_iter().take(k).collect()
    }
}

/// Shapley explainer over a batch prediction function
pub struct ShapExplainer<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>> + Sync,
{
    predict_fn: F,
    background: Array2<f64>,
    /// Permutations sampled per instance
    n_samples: usize,
    seed: u64,
    feature_names: Vec<String>,
}

impl<F> ShapExplainer<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>> + Sync,
{
    pub fn new(predict_fn: F, background: Array2<f64>) -> Result<Self> {
        if background.nrows() == 0 {
            return Err(FireError::InvalidInput("background set is empty".to_string()));
        }
        let feature_names = (0..background.ncols()).map(|i| format!("f{}", i)).collect();
        Ok(Self {
            predict_fn,
            background,
            n_samples: 100,
            seed: 42,
            feature_names,
        })
    }

    pub fn with_n_samples(mut self, n: usize) -> Self {
        self.n_samples = n.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self> {
        if names.len() != self.background.ncols() {
            return Err(FireError::ShapeError {
                expected: format!("{} feature names", self.background.ncols()),
                actual: format!("{} feature names", names.len()),
            });
        }
        self.feature_names = names;
        Ok(self)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Mean model output over the background set
    pub fn base_value(&self) -> Result<f64> {
        let preds = (self.predict_fn)(&self.background)?;
        Ok(preds.mean().unwrap_or(0.0))
    }

    pub fn explain(&self, instance: ArrayView1<f64>) -> Result<LocalExplanation> {
        let base_value = self.base_value()?;
        self.explain_instance(instance, 0, base_value)
    }

    /// Explain every row; instances are processed in parallel, each with its
    /// own seeded generator so results do not depend on scheduling
    pub fn explain_batch(&self, instances: &Array2<f64>) -> Result<Vec<LocalExplanation>> {
        if instances.ncols() != self.background.ncols() {
            return Err(FireError::ShapeError {
                expected: format!("{} features", self.background.ncols()),
                actual: format!("{} features", instances.ncols()),
            });
        }
        let base_value = self.base_value()?;

        (0..instances.nrows())
            .into_par_iter()
            .map(|idx| self.explain_instance(instances.row(idx), idx, base_value))
            .collect()
    }

    fn explain_instance(
        &self,
        instance: ArrayView1<f64>,
        instance_index: usize,
        base_value: f64,
    ) -> Result<LocalExplanation> {
        let n_features = instance.len();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed.wrapping_add(instance_index as u64));

        let prediction = (self.predict_fn)(&instance.to_owned().insert_axis(Axis(0)))?[0];
        let mut contributions = vec![0.0; n_features];

        for _ in 0..self.n_samples {
            let mut perm: Vec<usize> = (0..n_features).collect();
            perm.shuffle(&mut rng);
            let bg_idx = rng.gen_range(0..self.background.nrows());

            // Row 0 is the background row; row k has the first k permuted
            // features switched to the instance values
            let mut path = Array2::zeros((n_features + 1, n_features));
            let mut current = self.background.row(bg_idx).to_owned();
            path.row_mut(0).assign(&current);
            for (step, &feature) in perm.iter().enumerate() {
                current[feature] = instance[feature];
                path.row_mut(step + 1).assign(&current);
            }

            let outputs = (self.predict_fn)(&path)?;
            for (step, &feature) in perm.iter().enumerate() {
                contributions[feature] += outputs[step + 1] - outputs[step];
            }
        }

        let n = self.n_samples as f64;
        let contributions = contributions
            .into_iter()
            .enumerate()
            .map(|(idx, total)| FeatureContribution {
                feature_index: idx,
                feature_name: self.feature_names[idx].clone(),
                feature_value: instance[idx],
                contribution: total / n,
            })
            .collect();

        Ok(LocalExplanation {
            instance_index,
            base_value,
            prediction,
            contributions,
        })
    }
}

/// Stack explanations into an `(instances, features)` matrix
pub fn shap_matrix(explanations: &[LocalExplanation]) -> Array2<f64> {
    let n_features = explanations.first().map_or(0, |e| e.contributions.len());
    let mut out = Array2::zeros((explanations.len(), n_features));
    for (row, exp) in explanations.iter().enumerate() {
        for c in &exp.contributions {
            out[[row, c.feature_index]] = c.contribution;
        }
    }
    out
}

/// Per-feature statistics of SHAP values across many instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapSummary {
    pub feature_names: Vec<String>,
    pub mean_abs_shap: Vec<f64>,
    pub mean_shap: Vec<f64>,
    /// Population standard deviation
    pub std_shap: Vec<f64>,
    pub min_shap: Vec<f64>,
    pub max_shap: Vec<f64>,
}

impl ShapSummary {
    pub fn from_explanations(explanations: &[LocalExplanation]) -> Result<Self> {
        let first = explanations
            .first()
            .ok_or_else(|| FireError::InvalidInput("no explanations to summarise".to_string()))?;
        let feature_names: Vec<String> = first
            .contributions
            .iter()
            .map(|c| c.feature_name.clone())
            .collect();

        let values = shap_matrix(explanations);
        let n = values.nrows() as f64;

        let mean_abs_shap = values.mapv(f64::abs).sum_axis(Axis(0)) / n;
        let mean_shap = values.sum_axis(Axis(0)) / n;
        let std_shap = values.std_axis(Axis(0), 0.0);
        let min_shap = values.fold_axis(Axis(0), f64::INFINITY, |&a, &b| a.min(b));
        let max_shap = values.fold_axis(Axis(0), f64::NEG_INFINITY, |&a, &b| a.max(b));

        Ok(Self {
            feature_names,
            mean_abs_shap: mean_abs_shap.to_vec(),
            mean_shap: mean_shap.to_vec(),
            std_shap: std_shap.to_vec(),
            min_shap: min_shap.to_vec(),
            max_shap: max_shap.to_vec(),
        })
    }

    /// Feature indices by mean |SHAP|, largest first; ties keep column order
    pub fn feature_ranking(&self) -> Vec<(usize, f64)> {
        let mut indexed: Vec<(usize, f64)> = self.mean_abs_shap.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        indexed
    }
}
