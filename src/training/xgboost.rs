//! XGBoost-style gradient boosting with second-order approximation
//!
//! Key points of the method:
//! - Uses both gradient (first derivative) and hessian (second derivative) of the logistic loss
//! - Regularized leaf weights: w* = -G / (H + lambda)
//! - Gain-based split scoring: Gain = 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)] - γ
//! - Built-in L1 (alpha) and L2 (lambda) regularization
//! - Minimum child weight constraint
//!
//! Split nodes keep their gain and cover so that importances can be reported
//! the same ways the reference library does (weight, gain, total gain, cover).

use crate::error::{FireError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How split statistics are turned into feature importances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportanceType {
    /// Number of splits using the feature
    Weight,
    /// Average gain of the feature's splits
    Gain,
    /// Summed gain of the feature's splits
    TotalGain,
    /// Average hessian mass routed through the feature's splits
    Cover,
}

impl std::str::FromStr for ImportanceType {
    type Err = FireError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "weight" => Ok(Self::Weight),
            "gain" => Ok(Self::Gain),
            "total_gain" => Ok(Self::TotalGain),
            "cover" => Ok(Self::Cover),
            other => Err(FireError::ConfigError(format!("unknown importance type: {}", other))),
        }
    }
}

/// XGBoost configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split (gamma)
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub importance_type: ImportanceType,
    pub random_state: Option<u64>,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            importance_type: ImportanceType::Gain,
            random_state: Some(42),
        }
    }
}

impl XGBoostConfig {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_importance_type(mut self, importance_type: ImportanceType) -> Self {
        self.importance_type = importance_type;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }
}

/// A single node in the XGBoost tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum XGBNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        gain: f64,
        cover: f64,
        left: Box<XGBNode>,
        right: Box<XGBNode>,
    },
}

impl XGBNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            XGBNode::Leaf { weight } => *weight,
            XGBNode::Split { feature, threshold, left, right, .. } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

/// Gradient statistics shared by every node of one tree
struct GradStats<'a> {
    x: &'a Array2<f64>,
    grad: &'a Array1<f64>,
    hess: &'a Array1<f64>,
}

/// Best split found for one feature
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Build an XGBoost tree using exact greedy split finding
fn build_xgb_tree(
    stats: &GradStats<'_>,
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
    config: &XGBoostConfig,
) -> XGBNode {
    let n = indices.len();

    // Compute leaf weight with L1/L2 regularization
    let g_sum: f64 = indices.iter().map(|&i| stats.grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| stats.hess[i]).sum();

    let leaf_weight = compute_leaf_weight(g_sum, h_sum, config.reg_lambda, config.reg_alpha);

    // Stopping conditions
    if depth >= config.max_depth || n < 2 || h_sum < config.min_child_weight {
        return XGBNode::Leaf { weight: leaf_weight };
    }

    // Find best split across features (parallelized); ties go to the lower feature index
    let best_split = feature_indices
        .par_iter()
        .filter_map(|&f| find_best_split_for_feature(stats, indices, f, config))
        .reduce_with(|a, b| {
            if b.gain > a.gain || (b.gain == a.gain && b.feature < a.feature) {
                b
            } else {
                a
            }
        });

    match best_split {
        Some(split) if split.gain > config.gamma => {
            let feature = split.feature;
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| stats.x[[i, feature]] <= split.threshold);

            if left_idx.is_empty() || right_idx.is_empty() {
                return XGBNode::Leaf { weight: leaf_weight };
            }

            let left = build_xgb_tree(stats, &left_idx, feature_indices, depth + 1, config);
            let right = build_xgb_tree(stats, &right_idx, feature_indices, depth + 1, config);

            XGBNode::Split {
                feature,
                threshold: split.threshold,
                gain: split.gain,
                cover: h_sum,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => XGBNode::Leaf { weight: leaf_weight },
    }
}

/// Optimal leaf weight with L1 (alpha) and L2 (lambda) regularization
fn compute_leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    if alpha > 0.0 {
        // Soft-threshold for L1
        let g_adj = if g_sum > alpha {
            g_sum - alpha
        } else if g_sum < -alpha {
            g_sum + alpha
        } else {
            return 0.0;
        };
        -g_adj / (h_sum + lambda)
    } else {
        -g_sum / (h_sum + lambda)
    }
}

/// Find best split for a single feature using exact greedy method
fn find_best_split_for_feature(
    stats: &GradStats<'_>,
    indices: &[usize],
    feature: usize,
    config: &XGBoostConfig,
) -> Option<SplitCandidate> {
    let x = stats.x;

    // Sort indices by feature value
    let mut sorted_indices: Vec<usize> = indices.to_vec();
    sorted_indices.sort_by(|&a, &b| {
        x[[a, feature]]
            .partial_cmp(&x[[b, feature]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let g_total: f64 = sorted_indices.iter().map(|&i| stats.grad[i]).sum();
    let h_total: f64 = sorted_indices.iter().map(|&i| stats.hess[i]).sum();

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<SplitCandidate> = None;

    let lambda = config.reg_lambda;

    // The last position would put every sample on the left
    for pos in 0..sorted_indices.len().saturating_sub(1) {
        let idx = sorted_indices[pos];
        let next_idx = sorted_indices[pos + 1];
        g_left += stats.grad[idx];
        h_left += stats.hess[idx];

        // Skip if next sample has same feature value (avoid identical split)
        if (x[[idx, feature]] - x[[next_idx, feature]]).abs() < 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;

        // Min child weight check
        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * ((g_left * g_left) / (h_left + lambda)
                + (g_right * g_right) / (h_right + lambda)
                - (g_total * g_total) / (h_total + lambda));

        if best.as_ref().map_or(true, |b| gain > b.gain) {
            best = Some(SplitCandidate {
                feature,
                threshold: (x[[idx, feature]] + x[[next_idx, feature]]) / 2.0,
                gain,
            });
        }
    }

    best
}

/// Per-feature split statistics accumulated over all trees
#[derive(Default, Clone)]
struct SplitTally {
    count: f64,
    gain: f64,
    cover: f64,
}

fn tally_splits(node: &XGBNode, tallies: &mut [SplitTally]) {
    if let XGBNode::Split { feature, gain, cover, left, right, .. } = node {
        if let Some(t) = tallies.get_mut(*feature) {
            t.count += 1.0;
            t.gain += gain;
            t.cover += cover;
        }
        tally_splits(left, tallies);
        tally_splits(right, tallies);
    }
}

/// Normalized importances (sum to 1 unless no split was made)
fn xgb_tree_importances(
    trees: &[XGBNode],
    n_features: usize,
    importance_type: ImportanceType,
) -> Array1<f64> {
    let mut tallies = vec![SplitTally::default(); n_features];
    for tree in trees {
        tally_splits(tree, &mut tallies);
    }

    let mut scores: Vec<f64> = tallies
        .iter()
        .map(|t| match importance_type {
            ImportanceType::Weight => t.count,
            ImportanceType::TotalGain => t.gain,
            ImportanceType::Gain if t.count > 0.0 => t.gain / t.count,
            ImportanceType::Cover if t.count > 0.0 => t.cover / t.count,
            ImportanceType::Gain | ImportanceType::Cover => 0.0,
        })
        .collect();

    let total: f64 = scores.iter().sum();
    if total > 0.0 {
        for s in scores.iter_mut() {
            *s /= total;
        }
    }
    Array1::from_vec(scores)
}

// ─── XGBoost Classifier ────────────────────────────────────────────────────

/// XGBoost Classifier (logistic loss with second-order approximation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostClassifier {
    config: XGBoostConfig,
    trees: Vec<XGBNode>,
    base_score: f64,
    n_features: usize,
}

impl XGBoostClassifier {
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
        }
    }

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.n_features > 0
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Fit on labels in {0, 1}
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples == 0 || n_features == 0 {
            return Err(FireError::TrainingError("empty training matrix".to_string()));
        }
        if y.len() != n_samples {
            return Err(FireError::ShapeError {
                expected: format!("{} labels", n_samples),
                actual: format!("{} labels", y.len()),
            });
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(FireError::TrainingError(
                "XGBoost classifier expects labels 0 or 1".to_string(),
            ));
        }

        // Base score in log-odds space
        let p = y.mean().unwrap_or(0.5).clamp(1e-7, 1.0 - 1e-7);
        self.base_score = (p / (1.0 - p)).ln();
        let mut raw_preds = Array1::from_elem(n_samples, self.base_score);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();

        for round in 0..self.config.n_estimators {
            // Logistic loss: grad = p - y, hess = p * (1 - p)
            let probs: Array1<f64> = raw_preds.mapv(Self::sigmoid);
            let grad: Array1<f64> = &probs - y;
            let hess: Array1<f64> = probs.mapv(|p| (p * (1.0 - p)).max(1e-7));

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let stats = GradStats { x, grad: &grad, hess: &hess };
            let tree = build_xgb_tree(&stats, &row_indices, &col_indices, 0, &self.config);

            // Every row's margin moves, sampled or not, so the next round sees current predictions
            for (i, row) in x.rows().into_iter().enumerate() {
                raw_preds[i] += self.config.learning_rate * tree.predict(row);
            }

            self.trees.push(tree);

            if round % 25 == 0 {
                debug!(round, "Boosting round complete");
            }
        }

        self.n_features = n_features;
        Ok(())
    }

    /// Raw log-odds margin per row
    pub fn predict_margin(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_input(x)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                self.base_score
                    + self
                        .trees
                        .iter()
                        .map(|tree| self.config.learning_rate * tree.predict(row))
                        .sum::<f64>()
            })
            .collect())
    }

    /// Probability of the positive (fire) class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_margin(x)?.mapv(Self::sigmoid))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let preds = self.predict(x)?;
        if y.is_empty() {
            return Err(FireError::InvalidInput("cannot score on zero rows".to_string()));
        }
        let correct = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count();
        Ok(correct as f64 / y.len() as f64)
    }

    /// Importances of the configured type
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances_of(self.config.importance_type)
    }

    /// Importances of an explicit type
    pub fn feature_importances_of(&self, importance_type: ImportanceType) -> Option<Array1<f64>> {
        if self.n_features == 0 {
            return None;
        }
        Some(xgb_tree_importances(&self.trees, self.n_features, importance_type))
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        if self.n_features == 0 {
            return Err(FireError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(FireError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil().max(1.0) as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((50, 2), (0..100).map(|i| i as f64 * 0.1).collect())
            .unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| if r[0] + r[1] > 5.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    /// Label depends only on column 1; columns 0 and 2 are noise
    fn informative_column_data() -> (Array2<f64>, Array1<f64>) {
        let n = 80;
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => ((i * 37) % 11) as f64,
            1 => i as f64,
            _ => ((i * 53) % 7) as f64,
        });
        let y = Array1::from_shape_fn(n, |i| if i >= 40 { 1.0 } else { 0.0 });
        (x, y)
    }

    #[test]
    fn test_xgboost_classifier() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig {
            n_estimators: 50,
            max_depth: 4,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let acc = model.score(&x, &y).unwrap();
        assert!(acc >= 0.8, "XGBoost classifier accuracy = {}", acc);
    }

    #[test]
    fn test_xgboost_predict_proba() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(Default::default());
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.len(), x.nrows());
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_importances_find_informative_column() {
        let (x, y) = informative_column_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig::default().with_n_estimators(20));
        model.fit(&x, &y).unwrap();

        for importance_type in [
            ImportanceType::Weight,
            ImportanceType::Gain,
            ImportanceType::TotalGain,
            ImportanceType::Cover,
        ] {
            let imp = model.feature_importances_of(importance_type).unwrap();
            assert_eq!(imp.len(), 3);
            assert!((imp.sum() - 1.0).abs() < 1e-9);
        }

        let gain = model.feature_importances().unwrap();
        assert!(gain[1] > gain[0] && gain[1] > gain[2], "gain importances: {:?}", gain);
    }

    #[test]
    fn test_fit_is_deterministic_with_seed() {
        let (x, y) = classification_data();
        let config = XGBoostConfig {
            n_estimators: 10,
            subsample: 0.8,
            colsample_bytree: 0.5,
            ..Default::default()
        };
        let mut a = XGBoostClassifier::new(config.clone());
        let mut b = XGBoostClassifier::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_margin(&x).unwrap(), b.predict_margin(&x).unwrap());
    }

    #[test]
    fn test_rejects_non_binary_labels() {
        let (x, _) = classification_data();
        let y = Array1::from_elem(50, 2.0);
        let mut model = XGBoostClassifier::new(Default::default());
        assert!(model.fit(&x, &y).is_err());
    }

    #[test]
    fn test_predict_before_fit_and_wrong_width() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig::default().with_n_estimators(5));
        assert!(matches!(model.predict(&x), Err(FireError::ModelNotFitted)));

        model.fit(&x, &y).unwrap();
        let narrow = Array2::zeros((3, 1));
        assert!(matches!(model.predict(&narrow), Err(FireError::ShapeError { .. })));
    }

    #[test]
    fn test_regularization_shrinks_leaf_weight() {
        assert_eq!(compute_leaf_weight(0.5, 1.0, 1.0, 1.0), 0.0);
        assert!((compute_leaf_weight(-2.0, 1.0, 1.0, 0.0) - 1.0).abs() < 1e-12);
        assert!((compute_leaf_weight(-2.0, 1.0, 1.0, 1.0) - 0.5).abs() < 1e-12);
    }
}
