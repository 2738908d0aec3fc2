//! Pipeline configuration
//!
//! Path defaults can be overridden by environment variables; CLI flags
//! override both.

use crate::architectures::ClassifierConfig;
use crate::error::{FireError, Result};
use crate::preprocessing::ScalerType;
use crate::training::{TrainerConfig, XGBoostConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The ten fire-weather readings, in the column order the scaler is fit on
pub const FEATURE_NAMES: [&str; 10] = [
    "Temperature",
    "RH",
    "Ws",
    "Rain",
    "FFMC",
    "DMC",
    "DC",
    "ISI",
    "BUI",
    "FWI",
];

/// Categorical label column in the input CSV
pub const LABEL_COLUMN: &str = "Classes";

/// End-to-end settings for training, explanation and prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub data_path: PathBuf,
    /// Directory for every artifact written by the pipeline
    pub artifact_dir: PathBuf,
    pub scaler_file: String,
    pub model_file: String,
    pub ranking_file: String,
    pub shap_file: String,
    pub label_column: String,
    pub test_size: f64,
    pub seed: u64,
    /// Number of features passed from the boosted tree to the classifier
    pub top_k: usize,
    /// Scaler for feature selection and classifier training
    pub scaler_type: ScalerType,
    /// Scaler for the explainability run
    pub explain_scaler_type: ScalerType,
    /// Permutations sampled per explained row
    pub shap_samples: usize,
    pub xgboost: XGBoostConfig,
    pub classifier: ClassifierConfig,
    pub trainer: TrainerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: std::env::var("FIRESENSE_DATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("Fire_dataset_cleaned.csv")),
            artifact_dir: std::env::var("FIRESENSE_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            scaler_file: std::env::var("FIRESENSE_SCALER").unwrap_or_else(|_| "scaler.json".to_string()),
            model_file: std::env::var("FIRESENSE_MODEL")
                .unwrap_or_else(|_| "fire_transformer_model.json".to_string()),
            ranking_file: "feature_ranking.json".to_string(),
            shap_file: "shap_values.csv".to_string(),
            label_column: LABEL_COLUMN.to_string(),
            test_size: 0.2,
            seed: 42,
            top_k: 10,
            scaler_type: ScalerType::Robust,
            explain_scaler_type: ScalerType::Standard,
            shap_samples: 32,
            xgboost: XGBoostConfig::default(),
            classifier: ClassifierConfig::default(),
            trainer: TrainerConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Seed for the split, the boosted tree, weight init and batch shuffling
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.xgboost.random_state = Some(seed);
        self.classifier.random_state = Some(seed);
        self.trainer.random_state = Some(seed);
        self
    }

    pub fn with_xgboost(mut self, config: XGBoostConfig) -> Self {
        self.xgboost = config;
        self
    }

    pub fn with_classifier(mut self, config: ClassifierConfig) -> Self {
        self.classifier = config;
        self
    }

    pub fn with_trainer(mut self, config: TrainerConfig) -> Self {
        self.trainer = config;
        self
    }

    pub fn with_shap_samples(mut self, n: usize) -> Self {
        self.shap_samples = n;
        self
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.scaler_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.model_file)
    }

    pub fn ranking_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.ranking_file)
    }

    pub fn shap_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.shap_file)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(FireError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.top_k == 0 {
            return Err(FireError::ConfigError("top_k must be at least 1".to_string()));
        }
        if self.label_column.trim().is_empty() {
            return Err(FireError::ConfigError("label column name is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.top_k, 10);
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.scaler_type, ScalerType::Robust);
        assert_eq!(config.explain_scaler_type, ScalerType::Standard);
        assert_eq!(config.classifier.input_dim, FEATURE_NAMES.len());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_paths_join_artifact_dir() {
        let config = PipelineConfig::default().with_artifact_dir("/tmp/fire");
        assert_eq!(config.ranking_path(), PathBuf::from("/tmp/fire/feature_ranking.json"));
        assert_eq!(config.shap_path(), PathBuf::from("/tmp/fire/shap_values.csv"));
    }

    #[test]
    fn test_seed_propagates() {
        let config = PipelineConfig::default().with_seed(7);
        assert_eq!(config.xgboost.random_state, Some(7));
        assert_eq!(config.classifier.random_state, Some(7));
        assert_eq!(config.trainer.random_state, Some(7));
    }

    #[test]
    fn test_invalid_values() {
        assert!(PipelineConfig::default().with_top_k(0).validate().is_err());
        let mut config = PipelineConfig::default();
        config.test_size = 1.5;
        assert!(config.validate().is_err());
    }
}
