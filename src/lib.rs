//! firesense - Wildfire detection from fire-weather readings
//!
//! This crate provides a four-stage pipeline:
//! - Feature selection: robust scaling, seeded split, boosted-tree importance
//!   ranking, top-k selection
//! - Model training: a small transformer-encoder classifier trained with
//!   Adam, gradient clipping and early stopping; scaler and weights persisted
//! - Explainability: Shapley attributions of an independently fitted
//!   boosted tree
//! - Inference: reload artifacts, prompt for one reading per feature, print
//!   the class probabilities and a verdict
//!
//! # Modules
//!
//! ## Core ML Modules
//! - [`preprocessing`] - Scaling, splitting, feature selection
//! - [`training`] - Boosted trees, the classifier trainer, metrics
//! - [`architectures`] - Neural network layers and the transformer classifier
//! - [`inference`] - Artifact-backed single-sample prediction
//! - [`explainability`] - Sampling-based SHAP values
//!
//! ## Infrastructure
//! - [`export`] - JSON persistence of the scaler and model artifacts
//! - [`pipeline`] - Stage orchestration
//! - [`config`] - Pipeline configuration
//! - [`utils`] - CSV loading and frame/array conversion
//!
//! ## Services
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod architectures;
pub mod explainability;
pub mod inference;
pub mod preprocessing;
pub mod training;

// Infrastructure
pub mod config;
pub mod export;
pub mod pipeline;
pub mod utils;

// Services
pub mod cli;

pub use error::{FireError, Result};

/// Prelude for convenient imports
pub mod prelude {
    // Error handling
    pub use crate::error::{FireError, Result};

    // Configuration
    pub use crate::config::{PipelineConfig, FEATURE_NAMES, LABEL_COLUMN};

    // Preprocessing
    pub use crate::preprocessing::{train_test_split, FeatureSelector, Scaler, ScalerType, TrainTestSplit};

    // Training
    pub use crate::training::{
        ClassificationMetrics, ClassifierTrainer, ImportanceType, TrainerConfig, TrainingHistory,
        XGBoostClassifier, XGBoostConfig,
    };

    // Neural network
    pub use crate::architectures::{ClassifierConfig, Module, TransformerClassifier};

    // Inference
    pub use crate::inference::{FirePredictor, Prediction};

    // Explainability
    pub use crate::explainability::{ShapExplainer, ShapSummary};

    // Export
    pub use crate::export::{ModelArtifact, ModelMetadata};

    // Pipeline
    pub use crate::pipeline::{run_explain, run_training, ExplainReport, TrainingReport};

    // Utils
    pub use crate::utils::{load_fire_csv, LabeledDataset};
}
