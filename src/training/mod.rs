//! Model training module
//!
//! Provides:
//! - XGBoost-style boosted trees, used to rank features and as the
//!   explainability model
//! - The mini-batch trainer for the transformer classifier, with early stopping
//! - Binary classification metrics

pub mod metrics;
pub mod trainer;
pub mod xgboost;

pub use metrics::{ClassificationMetrics, ConfusionMatrix};
pub use trainer::{
    evaluate, to_class_indices, ClassifierTrainer, EarlyStopping, EpochRecord, TrainerConfig,
    TrainingHistory,
};
pub use xgboost::{ImportanceType, XGBoostClassifier, XGBoostConfig};
