//! Data preprocessing module
//!
//! Provides:
//! - Feature scaling (StandardScaler, MinMaxScaler, RobustScaler) with
//!   persisted, column-ordered parameters
//! - Seeded train/test splitting
//! - Importance-based feature selection

mod scaler;
mod split;
pub mod feature_selection;

pub use feature_selection::{FeatureSelector, RankedFeature, SelectionMethod};
pub use scaler::{Scaler, ScalerType};
pub use split::{train_test_split, TrainTestSplit};
