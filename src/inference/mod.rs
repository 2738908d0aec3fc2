//! Inference module
//!
//! Rebuilds the classifier from its persisted weights, applies the persisted
//! scaler to a single raw feature vector and returns logits, class
//! probabilities and the arg-max verdict.

mod predictor;
mod prompt;

pub use predictor::{FirePredictor, Prediction};
pub use prompt::{parse_value_list, prompt_feature_values};
