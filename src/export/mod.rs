//! Artifact persistence
//!
//! The scaler and the classifier weights are written to two independent
//! JSON files; the feature ranking report is a third, informational file.

mod serializer;

pub use serializer::{load_json, save_json, ModelArtifact, ModelMetadata};
