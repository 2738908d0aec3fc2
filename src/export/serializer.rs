//! JSON persistence for fitted artifacts

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::architectures::TransformerClassifier;
use crate::error::{FireError, Result};

/// Write any serializable value as pretty JSON, creating parent directories
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;

    debug!(path = %path.display(), "Artifact written");
    Ok(())
}

/// Read a JSON artifact
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| {
        FireError::IoError(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Descriptive data stored next to the classifier weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Input features in the order the network consumes them
    pub feature_names: Vec<String>,
    pub input_dim: usize,
    pub n_classes: usize,
    /// Held-out accuracy at save time
    pub test_accuracy: Option<f64>,
    /// Epochs actually run before stopping
    pub epochs_trained: usize,
}

/// The classifier weights file: metadata plus the network itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ModelMetadata,
    pub model: TransformerClassifier,
}

impl ModelArtifact {
    pub fn new(
        model: TransformerClassifier,
        feature_names: Vec<String>,
        test_accuracy: Option<f64>,
        epochs_trained: usize,
    ) -> Result<Self> {
        let config = model.config();
        if feature_names.len() != config.input_dim {
            return Err(FireError::ShapeError {
                expected: format!("{} feature names", config.input_dim),
                actual: format!("{} feature names", feature_names.len()),
            });
        }

        Ok(Self {
            metadata: ModelMetadata {
                created_at: chrono::Utc::now(),
                feature_names,
                input_dim: config.input_dim,
                n_classes: config.n_classes,
                test_accuracy,
                epochs_trained,
            },
            model,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }

    /// Load weights for a classifier built with `expected_input_dim` inputs.
    /// Any disagreement between the declared and stored shapes is a hard error.
    pub fn load(path: &Path, expected_input_dim: usize) -> Result<Self> {
        let artifact: Self = load_json(path)?;

        if artifact.metadata.input_dim != expected_input_dim {
            return Err(FireError::ShapeError {
                expected: format!("input_dim {}", expected_input_dim),
                actual: format!("input_dim {}", artifact.metadata.input_dim),
            });
        }
        if artifact.metadata.feature_names.len() != expected_input_dim {
            return Err(FireError::ShapeError {
                expected: format!("{} feature names", expected_input_dim),
                actual: format!("{} feature names", artifact.metadata.feature_names.len()),
            });
        }
        artifact.model.validate_shapes(expected_input_dim)?;

        Ok(artifact)
    }
}
