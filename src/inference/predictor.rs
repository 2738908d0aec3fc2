//! Single-sample fire prediction from persisted artifacts

use crate::architectures::{argmax, softmax_2d};
use crate::error::{FireError, Result};
use crate::export::ModelArtifact;
use crate::preprocessing::Scaler;
use crate::utils::{array_to_frame, frame_to_array};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Outcome of one forward pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub logits: Vec<f64>,
    pub probabilities: Vec<f64>,
    /// Arg-max class, 1 = fire
    pub class: usize,
}

impl Prediction {
    pub fn is_fire(&self) -> bool {
        self.class == 1
    }

    pub fn label(&self) -> &'static str {
        if self.is_fire() {
            "Fire (1)"
        } else {
            "No Fire (0)"
        }
    }

    /// Probability of the predicted class
    pub fn confidence(&self) -> f64 {
        self.probabilities.get(self.class).copied().unwrap_or(0.0)
    }
}

/// Reloaded scaler plus classifier weights
#[derive(Debug, Clone)]
pub struct FirePredictor {
    scaler: Scaler,
    artifact: ModelArtifact,
    /// Features to ask for, in scaler (file) order
    input_features: Vec<String>,
}

impl FirePredictor {
    /// Load both artifacts; the weights must describe a network with
    /// `expected_input_dim` inputs
    pub fn load(scaler_path: &Path, model_path: &Path, expected_input_dim: usize) -> Result<Self> {
        let scaler = Scaler::load(scaler_path)?;
        let artifact = ModelArtifact::load(model_path, expected_input_dim)?;
        info!(
            scaler = %scaler_path.display(),
            model = %model_path.display(),
            features = ?artifact.metadata.feature_names,
            "Artifacts loaded"
        );
        Self::from_parts(scaler, artifact)
    }

    pub fn from_parts(scaler: Scaler, artifact: ModelArtifact) -> Result<Self> {
        let fitted = scaler.columns();
        let model_features = &artifact.metadata.feature_names;
        if let Some(missing) = model_features.iter().find(|f| !fitted.contains(f)) {
            return Err(FireError::FeatureNotFound(format!(
                "{} is an input of the model but was not fitted by the scaler",
                missing
            )));
        }

        let input_features = fitted
            .into_iter()
            .filter(|f| model_features.contains(f))
            .collect();

        Ok(Self {
            scaler,
            artifact,
            input_features,
        })
    }

    /// Raw feature names to collect, in prompt order
    pub fn input_features(&self) -> &[String] {
        &self.input_features
    }

    /// Feature order the network consumes
    pub fn model_features(&self) -> &[String] {
        &self.artifact.metadata.feature_names
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Predict from raw values given in [`input_features`](Self::input_features) order
    pub fn predict_values(&self, values: &[f64]) -> Result<Prediction> {
        if values.len() != self.input_features.len() {
            return Err(FireError::ShapeError {
                expected: format!("{} values", self.input_features.len()),
                actual: format!("{} values", values.len()),
            });
        }

        let row = Array2::from_shape_vec((1, values.len()), values.to_vec())?;
        let raw = array_to_frame(&row, &self.input_features)?;
        let names: Vec<&str> = self.input_features.iter().map(String::as_str).collect();
        let scaled = self.scaler.transform_selected(&raw, &names)?;

        let model_order: Vec<&str> = self.model_features().iter().map(String::as_str).collect();
        let x = frame_to_array(&scaled, &model_order)?;
        debug!(scaled = ?x.row(0).to_vec(), "Scaled input");

        self.predict_scaled(&x)
    }

    /// Forward pass on already-scaled rows in model feature order; uses the first row
    pub fn predict_scaled(&self, x: &Array2<f64>) -> Result<Prediction> {
        if x.nrows() == 0 {
            return Err(FireError::InvalidInput("no rows to predict".to_string()));
        }
        let logits = self.artifact.model.infer(x)?;
        let probabilities = softmax_2d(&logits);

        let logits = logits.row(0).to_vec();
        let probabilities = probabilities.row(0).to_vec();
        let class = argmax(probabilities.iter().copied());

        Ok(Prediction {
            logits,
            probabilities,
            class,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architectures::{ClassifierConfig, TransformerClassifier};
    use crate::preprocessing::ScalerType;
    use polars::prelude::*;

    fn fitted_scaler() -> Scaler {
        let df = df! {
            "Temperature" => [20.0, 30.0, 40.0],
            "RH" => [80.0, 50.0, 20.0],
            "Rain" => [1.0, 0.0, 0.0],
        }
        .unwrap();
        let mut scaler = Scaler::new(ScalerType::Robust);
        scaler.fit(&df, &["Temperature", "RH", "Rain"]).unwrap();
        scaler
    }

    fn artifact(features: &[&str]) -> ModelArtifact {
        let config = ClassifierConfig::new(features.len())
            .with_d_model(8)
            .with_heads(2)
            .with_layers(1)
            .with_dim_feedforward(8);
        let model = TransformerClassifier::new(config).unwrap();
        ModelArtifact::new(model, features.iter().map(|s| s.to_string()).collect(), None, 0).unwrap()
    }

    #[test]
    fn test_prompt_order_follows_scaler() {
        let predictor = FirePredictor::from_parts(fitted_scaler(), artifact(&["RH", "Temperature"])).unwrap();
        assert_eq!(predictor.input_features(), &["Temperature", "RH"]);
        assert_eq!(predictor.model_features(), &["RH", "Temperature"]);
    }

    #[test]
    fn test_predict_values_gives_distribution() {
        let predictor = FirePredictor::from_parts(fitted_scaler(), artifact(&["RH", "Temperature"])).unwrap();
        let prediction = predictor.predict_values(&[35.0, 40.0]).unwrap();

        assert_eq!(prediction.logits.len(), 2);
        assert!((prediction.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(prediction.class < 2);
        assert!(prediction.confidence() >= 0.5);
    }

    #[test]
    fn test_feature_order_matters() {
        let predictor = FirePredictor::from_parts(fitted_scaler(), artifact(&["RH", "Temperature"])).unwrap();
        let scaler = fitted_scaler();

        // Scale by hand and feed in model order: must match predict_values
        let raw = df! { "Temperature" => [35.0], "RH" => [40.0] }.unwrap();
        let scaled = scaler.transform_selected(&raw, &["Temperature", "RH"]).unwrap();
        let x = frame_to_array(&scaled, &["RH", "Temperature"]).unwrap();

        let direct = predictor.predict_scaled(&x).unwrap();
        let via_values = predictor.predict_values(&[35.0, 40.0]).unwrap();
        for (a, b) in direct.logits.iter().zip(&via_values.logits) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_model_feature_unknown_to_scaler() {
        assert!(matches!(
            FirePredictor::from_parts(fitted_scaler(), artifact(&["Temperature", "FWI"])),
            Err(FireError::FeatureNotFound(_))
        ));
    }

    #[test]
    fn test_wrong_value_count() {
        let predictor = FirePredictor::from_parts(fitted_scaler(), artifact(&["RH"])).unwrap();
        assert!(predictor.predict_values(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_labels() {
        let fire = Prediction {
            logits: vec![0.0, 1.0],
            probabilities: vec![0.27, 0.73],
            class: 1,
        };
        assert!(fire.is_fire());
        assert_eq!(fire.label(), "Fire (1)");
        let no_fire = Prediction { class: 0, ..fire };
        assert_eq!(no_fire.label(), "No Fire (0)");
    }
}
