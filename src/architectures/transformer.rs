//! Attention-based tabular classifier
//!
//! Each sample is projected to `d_model` and treated as a single-token
//! sequence, passed through a stack of post-norm encoder layers, pooled,
//! and mapped to class logits.

use super::layers::{
    check_linear, softmax_2d, Dropout, FeedForward, LayerNorm, Linear, Module, MultiHeadAttention,
    Param,
};
use crate::error::{FireError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tokens per sample; every sample attends only to itself
const SEQ_LEN: usize = 1;

/// Architecture hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub input_dim: usize,
    pub d_model: usize,
    pub n_heads: usize,
    pub n_layers: usize,
    pub dim_feedforward: usize,
    /// Dropout inside every encoder layer
    pub encoder_dropout: f64,
    /// Dropout between pooling and the output layer
    pub head_dropout: f64,
    pub n_classes: usize,
    pub layer_norm_eps: f64,
    /// Seed for weight initialisation
    pub random_state: Option<u64>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            input_dim: 10,
            d_model: 64,
            n_heads: 4,
            n_layers: 2,
            dim_feedforward: 2048,
            encoder_dropout: 0.1,
            head_dropout: 0.3,
            n_classes: 2,
            layer_norm_eps: 1e-5,
            random_state: Some(42),
        }
    }
}

impl ClassifierConfig {
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            ..Default::default()
        }
    }

    pub fn with_d_model(mut self, d_model: usize) -> Self {
        self.d_model = d_model;
        self
    }

    pub fn with_heads(mut self, n_heads: usize) -> Self {
        self.n_heads = n_heads;
        self
    }

    pub fn with_layers(mut self, n_layers: usize) -> Self {
        self.n_layers = n_layers;
        self
    }

    pub fn with_dim_feedforward(mut self, dim: usize) -> Self {
        self.dim_feedforward = dim;
        self
    }

    pub fn with_dropout(mut self, encoder: f64, head: f64) -> Self {
        self.encoder_dropout = encoder;
        self.head_dropout = head;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(FireError::ConfigError("input_dim must be at least 1".to_string()));
        }
        if self.n_heads == 0 || self.d_model % self.n_heads != 0 {
            return Err(FireError::ConfigError(format!(
                "d_model {} must be divisible by n_heads {}",
                self.d_model, self.n_heads
            )));
        }
        if self.n_classes < 2 {
            return Err(FireError::ConfigError("n_classes must be at least 2".to_string()));
        }
        for (name, p) in [("encoder_dropout", self.encoder_dropout), ("head_dropout", self.head_dropout)] {
            if !(0.0..1.0).contains(&p) {
                return Err(FireError::ConfigError(format!("{} must be in [0, 1), got {}", name, p)));
            }
        }
        Ok(())
    }
}

/// Post-norm encoder layer:
/// `h = norm1(x + drop(attn(x)))`, `out = norm2(h + drop(ff(h)))`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderLayer {
    pub self_attn: MultiHeadAttention,
    pub feed_forward: FeedForward,
    pub norm1: LayerNorm,
    pub norm2: LayerNorm,
    dropout1: Dropout,
    dropout2: Dropout,
}

impl EncoderLayer {
    pub fn new(config: &ClassifierConfig, rng: &mut Xoshiro256PlusPlus) -> Result<Self> {
        Ok(Self {
            self_attn: MultiHeadAttention::new(config.d_model, config.n_heads, SEQ_LEN, rng)?,
            feed_forward: FeedForward::new(
                config.d_model,
                config.dim_feedforward,
                config.encoder_dropout,
                rng,
            ),
            norm1: LayerNorm::new(config.d_model, config.layer_norm_eps),
            norm2: LayerNorm::new(config.d_model, config.layer_norm_eps),
            dropout1: Dropout::new(config.encoder_dropout),
            dropout2: Dropout::new(config.encoder_dropout),
        })
    }

    pub fn forward(&mut self, x: &Array2<f64>, rng: &mut Xoshiro256PlusPlus) -> Result<Array2<f64>> {
        let attn = self.self_attn.forward(x)?;
        let h = self.norm1.forward(&(x + &self.dropout1.forward(&attn, rng)));
        let ff = self.feed_forward.forward(&h, rng);
        Ok(self.norm2.forward(&(&h + &self.dropout2.forward(&ff, rng))))
    }

    pub fn infer(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let h = self.norm1.infer(&(x + &self.self_attn.infer(x)?));
        Ok(self.norm2.infer(&(&h + &self.feed_forward.infer(&h))))
    }

    pub fn backward(&mut self, dy: &Array2<f64>) -> Result<Array2<f64>> {
        let d_sum2 = self.norm2.backward(dy)?;
        let d_ff = self.dropout2.backward(&d_sum2);
        let dh = d_sum2 + self.feed_forward.backward(&d_ff)?;

        let d_sum1 = self.norm1.backward(&dh)?;
        let d_attn = self.dropout1.backward(&d_sum1);
        Ok(d_sum1 + self.self_attn.backward(&d_attn)?)
    }

    fn check_shapes(&self, config: &ClassifierConfig) -> Result<()> {
        self.self_attn.check_shapes()?;
        check_linear(&self.feed_forward.linear1, "linear1", config.d_model, config.dim_feedforward)?;
        check_linear(&self.feed_forward.linear2, "linear2", config.dim_feedforward, config.d_model)?;
        for norm in [&self.norm1, &self.norm2] {
            if norm.dim() != config.d_model {
                return Err(FireError::ShapeError {
                    expected: format!("layer norm of width {}", config.d_model),
                    actual: format!("layer norm of width {}", norm.dim()),
                });
            }
        }
        Ok(())
    }
}

impl Module for EncoderLayer {
    fn params(&self) -> Vec<&Param> {
        let mut p = self.self_attn.params();
        p.extend(self.feed_forward.params());
        p.extend(self.norm1.params());
        p.extend(self.norm2.params());
        p
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut p = self.self_attn.params_mut();
        p.extend(self.feed_forward.params_mut());
        p.extend(self.norm1.params_mut());
        p.extend(self.norm2.params_mut());
        p
    }
}

/// Transformer encoder classifier over a fixed-width feature vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerClassifier {
    config: ClassifierConfig,
    embedding: Linear,
    layers: Vec<EncoderLayer>,
    head_dropout: Dropout,
    fc: Linear,
}

impl TransformerClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let embedding = Linear::new(config.input_dim, config.d_model, &mut rng);
        let layers = (0..config.n_layers)
            .map(|_| EncoderLayer::new(&config, &mut rng))
            .collect::<Result<Vec<_>>>()?;
        let fc = Linear::new(config.d_model, config.n_classes, &mut rng);

        let model = Self {
            head_dropout: Dropout::new(config.head_dropout),
            config,
            embedding,
            layers,
            fc,
        };
        debug!(
            input_dim = model.config.input_dim,
            layers = model.config.n_layers,
            parameters = model.num_parameters(),
            "Initialised transformer classifier"
        );
        Ok(model)
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.config.input_dim {
            return Err(FireError::ShapeError {
                expected: format!("{} features", self.config.input_dim),
                actual: format!("{} features", x.ncols()),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(FireError::InvalidInput("input contains non-finite values".to_string()));
        }
        Ok(())
    }

    /// Training forward pass: dropout active, activations cached for `backward`
    pub fn forward(&mut self, x: &Array2<f64>, rng: &mut Xoshiro256PlusPlus) -> Result<Array2<f64>> {
        self.check_input(x)?;
        let mut h = self.embedding.forward(x);
        for layer in &mut self.layers {
            h = layer.forward(&h, rng)?;
        }
        // Mean over a one-token sequence leaves the rows unchanged
        let pooled = self.head_dropout.forward(&h, rng);
        Ok(self.fc.forward(&pooled))
    }

    /// Backpropagate the gradient of the loss with respect to the logits
    pub fn backward(&mut self, d_logits: &Array2<f64>) -> Result<()> {
        let d_pooled = self.fc.backward(d_logits)?;
        let mut dh = self.head_dropout.backward(&d_pooled);
        for layer in self.layers.iter_mut().rev() {
            dh = layer.backward(&dh)?;
        }
        self.embedding.backward(&dh)?;
        Ok(())
    }

    /// Evaluation forward pass: no dropout, no caching
    pub fn infer(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;
        let mut h = self.embedding.infer(x);
        for layer in &self.layers {
            h = layer.infer(&h)?;
        }
        Ok(self.fc.infer(&h))
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(softmax_2d(&self.infer(x)?))
    }

    /// Arg-max class per row; ties go to the lower class index
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let logits = self.infer(x)?;
        Ok(logits.map_axis(Axis(1), |row| argmax(row.iter().copied())))
    }

    /// Verify loaded weights match the architecture and the expected input width
    pub fn validate_shapes(&self, expected_input_dim: usize) -> Result<()> {
        let c = &self.config;
        if c.input_dim != expected_input_dim {
            return Err(FireError::ShapeError {
                expected: format!("input_dim {}", expected_input_dim),
                actual: format!("input_dim {}", c.input_dim),
            });
        }
        c.validate()?;
        check_linear(&self.embedding, "embedding", c.input_dim, c.d_model)?;
        if self.layers.len() != c.n_layers {
            return Err(FireError::ShapeError {
                expected: format!("{} encoder layers", c.n_layers),
                actual: format!("{} encoder layers", self.layers.len()),
            });
        }
        for layer in &self.layers {
            layer.check_shapes(c)?;
        }
        check_linear(&self.fc, "fc", c.d_model, c.n_classes)
    }
}

impl Module for TransformerClassifier {
    fn params(&self) -> Vec<&Param> {
        let mut p = self.embedding.params();
        for layer in &self.layers {
            p.extend(layer.params());
        }
        p.extend(self.fc.params());
        p
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut p = self.embedding.params_mut();
        for layer in &mut self.layers {
            p.extend(layer.params_mut());
        }
        p.extend(self.fc.params_mut());
        p
    }
}

/// Index of the largest value; the first one wins on ties
pub fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    best
}
