//! Mini-batch training loop for the transformer classifier

use super::metrics::ClassificationMetrics;
use crate::architectures::{clip_grad_norm, cross_entropy, Adam, Module, TransformerClassifier};
use crate::error::{FireError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Optimisation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub learning_rate: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
    /// Epochs without validation improvement before stopping
    pub patience: usize,
    /// Global gradient-norm ceiling
    pub max_grad_norm: f64,
    /// Seed for batch shuffling and dropout masks
    pub random_state: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 5e-4,
            batch_size: 64,
            max_epochs: 30,
            patience: 5,
            max_grad_norm: 1.0,
            random_state: Some(42),
        }
    }
}

impl TrainerConfig {
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = epochs;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(FireError::ConfigError("batch_size must be at least 1".to_string()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(FireError::ConfigError(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.max_grad_norm > 0.0) {
            return Err(FireError::ConfigError("max_grad_norm must be positive".to_string()));
        }
        Ok(())
    }
}

/// Validation-loss plateau detector
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best: f64,
    counter: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best: f64::INFINITY,
            counter: 0,
        }
    }

    /// Record an epoch's validation loss; returns true when training should stop
    pub fn update(&mut self, val_loss: f64) -> bool {
        if val_loss < self.best {
            self.best = val_loss;
            self.counter = 0;
        } else {
            self.counter += 1;
        }
        self.counter >= self.patience
    }

    /// Whether the last update was a new best
    pub fn improved(&self) -> bool {
        self.counter == 0
    }

    pub fn best(&self) -> f64 {
        self.best
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    /// 1-based
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
}

/// Per-epoch losses and the stopping outcome
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochRecord>,
    /// Epoch (1-based) with the lowest validation loss
    pub best_epoch: usize,
    pub best_val_loss: f64,
    pub stopped_early: bool,
    pub training_time_secs: f64,
}

impl TrainingHistory {
    pub fn epochs_trained(&self) -> usize {
        self.epochs.len()
    }
}

/// Trains a [`TransformerClassifier`] with Adam, gradient clipping and early stopping
#[derive(Debug, Clone)]
pub struct ClassifierTrainer {
    config: TrainerConfig,
}

impl ClassifierTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Fit on the training split, monitoring loss on the validation split.
    ///
    /// The model keeps the weights of the final epoch.
    pub fn fit(
        &self,
        model: &mut TransformerClassifier,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_val: &Array2<f64>,
        y_val: &Array1<f64>,
    ) -> Result<TrainingHistory> {
        self.config.validate()?;
        let train_targets = to_class_indices(y_train)?;
        let val_targets = to_class_indices(y_val)?;
        check_rows(x_train, &train_targets)?;
        check_rows(x_val, &val_targets)?;
        if x_train.nrows() == 0 || x_val.nrows() == 0 {
            return Err(FireError::TrainingError(
                "training and validation sets must both be non-empty".to_string(),
            ));
        }

        let start = Instant::now();
        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        let mut optimizer = Adam::new(self.config.learning_rate);
        let mut stopper = EarlyStopping::new(self.config.patience);
        let mut history = TrainingHistory {
            best_val_loss: f64::INFINITY,
            ..Default::default()
        };

        let n_train = x_train.nrows();
        let batch_size = self.config.batch_size;

        for epoch in 1..=self.config.max_epochs {
            let mut indices: Vec<usize> = (0..n_train).collect();
            indices.shuffle(&mut rng);

            let mut running_loss = 0.0;
            let mut n_batches = 0;
            for batch in indices.chunks(batch_size) {
                let x_batch = x_train.select(Axis(0), batch);
                let y_batch: Vec<usize> = batch.iter().map(|&i| train_targets[i]).collect();

                model.zero_grad();
                let logits = model.forward(&x_batch, &mut rng)?;
                let (loss, d_logits) = cross_entropy(&logits, &y_batch)?;
                if !loss.is_finite() {
                    return Err(FireError::TrainingError(format!(
                        "loss diverged at epoch {}",
                        epoch
                    )));
                }
                model.backward(&d_logits)?;
                let grad_norm = clip_grad_norm(model.params_mut(), self.config.max_grad_norm);
                optimizer.step(model.params_mut());

                debug!(epoch, batch = n_batches, loss, grad_norm, "Batch step");
                running_loss += loss;
                n_batches += 1;
            }

            let train_loss = running_loss / n_batches as f64;
            let val_loss = self.evaluate_loss(model, x_val, &val_targets)?;
            info!(
                epoch,
                epochs = self.config.max_epochs,
                train_loss,
                val_loss,
                "Epoch complete"
            );
            history.epochs.push(EpochRecord {
                epoch,
                train_loss,
                val_loss,
            });

            let stop = stopper.update(val_loss);
            if stopper.improved() {
                history.best_epoch = epoch;
                history.best_val_loss = val_loss;
            }
            if stop {
                warn!(
                    epoch,
                    best_epoch = history.best_epoch,
                    patience = self.config.patience,
                    "Early stopping triggered"
                );
                history.stopped_early = true;
                break;
            }
        }

        history.training_time_secs = start.elapsed().as_secs_f64();
        Ok(history)
    }

    /// Mean of per-batch mean losses, batches in order, dropout off
    pub fn evaluate_loss(
        &self,
        model: &TransformerClassifier,
        x: &Array2<f64>,
        targets: &[usize],
    ) -> Result<f64> {
        let mut total = 0.0;
        let mut n_batches = 0;
        let indices: Vec<usize> = (0..x.nrows()).collect();
        for batch in indices.chunks(self.config.batch_size.max(1)) {
            let logits = model.infer(&x.select(Axis(0), batch))?;
            let y: Vec<usize> = batch.iter().map(|&i| targets[i]).collect();
            total += cross_entropy(&logits, &y)?.0;
            n_batches += 1;
        }
        if n_batches == 0 {
            return Err(FireError::InvalidInput("no rows to evaluate".to_string()));
        }
        Ok(total / n_batches as f64)
    }
}

/// Score a fitted classifier on a labelled split
pub fn evaluate(
    model: &TransformerClassifier,
    x: &Array2<f64>,
    y: &Array1<f64>,
) -> Result<ClassificationMetrics> {
    let targets = to_class_indices(y)?;
    check_rows(x, &targets)?;
    let predicted = model.predict(x)?.to_vec();
    Ok(ClassificationMetrics::compute(&targets, &predicted))
}

/// Labels must be exact non-negative integers
pub fn to_class_indices(y: &Array1<f64>) -> Result<Vec<usize>> {
    y.iter()
        .enumerate()
        .map(|(i, &v)| {
            if v >= 0.0 && v.fract() == 0.0 {
                Ok(v as usize)
            } else {
                Err(FireError::DataError(format!("label {} at row {} is not a class index", v, i)))
            }
        })
        .collect()
}

fn check_rows(x: &Array2<f64>, targets: &[usize]) -> Result<()> {
    if x.nrows() != targets.len() {
        return Err(FireError::ShapeError {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", targets.len()),
        });
    }
    Ok(())
}
