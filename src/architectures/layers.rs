//! Trainable neural network layers
//!
//! Every layer works on row-major activations `(rows, features)`, caches what
//! its backward pass needs during `forward`, and accumulates parameter
//! gradients into its [`Param`]s. `infer` is the cache-free, dropout-free
//! path used for evaluation and prediction.

use crate::error::{FireError, Result};
use ndarray::{s, Array1, Array2, Axis};
use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// A trainable tensor and its accumulated gradient.
///
/// Vectors (biases, norm gains) are stored as `(1, n)` rows so they
/// broadcast over a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub value: Array2<f64>,
    #[serde(skip)]
    pub grad: Array2<f64>,
}

impl Param {
    pub fn new(value: Array2<f64>) -> Self {
        let grad = Array2::zeros(value.raw_dim());
        Self { value, grad }
    }

    pub fn zero_grad(&mut self) {
        self.grad = Array2::zeros(self.value.raw_dim());
    }

    /// Add to the gradient; a gradient of the wrong shape (fresh after load) is reset first
    pub fn accumulate(&mut self, g: &Array2<f64>) {
        if self.grad.raw_dim() != self.value.raw_dim() {
            self.zero_grad();
        }
        self.grad += g;
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Anything holding trainable parameters
pub trait Module {
    fn params(&self) -> Vec<&Param>;

    fn params_mut(&mut self) -> Vec<&mut Param>;

    fn zero_grad(&mut self) {
        for p in self.params_mut() {
            p.zero_grad();
        }
    }

    fn num_parameters(&self) -> usize {
        self.params().iter().map(|p| p.len()).sum()
    }
}

fn missing_cache(layer: &str) -> FireError {
    FireError::TrainingError(format!("{}: backward called before forward", layer))
}

fn uniform(rng: &mut Xoshiro256PlusPlus, shape: (usize, usize), bound: f64) -> Array2<f64> {
    Array2::from_shape_fn(shape, |_| rng.gen_range(-bound..bound))
}

/// Softmax over rows of 2D array
pub fn softmax_2d(x: &Array2<f64>) -> Array2<f64> {
    let mut result = x.clone();
    for mut row in result.rows_mut() {
        let max_val = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp: Array1<f64> = row.mapv(|v| (v - max_val).exp());
        let sum: f64 = exp.sum();
        row.assign(&(exp / sum));
    }
    result
}

// ─── Linear ────────────────────────────────────────────────────────────────

/// Fully connected layer: y = x W + b
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Linear {
    /// `(in_features, out_features)`
    pub weight: Param,
    /// `(1, out_features)`
    pub bias: Param,
    #[serde(skip)]
    input: Option<Array2<f64>>,
}

impl Linear {
    /// Uniform fan-in initialisation U(-1/√in, 1/√in) for weights and bias
    pub fn new(in_features: usize, out_features: usize, rng: &mut Xoshiro256PlusPlus) -> Self {
        let bound = 1.0 / (in_features.max(1) as f64).sqrt();
        Self {
            weight: Param::new(uniform(rng, (in_features, out_features), bound)),
            bias: Param::new(uniform(rng, (1, out_features), bound)),
            input: None,
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.value.nrows()
    }

    pub fn out_features(&self) -> usize {
        self.weight.value.ncols()
    }

    pub fn forward(&mut self, x: &Array2<f64>) -> Array2<f64> {
        let y = self.infer(x);
        self.input = Some(x.clone());
        y
    }

    pub fn infer(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weight.value) + &self.bias.value
    }

    pub fn backward(&mut self, dy: &Array2<f64>) -> Result<Array2<f64>> {
        let x = self.input.as_ref().ok_or_else(|| missing_cache("Linear"))?;
        let dw = x.t().dot(dy);
        let db = dy.sum_axis(Axis(0)).insert_axis(Axis(0));
        let dx = dy.dot(&self.weight.value.t());
        self.weight.accumulate(&dw);
        self.bias.accumulate(&db);
        Ok(dx)
    }

    fn check_shape(&self, name: &str, in_features: usize, out_features: usize) -> Result<()> {
        let w = self.weight.value.dim();
        let b = self.bias.value.dim();
        if w != (in_features, out_features) || b != (1, out_features) {
            return Err(FireError::ShapeError {
                expected: format!("{} weight ({}, {})", name, in_features, out_features),
                actual: format!("weight {:?}, bias {:?}", w, b),
            });
        }
        Ok(())
    }
}

impl Module for Linear {
    fn params(&self) -> Vec<&Param> {
        vec![&self.weight, &self.bias]
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.weight, &mut self.bias]
    }
}

// ─── LayerNorm ─────────────────────────────────────────────────────────────

/// Layer normalization over the feature axis of each row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerNorm {
    pub gamma: Param,
    pub beta: Param,
    eps: f64,
    #[serde(skip)]
    cache: Option<(Array2<f64>, Array1<f64>)>,
}

impl LayerNorm {
    pub fn new(dim: usize, eps: f64) -> Self {
        Self {
            gamma: Param::new(Array2::ones((1, dim))),
            beta: Param::new(Array2::zeros((1, dim))),
            eps,
            cache: None,
        }
    }

    pub fn dim(&self) -> usize {
        self.gamma.value.ncols()
    }

    /// Returns (output, normalized input, 1/std per row)
    fn compute(&self, x: &Array2<f64>) -> (Array2<f64>, Array2<f64>, Array1<f64>) {
        let d = x.ncols() as f64;
        let mean = (x.sum_axis(Axis(1)) / d).insert_axis(Axis(1));
        let centered = x - &mean;
        let var = centered.mapv(|v| v * v).sum_axis(Axis(1)) / d;
        let inv_std = var.mapv(|v| 1.0 / (v + self.eps).sqrt());
        let xhat = &centered * &inv_std.view().insert_axis(Axis(1));
        let y = &xhat * &self.gamma.value + &self.beta.value;
        (y, xhat, inv_std)
    }

    pub fn forward(&mut self, x: &Array2<f64>) -> Array2<f64> {
        let (y, xhat, inv_std) = self.compute(x);
        self.cache = Some((xhat, inv_std));
        y
    }

    pub fn infer(&self, x: &Array2<f64>) -> Array2<f64> {
        self.compute(x).0
    }

    pub fn backward(&mut self, dy: &Array2<f64>) -> Result<Array2<f64>> {
        let (xhat, inv_std) = self.cache.as_ref().ok_or_else(|| missing_cache("LayerNorm"))?;
        let d = dy.ncols() as f64;

        let dgamma = (dy * xhat).sum_axis(Axis(0)).insert_axis(Axis(0));
        let dbeta = dy.sum_axis(Axis(0)).insert_axis(Axis(0));

        let dxhat = dy * &self.gamma.value;
        let sum_dxhat = dxhat.sum_axis(Axis(1)).insert_axis(Axis(1));
        let sum_dxhat_xhat = (&dxhat * xhat).sum_axis(Axis(1)).insert_axis(Axis(1));
        let dx = (&dxhat * d - &sum_dxhat - xhat * &sum_dxhat_xhat)
            * &inv_std.view().insert_axis(Axis(1))
            / d;

        self.gamma.accumulate(&dgamma);
        self.beta.accumulate(&dbeta);
        Ok(dx)
    }
}

impl Module for LayerNorm {
    fn params(&self) -> Vec<&Param> {
        vec![&self.gamma, &self.beta]
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.gamma, &mut self.beta]
    }
}

// ─── Dropout ───────────────────────────────────────────────────────────────

/// Inverted dropout: kept activations are scaled by 1/(1-p) during training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dropout {
    p: f64,
    #[serde(skip)]
    mask: Option<Array2<f64>>,
}

impl Dropout {
    pub fn new(p: f64) -> Self {
        Self {
            p: p.clamp(0.0, 0.99),
            mask: None,
        }
    }

    pub fn rate(&self) -> f64 {
        self.p
    }

    pub fn forward(&mut self, x: &Array2<f64>, rng: &mut Xoshiro256PlusPlus) -> Array2<f64> {
        if self.p <= 0.0 {
            self.mask = None;
            return x.clone();
        }
        let keep = 1.0 / (1.0 - self.p);
        let mask = Array2::from_shape_fn(x.raw_dim(), |_| {
            if rng.gen::<f64>() < self.p {
                0.0
            } else {
                keep
            }
        });
        let y = x * &mask;
        self.mask = Some(mask);
        y
    }

    pub fn backward(&self, dy: &Array2<f64>) -> Array2<f64> {
        match &self.mask {
            Some(mask) => dy * mask,
            None => dy.clone(),
        }
    }
}

// ─── Feed-forward block ────────────────────────────────────────────────────

/// Position-wise feed-forward: Linear -> ReLU -> Dropout -> Linear
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedForward {
    pub linear1: Linear,
    pub linear2: Linear,
    dropout: Dropout,
    #[serde(skip)]
    relu_mask: Option<Array2<f64>>,
}

impl FeedForward {
    pub fn new(d_model: usize, d_hidden: usize, dropout: f64, rng: &mut Xoshiro256PlusPlus) -> Self {
        Self {
            linear1: Linear::new(d_model, d_hidden, rng),
            linear2: Linear::new(d_hidden, d_model, rng),
            dropout: Dropout::new(dropout),
            relu_mask: None,
        }
    }

    pub fn forward(&mut self, x: &Array2<f64>, rng: &mut Xoshiro256PlusPlus) -> Array2<f64> {
        let h = self.linear1.forward(x);
        let mask = h.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let a = &h * &mask;
        self.relu_mask = Some(mask);
        let a = self.dropout.forward(&a, rng);
        self.linear2.forward(&a)
    }

    pub fn infer(&self, x: &Array2<f64>) -> Array2<f64> {
        let h = self.linear1.infer(x).mapv(|v| v.max(0.0));
        self.linear2.infer(&h)
    }

    pub fn backward(&mut self, dy: &Array2<f64>) -> Result<Array2<f64>> {
        let da = self.linear2.backward(dy)?;
        let da = self.dropout.backward(&da);
        let mask = self.relu_mask.as_ref().ok_or_else(|| missing_cache("FeedForward"))?;
        let dh = da * mask;
        self.linear1.backward(&dh)
    }
}

impl Module for FeedForward {
    fn params(&self) -> Vec<&Param> {
        let mut p = self.linear1.params();
        p.extend(self.linear2.params());
        p
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut p = self.linear1.params_mut();
        p.extend(self.linear2.params_mut());
        p
    }
}

// ─── Multi-head self-attention ─────────────────────────────────────────────

#[derive(Debug, Clone)]
struct AttentionCache {
    q: Array2<f64>,
    k: Array2<f64>,
    v: Array2<f64>,
    /// Attention weights per (sequence, head), `(seq_len, seq_len)` each
    weights: Vec<Array2<f64>>,
}

/// Scaled dot-product self-attention with `n_heads` heads.
///
/// Rows are tokens; consecutive blocks of `seq_len` rows form one sequence,
/// and tokens only attend within their own sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiHeadAttention {
    d_model: usize,
    n_heads: usize,
    seq_len: usize,
    pub q_proj: Linear,
    pub k_proj: Linear,
    pub v_proj: Linear,
    pub out_proj: Linear,
    #[serde(skip)]
    cache: Option<AttentionCache>,
}

impl MultiHeadAttention {
    pub fn new(
        d_model: usize,
        n_heads: usize,
        seq_len: usize,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Result<Self> {
        if n_heads == 0 || d_model % n_heads != 0 {
            return Err(FireError::ConfigError(format!(
                "d_model {} is not divisible by n_heads {}",
                d_model, n_heads
            )));
        }
        if seq_len == 0 {
            return Err(FireError::ConfigError("seq_len must be at least 1".to_string()));
        }

        Ok(Self {
            d_model,
            n_heads,
            seq_len,
            q_proj: Linear::new(d_model, d_model, rng),
            k_proj: Linear::new(d_model, d_model, rng),
            v_proj: Linear::new(d_model, d_model, rng),
            out_proj: Linear::new(d_model, d_model, rng),
            cache: None,
        })
    }

    pub fn n_heads(&self) -> usize {
        self.n_heads
    }

    fn head_dim(&self) -> usize {
        self.d_model / self.n_heads
    }

    fn n_sequences(&self, rows: usize) -> Result<usize> {
        if rows % self.seq_len != 0 {
            return Err(FireError::ShapeError {
                expected: format!("a multiple of {} rows", self.seq_len),
                actual: format!("{} rows", rows),
            });
        }
        Ok(rows / self.seq_len)
    }

    /// Attend within every (sequence, head) block; returns the concatenated
    /// head outputs and the attention weights
    fn attend(
        &self,
        q: &Array2<f64>,
        k: &Array2<f64>,
        v: &Array2<f64>,
    ) -> Result<(Array2<f64>, Vec<Array2<f64>>)> {
        let n_seq = self.n_sequences(q.nrows())?;
        let (l, dh) = (self.seq_len, self.head_dim());
        let scale = 1.0 / (dh as f64).sqrt();

        let mut context = Array2::zeros(q.raw_dim());
        let mut weights = Vec::with_capacity(n_seq * self.n_heads);

        for b in 0..n_seq {
            for h in 0..self.n_heads {
                let (r0, c0) = (b * l, h * dh);
                let block = s![r0..r0 + l, c0..c0 + dh];
                let qb = q.slice(block);
                let kb = k.slice(block);
                let vb = v.slice(block);

                let scores = qb.dot(&kb.t()) * scale;
                let attn = softmax_2d(&scores);
                context.slice_mut(block).assign(&attn.dot(&vb));
                weights.push(attn);
            }
        }

        Ok((context, weights))
    }

    pub fn forward(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let q = self.q_proj.forward(x);
        let k = self.k_proj.forward(x);
        let v = self.v_proj.forward(x);
        let (context, weights) = self.attend(&q, &k, &v)?;
        let out = self.out_proj.forward(&context);
        self.cache = Some(AttentionCache { q, k, v, weights });
        Ok(out)
    }

    pub fn infer(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let q = self.q_proj.infer(x);
        let k = self.k_proj.infer(x);
        let v = self.v_proj.infer(x);
        let (context, _) = self.attend(&q, &k, &v)?;
        Ok(self.out_proj.infer(&context))
    }

    /// Attention weights from the last training forward pass
    pub fn last_attention(&self) -> Option<&[Array2<f64>]> {
        self.cache.as_ref().map(|c| c.weights.as_slice())
    }

    pub fn backward(&mut self, dy: &Array2<f64>) -> Result<Array2<f64>> {
        let d_context = self.out_proj.backward(dy)?;
        let cache = self.cache.as_ref().ok_or_else(|| missing_cache("MultiHeadAttention"))?;

        let (l, dh) = (self.seq_len, self.head_dim());
        let scale = 1.0 / (dh as f64).sqrt();
        let n_seq = self.n_sequences(d_context.nrows())?;

        let mut dq = Array2::zeros(cache.q.raw_dim());
        let mut dk = Array2::zeros(cache.k.raw_dim());
        let mut dv = Array2::zeros(cache.v.raw_dim());

        for b in 0..n_seq {
            for h in 0..self.n_heads {
                let (r0, c0) = (b * l, h * dh);
                let block = s![r0..r0 + l, c0..c0 + dh];
                let attn = &cache.weights[b * self.n_heads + h];
                let qb = cache.q.slice(block);
                let kb = cache.k.slice(block);
                let vb = cache.v.slice(block);
                let d_ctx = d_context.slice(block);

                // context = A V
                dv.slice_mut(block).assign(&attn.t().dot(&d_ctx));
                let d_attn = d_ctx.dot(&vb.t());

                // softmax rows: dS = A ⊙ (dA - rowsum(dA ⊙ A))
                let row_dot = (&d_attn * attn).sum_axis(Axis(1)).insert_axis(Axis(1));
                let d_scores = attn * &(&d_attn - &row_dot) * scale;

                dq.slice_mut(block).assign(&d_scores.dot(&kb));
                dk.slice_mut(block).assign(&d_scores.t().dot(&qb));
            }
        }

        let dx_q = self.q_proj.backward(&dq)?;
        let dx_k = self.k_proj.backward(&dk)?;
        let dx_v = self.v_proj.backward(&dv)?;
        Ok(dx_q + dx_k + dx_v)
    }

    pub(crate) fn check_shapes(&self) -> Result<()> {
        let d = self.d_model;
        self.q_proj.check_shape("q_proj", d, d)?;
        self.k_proj.check_shape("k_proj", d, d)?;
        self.v_proj.check_shape("v_proj", d, d)?;
        self.out_proj.check_shape("out_proj", d, d)
    }
}

impl Module for MultiHeadAttention {
    fn params(&self) -> Vec<&Param> {
        let mut p = self.q_proj.params();
        p.extend(self.k_proj.params());
        p.extend(self.v_proj.params());
        p.extend(self.out_proj.params());
        p
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut p = self.q_proj.params_mut();
        p.extend(self.k_proj.params_mut());
        p.extend(self.v_proj.params_mut());
        p.extend(self.out_proj.params_mut());
        p
    }
}

pub(crate) fn check_linear(layer: &Linear, name: &str, rows: usize, cols: usize) -> Result<()> {
    layer.check_shape(name, rows, cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(7)
    }

    fn random_input(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
        let mut r = Xoshiro256PlusPlus::seed_from_u64(seed);
        Array2::from_shape_fn((rows, cols), |_| r.gen_range(-1.0..1.0))
    }

    /// Loss used for gradient checks: sum(y ⊙ w) for a fixed random w
    fn probe_loss(y: &Array2<f64>, w: &Array2<f64>) -> f64 {
        (y * w).sum()
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let x = Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, 1000.0, 0.0, -1000.0]).unwrap();
        let p = softmax_2d(&x);
        for row in p.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        assert!((p[[1, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_shapes_and_gradient() {
        let mut r = rng();
        let mut layer = Linear::new(4, 3, &mut r);
        let x = random_input(5, 4, 1);
        let w = random_input(5, 3, 2);

        let y = layer.forward(&x);
        assert_eq!(y.dim(), (5, 3));
        let dx = layer.backward(&w).unwrap();
        assert_eq!(dx.dim(), (5, 4));

        // Input gradient by central differences
        let eps = 1e-6;
        for &(i, j) in &[(0, 0), (2, 3), (4, 1)] {
            let mut xp = x.clone();
            xp[[i, j]] += eps;
            let mut xm = x.clone();
            xm[[i, j]] -= eps;
            let numeric = (probe_loss(&layer.infer(&xp), &w) - probe_loss(&layer.infer(&xm), &w))
                / (2.0 * eps);
            assert!((numeric - dx[[i, j]]).abs() < 1e-6);
        }

        // Bias gradient is the column sum of the upstream gradient
        let expected_db = w.sum_axis(Axis(0));
        for j in 0..3 {
            assert!((layer.bias.grad[[0, j]] - expected_db[j]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_layer_norm_gradient() {
        let mut norm = LayerNorm::new(6, 1e-5);
        norm.gamma.value = random_input(1, 6, 3) + 1.0;
        let x = random_input(4, 6, 4);
        let w = random_input(4, 6, 5);

        let y = norm.forward(&x);
        for row in norm.infer(&x).rows() {
            assert!(row.iter().all(|v| v.is_finite()));
        }
        assert_eq!(y.dim(), (4, 6));
        let dx = norm.backward(&w).unwrap();

        let eps = 1e-6;
        for &(i, j) in &[(0, 0), (1, 5), (3, 2)] {
            let mut xp = x.clone();
            xp[[i, j]] += eps;
            let mut xm = x.clone();
            xm[[i, j]] -= eps;
            let numeric = (probe_loss(&norm.infer(&xp), &w) - probe_loss(&norm.infer(&xm), &w))
                / (2.0 * eps);
            assert!(
                (numeric - dx[[i, j]]).abs() < 1e-5,
                "layer norm grad mismatch at ({}, {}): {} vs {}",
                i,
                j,
                numeric,
                dx[[i, j]]
            );
        }
    }

    #[test]
    fn test_attention_gradient_over_sequences() {
        let mut r = rng();
        // Two sequences of three tokens each, two heads
        let mut attn = MultiHeadAttention::new(4, 2, 3, &mut r).unwrap();
        let x = random_input(6, 4, 6);
        let w = random_input(6, 4, 8);

        let y = attn.forward(&x).unwrap();
        assert_eq!(y.dim(), (6, 4));
        assert_eq!(attn.last_attention().unwrap().len(), 4);
        let dx = attn.backward(&w).unwrap();

        let eps = 1e-6;
        for &(i, j) in &[(0, 0), (2, 3), (4, 1), (5, 2)] {
            let mut xp = x.clone();
            xp[[i, j]] += eps;
            let mut xm = x.clone();
            xm[[i, j]] -= eps;
            let numeric = (probe_loss(&attn.infer(&xp).unwrap(), &w)
                - probe_loss(&attn.infer(&xm).unwrap(), &w))
                / (2.0 * eps);
            assert!(
                (numeric - dx[[i, j]]).abs() < 1e-5,
                "attention grad mismatch at ({}, {}): {} vs {}",
                i,
                j,
                numeric,
                dx[[i, j]]
            );
        }
    }

    #[test]
    fn test_attention_rejects_ragged_batch() {
        let mut r = rng();
        let attn = MultiHeadAttention::new(4, 2, 3, &mut r).unwrap();
        assert!(attn.infer(&random_input(4, 4, 1)).is_err());
        assert!(MultiHeadAttention::new(6, 4, 1, &mut r).is_err());
    }

    #[test]
    fn test_feed_forward_gradient_without_dropout() {
        let mut r = rng();
        let mut ff = FeedForward::new(4, 8, 0.0, &mut r);
        let x = random_input(3, 4, 9);
        let w = random_input(3, 4, 10);

        ff.forward(&x, &mut r);
        let dx = ff.backward(&w).unwrap();

        let eps = 1e-6;
        for &(i, j) in &[(0, 1), (2, 3)] {
            let mut xp = x.clone();
            xp[[i, j]] += eps;
            let mut xm = x.clone();
            xm[[i, j]] -= eps;
            let numeric =
                (probe_loss(&ff.infer(&xp), &w) - probe_loss(&ff.infer(&xm), &w)) / (2.0 * eps);
            assert!((numeric - dx[[i, j]]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_dropout_scales_kept_units() {
        let mut r = rng();
        let mut dropout = Dropout::new(0.5);
        let x = Array2::ones((20, 20));
        let y = dropout.forward(&x, &mut r);
        assert!(y.iter().all(|&v| v == 0.0 || (v - 2.0).abs() < 1e-12));
        assert!(y.iter().any(|&v| v == 0.0));

        let g = dropout.backward(&x);
        assert_eq!(g, y);
    }

    #[test]
    fn test_backward_before_forward_is_an_error() {
        let mut r = rng();
        let mut layer = Linear::new(2, 2, &mut r);
        assert!(layer.backward(&Array2::zeros((1, 2))).is_err());
    }

    #[test]
    fn test_param_accumulates_and_resets() {
        let mut p = Param::new(Array2::zeros((1, 2)));
        p.grad = Array2::default((0, 0));
        p.accumulate(&Array2::ones((1, 2)));
        p.accumulate(&Array2::ones((1, 2)));
        assert_eq!(p.grad, Array2::from_elem((1, 2), 2.0));
        p.zero_grad();
        assert_eq!(p.grad.sum(), 0.0);
    }
}
