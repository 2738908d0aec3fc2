//! Classification loss

use super::layers::softmax_2d;
use crate::error::{FireError, Result};
use ndarray::Array2;

/// Mean cross-entropy over a batch of logits.
///
/// Returns the loss and its gradient with respect to the logits,
/// `(softmax(logits) - onehot(targets)) / batch`.
pub fn cross_entropy(logits: &Array2<f64>, targets: &[usize]) -> Result<(f64, Array2<f64>)> {
    let (n, n_classes) = logits.dim();
    if n == 0 {
        return Err(FireError::InvalidInput("empty batch".to_string()));
    }
    if targets.len() != n {
        return Err(FireError::ShapeError {
            expected: format!("{} targets", n),
            actual: format!("{} targets", targets.len()),
        });
    }
    if let Some(&bad) = targets.iter().find(|&&t| t >= n_classes) {
        return Err(FireError::InvalidInput(format!(
            "target class {} out of range for {} classes",
            bad, n_classes
        )));
    }

    let mut loss = 0.0;
    for (row, &t) in logits.rows().into_iter().zip(targets) {
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let log_sum = row.iter().map(|&v| (v - max).exp()).sum::<f64>().ln() + max;
        loss += log_sum - row[t];
    }

    let mut grad = softmax_2d(logits);
    for (i, &t) in targets.iter().enumerate() {
        grad[[i, t]] -= 1.0;
    }
    grad /= n as f64;

    Ok((loss / n as f64, grad))
}
