//! Seeded train/test splitting

use crate::error::{FireError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Result of a shuffled train/test split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
    /// Source row of each training sample
    pub train_indices: Vec<usize>,
    /// Source row of each test sample
    pub test_indices: Vec<usize>,
}

impl TrainTestSplit {
    /// Keep only the given feature columns, in the given order
    pub fn select_columns(&self, columns: &[usize]) -> Result<Self> {
        let n_features = self.x_train.ncols();
        if let Some(&bad) = columns.iter().find(|&&c| c >= n_features) {
            return Err(FireError::InvalidInput(format!(
                "column index {} out of range for {} features",
                bad, n_features
            )));
        }

        Ok(Self {
            x_train: self.x_train.select(Axis(1), columns),
            x_test: self.x_test.select(Axis(1), columns),
            y_train: self.y_train.clone(),
            y_test: self.y_test.clone(),
            train_indices: self.train_indices.clone(),
            test_indices: self.test_indices.clone(),
        })
    }
}

/// Shuffle rows with a seeded generator and hold out `test_size` of them.
///
/// The test set size is `ceil(n * test_size)`; the same seed always yields
/// the same partition.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    let n = x.nrows();
    if n != y.len() {
        return Err(FireError::ShapeError {
            expected: format!("{} labels", n),
            actual: format!("{} labels", y.len()),
        });
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(FireError::ConfigError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n_test = ((n as f64) * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(FireError::DataError(format!(
            "cannot split {} rows with test_size {}",
            n, test_size
        )));
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let test_indices = indices[..n_test].to_vec();
    let train_indices = indices[n_test..].to_vec();

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), &train_indices),
        x_test: x.select(Axis(0), &test_indices),
        y_train: y.select(Axis(0), &train_indices),
        y_test: y.select(Axis(0), &test_indices),
        train_indices,
        test_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| (i * 3 + j) as f64);
        let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
        (x, y)
    }

    #[test]
    fn test_split_is_deterministic_for_seed() {
        let (x, y) = data(50);
        let a = train_test_split(&x, &y, 0.2, 42).unwrap();
        let b = train_test_split(&x, &y, 0.2, 42).unwrap();
        assert_eq!(a.test_indices, b.test_indices);
        assert_eq!(a.x_train, b.x_train);
        assert_eq!(a.y_test, b.y_test);

        let c = train_test_split(&x, &y, 0.2, 7).unwrap();
        assert_ne!(a.test_indices, c.test_indices);
    }

    #[test]
    fn test_split_sizes_and_partition() {
        let (x, y) = data(51);
        let split = train_test_split(&x, &y, 0.2, 42).unwrap();
        assert_eq!(split.x_test.nrows(), 11); // ceil(51 * 0.2)
        assert_eq!(split.x_train.nrows(), 40);

        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(split.test_indices.iter())
            .copied()
            .collect();
        all.sort();
        assert_eq!(all, (0..51).collect::<Vec<_>>());
    }

    #[test]
    fn test_rows_stay_aligned_with_labels() {
        let (x, y) = data(20);
        let split = train_test_split(&x, &y, 0.25, 1).unwrap();
        for (row, &src) in split.test_indices.iter().enumerate() {
            assert_eq!(split.x_test[[row, 0]], x[[src, 0]]);
            assert_eq!(split.y_test[row], y[src]);
        }
    }

    #[test]
    fn test_select_columns() {
        let (x, y) = data(10);
        let split = train_test_split(&x, &y, 0.3, 3).unwrap();
        let reduced = split.select_columns(&[2, 0]).unwrap();
        assert_eq!(reduced.x_train.ncols(), 2);
        assert_eq!(reduced.x_train[[0, 0]], split.x_train[[0, 2]]);
        assert!(split.select_columns(&[5]).is_err());
    }

    #[test]
    fn test_invalid_test_size() {
        let (x, y) = data(10);
        assert!(train_test_split(&x, &y, 0.0, 1).is_err());
        assert!(train_test_split(&x, &y, 1.0, 1).is_err());
    }
}
