//! Data
//!
//! Containers for the training data. Features are stored as `f32` in row-major
//! order, which is the layout every layer of the weak learners consumes.
use crate::errors::GrowNetError;
use std::fmt;

/// Contiguous row-major matrix view.
///
/// This structure borrows a dense matrix of values stored in a single slice.
/// Row `i` occupies `data[i * cols..(i + 1) * cols]`.
///
/// # Type Parameters
/// * `T` - The numeric type of the data (e.g., `f32`, `f64`).
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
}

impl<'a, T> Matrix<'a, T> {
    /// Create a new Matrix.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        assert_eq!(data.len(), rows * cols, "Matrix data length must equal rows * cols");
        Matrix { data, rows, cols }
    }

    /// Get a single reference to an item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[i * self.cols + j]
    }

    /// Get a row of the matrix as a slice.
    pub fn get_row(&self, row: usize) -> &'a [T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }
}

impl<'a, T> fmt::Display for Matrix<'a, T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut val = String::new();
        for i in 0..self.rows {
            for j in 0..self.cols {
                val.push_str(self.get(i, j).to_string().as_str());
                if j == (self.cols - 1) {
                    val.push('\n');
                } else {
                    val.push(' ');
                }
            }
        }
        write!(f, "{}", val)
    }
}

/// Binary classification dataset that owns its contents.
///
/// Labels are always `-1.0` or `1.0`; the dataset adapters map raw labels into
/// this domain when loading.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Vec<f32>,
    labels: Vec<f32>,
    weights: Option<Vec<f32>>,
    feature_dim: usize,
}

impl Dataset {
    /// Create a dataset from row-major features and `{-1, 1}` labels.
    pub fn new(features: Vec<f32>, labels: Vec<f32>, feature_dim: usize) -> Result<Self, GrowNetError> {
        if feature_dim == 0 {
            return Err(GrowNetError::InvalidData("feature_dim must be > 0".to_string()));
        }
        if features.len() != labels.len() * feature_dim {
            return Err(GrowNetError::ShapeMismatch(
                "features".to_string(),
                labels.len() * feature_dim,
                features.len(),
            ));
        }
        if let Some(bad) = labels.iter().find(|y| **y != 1.0 && **y != -1.0) {
            return Err(GrowNetError::InvalidData(format!("labels must be -1 or 1, found {}", bad)));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(GrowNetError::InvalidData("features must be finite".to_string()));
        }
        Ok(Dataset {
            features,
            labels,
            weights: None,
            feature_dim,
        })
    }

    /// Attach per-row sample weights.
    pub fn with_weights(mut self, weights: Vec<f32>) -> Result<Self, GrowNetError> {
        if weights.len() != self.labels.len() {
            return Err(GrowNetError::ShapeMismatch(
                "weights".to_string(),
                self.labels.len(),
                weights.len(),
            ));
        }
        if weights.iter().any(|w| !(w.is_finite() && *w > 0.0)) {
            return Err(GrowNetError::InvalidData("weights must be finite and > 0".to_string()));
        }
        self.weights = Some(weights);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn features(&self) -> &[f32] {
        &self.features
    }

    pub(crate) fn features_mut(&mut self) -> &mut [f32] {
        &mut self.features
    }

    pub fn labels(&self) -> &[f32] {
        &self.labels
    }

    pub fn weights(&self) -> Option<&[f32]> {
        self.weights.as_deref()
    }

    /// View of all features as a matrix.
    pub fn matrix(&self) -> Matrix<'_, f32> {
        Matrix::new(&self.features, self.len(), self.feature_dim)
    }

    pub fn label(&self, i: usize) -> f32 {
        self.labels[i]
    }

    pub fn weight(&self, i: usize) -> f32 {
        self.weights.as_ref().map_or(1.0, |w| w[i])
    }

    /// Sample weights, defaulting to one for every row.
    pub fn weights_or_ones(&self) -> Vec<f64> {
        match &self.weights {
            Some(w) => w.iter().map(|v| *v as f64).collect(),
            None => vec![1.0; self.len()],
        }
    }

    /// Labels mapped from `{-1, 1}` to `{0, 1}`.
    pub fn labels_01(&self) -> Vec<f64> {
        self.labels.iter().map(|y| ((*y + 1.0) / 2.0) as f64).collect()
    }

    /// Number of positive and negative rows.
    pub fn class_counts(&self) -> (usize, usize) {
        let positive = self.labels.iter().filter(|y| **y > 0.0).count();
        (positive, self.len() - positive)
    }

    /// Copy the selected rows into a new dataset.
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        let mut features = Vec::with_capacity(indices.len() * self.feature_dim);
        self.gather(indices, &mut features);
        Dataset {
            features,
            labels: indices.iter().map(|i| self.labels[*i]).collect(),
            weights: self.weights.as_ref().map(|w| indices.iter().map(|i| w[*i]).collect()),
            feature_dim: self.feature_dim,
        }
    }

    /// Fill `buf` with the features of the selected rows, in row-major order.
    pub fn gather(&self, indices: &[usize], buf: &mut Vec<f32>) {
        buf.clear();
        for i in indices {
            let start = i * self.feature_dim;
            buf.extend_from_slice(&self.features[start..start + self.feature_dim]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> Dataset {
        Dataset::new(vec![1., 2., 3., 4., 5., 6.], vec![1., -1., 1.], 2).unwrap()
    }

    #[test]
    fn test_matrix_get() {
        let v = vec![1, 2, 3, 5, 6, 7];
        let m = Matrix::new(&v, 2, 3);
        println!("{}", m);
        assert_eq!(m.get(0, 0), &1);
        assert_eq!(m.get(1, 0), &5);
        assert_eq!(m.get(0, 2), &3);
        assert_eq!(m.get(1, 1), &6);
    }

    #[test]
    fn test_matrix_row() {
        let v = vec![1, 2, 3, 5, 6, 7];
        let m = Matrix::new(&v, 3, 2);
        assert_eq!(m.get_row(0), &[1, 2]);
        assert_eq!(m.get_row(2), &[6, 7]);
    }

    #[test]
    fn test_dataset_rejects_bad_labels() {
        assert!(Dataset::new(vec![0., 0.], vec![0., 1.], 1).is_err());
        assert!(Dataset::new(vec![0., 0., 0.], vec![1., 1.], 1).is_err());
        assert!(Dataset::new(vec![f32::NAN], vec![1.], 1).is_err());
    }

    #[test]
    fn test_dataset_subset_and_gather() {
        let d = toy().with_weights(vec![1., 2., 3.]).unwrap();
        let s = d.subset(&[2, 0]);
        assert_eq!(s.features(), &[5., 6., 1., 2.]);
        assert_eq!(s.labels(), &[1., 1.]);
        assert_eq!(s.weights().unwrap(), &[3., 1.]);

        let mut buf = Vec::new();
        d.gather(&[1], &mut buf);
        assert_eq!(buf, vec![3., 4.]);
    }

    #[test]
    fn test_dataset_counts_and_labels() {
        let d = toy();
        assert_eq!(d.class_counts(), (2, 1));
        assert_eq!(d.labels_01(), vec![1., 0., 1.]);
        assert_eq!(d.weights_or_ones(), vec![1., 1., 1.]);
        assert!(d.clone().with_weights(vec![1., 0., 1.]).is_err());
    }
}
