//! Scaler
//!
//! Per-feature min-max scaling fitted on the training data and applied to every
//! split, so that all learners see features in `[0, 1]`.
use crate::data::Dataset;
use crate::errors::GrowNetError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub data_min: Vec<f32>,
    pub data_max: Vec<f32>,
}

impl MinMaxScaler {
    /// Compute column minima and maxima of `data`.
    pub fn fit(data: &Dataset) -> Result<Self, GrowNetError> {
        if data.is_empty() {
            return Err(GrowNetError::InvalidData("cannot fit a scaler on an empty dataset".to_string()));
        }
        let cols = data.feature_dim();
        let mut data_min = vec![f32::INFINITY; cols];
        let mut data_max = vec![f32::NEG_INFINITY; cols];
        for row in data.features().chunks_exact(cols) {
            for (j, v) in row.iter().enumerate() {
                data_min[j] = data_min[j].min(*v);
                data_max[j] = data_max[j].max(*v);
            }
        }
        Ok(MinMaxScaler { data_min, data_max })
    }

    /// Scale `data` in place. Constant columns are only shifted.
    pub fn transform(&self, data: &mut Dataset) -> Result<(), GrowNetError> {
        let cols = data.feature_dim();
        if cols != self.data_min.len() {
            return Err(GrowNetError::ShapeMismatch(
                "scaler feature_dim".to_string(),
                self.data_min.len(),
                cols,
            ));
        }
        let scale: Vec<f32> = self
            .data_min
            .iter()
            .zip(&self.data_max)
            .map(|(lo, hi)| {
                let range = hi - lo;
                if range == 0.0 {
                    1.0
                } else {
                    1.0 / range
                }
            })
            .collect();
        for row in data.features_mut().chunks_exact_mut(cols) {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (*v - self.data_min[j]) * scale[j];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_scaler() {
        let train = Dataset::new(vec![0., 5., 2., 5., 4., 5.], vec![1., -1., 1.], 2).unwrap();
        let scaler = MinMaxScaler::fit(&train).unwrap();
        assert_eq!(scaler.data_min, vec![0., 5.]);
        assert_eq!(scaler.data_max, vec![4., 5.]);

        let mut test = Dataset::new(vec![2., 5., 8., 7.], vec![1., -1.], 2).unwrap();
        scaler.transform(&mut test).unwrap();
        assert_eq!(test.features(), &[0.5, 0., 2., 2.]);
    }

    #[test]
    fn test_scaler_shape_mismatch() {
        let train = Dataset::new(vec![0., 1.], vec![1., -1.], 1).unwrap();
        let scaler = MinMaxScaler::fit(&train).unwrap();
        let mut other = Dataset::new(vec![0., 1.], vec![1.], 2).unwrap();
        assert!(scaler.transform(&mut other).is_err());
    }
}
