use crate::errors::GrowNetError;
use std::convert::TryInto;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    let mut s = String::new();
    for i in items {
        s.push_str(i);
        s.push_str(&String::from(", "));
    }
    s
}

// Validation
pub fn validate_positive_float_parameter(value: f64, parameter: &str) -> Result<(), GrowNetError> {
    validate_float_parameter(value, f64::MIN_POSITIVE, f64::INFINITY, parameter)
}
pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), GrowNetError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(GrowNetError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}
pub fn validate_positive_usize_parameter(value: usize, parameter: &str) -> Result<(), GrowNetError> {
    if value == 0 {
        Err(GrowNetError::InvalidParameter(
            parameter.to_string(),
            "a value > 0".to_string(),
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Convert Log odds to probability
#[inline]
pub fn odds(v: f64) -> f64 {
    1. / (1. + (-v).exp())
}

/// Numerically stable logistic function in single precision.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

const LANES: usize = 16;

/// Fast summation, but using f64 as the internal representation so that
/// we don't have issues with the precision.
/// This way, we can still work with f32 values, but get the correct sum
/// value.
#[inline]
pub fn fast_f64_sum(values: &[f32]) -> f64 {
    let chunks = values.chunks_exact(LANES);
    let remainder = chunks.remainder();

    let sum = chunks.fold([0f64; LANES], |mut acc, chunk| {
        let chunk: [f32; LANES] = chunk.try_into().unwrap();
        for i in 0..LANES {
            acc[i] += f64::from(chunk[i]);
        }
        acc
    });

    let remainder: f64 = remainder.iter().fold(0f64, |acc, b| acc + f64::from(*b));

    let mut reduced: f64 = 0.;
    for s in sum.iter().take(LANES) {
        reduced += *s;
    }
    reduced + remainder
}

#[inline]
pub fn precision_round(n: f64, precision: i32) -> f64 {
    let p = (10.0_f64).powi(precision);
    (n * p).round() / p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round() {
        assert_eq!(0.3, precision_round(0.3333, 1));
        assert_eq!(0.2343, precision_round(0.2343123123123, 4));
    }

    #[test]
    fn test_fast_f64_sum() {
        let v: Vec<f32> = (0..100).map(|i| i as f32 * 0.5).collect();
        assert_eq!(fast_f64_sum(&v), 2475.0);
    }

    #[test]
    fn test_sigmoid_matches_odds() {
        for x in [-30.0f32, -2.0, 0.0, 0.5, 30.0] {
            assert!((sigmoid(x) as f64 - odds(x as f64)).abs() < 1e-6);
        }
        assert_eq!(sigmoid(0.0), 0.5);
    }

    #[test]
    fn test_validate_parameters() {
        assert!(validate_positive_float_parameter(0.1, "lr").is_ok());
        assert!(validate_positive_float_parameter(0.0, "lr").is_err());
        assert!(validate_positive_float_parameter(f64::NAN, "lr").is_err());
        assert!(validate_float_parameter(0.0, 0.0, 1.0, "l2").is_ok());
        assert!(validate_positive_usize_parameter(0, "batch_size").is_err());
        assert_eq!(items_to_strings(vec!["a", "b"]), "a, b, ");
    }
}
