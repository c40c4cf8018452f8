//! Errors
//!
//! Custom error types used throughout the `grownet` crate.
use thiserror::Error;

/// Errors that can occur while loading data or training the ensemble.
#[derive(Debug, Error)]
pub enum GrowNetError {
    /// Unable to write model or report to file.
    #[error("Unable to write to file: {0}")]
    UnableToWrite(String),
    /// Unable to read model or data from file.
    #[error("Unable to read from file {0}")]
    UnableToRead(String),
    /// A data file could not be parsed.
    #[error("Unable to parse line {0} of {1}: {2}")]
    ParseData(usize, String, String),
    /// Data does not satisfy the expected contract.
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// Shapes of two inputs disagree.
    #[error("Shape mismatch for {0}, expected {1} but {2} provided.")]
    ShapeMismatch(String, usize, usize),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// The rayon thread pool could not be created.
    #[error("Unable to build thread pool: {0}")]
    ThreadPool(String),
}
