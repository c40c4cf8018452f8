//! Booster Configuration
//!
//! Hyperparameters of the boosting loop, and the json persistence shared by
//! every serializable artifact (`BoosterIO`).
use crate::constants::{CORRECTIVE_LR_SCALER, LR_HALVING_INTERVAL};
use crate::errors::GrowNetError;
use crate::objective::ModelOrder;
use crate::sampler::SampleMethod;
use crate::utils::{validate_float_parameter, validate_positive_float_parameter, validate_positive_usize_parameter};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_corrective_lr_scaler() -> f32 {
    CORRECTIVE_LR_SCALER
}
fn default_lr_halving_interval() -> Option<usize> {
    Some(LR_HALVING_INTERVAL)
}
fn default_sample_method() -> SampleMethod {
    SampleMethod::None
}
fn default_log_iterations() -> usize {
    1
}

/// Configuration for the `GrowNetBooster`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoosterConfig {
    /// Number of input features.
    pub feature_dim: usize,
    /// Width of both hidden layers of every weak learner.
    pub hidden_dim: usize,
    /// Initial boost rate.
    pub boost_rate: f32,
    /// Learning rate for fitting a new learner. Also the base of the corrective step rate.
    pub lr: f32,
    /// Number of boosting stages.
    pub num_nets: usize,
    /// Mini-batch size.
    pub batch_size: usize,
    /// Epochs spent fitting each new learner.
    pub epochs_per_stage: usize,
    /// Epochs of the fully-corrective step.
    pub correct_epoch: usize,
    /// L2 weight decay of both optimizers.
    pub l2: f32,
    /// Gradient direction the learners are fit to.
    #[serde(default)]
    pub model_order: ModelOrder,
    /// Min-max scale features with statistics of the training rows.
    #[serde(default)]
    pub normalization: bool,
    /// Hold out 5% of the training rows for model selection.
    #[serde(default)]
    pub cv: bool,
    /// Corrective step learning rate is `lr / corrective_lr_scaler`.
    #[serde(default = "default_corrective_lr_scaler")]
    pub corrective_lr_scaler: f32,
    /// Halve `lr` at every stage divisible by this interval.
    #[serde(default = "default_lr_halving_interval")]
    pub lr_halving_interval: Option<usize>,
    /// Training rows used by the whole run, drawn once before the first stage.
    #[serde(default = "default_sample_method")]
    pub sample_method: SampleMethod,
    /// Drop the last incomplete training batch of every epoch.
    #[serde(default)]
    pub drop_last: bool,
    /// Seed for random number generation.
    pub seed: u64,
    /// Number of threads for parallel tasks.
    pub num_threads: Option<usize>,
    /// Logging frequency (every N stages), zero to stay quiet.
    #[serde(default = "default_log_iterations")]
    pub log_iterations: usize,
    /// Where to write the ensemble after every stage.
    #[serde(default)]
    pub checkpoint_path: Option<PathBuf>,
}

// Default booster base configuration
impl Default for BoosterConfig {
    fn default() -> Self {
        BoosterConfig {
            feature_dim: 1,
            hidden_dim: 16,
            boost_rate: 1.0,
            lr: 0.005,
            num_nets: 40,
            batch_size: 2048,
            epochs_per_stage: 1,
            correct_epoch: 1,
            l2: 0.001,
            model_order: ModelOrder::Second,
            normalization: false,
            cv: false,
            corrective_lr_scaler: CORRECTIVE_LR_SCALER,
            lr_halving_interval: Some(LR_HALVING_INTERVAL),
            sample_method: SampleMethod::None,
            drop_last: false,
            seed: 0,
            num_threads: None,
            log_iterations: 1,
            checkpoint_path: None,
        }
    }
}

impl BoosterConfig {
    /// Whether `lr` is halved before the corrective step of `stage`.
    pub fn halves_lr_at(&self, stage: usize) -> bool {
        stage != 0 && self.lr_halving_interval.is_some_and(|i| stage % i == 0)
    }

    pub fn validate(&self) -> Result<(), GrowNetError> {
        validate_positive_usize_parameter(self.feature_dim, "feature_dim")?;
        validate_positive_usize_parameter(self.hidden_dim, "hidden_dim")?;
        validate_positive_usize_parameter(self.num_nets, "num_nets")?;
        validate_positive_usize_parameter(self.batch_size, "batch_size")?;
        validate_float_parameter(self.boost_rate as f64, f64::MIN, f64::MAX, "boost_rate")?;
        validate_positive_float_parameter(self.lr as f64, "lr")?;
        validate_float_parameter(self.l2 as f64, 0.0, f64::MAX, "l2")?;
        validate_positive_float_parameter(self.corrective_lr_scaler as f64, "corrective_lr_scaler")?;
        if let Some(interval) = self.lr_halving_interval {
            validate_positive_usize_parameter(interval, "lr_halving_interval")?;
        }
        match self.sample_method {
            SampleMethod::Random(fraction) => {
                validate_float_parameter(fraction as f64, f64::MIN_POSITIVE, 1.0, "sample_method")?
            }
            SampleMethod::FixedSize(size) => validate_positive_usize_parameter(size, "sample_method")?,
            SampleMethod::None => {}
        }
        if let Some(n) = self.num_threads {
            validate_positive_usize_parameter(n, "num_threads")?;
        }
        Ok(())
    }
}

/// IO
pub trait BoosterIO: Serialize + DeserializeOwned + Sized {
    /// Save a booster as a json object to a file.
    ///
    /// * `path` - Path to save booster.
    fn save_booster<P: AsRef<Path>>(&self, path: P) -> Result<(), GrowNetError> {
        fs::write(path, self.json_dump()?).map_err(|e| GrowNetError::UnableToWrite(e.to_string()))
    }

    /// Dump a booster as a json object
    fn json_dump(&self) -> Result<String, GrowNetError> {
        serde_json::to_string(self).map_err(|e| GrowNetError::UnableToWrite(e.to_string()))
    }

    /// Load a booster from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, GrowNetError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| GrowNetError::UnableToRead(e.to_string()))
    }

    /// Load a booster from a path to a json booster object.
    ///
    /// * `path` - Path to load booster from.
    fn load_booster<P: AsRef<Path>>(path: P) -> Result<Self, GrowNetError> {
        let json_str = fs::read_to_string(path).map_err(|e| GrowNetError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl BoosterIO for BoosterConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_booster_config_default() {
        let config = BoosterConfig::default();
        assert_eq!(config.corrective_lr_scaler, 3.0);
        assert_eq!(config.lr_halving_interval, Some(15));
        assert_eq!(config.model_order, ModelOrder::Second);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_halves_lr_at() {
        let config = BoosterConfig::default();
        assert!(!config.halves_lr_at(0));
        assert!(!config.halves_lr_at(14));
        assert!(config.halves_lr_at(15));
        assert!(config.halves_lr_at(30));
        let config = BoosterConfig {
            lr_halving_interval: None,
            ..Default::default()
        };
        assert!(!config.halves_lr_at(15));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = BoosterConfig::default();
        config.lr = 0.0;
        assert!(config.validate().is_err());
        let mut config = BoosterConfig::default();
        config.sample_method = SampleMethod::Random(1.5);
        assert!(config.validate().is_err());
        let mut config = BoosterConfig::default();
        config.lr_halving_interval = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_booster_io_json() {
        let config = BoosterConfig {
            hidden_dim: 32,
            sample_method: SampleMethod::FixedSize(100),
            ..Default::default()
        };
        let json = config.json_dump().unwrap();
        let config2 = BoosterConfig::from_json(&json).unwrap();
        assert_eq!(config.hidden_dim, config2.hidden_dim);
        assert_eq!(config2.sample_method, SampleMethod::FixedSize(100));
    }

    #[test]
    fn test_booster_io_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let config = BoosterConfig::default();
        config.save_booster(&file_path).unwrap();
        let config2 = BoosterConfig::load_booster(&file_path).unwrap();
        assert_eq!(config.lr, config2.lr);
        assert_eq!(config.batch_size, config2.batch_size);
    }

    #[test]
    fn test_parse_minimal() {
        let json = r#"{"feature_dim": 123, "hidden_dim": 16, "boost_rate": 1.0, "lr": 0.005, "num_nets": 40,
            "batch_size": 2048, "epochs_per_stage": 1, "correct_epoch": 1, "l2": 0.001, "seed": 0,
            "num_threads": null}"#;
        let config: BoosterConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.feature_dim, 123);
        assert_eq!(config.corrective_lr_scaler, 3.0);
        assert_eq!(config.sample_method, SampleMethod::None);
        assert_eq!(config.log_iterations, 1);
        assert!(config.checkpoint_path.is_none());
    }
}
