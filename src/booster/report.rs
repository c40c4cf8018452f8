//! Training Report
//!
//! Per-stage losses, scores and timings collected by `GrowNetBooster::fit`.
use crate::booster::config::{BoosterConfig, BoosterIO};
use crate::errors::GrowNetError;
use crate::metric::is_comparison_better;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;

/// json has no NaN, serde_json writes it as null.
fn parse_nan<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Deserialize::deserialize(d).map(|x: Option<_>| x.unwrap_or(f64::NAN))
}

/// What happened in one boosting stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageRecord {
    pub stage: usize,
    /// Base learning rate after this stage's halving. The corrective step
    /// ran at `lr / corrective_lr_scaler`.
    pub lr: f32,
    /// Mean corrective step loss, zero for stage 0.
    #[serde(deserialize_with = "parse_nan")]
    pub train_loss: f64,
    /// Mean squared stage loss of the new learner.
    #[serde(deserialize_with = "parse_nan")]
    pub model_loss: f64,
    /// Log loss of the ensemble on the training rows, in eval mode.
    #[serde(deserialize_with = "parse_nan")]
    pub train_log_loss: f64,
    /// Log loss of the ensemble on the test set.
    #[serde(deserialize_with = "parse_nan")]
    pub test_loss: f64,
    #[serde(deserialize_with = "parse_nan")]
    pub train_accuracy: f64,
    #[serde(deserialize_with = "parse_nan")]
    pub test_accuracy: f64,
    pub boost_rate: f32,
    /// Validation AUC, `None` without a validation set.
    pub val_auc: Option<f64>,
    #[serde(deserialize_with = "parse_nan")]
    pub test_auc: f64,
    pub train_secs: f64,
    pub test_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub config: BoosterConfig,
    pub stages: Vec<StageRecord>,
    /// Stage with the highest validation AUC, the last stage without a validation set.
    pub best_stage: usize,
    pub best_val_auc: Option<f64>,
    #[serde(deserialize_with = "parse_nan")]
    pub best_test_auc: f64,
}

impl TrainingReport {
    pub fn new(config: BoosterConfig) -> Self {
        TrainingReport {
            config,
            stages: Vec::new(),
            best_stage: 0,
            best_val_auc: None,
            best_test_auc: f64::NAN,
        }
    }

    /// Record a stage and move the best stage to it when its validation AUC
    /// improves on the best so far. NaN scores never win.
    pub fn push(&mut self, record: StageRecord) {
        match (record.val_auc, self.best_val_auc) {
            (Some(auc), best) if is_comparison_better(best.unwrap_or(f64::NAN), auc, true) => {
                self.best_stage = record.stage;
                self.best_val_auc = Some(auc);
            }
            // Until some stage has a usable validation score, the latest stage is the best.
            (_, None) => self.best_stage = record.stage,
            _ => {}
        }
        self.stages.push(record);
        self.best_test_auc = self.stages[self.best_stage].test_auc;
    }

    pub fn training_losses(&self) -> Vec<f64> {
        self.stages.iter().map(|s| s.train_loss).collect()
    }

    pub fn test_losses(&self) -> Vec<f64> {
        self.stages.iter().map(|s| s.test_loss).collect()
    }

    pub fn boost_rates(&self) -> Vec<f32> {
        self.stages.iter().map(|s| s.boost_rate).collect()
    }

    /// Human readable json, written to `path`.
    pub fn save_report<P: AsRef<Path>>(&self, path: P) -> Result<(), GrowNetError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| GrowNetError::UnableToWrite(e.to_string()))?;
        fs::write(path, json).map_err(|e| GrowNetError::UnableToWrite(e.to_string()))
    }
}

impl BoosterIO for TrainingReport {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(stage: usize, val_auc: Option<f64>, test_auc: f64) -> StageRecord {
        StageRecord {
            stage,
            lr: 0.005,
            train_loss: 0.5,
            model_loss: 0.1,
            train_log_loss: 0.55,
            test_loss: 0.6,
            train_accuracy: 0.8,
            test_accuracy: 0.75,
            boost_rate: 1.0,
            val_auc,
            test_auc,
            train_secs: 0.0,
            test_secs: 0.0,
        }
    }

    #[test]
    fn test_best_stage_follows_validation() {
        let mut report = TrainingReport::new(BoosterConfig::default());
        report.push(record(0, Some(0.7), 0.71));
        report.push(record(1, Some(0.8), 0.79));
        report.push(record(2, Some(0.75), 0.82));
        assert_eq!(report.best_stage, 1);
        assert_eq!(report.best_val_auc, Some(0.8));
        assert_eq!(report.best_test_auc, 0.79);
    }

    #[test]
    fn test_nan_validation_auc_is_ignored() {
        let mut report = TrainingReport::new(BoosterConfig::default());
        report.push(record(0, Some(0.7), 0.71));
        report.push(record(1, Some(f64::NAN), 0.9));
        assert_eq!(report.best_stage, 0);
    }

    #[test]
    fn test_best_stage_is_last_without_validation() {
        let mut report = TrainingReport::new(BoosterConfig::default());
        report.push(record(0, None, 0.6));
        report.push(record(1, None, 0.65));
        assert_eq!(report.best_stage, 1);
        assert_eq!(report.best_test_auc, 0.65);
        assert_eq!(report.boost_rates(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_save_and_load_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut report = TrainingReport::new(BoosterConfig::default());
        report.push(record(0, Some(0.7), 0.71));
        report.save_report(&path).unwrap();
        let loaded = TrainingReport::load_booster(&path).unwrap();
        assert_eq!(loaded.stages, report.stages);
        assert_eq!(loaded.best_stage, 0);
    }

    #[test]
    fn test_nan_scores_survive_json() {
        let mut report = TrainingReport::new(BoosterConfig::default());
        report.push(record(0, None, f64::NAN));
        let loaded = TrainingReport::from_json(&report.json_dump().unwrap()).unwrap();
        assert!(loaded.stages[0].test_auc.is_nan());
        assert!(loaded.best_test_auc.is_nan());
    }
}
