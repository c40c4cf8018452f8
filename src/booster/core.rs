use crate::booster::config::{BoosterConfig, BoosterIO};
use crate::booster::report::{StageRecord, TrainingReport};
use crate::constants::VALIDATION_TRAIN_FRACTION;
use crate::data::{Dataset, Matrix};
use crate::ensemble::DynamicNet;
use crate::errors::GrowNetError;
use crate::learner::WeakLearner;
use crate::loader::BatchLoader;
use crate::metric::{accuracy, log_loss, roc_auc_score};
use crate::nn::{Adam, Parameterized};
use crate::objective::{grad_direction, stage_loss, LogLoss};
use crate::sampler::train_validation_split;
use crate::scaler::MinMaxScaler;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Gradient boosted ensemble of neural networks.
#[derive(Clone, Serialize, Deserialize)]
pub struct GrowNetBooster {
    pub cfg: BoosterConfig,
    pub ensemble: DynamicNet,
    /// Scaler fitted by `prepare` when `normalization` is set.
    pub scaler: Option<MinMaxScaler>,
}

impl Default for GrowNetBooster {
    fn default() -> Self {
        let cfg = BoosterConfig::default();
        GrowNetBooster {
            ensemble: DynamicNet::new(0.0, cfg.boost_rate),
            cfg,
            scaler: None,
        }
    }
}

impl GrowNetBooster {
    pub fn new(cfg: BoosterConfig) -> Result<Self, GrowNetError> {
        cfg.validate()?;
        Ok(GrowNetBooster {
            ensemble: DynamicNet::new(0.0, cfg.boost_rate),
            cfg,
            scaler: None,
        })
    }

    /// Split off the validation rows and scale features, as configured.
    ///
    /// With `cv` set, 5% of the shuffled training rows become the validation
    /// set. With `normalization` set, a min-max scaler is fitted on the
    /// remaining training rows, applied to every split and kept on the booster.
    ///
    /// Returns `(train, test, validation)`.
    pub fn prepare(
        &mut self,
        train: Dataset,
        mut test: Dataset,
    ) -> Result<(Dataset, Dataset, Option<Dataset>), GrowNetError> {
        let mut rng = StdRng::seed_from_u64(self.cfg.seed);
        let (mut train, mut validation) = if self.cfg.cv {
            info!("Creating validation set.");
            let (train_idx, val_idx) = train_validation_split(train.len(), VALIDATION_TRAIN_FRACTION, &mut rng);
            (train.subset(&train_idx), Some(train.subset(&val_idx)))
        } else {
            (train, None)
        };

        if self.cfg.normalization {
            let scaler = MinMaxScaler::fit(&train)?;
            scaler.transform(&mut train)?;
            scaler.transform(&mut test)?;
            if let Some(validation) = validation.as_mut() {
                scaler.transform(validation)?;
            }
            self.scaler = Some(scaler);
        }

        info!(
            "#Train: {}, #Val: {}, #Test: {}",
            train.len(),
            validation.as_ref().map_or(0, |v| v.len()),
            test.len()
        );
        Ok((train, test, validation))
    }

    /// Fit the ensemble, replacing any previous one.
    ///
    /// * `train` - Rows the learners are fit on.
    /// * `test` - Rows scored after every stage.
    /// * `validation` - Optional rows used to pick the best stage.
    pub fn fit(
        &mut self,
        train: &Dataset,
        test: &Dataset,
        validation: Option<&Dataset>,
    ) -> Result<TrainingReport, GrowNetError> {
        self.cfg.validate()?;
        let expected = self.cfg.feature_dim;
        let mut splits = vec![("train", train), ("test", test)];
        if let Some(v) = validation {
            splits.push(("validation", v));
        }
        for (name, data) in splits {
            if data.feature_dim() != expected {
                return Err(GrowNetError::ShapeMismatch(
                    format!("{} feature_dim", name),
                    expected,
                    data.feature_dim(),
                ));
            }
            if data.is_empty() {
                return Err(GrowNetError::InvalidData(format!("{} set is empty", name)));
            }
        }

        let num_threads = match self.cfg.num_threads {
            Some(num_threads) => num_threads,
            None => std::thread::available_parallelism().map_or(1, |n| n.get()),
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| GrowNetError::ThreadPool(e.to_string()))?;

        pool.install(|| self.fit_stages(train, test, validation))
    }

    fn fit_stages(
        &mut self,
        train: &Dataset,
        test: &Dataset,
        validation: Option<&Dataset>,
    ) -> Result<TrainingReport, GrowNetError> {
        let start = Instant::now();
        let cfg = self.cfg.clone();
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        let c0 = LogLoss::calc_init(train)?;
        let (positive, negative) = train.class_counts();
        info!(
            "Blind accuracy: {:.4}",
            positive.max(negative) as f64 / (positive + negative) as f64
        );
        self.ensemble = DynamicNet::new(c0 as f32, cfg.boost_rate);

        let all_rows: Vec<usize> = (0..train.len()).collect();
        let train_index = match cfg.sample_method.sampler() {
            Some(mut sampler) => sampler.sample(&mut rng, &all_rows).0,
            None => all_rows,
        };
        let loader = BatchLoader::new(cfg.batch_size, true, cfg.drop_last);
        if loader.n_batches(train_index.len()) == 0 {
            return Err(GrowNetError::InvalidData(format!(
                "{} training rows do not fill a single batch of {}",
                train_index.len(),
                cfg.batch_size
            )));
        }

        let mut report = TrainingReport::new(cfg.clone());
        let mut lr = cfg.lr;
        let train_y = train.labels_01();
        let train_w = train.weights_or_ones();
        let mut x = Vec::with_capacity(cfg.batch_size * cfg.feature_dim);

        for stage in 0..cfg.num_nets {
            let t0 = Instant::now();

            // Fit the new learner to the gradient direction of the current ensemble.
            let mut model = WeakLearner::new(stage, cfg.feature_dim, cfg.hidden_dim, &mut rng);
            let mut optimizer = Adam::new(lr, cfg.l2)?;
            self.ensemble.to_train();
            let mut model_losses = Vec::new();
            for _ in 0..cfg.epochs_per_stage {
                for batch in loader.batches(&train_index, &mut rng) {
                    let rows = batch.len();
                    train.gather(&batch, &mut x);
                    let y: Vec<f32> = batch.iter().map(|i| train.label(*i)).collect();
                    let (middle, out) = self.ensemble.forward(&x, rows);
                    let target = grad_direction(&y, &out, cfg.model_order);
                    let (output, cache) = model.forward_cached(&x, middle.as_deref(), rows);
                    let (loss, d_out) = stage_loss(self.ensemble.boost_rate(), &output.out, &target);
                    model.zero_grad();
                    model.backward(&cache, None, &d_out);
                    optimizer.step(&mut model);
                    model_losses.push(loss);
                }
            }
            self.ensemble.add(model);
            let model_loss = mean_f64(&model_losses);
            if !model_loss.is_finite() {
                warn!("Stage {} learner loss is not finite, consider lowering lr.", stage);
            }

            // Fully-corrective step over every learner and the boost rate.
            let mut corrective_losses = Vec::new();
            if stage != 0 {
                if cfg.halves_lr_at(stage) {
                    lr /= 2.0;
                }
                let mut optimizer = Adam::new(lr / cfg.corrective_lr_scaler, cfg.l2)?;
                for _ in 0..cfg.correct_epoch {
                    for batch in loader.batches(&train_index, &mut rng) {
                        let rows = batch.len();
                        train.gather(&batch, &mut x);
                        let t: Vec<f32> = batch.iter().map(|i| (train.label(*i) + 1.0) / 2.0).collect();
                        let w: Option<Vec<f32>> = train
                            .weights()
                            .map(|w| batch.iter().map(|i| w[*i]).collect());
                        let (out, cache) = self.ensemble.forward_grad(&x, rows);
                        let (loss, d_out) = LogLoss::calc_loss_grad(&t, &out, w.as_deref());
                        self.ensemble.zero_grad();
                        self.ensemble.backward(&cache, &d_out);
                        optimizer.step(&mut self.ensemble);
                        corrective_losses.push(loss);
                    }
                }
            }
            let train_loss = mean_f64(&corrective_losses);
            let train_secs = t0.elapsed().as_secs_f64();

            self.ensemble.to_eval();
            let test_scores = self.ensemble.predict(&test.matrix(), true);
            let test_y = test.labels_01();
            let test_w = test.weights_or_ones();
            let test_loss = log_loss(&test_y, &test_scores, &test_w);
            let train_scores = self.ensemble.predict(&train.matrix(), true);
            let train_log_loss = log_loss(&train_y, &train_scores, &train_w);
            let train_accuracy = accuracy(&train_y, &train_scores, &train_w);
            let test_accuracy = accuracy(&test_y, &test_scores, &test_w);
            let boost_rate = self.ensemble.boost_rate();
            if let Some(path) = &cfg.checkpoint_path {
                self.ensemble.save_ensemble(path)?;
            }

            let val_auc = validation.map(|v| {
                let scores = self.ensemble.predict(&v.matrix(), true);
                roc_auc_score(&v.labels_01(), &scores, &v.weights_or_ones())
            });
            let test_auc = roc_auc_score(&test_y, &test_scores, &test_w);
            let test_secs = t0.elapsed().as_secs_f64() - train_secs;

            if cfg.log_iterations > 0 && stage % cfg.log_iterations == 0 {
                info!(
                    "Stage - {}, training time: {:.1} sec, boost rate: {:.4}, Training Loss: {:.4}, Test Loss: {:.4}",
                    stage, train_secs, boost_rate, train_loss, test_loss
                );
                info!(
                    "Stage: {}, test time: {:.1}, AUC@Val: {:.4}, AUC@Test: {:.4}",
                    stage,
                    test_secs,
                    val_auc.unwrap_or(0.0),
                    test_auc
                );
                info!(
                    "Logloss@Tr: {:.8}, Logloss@Te: {:.8}, Acc@Tr: {:.4}, Acc@Te: {:.4}",
                    train_log_loss, test_loss, train_accuracy, test_accuracy
                );
            }

            report.push(StageRecord {
                stage,
                lr,
                train_loss,
                model_loss,
                train_log_loss,
                test_loss,
                train_accuracy,
                test_accuracy,
                boost_rate,
                val_auc,
                test_auc,
                train_secs,
                test_secs,
            });
        }

        info!(
            "Best validation stage: {}, AUC@Val: {:.4}, final AUC@Test: {:.4}",
            report.best_stage,
            report.best_val_auc.unwrap_or(0.0),
            report.best_test_auc
        );
        if cfg.log_iterations > 0 {
            info!(
                "Finished training an ensemble with {0} learners in {1} seconds.",
                self.ensemble.len(),
                start.elapsed().as_secs()
            );
        }
        let num_params = self.ensemble.num_params();
        self.ensemble
            .insert_metadata("num_params".to_string(), num_params.to_string());

        Ok(report)
    }

    /// Raw scores (log-odds) for already prepared features.
    pub fn predict(&self, data: &Matrix<f32>, parallel: bool) -> Vec<f64> {
        self.ensemble.predict(data, parallel)
    }

    /// Positive class probabilities for already prepared features.
    pub fn predict_proba(&self, data: &Matrix<f32>, parallel: bool) -> Vec<f64> {
        self.ensemble.predict_proba(data, parallel)
    }

    pub fn ensemble(&self) -> &DynamicNet {
        &self.ensemble
    }
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl BoosterIO for GrowNetBooster {}
