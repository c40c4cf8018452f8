use crate::booster::core::GrowNetBooster;
use crate::objective::ModelOrder;
use crate::sampler::SampleMethod;
use std::path::PathBuf;

impl GrowNetBooster {
    // Set methods for paramters

    /// Set the number of input features.
    /// * `feature_dim` - Number of feature columns of every dataset passed to `fit`.
    pub fn set_feature_dim(mut self, feature_dim: usize) -> Self {
        self.cfg.feature_dim = feature_dim;
        self
    }

    /// Set the hidden layer width of the weak learners.
    pub fn set_hidden_dim(mut self, hidden_dim: usize) -> Self {
        self.cfg.hidden_dim = hidden_dim;
        self
    }

    /// Set the initial boost rate.
    /// * `boost_rate` - Scale of each learner's output, trained further by the corrective step.
    pub fn set_boost_rate(mut self, boost_rate: f32) -> Self {
        self.cfg.boost_rate = boost_rate;
        self
    }

    /// Set the learning rate.
    pub fn set_lr(mut self, lr: f32) -> Self {
        self.cfg.lr = lr;
        self
    }

    /// Set the number of boosting stages.
    pub fn set_num_nets(mut self, num_nets: usize) -> Self {
        self.cfg.num_nets = num_nets;
        self
    }

    pub fn set_batch_size(mut self, batch_size: usize) -> Self {
        self.cfg.batch_size = batch_size;
        self
    }

    pub fn set_epochs_per_stage(mut self, epochs_per_stage: usize) -> Self {
        self.cfg.epochs_per_stage = epochs_per_stage;
        self
    }

    /// Set the number of fully-corrective epochs per stage.
    pub fn set_correct_epoch(mut self, correct_epoch: usize) -> Self {
        self.cfg.correct_epoch = correct_epoch;
        self
    }

    /// Set the L2 weight decay.
    pub fn set_l2(mut self, l2: f32) -> Self {
        self.cfg.l2 = l2;
        self
    }

    /// Set the gradient direction the learners are fit to.
    /// * `model_order` - `ModelOrder::First` or `ModelOrder::Second`.
    pub fn set_model_order(mut self, model_order: ModelOrder) -> Self {
        self.cfg.model_order = model_order;
        self
    }

    pub fn set_normalization(mut self, normalization: bool) -> Self {
        self.cfg.normalization = normalization;
        self
    }

    /// Hold out a validation split in `prepare`.
    pub fn set_cv(mut self, cv: bool) -> Self {
        self.cfg.cv = cv;
        self
    }

    pub fn set_corrective_lr_scaler(mut self, corrective_lr_scaler: f32) -> Self {
        self.cfg.corrective_lr_scaler = corrective_lr_scaler;
        self
    }

    /// Set how often the learning rate is halved, `None` to keep it constant.
    pub fn set_lr_halving_interval(mut self, lr_halving_interval: Option<usize>) -> Self {
        self.cfg.lr_halving_interval = lr_halving_interval;
        self
    }

    /// Set the training row sampling method.
    /// * `sample_method` - Rows kept for the whole run.
    pub fn set_sample_method(mut self, sample_method: SampleMethod) -> Self {
        self.cfg.sample_method = sample_method;
        self
    }

    pub fn set_drop_last(mut self, drop_last: bool) -> Self {
        self.cfg.drop_last = drop_last;
        self
    }

    /// Set the seed for the booster.
    /// * `seed` - Integer value used to seed any randomness used in the algorithm.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.cfg.seed = seed;
        self
    }

    /// Set the number of threads on the booster.
    /// * `num_threads` - Set the number of threads to be used during training.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.cfg.num_threads = num_threads;
        self
    }

    /// Set the log iterations on the booster.
    /// * `log_iterations` - The number of stages between progress logs, zero for none.
    pub fn set_log_iterations(mut self, log_iterations: usize) -> Self {
        self.cfg.log_iterations = log_iterations;
        self
    }

    /// Write the ensemble to `checkpoint_path` after every stage.
    pub fn set_checkpoint_path(mut self, checkpoint_path: Option<PathBuf>) -> Self {
        self.cfg.checkpoint_path = checkpoint_path;
        self
    }
}
