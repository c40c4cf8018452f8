pub const LEAKY_RELU_SLOPE: f32 = 0.1;
pub const BATCH_NORM_EPS: f32 = 1e-5;
pub const BATCH_NORM_MOMENTUM: f32 = 0.1;
pub const ADAM_BETA1: f32 = 0.9;
pub const ADAM_BETA2: f32 = 0.999;
pub const ADAM_EPS: f32 = 1e-8;
pub const CORRECTIVE_LR_SCALER: f32 = 3.0;
pub const LR_HALVING_INTERVAL: usize = 15;
pub const VALIDATION_TRAIN_FRACTION: f64 = 0.95;
