//! GrowNet
//!
//! Gradient boosting with shallow neural networks as weak learners, for binary
//! classification. Every boosting stage fits a new two-hidden-layer network to
//! the gradient direction of the current ensemble, adds it scaled by a trainable
//! boost rate, and then fine-tunes the whole ensemble in a fully-corrective step.
//!
//! ```no_run
//! use grownet::datasets::{load_dataset, DatasetPreset};
//! use grownet::GrowNetBooster;
//!
//! let preset: DatasetPreset = "a9a".parse().unwrap();
//! let format = preset.format().unwrap();
//! let label_map = preset.label_map();
//! let train = load_dataset("a9a.train", format, 123, &label_map, Default::default()).unwrap();
//! let test = load_dataset("a9a.test", format, 123, &label_map, Default::default()).unwrap();
//!
//! let mut model = GrowNetBooster::default()
//!     .set_feature_dim(123)
//!     .set_hidden_dim(16)
//!     .set_num_nets(40);
//! let report = model.fit(&train, &test, None).unwrap();
//! println!("AUC@Test: {:.4}", report.best_test_auc);
//! ```

mod constants;

// Modules
pub mod booster;
pub mod data;
pub mod datasets;
pub mod ensemble;
pub mod errors;
pub mod learner;
pub mod loader;
pub mod metric;
pub mod nn;
pub mod objective;
pub mod sampler;
pub mod scaler;
pub mod utils;

// Individual classes, and functions
pub use booster::GrowNetBooster;
pub use data::{Dataset, Matrix};
pub use ensemble::DynamicNet;
pub use errors::GrowNetError;
