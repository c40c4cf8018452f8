//! Fit a small ensemble on a synthetic two-class problem.
//!
//! Run with `RUST_LOG=info` to follow the stages.
use grownet::objective::ModelOrder;
use grownet::{Dataset, GrowNetBooster, GrowNetError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

/// Two interleaved rings: positive when the radius falls in an odd band.
fn rings(n: usize, seed: u64) -> Result<Dataset, GrowNetError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n * 2);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let x: f32 = rng.gen_range(-3.0..3.0);
        let y: f32 = rng.gen_range(-3.0..3.0);
        let band = (x * x + y * y).sqrt() as usize;
        features.push(x);
        features.push(y);
        labels.push(if band % 2 == 1 { 1.0 } else { -1.0 });
    }
    Dataset::new(features, labels, 2)
}

fn main() -> Result<(), GrowNetError> {
    pretty_env_logger::init();

    let train = rings(20_000, 0)?;
    let test = rings(5_000, 1)?;

    let mut model = GrowNetBooster::default()
        .set_feature_dim(2)
        .set_hidden_dim(16)
        .set_num_nets(10)
        .set_batch_size(256)
        .set_epochs_per_stage(2)
        .set_correct_epoch(1)
        .set_lr(0.005)
        .set_model_order(ModelOrder::Second)
        .set_cv(true)
        .set_normalization(true);

    let (train, test, validation) = model.prepare(train, test)?;
    let start = Instant::now();
    let report = model.fit(&train, &test, validation.as_ref())?;

    for s in &report.stages {
        println!(
            "stage {:2}  boost rate {:.4}  test loss {:.4}  AUC@Test {:.4}",
            s.stage, s.boost_rate, s.test_loss, s.test_auc
        );
    }
    println!(
        "best stage {} with AUC@Test {:.4}, trained in {:.1}s",
        report.best_stage,
        report.best_test_auc,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
