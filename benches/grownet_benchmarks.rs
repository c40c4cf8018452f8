use criterion::{black_box, criterion_group, criterion_main, Criterion};
use grownet::data::{Dataset, Matrix};
use grownet::learner::WeakLearner;
use grownet::nn::Linear;
use grownet::objective::{grad_direction, LogLoss, ModelOrder};
use grownet::utils::fast_f64_sum;
use grownet::GrowNetBooster;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const ROWS: usize = 10_000;
const COLS: usize = 20;

fn synthetic(rows: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let features: Vec<f32> = (0..rows * COLS).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let labels: Vec<f32> = features
        .chunks_exact(COLS)
        .map(|r| if r[0] - r[1] + 0.3 * r[2] > 0.0 { 1.0 } else { -1.0 })
        .collect();
    Dataset::new(features, labels, COLS).unwrap()
}

pub fn grownet_benchmarks(c: &mut Criterion) {
    let data = synthetic(ROWS, 0);
    let mut rng = StdRng::seed_from_u64(1);
    let yhat: Vec<f32> = (0..ROWS).map(|_| rng.gen_range(-2.0..2.0)).collect();
    let t: Vec<f32> = data.labels().iter().map(|y| (y + 1.0) / 2.0).collect();

    let v: Vec<f32> = vec![10.; 300000];
    c.bench_function("fast f64 sum", |b| b.iter(|| fast_f64_sum(black_box(&v))));
    c.bench_function("grad_direction second order", |b| {
        b.iter(|| grad_direction(black_box(data.labels()), black_box(&yhat), ModelOrder::Second))
    });
    c.bench_function("log loss and gradient", |b| {
        b.iter(|| LogLoss::calc_loss_grad(black_box(&t), black_box(&yhat), None))
    });

    let batch = &data.features()[..1024 * COLS];
    let mut linear = Linear::new_with_rng(COLS, 64, &mut rng);
    let out = linear.forward(batch, 1024);
    c.bench_function("Linear forward (1024 rows)", |b| {
        b.iter(|| linear.forward(black_box(batch), 1024))
    });
    c.bench_function("Linear backward (1024 rows)", |b| {
        b.iter(|| linear.backward(black_box(batch), black_box(&out), 1024))
    });

    let mut learner = WeakLearner::new(0, COLS, 32, &mut rng);
    c.bench_function("WeakLearner forward_cached (1024 rows)", |b| {
        b.iter(|| learner.forward_cached(black_box(batch), None, 1024))
    });

    let mut booster_train = c.benchmark_group("train_booster");
    booster_train.warm_up_time(Duration::from_secs(5));
    booster_train.sample_size(10);
    let test = synthetic(2_000, 2);
    booster_train.bench_function("train_booster_5_stages", |b| {
        b.iter(|| {
            let mut booster = GrowNetBooster::default()
                .set_feature_dim(COLS)
                .set_hidden_dim(16)
                .set_num_nets(5)
                .set_batch_size(512)
                .set_lr(0.01)
                .set_log_iterations(0);
            booster.fit(black_box(&data), black_box(&test), None).unwrap();
        })
    });

    let mut booster = GrowNetBooster::default()
        .set_feature_dim(COLS)
        .set_hidden_dim(16)
        .set_num_nets(10)
        .set_batch_size(512)
        .set_log_iterations(0);
    booster.fit(&data, &test, None).unwrap();
    let matrix = Matrix::new(data.features(), ROWS, COLS);
    booster_train.bench_function("Predict Booster (Single Threaded)", |b| {
        b.iter(|| booster.predict(black_box(&matrix), false))
    });
    booster_train.bench_function("Predict Booster (Multi Threaded)", |b| {
        b.iter(|| booster.predict(black_box(&matrix), true))
    });
    booster_train.finish();
}

criterion_group!(benches, grownet_benchmarks);
criterion_main!(benches);
