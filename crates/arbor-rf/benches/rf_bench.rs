//! Criterion benchmarks for arbor-rf: training, hold-out evaluation, prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use arbor_rf::{ClassLabels, Holdout, RandomForestConfig};

fn make_binary(n_samples: usize, n_features: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % 2;
        labels.push(class);
        let row: Vec<f64> = (0..n_features)
            .map(|f| {
                let shift = if f == 0 { class as f64 } else { 0.0 };
                shift + rng.r#gen::<f64>()
            })
            .collect();
        features.push(row);
    }
    let names: Vec<String> = (0..n_features).map(|f| format!("f{f}")).collect();
    (features, labels, names)
}

fn bench_rf_train(c: &mut Criterion) {
    let (features, labels, names) = make_binary(1000, 4, 42);
    let cfg = RandomForestConfig::new(200).unwrap().with_seed(42);

    c.bench_function("rf_train_1000x4_200trees", |b| {
        b.iter(|| cfg.fit(&features, &labels, &names).unwrap());
    });
}

fn bench_holdout(c: &mut Criterion) {
    let (features, labels, names) = make_binary(1000, 4, 42);
    let cfg = RandomForestConfig::new(50).unwrap().with_seed(42);
    let holdout = Holdout::new(0.2).unwrap().with_seed(42);
    let classes = ClassLabels::numbered(2);

    c.bench_function("rf_holdout_1000x4_50trees", |b| {
        b.iter(|| {
            holdout
                .evaluate(&cfg, &features, &labels, &names, &classes)
                .unwrap()
        });
    });
}

fn bench_rf_predict_batch(c: &mut Criterion) {
    let (features, labels, names) = make_binary(1000, 4, 42);
    let forest = RandomForestConfig::new(200)
        .unwrap()
        .with_seed(42)
        .fit(&features, &labels, &names)
        .unwrap()
        .into_forest();

    c.bench_function("rf_predict_batch_1000x4_200trees", |b| {
        b.iter(|| forest.predict_batch(&features).unwrap());
    });
}

criterion_group!(benches, bench_rf_train, bench_holdout, bench_rf_predict_batch);
criterion_main!(benches);
