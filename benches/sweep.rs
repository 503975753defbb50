use criterion::{Criterion, black_box, criterion_group, criterion_main};
use nalgebra::DMatrix;
use rand::SeedableRng;
use rand::rngs::StdRng;

use admm_mlp::{
    DualState, FitConfig, NetworkBuilder, Nonlinearity, fit_output_hidden, sample_gen, target_gen,
};

fn column(mut rows: Vec<Vec<f64>>) -> DMatrix<f64> {
    let v = rows.remove(0);
    DMatrix::from_vec(v.len(), 1, v)
}

fn sweep_bench(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut net = NetworkBuilder::new(200)
        .unwrap()
        .add_hidden(50, Nonlinearity::ReLU)
        .unwrap()
        .add_terminal(10)
        .unwrap()
        .build_with_rng(&mut rng)
        .unwrap();
    let mut dual = DualState::zeros(10, 1);
    let input = column(sample_gen(200, 1, &mut rng).unwrap());
    let target = column(target_gen(10, 1, &mut rng).unwrap());
    let cfg = FitConfig::default();

    c.bench_function("sweep_200_50_10", |b| {
        b.iter(|| {
            let report = net
                .sweep(black_box(&input), black_box(&target), &mut dual, &cfg)
                .unwrap();
            black_box(report);
        })
    });
}

fn output_hidden_bench(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let a = column(sample_gen(50, 1, &mut rng).unwrap());
    let a_prev = column(sample_gen(200, 1, &mut rng).unwrap());
    let w = DMatrix::from_fn(50, 200, |i, j| ((i * 7 + j * 3) % 11) as f64 * 0.01 - 0.05);

    c.bench_function("fit_output_hidden_50x200", |b| {
        b.iter(|| {
            let z = fit_output_hidden(black_box(&a), &w, black_box(&a_prev), 10.0, 1.0).unwrap();
            black_box(z);
        })
    });
}

criterion_group!(benches, sweep_bench, output_hidden_bench);
criterion_main!(benches);
