use admm_mlp::{
    Dataset, DualState, Error, FitConfig, NetworkBuilder, Nonlinearity, Penalties, SweepSchedule,
    metrics,
};
use nalgebra::DMatrix;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn reference_net(seed: u64) -> admm_mlp::Network {
    NetworkBuilder::new(4)
        .unwrap()
        .add_hidden(3, Nonlinearity::ReLU)
        .unwrap()
        .add_terminal(2)
        .unwrap()
        .build_with_seed(seed)
        .unwrap()
}

#[test]
fn single_sweep_end_to_end_keeps_every_shape() {
    let mut net = reference_net(0);
    let mut dual = DualState::zeros(2, 1);
    let x = DMatrix::from_column_slice(4, 1, &[0.5, -0.25, 1.0, 0.1]);
    let y = DMatrix::from_column_slice(2, 1, &[-1.0, 1.0]);
    let cfg = FitConfig {
        penalties: Penalties::new(1.0, 10.0).unwrap(),
        ..FitConfig::default()
    };

    let report = net.sweep(&x, &y, &mut dual, &cfg).unwrap();
    assert!(report.residual.is_finite());

    let hidden = net.hidden().next().unwrap();
    assert_eq!(hidden.w().shape(), (3, 4));
    assert_eq!(hidden.a().shape(), (3, 1));
    assert_eq!(hidden.z().shape(), (3, 1));
    assert_eq!(net.terminal().w().shape(), (2, 3));
    assert_eq!(net.terminal().z().shape(), (2, 1));
    assert_eq!(dual.shape(), (2, 1));
}

#[test]
fn fit_over_synthetic_data_reports_every_example() {
    let mut rng = StdRng::seed_from_u64(3);
    let train = Dataset::synthetic(20, 5, 12, &mut rng).unwrap();
    let mut net = NetworkBuilder::new(20)
        .unwrap()
        .add_hidden(8, Nonlinearity::ReLU)
        .unwrap()
        .add_hidden(6, Nonlinearity::ReLU)
        .unwrap()
        .add_terminal(5)
        .unwrap()
        .build_with_seed(3)
        .unwrap();
    let mut dual = DualState::zeros(5, 1);

    let report = net.fit(&train, FitConfig::default(), &mut dual).unwrap();
    assert_eq!(report.examples.len(), 12);
    assert_eq!(report.total_sweeps(), 12);
    assert!(report.examples.iter().all(|e| e.residual.is_finite()));

    let accuracy = net.evaluate_accuracy(&train).unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
}

#[test]
fn tolerance_can_stop_early() {
    let mut rng = StdRng::seed_from_u64(5);
    let train = Dataset::synthetic(6, 3, 4, &mut rng).unwrap();
    let mut net = NetworkBuilder::new(6)
        .unwrap()
        .add_hidden(4, Nonlinearity::ReLU)
        .unwrap()
        .add_terminal(3)
        .unwrap()
        .build_with_seed(5)
        .unwrap();
    let mut dual = DualState::zeros(3, 1);
    let cfg = FitConfig {
        sweeps_per_example: 5,
        // Any finite residual is below this, so each example takes one sweep.
        tolerance: Some(f64::MAX),
        ..FitConfig::default()
    };

    let report = net.fit(&train, cfg, &mut dual).unwrap();
    assert!(report.examples.iter().all(|e| e.sweeps == 1));

    let cfg = FitConfig {
        sweeps_per_example: 3,
        tolerance: None,
        ..FitConfig::default()
    };
    let report = net.fit(&train, cfg, &mut dual).unwrap();
    assert!(report.examples.iter().all(|e| e.sweeps == 3));
}

#[test]
fn synchronous_schedule_trains_with_same_shapes() {
    let mut rng = StdRng::seed_from_u64(8);
    let train = Dataset::synthetic(10, 4, 6, &mut rng).unwrap();
    let mut net = NetworkBuilder::new(10)
        .unwrap()
        .add_hidden(5, Nonlinearity::ReLU)
        .unwrap()
        .add_terminal(4)
        .unwrap()
        .build_with_seed(8)
        .unwrap();
    let mut dual = DualState::zeros(4, 1);
    let cfg = FitConfig {
        schedule: SweepSchedule::Synchronous,
        sweeps_per_example: 2,
        ..FitConfig::default()
    };

    let report = net.fit(&train, cfg, &mut dual).unwrap();
    assert_eq!(report.total_sweeps(), 12);
    assert_eq!(net.terminal().w().shape(), (4, 5));
}

fn batched_net(batch: usize, seed: u64) -> admm_mlp::Network {
    NetworkBuilder::new(6)
        .unwrap()
        .batch_size(batch)
        .unwrap()
        .add_hidden(4, Nonlinearity::ReLU)
        .unwrap()
        .add_terminal(3)
        .unwrap()
        .build_with_seed(seed)
        .unwrap()
}

#[test]
fn fit_presents_batch_sized_blocks() {
    let mut rng = StdRng::seed_from_u64(21);
    let train = Dataset::synthetic(6, 3, 6, &mut rng).unwrap();
    let mut net = batched_net(2, 21);
    let mut dual = DualState::zeros(3, 2);

    let report = net.fit(&train, FitConfig::default(), &mut dual).unwrap();
    assert_eq!(report.examples.len(), 3);
    assert!(report.examples.iter().all(|e| e.residual.is_finite()));

    assert_eq!(net.batch_size(), 2);
    assert_eq!(net.input().a(), &train.input_block(4, 2));
    assert_eq!(net.hidden().next().unwrap().a().shape(), (4, 2));
    assert_eq!(net.terminal().z().shape(), (3, 2));
    assert_eq!(dual.shape(), (3, 2));

    let accuracy = net.evaluate_accuracy(&train).unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
}

#[test]
fn fit_rejects_partial_final_block() {
    let mut rng = StdRng::seed_from_u64(22);
    let train = Dataset::synthetic(6, 3, 5, &mut rng).unwrap();
    let mut net = batched_net(2, 22);
    let before = net.clone();
    let mut dual = DualState::zeros(3, 2);

    assert!(matches!(
        net.fit(&train, FitConfig::default(), &mut dual),
        Err(Error::InvalidData(_))
    ));
    assert_eq!(net, before);
}

#[cfg(feature = "serde")]
#[test]
fn batched_network_reloads_after_training() {
    use admm_mlp::Checkpoint;

    let mut rng = StdRng::seed_from_u64(23);
    let train = Dataset::synthetic(6, 3, 4, &mut rng).unwrap();
    let mut net = batched_net(2, 23);
    let mut dual = DualState::zeros(3, 2);
    net.fit(&train, FitConfig::default(), &mut dual).unwrap();

    let json = Checkpoint {
        network: net.clone(),
        dual: dual.clone(),
    }
    .to_json_string()
    .unwrap();
    let loaded = Checkpoint::from_json_str(&json).unwrap();
    assert_eq!(loaded.network.batch_size(), 2);
    assert_eq!(loaded.dual, dual);
}

#[test]
fn dataset_dimension_mismatch_is_rejected() {
    let mut rng = StdRng::seed_from_u64(1);
    let train = Dataset::synthetic(7, 2, 3, &mut rng).unwrap();
    let mut net = reference_net(1);
    let mut dual = DualState::zeros(2, 1);
    assert!(matches!(
        net.fit(&train, FitConfig::default(), &mut dual),
        Err(Error::InvalidData(_))
    ));
}

#[test]
fn objective_accounts_for_every_block() {
    let mut net = reference_net(2);
    let mut dual = DualState::zeros(2, 1);
    let x = DMatrix::from_column_slice(4, 1, &[0.1, 0.2, 0.3, 0.4]);
    let y = DMatrix::from_column_slice(2, 1, &[1.0, -1.0]);
    let cfg = FitConfig::default();

    net.sweep(&x, &y, &mut dual, &cfg).unwrap();
    let value = metrics::objective(&net, &dual, &y, cfg.penalties).unwrap();
    assert!(value.is_finite());
}

#[cfg(feature = "serde")]
#[test]
fn checkpoint_resumes_training() {
    use admm_mlp::Checkpoint;

    let mut rng = StdRng::seed_from_u64(4);
    let train = Dataset::synthetic(6, 3, 4, &mut rng).unwrap();
    let mut net = NetworkBuilder::new(6)
        .unwrap()
        .add_hidden(4, Nonlinearity::ReLU)
        .unwrap()
        .add_terminal(3)
        .unwrap()
        .build_with_seed(4)
        .unwrap();
    let mut dual = DualState::zeros(3, 1);
    net.fit(&train, FitConfig::default(), &mut dual).unwrap();

    let path = std::env::temp_dir().join(format!("admm_mlp_ckpt_{}.json", std::process::id()));
    let ckpt = Checkpoint {
        network: net.clone(),
        dual: dual.clone(),
    };
    ckpt.save_json(&path).unwrap();
    let mut loaded = Checkpoint::load_json(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    // Continue both copies for one more pass; they must agree.
    net.fit(&train, FitConfig::default(), &mut dual).unwrap();
    loaded
        .network
        .fit(&train, FitConfig::default(), &mut loaded.dual)
        .unwrap();
    approx::assert_relative_eq!(
        net.terminal().w(),
        loaded.network.terminal().w(),
        epsilon = 1e-9
    );
    approx::assert_relative_eq!(dual.lambda(), loaded.dual.lambda(), epsilon = 1e-9);
}
