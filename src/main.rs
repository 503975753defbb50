use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use admm_mlp::{Dataset, DualState, FitConfig, NetworkBuilder, Nonlinearity};

const INPUT_DIM: usize = 200;
const HIDDEN_DIM: usize = 50;
const CLASSES: usize = 10;
const EXAMPLES: usize = 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let level = if std::env::var_os("ADMM_MLP_DEBUG").is_some() {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut rng = StdRng::seed_from_u64(0);
    let train = Dataset::synthetic(INPUT_DIM, CLASSES, EXAMPLES, &mut rng)?;

    let mut net = NetworkBuilder::new(INPUT_DIM)?
        .add_hidden(HIDDEN_DIM, Nonlinearity::ReLU)?
        .add_terminal(CLASSES)?
        .build_with_rng(&mut rng)?;
    let mut dual = DualState::zeros(net.output_dim(), net.batch_size());

    let report = net.fit(&train, FitConfig::default(), &mut dual)?;

    for layer in net.hidden() {
        info!(
            weights = ?layer.w().shape(),
            activation = ?layer.a().shape(),
            output = ?layer.z().shape(),
            "hidden layer"
        );
    }
    info!(
        weights = ?net.terminal().w().shape(),
        output = ?net.terminal().z().shape(),
        dual = ?dual.shape(),
        "terminal layer"
    );

    let accuracy = net.evaluate_accuracy(&train)?;
    println!(
        "sweeps={} mean_hinge={:.4} final_residual={:.3e} train_accuracy={:.2}",
        report.total_sweeps(),
        report.mean_loss(),
        report.final_residual().unwrap_or(f64::NAN),
        accuracy
    );

    Ok(())
}
