// demos/simulate.rs
// Run with:
//   cargo run --example simulate
//
// Compare probability methods on a 2:1 trial by simulating enrollment.

use smallerize::simulation::run_simulations;
use smallerize::{Arm, Factor, ImbalanceMethod, Minimizer, MinimizerConfig, ProbabilityMethod};
use tracing_subscriber::EnvFilter;

const TRIALS: usize = 200;
const PARTICIPANTS: usize = 120;

fn main() -> smallerize::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let factors = || -> smallerize::Result<Vec<Factor>> {
        Ok(vec![
            Factor::new("Sex", ["Male", "Female"])?,
            Factor::new("Age", ["<40", "40-65", ">65"])?,
            Factor::weighted("Site", ["North", "South", "East", "West"], 2.0)?,
        ])
    };
    let arms = || -> smallerize::Result<Vec<Arm>> {
        Ok(vec![Arm::with_ratio("Drug", 2)?, Arm::with_ratio("Placebo", 1)?])
    };

    println!("== {TRIALS} trials x {PARTICIPANTS} participants, Drug:Placebo = 2:1 ==");
    println!("{:<12} {:>10} {:>10} {:>12}", "method", "mean", "worst", "favoured");
    for method in ProbabilityMethod::ALL {
        let cfg = MinimizerConfig {
            d_imbalance_method: ImbalanceMethod::Range,
            probability_method: method,
            preferred_p: Some(0.8),
            q: Some(0.8),
            seed: Some(42),
            ..Default::default()
        };
        let mut m = Minimizer::new(factors()?, arms()?, cfg)?;
        let s = run_simulations(&mut m, TRIALS, PARTICIPANTS)?;
        println!(
            "{:<12} {:>10.3} {:>10.3} {:>12.3}",
            method.tag(),
            s.mean_max_marginal_range,
            s.worst_max_marginal_range,
            s.mean_most_favoured_rate
        );
    }
    Ok(())
}
