// demos/ps1975.rs
// Run with:
//   RUST_LOG=smallerize=debug cargo run --example ps1975
//
// Pocock & Simon (1975), section 3.4: three factors, three arms, 61 patients
// already enrolled. Which arm should the next patient go to?

use smallerize::{Arm, Factor, ImbalanceMethod, Minimizer, MinimizerConfig, participant};
use tracing_subscriber::EnvFilter;

const HISTORY: &str = include_str!("../tests/fixtures/ps1975_table1.csv");

fn main() -> smallerize::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let factors = vec![
        Factor::new("Factor1", ["level1", "level2"])?,
        Factor::new("Factor2", ["level1", "level2", "level3"])?,
        Factor::new("Factor3", ["level1", "level2"])?,
    ];
    let arms = vec![Arm::new("Arm1"), Arm::new("Arm2"), Arm::new("Arm3")];
    let cfg = MinimizerConfig {
        d_imbalance_method: ImbalanceMethod::Range,
        preferred_p: Some(2.0 / 3.0),
        seed: Some(1975),
        ..Default::default()
    };

    let mut m = Minimizer::new(factors, arms, cfg)?;
    let loaded = m.load_history(HISTORY.as_bytes())?;

    let next = participant([("Factor1", "level1"), ("Factor2", "level2"), ("Factor3", "level2")]);

    println!("== Pocock & Simon 1975, section 3.4 ==");
    println!("enrolled: {loaded}");
    for (factor, counts) in m.get_current_x_counts(&next)? {
        println!("x[{factor:<7}] -> {counts:?}");
    }
    for (arm, ds) in m.get_new_ds(&next)? {
        println!("d[{arm}] -> {ds:?}");
    }
    let totals = m.get_new_total_imbalances(&next)?;
    println!("G       -> {totals:?}");
    println!("p       -> {:?}", m.get_arm_probability(Some(&totals))?);

    let info = m.get_assignment_info(&next, true)?;
    println!(
        "assigned {} (p = {:.3}, most favoured: {})",
        info.arm, info.prob, info.most_favoured
    );
    Ok(())
}
