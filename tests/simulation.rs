// tests/simulation.rs
#![cfg(feature = "simulation")]

use std::cell::RefCell;
use std::rc::Rc;

use smallerize::mechanics::stoch;
use smallerize::simulation::{SimulatedTrial, measure, run_simulations};
use smallerize::{Arm, Factor, Minimizer, MinimizerConfig, ProbabilityMethod};

mod common;
use common::*;

fn two_factor(config: MinimizerConfig) -> Minimizer {
    Minimizer::new(vec![factor_sex(), factor_age()], vec![arm_one(), arm_two()], seeded(config)).unwrap()
}

#[test]
fn simulated_trial_enrolls_everyone() {
    let mut m = two_factor(MinimizerConfig::default());
    let report = SimulatedTrial::new(&mut m, 50).run().unwrap();
    assert_eq!(report.n_participants, 50);
    assert_eq!(report.arm_totals.values().sum::<u64>(), 50);
    for per_level in report.marginal_counts.values() {
        let n: u64 = per_level.values().flat_map(|arms| arms.values()).sum();
        assert_eq!(n, 50);
    }
    assert!((0.0..=1.0).contains(&report.most_favoured_rate));
    assert_eq!(m.total_participants(), 50);
}

#[test]
fn drawn_participants_use_known_levels() {
    let mut m = two_factor(MinimizerConfig::default());
    let trial = SimulatedTrial::new(&mut m, 20);
    let people = trial.draw_participants();
    assert_eq!(people.len(), 20);
    for p in &people {
        assert!(factor_sex().level_index(&p["Sex"]).is_some());
        assert!(factor_age().level_index(&p["Age"]).is_some());
    }
}

#[test]
fn deterministic_minimization_always_takes_the_favourite() {
    let cfg = MinimizerConfig {
        d_imbalance_method: smallerize::ImbalanceMethod::Range,
        preferred_p: Some(1.0),
        ..Default::default()
    };
    let mut m = two_factor(cfg);
    let summary = run_simulations(&mut m, 10, 100).unwrap();
    assert_eq!(summary.trials.len(), 10);
    assert_eq!(summary.mean_most_favoured_rate, 1.0);
    for t in &summary.trials {
        assert_eq!(t.arm_totals.values().sum::<u64>(), 100);
        assert!(t.max_marginal_range <= summary.worst_max_marginal_range);
    }
}

#[test]
fn minimization_beats_pure_random() {
    let min_cfg = MinimizerConfig { preferred_p: Some(0.8), ..Default::default() };
    let rand_cfg = MinimizerConfig { probability_method: ProbabilityMethod::PureRandom, ..Default::default() };
    let minimized = run_simulations(&mut two_factor(min_cfg), 30, 80).unwrap();
    let random = run_simulations(&mut two_factor(rand_cfg), 30, 80).unwrap();
    assert!(
        minimized.mean_max_marginal_range < random.mean_max_marginal_range,
        "{} vs {}",
        minimized.mean_max_marginal_range,
        random.mean_max_marginal_range
    );
}

#[test]
fn simulations_leave_counts_empty() {
    let mut m = example_3to1(None, MinimizerConfig::default());
    run_simulations(&mut m, 3, 10).unwrap();
    assert_eq!(m.total_participants(), 0);
}

#[test]
fn measure_normalizes_by_ratio() {
    let arms = vec![Arm::with_ratio("Treat1", 3).unwrap(), Arm::with_ratio("Treat2", 1).unwrap()];
    let m = example_3to1(Some(arms), MinimizerConfig::default());
    let report = measure(&m);
    assert_eq!(report.n_participants, 4);
    assert_eq!(report.arm_totals["Treat1"], 3);
    assert_eq!(report.marginal_counts["Sex"]["Male"]["Treat1"], 3);
    // 3 / 3 against 1 / 1
    assert_eq!(report.max_marginal_range, 0.0);
}

#[test]
fn shared_rng_replays_whole_simulation() {
    let run = || {
        let rng = Rc::new(RefCell::new(stoch::seeded(SEED)));
        let sex = Factor::new("Sex", ["Male", "Female"]).unwrap();
        let mut m = Minimizer::with_rng(sex, vec![arm_one(), arm_two()], MinimizerConfig::default(), rng).unwrap();
        run_simulations(&mut m, 5, 25).unwrap()
    };
    assert_eq!(run(), run());
}
