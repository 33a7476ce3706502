// src/simulation.rs

//! # Simulated trials
//!
//! Closed-loop harness for judging a minimizer configuration before a real
//! trial uses it: **simulate** enrollment of random participants, **measure**
//! the balance it produced, repeat over many trials and summarise.
//!
//! Participants are drawn with `Factor::get_random_level_multiple` from the
//! minimizer's own RNG, so one seed fixes both who enrolls and where they go.
//!
//! ## Typical use
//! ```no_run
//! use smallerize::simulation::run_simulations;
//! use smallerize::{Arm, Factor, Minimizer, MinimizerConfig};
//!
//! let sex = Factor::new("Sex", ["Male", "Female"]).unwrap();
//! let arms = vec![Arm::new("A"), Arm::new("B")];
//! let cfg = MinimizerConfig { seed: Some(1), preferred_p: Some(0.8), ..Default::default() };
//! let mut m = Minimizer::new(sex, arms, cfg).unwrap();
//! let summary = run_simulations(&mut m, 100, 50).unwrap();
//! println!("mean worst range: {}", summary.mean_max_marginal_range);
//! ```

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::mechanics::imbalance;
use crate::trial::{ArmMap, FactorMap, Minimizer, Participant};

/// Balance achieved by one simulated trial.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialReport {
    pub n_participants: usize,
    /// Raw participants per arm.
    pub arm_totals: ArmMap<u64>,
    /// factor → level → arm → raw count.
    pub marginal_counts: FactorMap<BTreeMap<String, ArmMap<u64>>>,
    /// Largest ratio-normalized range over every factor level.
    pub max_marginal_range: f64,
    /// Share of draws that picked a most-favoured arm.
    pub most_favoured_rate: f64,
}

/// Aggregate over many simulated trials.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationSummary {
    pub trials: Vec<TrialReport>,
    pub mean_max_marginal_range: f64,
    pub worst_max_marginal_range: f64,
    pub mean_most_favoured_rate: f64,
}

/// One simulated enrollment run on top of whatever the minimizer already holds.
pub struct SimulatedTrial<'a> {
    minimizer: &'a mut Minimizer,
    n_participants: usize,
}

impl<'a> SimulatedTrial<'a> {
    pub fn new(minimizer: &'a mut Minimizer, n_participants: usize) -> Self {
        Self { minimizer, n_participants }
    }

    /// Random participants, levels drawn uniformly and independently per factor.
    pub fn draw_participants(&self) -> Vec<Participant> {
        let rng = self.minimizer.rng();
        let columns: Vec<(String, Vec<String>)> = self
            .minimizer
            .factors()
            .iter()
            .map(|f| {
                let levels = f
                    .get_random_level_multiple(self.n_participants, &rng)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                (f.name().to_string(), levels)
            })
            .collect();

        (0..self.n_participants)
            .map(|i| {
                columns
                    .iter()
                    .map(|(name, levels)| (name.clone(), levels[i].clone()))
                    .collect()
            })
            .collect()
    }

    /// Simulate: assign every drawn participant. Measure: report balance.
    pub fn run(self) -> Result<TrialReport> {
        let participants = self.draw_participants();
        let mut favoured = 0usize;
        for p in &participants {
            if self.minimizer.get_assignment_info(p, true)?.most_favoured {
                favoured += 1;
            }
        }
        let mut report = measure(self.minimizer);
        report.n_participants = participants.len();
        report.most_favoured_rate = if participants.is_empty() {
            0.0
        } else {
            favoured as f64 / participants.len() as f64
        };
        Ok(report)
    }
}

/// Current balance of `minimizer`'s count table.
pub fn measure(minimizer: &Minimizer) -> TrialReport {
    let table = minimizer.count_table();
    let arm_names: Vec<String> = minimizer.arm_names().into_iter().map(str::to_string).collect();
    let ratios: Vec<f64> = minimizer.arms().iter().map(|a| f64::from(a.allocation_ratio())).collect();
    let label = |counts: &[u64]| -> ArmMap<u64> { arm_names.iter().cloned().zip(counts.iter().copied()).collect() };

    let mut marginal_counts = FactorMap::new();
    let mut max_range = 0.0_f64;
    for (f, factor) in minimizer.factors().iter().enumerate() {
        let mut per_level = BTreeMap::new();
        for (l, level) in factor.levels().iter().enumerate() {
            let counts = table.marginal(f, l);
            let normalized: Vec<f64> = counts.iter().zip(&ratios).map(|(&c, r)| c as f64 / r).collect();
            max_range = max_range.max(imbalance::range(&normalized));
            per_level.insert(level.clone(), label(&counts));
        }
        marginal_counts.insert(factor.name().to_string(), per_level);
    }

    TrialReport {
        n_participants: table.total() as usize,
        arm_totals: label(&table.arm_totals()),
        marginal_counts,
        max_marginal_range: max_range,
        most_favoured_rate: 0.0,
    }
}

/// Run `n_trials` independent trials of `n_participants` each, resetting the
/// minimizer's counts before every trial (and after the last one).
pub fn run_simulations(minimizer: &mut Minimizer, n_trials: usize, n_participants: usize) -> Result<SimulationSummary> {
    let mut trials = Vec::with_capacity(n_trials);
    for t in 0..n_trials {
        minimizer.reset_counts_to_zero();
        let report = SimulatedTrial::new(minimizer, n_participants).run()?;
        debug!(trial = t, max_range = report.max_marginal_range, "simulated trial");
        trials.push(report);
    }
    minimizer.reset_counts_to_zero();

    let n = trials.len().max(1) as f64;
    let mean_max_marginal_range = trials.iter().map(|r| r.max_marginal_range).sum::<f64>() / n;
    let worst_max_marginal_range = trials.iter().map(|r| r.max_marginal_range).fold(0.0, f64::max);
    let mean_most_favoured_rate = trials.iter().map(|r| r.most_favoured_rate).sum::<f64>() / n;

    Ok(SimulationSummary {
        trials,
        mean_max_marginal_range,
        worst_max_marginal_range,
        mean_most_favoured_rate,
    })
}
