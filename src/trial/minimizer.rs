// src/trial/minimizer.rs

//! # Minimizer
//!
//! Assigns participants to arms so that the marginal distribution of every
//! prognostic factor stays balanced across arms (Pocock & Simon 1975), with
//! the refinements of Han et al. (2009) for unequal allocation ratios.
//!
//! ## One assignment, step by step
//! For a new participant with levels `(l₁, …, l_F)`:
//!
//! 1. **x counts**: for each factor `f`, count the enrolled participants per
//!    arm who share level `l_f`, divided by the arm's allocation ratio.
//! 2. **after-assignment counts**: for each candidate arm `k`, the same
//!    counts with 1 added to arm `k`.
//! 3. **d scores**: score each factor's after-assignment counts with the
//!    configured `ImbalanceMethod`.
//! 4. **total imbalance**: combine the d scores per candidate arm (`sum` or
//!    `weighted_sum`).
//! 5. **probabilities**: rank candidates by total imbalance and apply the
//!    `ProbabilityMethod`. `pure_random` skips steps 1–4.
//! 6. **draw** an arm, and commit it to the count table only when asked.
//!
//! Every step is exposed on its own (`get_current_x_counts`,
//! `get_all_new_counts`, `get_new_ds`, `get_new_total_imbalances`,
//! `get_arm_probability`, `get_chosen_arm`) so each can be checked against
//! published worked examples.
//!
//! ## Failure and mutation
//! Participants are validated in full before anything is counted, so a call
//! that returns `Err` leaves the count table exactly as it was. Only
//! `add_existing_participant`, `assign_participant`,
//! `get_assignment_info(.., true)`, `load_history` and `reset_counts_to_zero`
//! write to it.
//!
//! ## Randomness
//! Tie-breaking and arm draws use the minimizer's `WyRand`, shared through
//! `Rc<RefCell<_>>` so a simulation can draw participants from the same
//! stream. Seed it via `MinimizerConfig::seed` or inject one with `with_rng`.
//! A `Minimizer` is single-threaded by construction (`!Send`).

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use bevy_prng::WyRand;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::mechanics::imbalance::ScoreContext;
use crate::mechanics::probability::{self, ProbabilityMethod};
use crate::mechanics::stoch;
use crate::trial::config::{ConfigWarning, MinimizerConfig, Policy, TotalImbalanceMethod};
use crate::trial::{Arm, ArmMap, CountTable, Factor, FactorMap, Participant};

/// A single item or a list, so `Minimizer::new(sex, arms, ..)` and
/// `Minimizer::new(vec![sex, age], arms, ..)` both read naturally.
#[derive(Clone, Debug)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(t) => vec![t],
            OneOrMany::Many(v) => v,
        }
    }
}

impl From<Factor> for OneOrMany<Factor> {
    fn from(f: Factor) -> Self {
        OneOrMany::One(f)
    }
}

impl From<Arm> for OneOrMany<Arm> {
    fn from(a: Arm) -> Self {
        OneOrMany::One(a)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(v: Vec<T>) -> Self {
        OneOrMany::Many(v)
    }
}

impl<T, const N: usize> From<[T; N]> for OneOrMany<T> {
    fn from(a: [T; N]) -> Self {
        OneOrMany::Many(a.into())
    }
}

/// Outcome of one draw.
#[derive(Clone, Debug, PartialEq)]
pub struct AssignmentInfo {
    /// Chosen arm.
    pub arm: String,
    /// Probability the chosen arm had before the draw.
    pub prob: f64,
    /// Whether the chosen arm had the highest probability (ties included).
    pub most_favoured: bool,
    pub probabilities: ArmMap<f64>,
    /// Total imbalance per candidate arm; `None` under `pure_random`.
    pub imbalances: Option<ArmMap<f64>>,
}

pub struct Minimizer {
    factors: Vec<Factor>,
    arms: Vec<Arm>,
    ratios: Vec<u32>,
    policy: Policy,
    warnings: Vec<ConfigWarning>,
    counts: CountTable,
    rng: Rc<RefCell<WyRand>>,
}

impl Minimizer {
    /// Build a minimizer with its own RNG (seeded from `config.seed`, or the OS).
    pub fn new(
        factors: impl Into<OneOrMany<Factor>>,
        arms: impl Into<OneOrMany<Arm>>,
        config: MinimizerConfig,
    ) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => stoch::seeded(seed),
            None => stoch::from_entropy(),
        };
        Self::with_rng(factors, arms, config, Rc::new(RefCell::new(rng)))
    }

    /// Build a minimizer that draws from a caller-owned RNG. `config.seed` is ignored.
    pub fn with_rng(
        factors: impl Into<OneOrMany<Factor>>,
        arms: impl Into<OneOrMany<Arm>>,
        config: MinimizerConfig,
        rng: Rc<RefCell<WyRand>>,
    ) -> Result<Self> {
        let factors = factors.into().into_vec();
        let arms = arms.into().into_vec();

        if factors.is_empty() {
            return Err(Error::NoFactors);
        }
        if arms.len() < 2 {
            return Err(Error::NotEnoughArms(arms.len()));
        }
        let mut seen = HashSet::new();
        for f in &factors {
            if !seen.insert(f.name()) {
                return Err(Error::DuplicateFactor(f.name().to_string()));
            }
        }
        seen.clear();
        for a in &arms {
            if !seen.insert(a.name()) {
                return Err(Error::DuplicateArm(a.name().to_string()));
            }
        }

        let ratios: Vec<u32> = arms.iter().map(Arm::allocation_ratio).collect();
        let (policy, warnings) = config.resolve(&ratios)?;
        debug!(
            factors = factors.len(),
            arms = arms.len(),
            d_imbalance = %policy.d_imbalance_method,
            total_imbalance = %policy.total_imbalance_method,
            probability = %policy.probability_method,
            "minimizer configured"
        );

        let counts = CountTable::new(arms.len());
        Ok(Self { factors, arms, ratios, policy, warnings, counts, rng })
    }

    /* --- configuration views --- */

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn factor_names(&self) -> Vec<&str> {
        self.factors.iter().map(Factor::name).collect()
    }

    pub fn factor_weights(&self) -> FactorMap<f64> {
        self.factors.iter().map(|f| (f.name().to_string(), f.weight())).collect()
    }

    pub fn arms(&self) -> &[Arm] {
        &self.arms
    }

    pub fn arm_names(&self) -> Vec<&str> {
        self.arms.iter().map(Arm::name).collect()
    }

    pub fn arm_ratios(&self) -> ArmMap<u32> {
        self.arms.iter().map(|a| (a.name().to_string(), a.allocation_ratio())).collect()
    }

    /// Number of arms.
    pub fn get_n(&self) -> usize {
        self.arms.len()
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Advisory remarks raised while resolving the configuration.
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Shared handle on the RNG.
    pub fn rng(&self) -> Rc<RefCell<WyRand>> {
        Rc::clone(&self.rng)
    }

    pub fn count_table(&self) -> &CountTable {
        &self.counts
    }

    pub fn total_participants(&self) -> u64 {
        self.counts.total()
    }

    /* --- validation --- */

    /// Level indices for `participant`, in factor order.
    fn participant_key(&self, participant: &Participant) -> Result<Vec<usize>> {
        if let Some(unknown) = participant
            .keys()
            .find(|name| !self.factors.iter().any(|f| f.name() == name.as_str()))
        {
            return Err(Error::UnknownFactor(unknown.clone()));
        }
        let missing: Vec<String> = self
            .factors
            .iter()
            .filter(|f| !participant.contains_key(f.name()))
            .map(|f| f.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingFactors { missing });
        }

        self.factors
            .iter()
            .map(|f| {
                let level = &participant[f.name()];
                f.level_index(level).ok_or_else(|| Error::UnknownLevel {
                    factor: f.name().to_string(),
                    level: level.clone(),
                })
            })
            .collect()
    }

    fn arm_index(&self, arm: &str) -> Result<usize> {
        self.arms
            .iter()
            .position(|a| a.name() == arm)
            .ok_or_else(|| Error::UnknownArm(arm.to_string()))
    }

    /* --- imbalance, index form: [factor][arm] / [arm][factor][arm] --- */

    fn x_counts(&self, key: &[usize]) -> Vec<Vec<f64>> {
        key.iter()
            .enumerate()
            .map(|(f, &level)| {
                self.counts
                    .marginal(f, level)
                    .iter()
                    .zip(&self.ratios)
                    .map(|(&c, &r)| c as f64 / f64::from(r))
                    .collect()
            })
            .collect()
    }

    fn new_counts(&self, key: &[usize]) -> Vec<Vec<Vec<f64>>> {
        let current = self.x_counts(key);
        (0..self.arms.len())
            .map(|k| {
                current
                    .iter()
                    .map(|counts| {
                        let mut after = counts.clone();
                        after[k] += 1.0;
                        after
                    })
                    .collect()
            })
            .collect()
    }

    fn ds(&self, key: &[usize]) -> Vec<Vec<f64>> {
        let method = self.policy.d_imbalance_method;
        self.new_counts(key)
            .into_iter()
            .enumerate()
            .map(|(k, per_factor)| {
                let ctx = ScoreContext { focal_arm: k, max_range: self.policy.d_max_range };
                per_factor.iter().map(|c| method.score(c, &ctx)).collect()
            })
            .collect()
    }

    fn total_imbalances(&self, key: &[usize]) -> Vec<f64> {
        let totals: Vec<f64> = self
            .ds(key)
            .into_iter()
            .map(|scores| match self.policy.total_imbalance_method {
                TotalImbalanceMethod::Sum => scores.iter().sum(),
                TotalImbalanceMethod::WeightedSum => scores
                    .iter()
                    .zip(&self.factors)
                    .map(|(d, f)| d * f.weight())
                    .sum(),
            })
            .collect();
        trace!(?key, ?totals, "total imbalance per candidate arm");
        totals
    }

    /// Probabilities in arm order.
    fn probabilities(&self, imbalances: Option<&[f64]>) -> Result<Vec<f64>> {
        let method = self.policy.probability_method;
        let n = self.arms.len();
        let Some(imbalances) = imbalances else {
            return match method {
                ProbabilityMethod::PureRandom => Ok(probability::pure_random(&self.ratios)),
                _ => Err(Error::MissingImbalances(method.tag())),
            };
        };

        let ranked = probability::rank(imbalances, &self.rng);
        let by_rank = match method {
            ProbabilityMethod::BestOnly => probability::best_only(n, self.policy.preferred_p),
            ProbabilityMethod::RankAll => probability::rank_all(n, self.policy.q),
            ProbabilityMethod::BiasedCoin => {
                probability::biased_coin(&ranked, &self.ratios, self.policy.preferred_p)
            }
            ProbabilityMethod::PureRandom => {
                let ps = probability::pure_random(&self.ratios);
                ranked.iter().map(|&i| ps[i]).collect()
            }
        };
        let mut out = vec![0.0; n];
        for (&arm, p) in ranked.iter().zip(by_rank) {
            out[arm] = p;
        }
        Ok(out)
    }

    fn by_arm<T: Clone>(&self, values: &[T]) -> ArmMap<T> {
        self.arms
            .iter()
            .zip(values)
            .map(|(a, v)| (a.name().to_string(), v.clone()))
            .collect()
    }

    fn by_factor<T: Clone>(&self, values: &[T]) -> FactorMap<T> {
        self.factors
            .iter()
            .zip(values)
            .map(|(f, v)| (f.name().to_string(), v.clone()))
            .collect()
    }

    /// Arm-ordered values from an arm-keyed map; every arm must be present.
    fn arm_vector(&self, map: &ArmMap<f64>) -> Result<Vec<f64>> {
        if let Some(extra) = map.keys().find(|k| self.arm_index(k).is_err()) {
            return Err(Error::UnknownArm(extra.clone()));
        }
        self.arms
            .iter()
            .map(|a| {
                map.get(a.name())
                    .copied()
                    .ok_or_else(|| Error::IncompleteImbalances(a.name().to_string()))
            })
            .collect()
    }

    /* --- public pipeline --- */

    /// Ratio-normalized arm counts among enrolled participants who share each
    /// of `participant`'s factor levels (factor → arm → count).
    pub fn get_current_x_counts(&self, participant: &Participant) -> Result<FactorMap<ArmMap<f64>>> {
        let key = self.participant_key(participant)?;
        let per_factor: Vec<ArmMap<f64>> = self.x_counts(&key).iter().map(|c| self.by_arm(c)).collect();
        Ok(self.by_factor(&per_factor))
    }

    /// Copy of `arm_counts` with one more participant in `arm_name`.
    pub fn get_count_after_assignment(arm_counts: &ArmMap<f64>, arm_name: &str) -> ArmMap<f64> {
        let mut out = arm_counts.clone();
        *out.entry(arm_name.to_string()).or_insert(0.0) += 1.0;
        out
    }

    /// Candidate arm → factor → arm counts after assigning `participant` to
    /// the candidate.
    pub fn get_all_new_counts(&self, participant: &Participant) -> Result<ArmMap<FactorMap<ArmMap<f64>>>> {
        let key = self.participant_key(participant)?;
        let per_arm: Vec<FactorMap<ArmMap<f64>>> = self
            .new_counts(&key)
            .iter()
            .map(|per_factor| {
                let maps: Vec<ArmMap<f64>> = per_factor.iter().map(|c| self.by_arm(c)).collect();
                self.by_factor(&maps)
            })
            .collect();
        Ok(self.by_arm(&per_arm))
    }

    /// Candidate arm → factor → imbalance score (the d scores).
    pub fn get_new_ds(&self, participant: &Participant) -> Result<ArmMap<FactorMap<f64>>> {
        let key = self.participant_key(participant)?;
        let per_arm: Vec<FactorMap<f64>> = self.ds(&key).iter().map(|d| self.by_factor(d)).collect();
        Ok(self.by_arm(&per_arm))
    }

    /// Candidate arm → total imbalance.
    pub fn get_new_total_imbalances(&self, participant: &Participant) -> Result<ArmMap<f64>> {
        let key = self.participant_key(participant)?;
        Ok(self.by_arm(&self.total_imbalances(&key)))
    }

    /// Names ordered from least to most imbalanced; ties in random order.
    /// Any names may be ranked, not only this trial's arms.
    pub fn rank_imbalances(&self, imbalances: &ArmMap<f64>) -> Vec<String> {
        let names: Vec<&String> = imbalances.keys().collect();
        let values: Vec<f64> = imbalances.values().copied().collect();
        probability::rank(&values, &self.rng)
            .into_iter()
            .map(|i| names[i].clone())
            .collect()
    }

    /// Assignment probability per arm. `imbalances` may be `None` only for
    /// `pure_random`, which ignores it anyway.
    pub fn get_arm_probability(&self, imbalances: Option<&ArmMap<f64>>) -> Result<ArmMap<f64>> {
        let values = match (self.policy.probability_method, imbalances) {
            (ProbabilityMethod::PureRandom, _) | (_, None) => None,
            (_, Some(map)) => Some(self.arm_vector(map)?),
        };
        let ps = self.probabilities(values.as_deref())?;
        Ok(self.by_arm(&ps))
    }

    /// Draw one arm from `probabilities`.
    pub fn get_chosen_arm(&self, probabilities: &ArmMap<f64>) -> Result<String> {
        let weights: Vec<f64> = probabilities.values().copied().collect();
        let i = stoch::categorical(&self.rng, &weights).ok_or(Error::EmptyDistribution)?;
        probabilities
            .keys()
            .nth(i)
            .cloned()
            .ok_or(Error::EmptyDistribution)
    }

    /// Choose an arm for `participant` and report how it was chosen. The count
    /// table is only updated when `do_assignment` is set.
    pub fn get_assignment_info(&mut self, participant: &Participant, do_assignment: bool) -> Result<AssignmentInfo> {
        let key = self.participant_key(participant)?;

        let imbalances = match self.policy.probability_method {
            ProbabilityMethod::PureRandom => None,
            _ => Some(self.total_imbalances(&key)),
        };
        let ps = self.probabilities(imbalances.as_deref())?;
        let chosen = stoch::categorical(&self.rng, &ps).ok_or(Error::EmptyDistribution)?;

        let prob = ps[chosen];
        let best = ps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let most_favoured = prob >= best - 1e-12;
        let arm = self.arms[chosen].name().to_string();

        if do_assignment {
            self.counts.increment(key, chosen);
        }
        debug!(%arm, prob, most_favoured, committed = do_assignment, "arm chosen");

        Ok(AssignmentInfo {
            arm,
            prob,
            most_favoured,
            probabilities: self.by_arm(&ps),
            imbalances: imbalances.map(|v| self.by_arm(&v)),
        })
    }

    /// Choose and commit an arm for a new participant.
    pub fn assign_participant(&mut self, participant: &Participant) -> Result<String> {
        Ok(self.get_assignment_info(participant, true)?.arm)
    }

    /// Record a participant already allocated to `arm` (no randomization).
    pub fn add_existing_participant(&mut self, participant: &Participant, arm: &str) -> Result<()> {
        let key = self.participant_key(participant)?;
        let arm = self.arm_index(arm)?;
        self.counts.increment(key, arm);
        Ok(())
    }

    /// Validate a batch of historical records, then commit them all.
    /// Nothing is committed if any record is invalid.
    pub fn add_existing_participants<'a, I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a Participant, &'a str)>,
    {
        let staged = records
            .into_iter()
            .map(|(p, arm)| -> Result<(Vec<usize>, usize)> {
                Ok((self.participant_key(p)?, self.arm_index(arm)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let n = staged.len();
        for (key, arm) in staged {
            self.counts.increment(key, arm);
        }
        Ok(n)
    }

    /// Back to zero participants; factors, arms and settings are kept.
    pub fn reset_counts_to_zero(&mut self) {
        self.counts.reset();
    }
}
