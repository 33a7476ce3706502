/// Probability mechanics: rank arms by imbalance and turn ranks into assignment
/// probabilities.
///
/// Policies return probabilities in *rank order* (index 0 = least imbalanced
/// arm) except `pure_random`, which ignores ranking and returns them in arm
/// order. All of them sum to 1.
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bevy_prng::WyRand;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::mechanics::stoch;

/// Closed registry of probability policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ProbabilityMethod {
    #[default]
    BestOnly,
    RankAll,
    PureRandom,
    BiasedCoin,
}

impl ProbabilityMethod {
    pub const ALL: [ProbabilityMethod; 4] = [
        ProbabilityMethod::BestOnly,
        ProbabilityMethod::RankAll,
        ProbabilityMethod::PureRandom,
        ProbabilityMethod::BiasedCoin,
    ];
    pub const TAGS: &'static [&'static str] = &["best_only", "rank_all", "pure_random", "biased_coin"];

    pub const fn tag(self) -> &'static str {
        match self {
            ProbabilityMethod::BestOnly => "best_only",
            ProbabilityMethod::RankAll => "rank_all",
            ProbabilityMethod::PureRandom => "pure_random",
            ProbabilityMethod::BiasedCoin => "biased_coin",
        }
    }

    /// Whether this policy needs `preferred_p`.
    pub const fn uses_preferred_p(self) -> bool {
        matches!(self, ProbabilityMethod::BestOnly | ProbabilityMethod::BiasedCoin)
    }
}

impl fmt::Display for ProbabilityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ProbabilityMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProbabilityMethod::ALL
            .into_iter()
            .find(|m| m.tag() == s)
            .ok_or_else(|| Error::InvalidProbabilityMethod {
                allowed: ProbabilityMethod::TAGS,
                given: s.to_string(),
            })
    }
}

impl TryFrom<String> for ProbabilityMethod {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Midpoint between 1/N and 1.
#[inline]
pub fn default_preferred_p(n_arms: usize) -> f64 {
    (1.0 + 1.0 / n_arms as f64) / 2.0
}

/// 1/N < p ≤ 1.
#[inline]
pub fn preferred_p_valid(p: f64, n_arms: usize) -> bool {
    p > 1.0 / n_arms as f64 && p <= 1.0
}

/// Midpoint between 1/N and 2/(N − 1).
#[inline]
pub fn default_q(n_arms: usize) -> f64 {
    let n = n_arms as f64;
    (1.0 / n + 2.0 / (n - 1.0)) / 2.0
}

/// 1/N < q < 2/(N − 1).
#[inline]
pub fn q_valid(q: f64, n_arms: usize) -> bool {
    let n = n_arms as f64;
    q > 1.0 / n && q < 2.0 / (n - 1.0)
}

/// Arm indices from least to most imbalanced. Tied arms are shuffled on every
/// call (Pocock & Simon break ties at random, never by position).
pub fn rank(imbalances: &[f64], rng: &RefCell<WyRand>) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..imbalances.len()).collect();
    ranked.sort_by(|&a, &b| {
        imbalances[a]
            .partial_cmp(&imbalances[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut start = 0;
    while start < ranked.len() {
        let v = imbalances[ranked[start]];
        let mut end = start + 1;
        while end < ranked.len() && imbalances[ranked[end]] == v {
            end += 1;
        }
        if end - start > 1 {
            stoch::shuffle(rng, &mut ranked[start..end]);
        }
        start = end;
    }
    ranked
}

/// Ratio-proportional probabilities, in arm order.
pub fn pure_random(ratios: &[u32]) -> Vec<f64> {
    let total: f64 = ratios.iter().map(|&r| f64::from(r)).sum();
    ratios.iter().map(|&r| f64::from(r) / total).collect()
}

/// Best arm gets `preferred_p`; the rest split the remainder equally.
pub fn best_only(n_arms: usize, preferred_p: f64) -> Vec<f64> {
    let other = (1.0 - preferred_p) / (n_arms - 1) as f64;
    std::iter::once(preferred_p)
        .chain(std::iter::repeat_n(other, n_arms - 1))
        .collect()
}

/// Linearly decreasing in rank (Pocock & Simon 1975):
/// p_k = q − 2(Nq − 1) / (N(N + 1)) · k, for k = 1..N.
pub fn rank_all(n_arms: usize, q: f64) -> Vec<f64> {
    let n = n_arms as f64;
    let slope = 2.0 * (n * q - 1.0) / (n * (n + 1.0));
    (1..=n_arms).map(|k| q - slope * k as f64).collect()
}

/// Biased coin minimization (Han et al. 2009).
///
/// `ranked` holds arm indices in rank order and `ratios` the allocation ratios
/// in arm order. The preferred arm's probability is shrunk from `preferred_p`
/// according to how much of the allocation it already owns; the remaining mass
/// is split over the other arms in proportion to their ratios.
pub fn biased_coin(ranked: &[usize], ratios: &[u32], preferred_p: f64) -> Vec<f64> {
    let Some(&preferred) = ranked.first() else {
        return Vec::new();
    };
    let smallest = (0..ratios.len()).min_by_key(|&i| ratios[i]).unwrap_or(0);
    let sum_except = |skip: usize| -> f64 {
        ratios
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != skip)
            .map(|(_, &r)| f64::from(r))
            .sum()
    };

    let others = sum_except(preferred);
    let p_high = 1.0 - (others / sum_except(smallest)) * (1.0 - preferred_p);

    let mut ps = Vec::with_capacity(ranked.len());
    ps.push(p_high);
    for &arm in &ranked[1..] {
        ps.push(f64::from(ratios[arm]) / others * (1.0 - p_high));
    }
    ps
}
