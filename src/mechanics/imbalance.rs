/// Imbalance mechanics: score how unevenly one factor level is spread over arms.
///
/// Every scorer has the same shape, `(&[f64], &ScoreContext) -> f64`: the
/// slice holds one (ratio-normalized) count per arm, in arm order, and the
/// context names the candidate arm plus any method argument.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Per-call inputs beyond the counts themselves.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScoreContext {
    /// Arm the new participant would hypothetically join.
    pub focal_arm: usize,
    /// Threshold for `over_max_range`.
    pub max_range: Option<f64>,
}

pub type Scorer = fn(&[f64], &ScoreContext) -> f64;

/// Closed registry of per-factor imbalance measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ImbalanceMethod {
    Range,
    #[default]
    StandardDeviation,
    Variance,
    MarginalBalance,
    IsLargest,
    OverMaxRange,
}

impl ImbalanceMethod {
    pub const ALL: [ImbalanceMethod; 6] = [
        ImbalanceMethod::Range,
        ImbalanceMethod::StandardDeviation,
        ImbalanceMethod::Variance,
        ImbalanceMethod::MarginalBalance,
        ImbalanceMethod::IsLargest,
        ImbalanceMethod::OverMaxRange,
    ];

    pub const fn tag(self) -> &'static str {
        match self {
            ImbalanceMethod::Range => "range",
            ImbalanceMethod::StandardDeviation => "standard_deviation",
            ImbalanceMethod::Variance => "variance",
            ImbalanceMethod::MarginalBalance => "marginal_balance",
            ImbalanceMethod::IsLargest => "is_largest",
            ImbalanceMethod::OverMaxRange => "over_max_range",
        }
    }

    pub fn scorer(self) -> Scorer {
        match self {
            ImbalanceMethod::Range => score_range,
            ImbalanceMethod::StandardDeviation => score_standard_deviation,
            ImbalanceMethod::Variance => score_variance,
            ImbalanceMethod::MarginalBalance => score_marginal_balance,
            ImbalanceMethod::IsLargest => score_is_largest,
            ImbalanceMethod::OverMaxRange => score_over_max_range,
        }
    }

    #[inline]
    pub fn score(self, counts: &[f64], ctx: &ScoreContext) -> f64 {
        (self.scorer())(counts, ctx)
    }
}

impl fmt::Display for ImbalanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ImbalanceMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImbalanceMethod::ALL
            .into_iter()
            .find(|m| m.tag() == s)
            .ok_or_else(|| Error::InvalidImbalanceMethod(s.to_string()))
    }
}

/// Tags in config files go through `FromStr`, so they fail with the same
/// messages as tags parsed from code.
impl TryFrom<String> for ImbalanceMethod {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

fn score_range(c: &[f64], _: &ScoreContext) -> f64 {
    range(c)
}
fn score_standard_deviation(c: &[f64], _: &ScoreContext) -> f64 {
    standard_deviation(c)
}
fn score_variance(c: &[f64], _: &ScoreContext) -> f64 {
    variance(c)
}
fn score_marginal_balance(c: &[f64], _: &ScoreContext) -> f64 {
    marginal_balance(c)
}
fn score_is_largest(c: &[f64], ctx: &ScoreContext) -> f64 {
    is_largest(c, ctx.focal_arm)
}
fn score_over_max_range(c: &[f64], ctx: &ScoreContext) -> f64 {
    ctx.max_range.map_or(0.0, |m| over_max_range(c, m))
}

/// max − min.
#[inline]
pub fn range(counts: &[f64]) -> f64 {
    let (lo, hi) = counts
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
    if counts.is_empty() { 0.0 } else { hi - lo }
}

/// Sample variance (n − 1 denominator); 0 for fewer than two values.
pub fn variance(counts: &[f64]) -> f64 {
    let n = counts.len();
    if n < 2 {
        return 0.0;
    }
    let mean = counts.iter().sum::<f64>() / n as f64;
    counts.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Sample standard deviation.
#[inline]
pub fn standard_deviation(counts: &[f64]) -> f64 {
    variance(counts).sqrt()
}

/// Marginal balance (Han et al. 2009): Σ_{i<j} |xᵢ − xⱼ| / ((N − 1) Σ xᵢ).
/// In [0, 1]; 0 when nobody is counted yet.
pub fn marginal_balance(counts: &[f64]) -> f64 {
    let n = counts.len();
    let total: f64 = counts.iter().sum();
    if n < 2 || total <= 0.0 {
        return 0.0;
    }
    let mut num = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            num += (counts[i] - counts[j]).abs();
        }
    }
    num / ((n - 1) as f64 * total)
}

/// 1 if `focal` holds the largest count and the counts are not all tied.
/// Two-arm trials only; a tie scores 0 for both arms.
pub fn is_largest(counts: &[f64], focal: usize) -> f64 {
    let Some(&own) = counts.get(focal) else {
        return 0.0;
    };
    let max = counts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let spread = range(counts) > 0.0;
    if own == max && spread { 1.0 } else { 0.0 }
}

/// 1 if the range exceeds `max_range`, else 0.
#[inline]
pub fn over_max_range(counts: &[f64], max_range: f64) -> f64 {
    if range(counts) > max_range { 1.0 } else { 0.0 }
}
