//! Minimizer configuration: which imbalance measure, how to combine it across
//! factors, and how to turn it into assignment probabilities.
//!
//! `MinimizerConfig` is what callers write (in code or in a trial definition
//! file). `Policy` is what a `Minimizer` runs with after every argument has
//! been checked against the number of arms and defaults have been filled in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::mechanics::imbalance::ImbalanceMethod;
use crate::mechanics::probability::{self, ProbabilityMethod};

/// How per-factor imbalance scores are combined into one score per arm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum TotalImbalanceMethod {
    #[default]
    Sum,
    /// Each factor's score multiplied by the factor's weight.
    WeightedSum,
}

impl TotalImbalanceMethod {
    pub const fn tag(self) -> &'static str {
        match self {
            TotalImbalanceMethod::Sum => "sum",
            TotalImbalanceMethod::WeightedSum => "weighted_sum",
        }
    }
}

impl fmt::Display for TotalImbalanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for TotalImbalanceMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(TotalImbalanceMethod::Sum),
            "weighted_sum" => Ok(TotalImbalanceMethod::WeightedSum),
            other => Err(Error::InvalidTotalImbalanceMethod(other.to_string())),
        }
    }
}

impl TryFrom<String> for TotalImbalanceMethod {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Caller-facing settings. Method arguments are optional; which ones are
/// required depends on the chosen methods.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimizerConfig {
    pub d_imbalance_method: ImbalanceMethod,
    pub total_imbalance_method: TotalImbalanceMethod,
    pub probability_method: ProbabilityMethod,
    /// `best_only` / `biased_coin`: probability given to the preferred arm.
    pub preferred_p: Option<f64>,
    /// `rank_all`: probability given to the best-ranked arm.
    pub q: Option<f64>,
    /// `over_max_range`: largest tolerated range.
    pub d_max_range: Option<f64>,
    /// Seed for the minimizer's own RNG; `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Non-fatal remarks produced while resolving a configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigWarning {
    PreferBiasedCoin { method: ProbabilityMethod },
    DefaultPreferredP(f64),
    DefaultQ(f64),
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::PreferBiasedCoin { method } => write!(
                f,
                "NOTE: 'biased_coin' may give better results than '{method}' when allocation ratios are unequal."
            ),
            ConfigWarning::DefaultPreferredP(p) => {
                write!(f, "preferred_p argument was not provided. Using default value of {p}")
            }
            ConfigWarning::DefaultQ(q) => {
                write!(f, "q argument was not provided. Using default value of {q}")
            }
        }
    }
}

/// Validated configuration. Only the argument the probability method needs
/// is meaningful; the other one is left at its default.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Policy {
    pub d_imbalance_method: ImbalanceMethod,
    pub total_imbalance_method: TotalImbalanceMethod,
    pub probability_method: ProbabilityMethod,
    pub preferred_p: f64,
    pub q: f64,
    pub d_max_range: Option<f64>,
}

impl MinimizerConfig {
    /// Check every method and argument against the trial's arms.
    /// `ratios` are the allocation ratios in arm order (at least two).
    pub fn resolve(&self, ratios: &[u32]) -> Result<(Policy, Vec<ConfigWarning>)> {
        let n = ratios.len();
        let mut warnings = Vec::new();

        match self.d_imbalance_method {
            ImbalanceMethod::IsLargest if n > 2 => return Err(Error::IsLargestTooManyArms),
            ImbalanceMethod::OverMaxRange if self.d_max_range.is_none() => {
                return Err(Error::MissingMaxRange);
            }
            _ => {}
        }

        let method = self.probability_method;
        let unequal = ratios.windows(2).any(|w| w[0] != w[1]);
        if method != ProbabilityMethod::BiasedCoin && unequal {
            warnings.push(ConfigWarning::PreferBiasedCoin { method });
        }

        let mut preferred_p = probability::default_preferred_p(n);
        let mut q = probability::default_q(n);
        match method {
            m if m.uses_preferred_p() => {
                preferred_p = match self.preferred_p {
                    Some(p) => p,
                    None => {
                        warnings.push(ConfigWarning::DefaultPreferredP(preferred_p));
                        preferred_p
                    }
                };
                if !probability::preferred_p_valid(preferred_p, n) {
                    return Err(Error::PreferredPOutOfRange { preferred_p, n_arms: n });
                }
            }
            ProbabilityMethod::RankAll => {
                q = match self.q {
                    Some(q) => q,
                    None => {
                        warnings.push(ConfigWarning::DefaultQ(q));
                        q
                    }
                };
                if !probability::q_valid(q, n) {
                    return Err(Error::QOutOfRange { q, n_arms: n });
                }
            }
            _ => {}
        }

        for w in &warnings {
            warn!(target: "smallerize::config", "{w}");
        }

        let policy = Policy {
            d_imbalance_method: self.d_imbalance_method,
            total_imbalance_method: self.total_imbalance_method,
            probability_method: method,
            preferred_p,
            q,
            d_max_range: self.d_max_range,
        };
        Ok((policy, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_all_without_q_warns_and_uses_midpoint() {
        let cfg = MinimizerConfig { probability_method: ProbabilityMethod::RankAll, ..Default::default() };
        let (policy, warnings) = cfg.resolve(&[1, 1]).unwrap();
        assert_eq!(policy.q, probability::default_q(2));
        assert!(warnings.iter().any(|w| w.to_string().contains("q argument was not provided")));
    }

    #[test]
    fn unequal_ratios_suggest_biased_coin() {
        let cfg = MinimizerConfig { preferred_p: Some(0.8), ..Default::default() };
        let (_, warnings) = cfg.resolve(&[1, 2]).unwrap();
        assert!(
            warnings
                .iter()
                .any(|w| w.to_string().contains("NOTE: 'biased_coin' may give better results"))
        );

        let cfg = MinimizerConfig {
            probability_method: ProbabilityMethod::BiasedCoin,
            preferred_p: Some(0.8),
            ..Default::default()
        };
        let (_, warnings) = cfg.resolve(&[1, 2]).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn total_method_parse_error_lists_choices() {
        let err = "waited_some".parse::<TotalImbalanceMethod>().unwrap_err();
        assert!(err.to_string().contains("Imbalance method should be one of:"));
    }

    #[test]
    fn deserializes_snake_case_tags() {
        let cfg: MinimizerConfig = serde_json::from_str(
            r#"{"d_imbalance_method": "marginal_balance", "probability_method": "biased_coin", "preferred_p": 0.7}"#,
        )
        .unwrap();
        assert_eq!(cfg.d_imbalance_method, ImbalanceMethod::MarginalBalance);
        assert_eq!(cfg.probability_method, ProbabilityMethod::BiasedCoin);
        assert_eq!(cfg.total_imbalance_method, TotalImbalanceMethod::Sum);
        assert_eq!(cfg.preferred_p, Some(0.7));
    }

    #[test]
    fn bad_tags_in_json_keep_parse_messages() {
        let err = serde_json::from_str::<MinimizerConfig>(r#"{"total_imbalance_method": "bogus"}"#).unwrap_err();
        assert!(err.to_string().contains("Imbalance method should be one of:"), "{err}");
        let err = serde_json::from_str::<MinimizerConfig>(r#"{"probability_method": "bogus"}"#).unwrap_err();
        assert!(err.to_string().contains("bogus given"), "{err}");
        let err = serde_json::from_str::<MinimizerConfig>(r#"{"d_imbalance_method": "bogus"}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid d_imbalance_method 'bogus'"), "{err}");
    }
}
