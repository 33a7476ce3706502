// src/trial/mod.rs

// Trial state: factors, arms, configuration, the count table and the
// minimizer that ties them together.

pub mod arm;
pub mod config;
pub mod count_table;
pub mod definition;
pub mod factor;
pub mod history;
pub mod minimizer;

pub use arm::Arm;
pub use config::{ConfigWarning, MinimizerConfig, Policy, TotalImbalanceMethod};
pub use count_table::CountTable;
pub use definition::TrialDefinition;
pub use factor::Factor;
pub use minimizer::{AssignmentInfo, Minimizer, OneOrMany};

use std::collections::BTreeMap;

/// Values keyed by arm name.
pub type ArmMap<T> = BTreeMap<String, T>;

/// Values keyed by factor name.
pub type FactorMap<T> = BTreeMap<String, T>;

/// A participant's level for each factor: factor name → level.
pub type Participant = BTreeMap<String, String>;

/// Build a `Participant` from `(factor, level)` pairs.
pub fn participant<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Participant
where
    K: Into<String>,
    V: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
