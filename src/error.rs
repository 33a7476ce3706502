// src/error.rs

//! Error type shared by the whole crate.
//!
//! Construction-time problems (factors, arms, methods, method arguments),
//! call-time problems (participants the trial does not know about) and input
//! problems (history files, trial definitions) all surface here. Several
//! messages are matched on by callers, so keep their wording stable.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// A factor was given fewer than two levels.
    #[error("Factors must have 2 or more levels (factor '{factor}')")]
    NotEnoughLevels { factor: String },

    /// A factor listed the same level twice.
    #[error("Factor levels must be distinct: '{level}' repeated in factor '{factor}'")]
    DuplicateLevel { factor: String, level: String },

    /// Zero, negative or non-finite factor weight.
    #[error("Factor weight must be a positive number (factor '{factor}', got {weight})")]
    InvalidWeight { factor: String, weight: f64 },

    /// Fractional, non-finite or non-positive allocation ratio.
    #[error("Allocation ratio must be an integer. Arm '{arm}' got {ratio}; ratios are whole numbers >= 1")]
    InvalidAllocationRatio { arm: String, ratio: f64 },

    #[error("A minimizer needs at least one factor")]
    NoFactors,

    #[error("A minimizer needs at least 2 arms, {0} given")]
    NotEnoughArms(usize),

    #[error("Factor names must be unique: '{0}' repeated")]
    DuplicateFactor(String),

    #[error("Arm names must be unique: '{0}' repeated")]
    DuplicateArm(String),

    #[error("Invalid d_imbalance_method '{0}'. See ImbalanceMethod::ALL for available methods.")]
    InvalidImbalanceMethod(String),

    #[error("Can't use 'is_largest' with more than 2 arms.")]
    IsLargestTooManyArms,

    #[error("If using 'over_max_range', you must supply an additional argument d_max_range")]
    MissingMaxRange,

    #[error("Imbalance method should be one of: [\"sum\", \"weighted_sum\"], '{0}' given")]
    InvalidTotalImbalanceMethod(String),

    #[error("Probability method must be one of {allowed:?}, {given} given")]
    InvalidProbabilityMethod {
        allowed: &'static [&'static str],
        given: String,
    },

    #[error("preferred_p must be between (1 / N) and 1, got {preferred_p} with N = {n_arms}")]
    PreferredPOutOfRange { preferred_p: f64, n_arms: usize },

    #[error("q must be between 1 / N and 2 / (N - 1), got {q} with N = {n_arms}")]
    QOutOfRange { q: f64, n_arms: usize },

    #[error("Unknown factor '{0}' is not part of this trial")]
    UnknownFactor(String),

    #[error("Unknown level '{level}' for factor '{factor}'")]
    UnknownLevel { factor: String, level: String },

    #[error("Unknown arm '{0}' is not part of this trial")]
    UnknownArm(String),

    /// Participant mapping did not cover every trial factor.
    #[error("All factors in the trial must be in factor_levels. Missing: {missing:?}")]
    MissingFactors { missing: Vec<String> },

    #[error("Imbalance scores must cover every arm exactly once, missing '{0}'")]
    IncompleteImbalances(String),

    #[error("Cannot draw an arm: no arm has positive probability")]
    EmptyDistribution,

    #[error("Probability method '{0}' needs imbalance scores")]
    MissingImbalances(&'static str),

    #[error("History line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Trial definition error: {0}")]
    Json(#[from] serde_json::Error),
}
