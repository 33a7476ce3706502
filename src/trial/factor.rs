//! Prognostic factors: the stratification variables balanced across arms.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;

use bevy_prng::WyRand;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::mechanics::stoch;

/// A factor with two or more categorical levels, e.g. `Sex = {Male, Female}`.
///
/// `weight` only matters for `weighted_sum` total imbalance.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "FactorSpec")]
pub struct Factor {
    name: String,
    levels: Vec<String>,
    weight: f64,
}

#[derive(Deserialize)]
struct FactorSpec {
    name: String,
    levels: Vec<String>,
    #[serde(default = "default_weight")]
    weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl TryFrom<FactorSpec> for Factor {
    type Error = Error;

    fn try_from(spec: FactorSpec) -> Result<Self> {
        Factor::weighted(spec.name, spec.levels, spec.weight)
    }
}

impl Factor {
    /// Factor with weight 1.0.
    pub fn new<I, S>(name: impl Into<String>, levels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::weighted(name, levels, 1.0)
    }

    pub fn weighted<I, S>(name: impl Into<String>, levels: I, weight: f64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let levels: Vec<String> = levels.into_iter().map(Into::into).collect();
        if levels.len() < 2 {
            return Err(Error::NotEnoughLevels { factor: name });
        }
        let mut seen = HashSet::with_capacity(levels.len());
        for l in &levels {
            if !seen.insert(l.as_str()) {
                return Err(Error::DuplicateLevel { factor: name, level: l.clone() });
            }
        }
        if !(weight.is_finite() && weight > 0.0) {
            return Err(Error::InvalidWeight { factor: name, weight });
        }
        Ok(Self { name, levels, weight })
    }

    /// Same factor with a new weight (validated again).
    pub fn with_weight(&self, weight: f64) -> Result<Self> {
        Self::weighted(self.name.clone(), self.levels.iter().cloned(), weight)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Position of `level` in this factor's level order.
    pub fn level_index(&self, level: &str) -> Option<usize> {
        self.levels.iter().position(|l| l == level)
    }

    /// One level, all levels equally likely.
    pub fn get_random_level(&self, rng: &RefCell<WyRand>) -> &str {
        &self.levels[stoch::uniform_index(rng, self.levels.len())]
    }

    /// `n` levels drawn with replacement.
    pub fn get_random_level_multiple(&self, n: usize, rng: &RefCell<WyRand>) -> Vec<&str> {
        (0..n).map(|_| self.get_random_level(rng)).collect()
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Factor({}, levels=(", self.name)?;
        for (i, l) in self.levels.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{l}'")?;
        }
        f.write_str("))")
    }
}
