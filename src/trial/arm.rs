//! Treatment arms.

use std::fmt;

use serde::Deserialize;

use crate::error::{Error, Result};

/// A treatment arm with an integer allocation ratio (e.g. 1:2:1 over A, B, C).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ArmSpec")]
pub struct Arm {
    name: String,
    allocation_ratio: u32,
}

/// Untyped form used by trial definitions; the ratio may arrive as any number.
#[derive(Deserialize)]
struct ArmSpec {
    name: String,
    #[serde(default = "default_ratio")]
    allocation_ratio: f64,
}

fn default_ratio() -> f64 {
    1.0
}

impl TryFrom<ArmSpec> for Arm {
    type Error = Error;

    fn try_from(spec: ArmSpec) -> Result<Self> {
        Arm::from_ratio(spec.name, spec.allocation_ratio)
    }
}

impl Arm {
    /// Arm with allocation ratio 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), allocation_ratio: 1 }
    }

    /// Ratio 0 is rejected.
    pub fn with_ratio(name: impl Into<String>, allocation_ratio: u32) -> Result<Self> {
        let name = name.into();
        if allocation_ratio == 0 {
            return Err(Error::InvalidAllocationRatio { arm: name, ratio: 0.0 });
        }
        Ok(Self { name, allocation_ratio })
    }

    /// Checked conversion from an arbitrary number: only whole numbers ≥ 1
    /// that fit in `u32` are accepted.
    pub fn from_ratio(name: impl Into<String>, ratio: f64) -> Result<Self> {
        let name = name.into();
        let whole = ratio.is_finite() && ratio.fract() == 0.0 && ratio >= 1.0 && ratio <= f64::from(u32::MAX);
        if !whole {
            return Err(Error::InvalidAllocationRatio { arm: name, ratio });
        }
        Ok(Self { name, allocation_ratio: ratio as u32 })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn allocation_ratio(&self) -> u32 {
        self.allocation_ratio
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arm({}, allocation_ratio={})", self.name, self.allocation_ratio)
    }
}
