//! Trial definitions read from JSON: factors, arms and minimizer settings in
//! one document.
//!
//! ```json
//! {
//!   "factors": [{"name": "Sex", "levels": ["Male", "Female"], "weight": 2.0}],
//!   "arms": [{"name": "Drug", "allocation_ratio": 2}, {"name": "Placebo"}],
//!   "d_imbalance_method": "range",
//!   "probability_method": "biased_coin",
//!   "preferred_p": 0.8,
//!   "seed": 7
//! }
//! ```

use serde::Deserialize;

use crate::error::Result;
use crate::trial::{Arm, Factor, Minimizer, MinimizerConfig};

#[derive(Clone, Debug, Deserialize)]
pub struct TrialDefinition {
    pub factors: Vec<Factor>,
    pub arms: Vec<Arm>,
    #[serde(flatten)]
    pub config: MinimizerConfig,
}

impl TrialDefinition {
    /// Parse and validate factors and arms. Method arguments are checked by
    /// `into_minimizer`, since their bounds depend on the number of arms.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_reader(r: impl std::io::Read) -> Result<Self> {
        Ok(serde_json::from_reader(r)?)
    }

    pub fn into_minimizer(self) -> Result<Minimizer> {
        Minimizer::new(self.factors, self.arms, self.config)
    }
}
