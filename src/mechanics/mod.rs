pub mod imbalance;
pub mod probability;
pub mod stoch;

pub use imbalance::{ImbalanceMethod, ScoreContext, Scorer};
pub use probability::ProbabilityMethod;
