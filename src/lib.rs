/*!
`smallerize` — covariate-adaptive randomization by minimization.

What it does
- Keeps prognostic factors (sex, age band, site, …) balanced across treatment
  arms as participants enroll one at a time (Pocock & Simon 1975).
- For each new participant, scores the imbalance that every candidate arm
  would cause, turns those scores into assignment probabilities, and draws an
  arm.
- Honors unequal allocation ratios (2:1, 1:2:3, …) via ratio-normalized
  counts and the biased coin policy of Han et al. (2009).

How to use (call surface only)
- Build `Factor`s and `Arm`s.
- Pick a `MinimizerConfig`:
  * `d_imbalance_method`: `range`, `standard_deviation`, `variance`,
    `marginal_balance`, `is_largest`, `over_max_range`
  * `total_imbalance_method`: `sum`, `weighted_sum`
  * `probability_method`: `best_only`, `biased_coin`, `rank_all`, `pure_random`
  * method arguments `preferred_p`, `q`, `d_max_range`, and an optional `seed`.
- `Minimizer::new(factors, arms, config)`, optionally seed it with
  `add_existing_participant` / `load_history`, then call
  `assign_participant` (commit) or `get_assignment_info` (preview or commit).

What it does NOT do
- No persistence, no trial logistics, no reporting. Callers own records and
  must serialize access to a `Minimizer` shared between clients.
*/

pub mod error;
pub mod mechanics;
#[cfg(feature = "simulation")]
pub mod simulation;
pub mod trial;

pub use error::{Error, Result};
pub use mechanics::{ImbalanceMethod, ProbabilityMethod};
pub use trial::{
    Arm, ArmMap, AssignmentInfo, ConfigWarning, CountTable, Factor, FactorMap, Minimizer, MinimizerConfig,
    OneOrMany, Participant, TotalImbalanceMethod, TrialDefinition, participant,
};
