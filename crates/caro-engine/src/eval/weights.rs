//! Tunable scoring weights for the pattern evaluator.
//!
//! These are parameters, not constants baked into the algorithm (see
//! spec §4.3): the ordering properties tested in `pattern.rs` must hold
//! for any sane weight set, not just the recommended one below.

use crate::config::EngineConfig;

/// One evaluator weight set. `Default` gives the recommended values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalWeights {
    /// Five-in-a-row (or longer, unless sandwiched).
    pub w5: i32,
    /// Open four (`open_ends >= 1` at length 4).
    pub w_open_four: i32,
    /// Closed four (`open_ends == 0` at length 4).
    pub w_closed_four: i32,
    /// Open three (either end open, length 3).
    pub w_open_three: i32,
    /// Closed three (both ends blocked, length 3).
    pub w_closed_three: i32,
    /// Open two (both ends open, length 2).
    pub w_open_two: i32,
    /// Center-zone bonus peak (at the exact center cell).
    pub center: i32,
    /// Chebyshev radius of the center-bonus zone around `(7, 7)` (spec §6
    /// `center_zone_radius`).
    pub center_zone_radius: i32,
    /// Defense multiplier applied to the opponent's sum, as `num/den`.
    pub defense_multiplier_num: i32,
    pub defense_multiplier_den: i32,
}

impl Default for EvalWeights {
    fn default() -> Self {
        EvalWeights {
            w5: 100_000,
            w_open_four: 10_000,
            w_closed_four: 1_000,
            w_open_three: 1_000,
            w_closed_three: 100,
            w_open_two: 100,
            center: 50,
            center_zone_radius: 2,
            defense_multiplier_num: 3,
            defense_multiplier_den: 2,
        }
    }
}

impl EvalWeights {
    /// Build a weight set whose configurable knobs (`center_zone_radius`,
    /// `defense_multiplier_num/den`, spec §6) come from `config`, keeping
    /// the scoring weights themselves at their recommended defaults.
    pub fn from_config(config: &EngineConfig) -> Self {
        EvalWeights {
            center_zone_radius: config.center_zone_radius as i32,
            defense_multiplier_num: config.defense_multiplier_num,
            defense_multiplier_den: config.defense_multiplier_den,
            ..EvalWeights::default()
        }
    }
}
