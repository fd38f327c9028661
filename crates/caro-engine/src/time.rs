//! `TimeManager` / `DepthPlanner` — convert a remaining clock into per-move
//! search bounds and a depth cap (spec §4.12).
//!
//! Grounded on the teacher's `compute_limits`: same base-share-plus-increment
//! shape, generalized with the phase/complexity scaling spec §4.12 adds on
//! top, and feeding a [`SearchControl`](crate::control::SearchControl)
//! exactly the way the teacher's `limits_from_go` does.

use std::time::Duration;

use crate::config::EngineConfig;

/// Game phase, used to pick the expected-moves-left constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opening,
    EarlyMid,
    LateMid,
    Endgame,
}

impl Phase {
    /// Classify by stones already on the board (out of the 225-cell board).
    pub fn for_stone_count(stones: u32) -> Phase {
        match stones {
            0..=9 => Phase::Opening,
            10..=39 => Phase::EarlyMid,
            40..=89 => Phase::LateMid,
            _ => Phase::Endgame,
        }
    }

    /// Expected number of moves left in the game from this phase.
    fn expected_moves_left(self) -> f64 {
        match self {
            Phase::Opening => 40.0,
            Phase::EarlyMid => 30.0,
            Phase::LateMid => 20.0,
            Phase::Endgame => 10.0,
        }
    }
}

/// Result of [`TimeManager::allocate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAllocation {
    pub soft_bound_ms: u64,
    pub hard_bound_ms: u64,
    pub optimal_ms: u64,
    pub phase: Phase,
    pub complexity: f64,
    pub is_emergency: bool,
}

/// Fixed buffer kept unspent to absorb scheduling jitter, regardless of the
/// difficulty's emergency threshold.
const SAFETY_MARGIN_MS: u64 = 50;

/// No-clock fallback allocation (analysis / untimed games).
const UNTIMED_SOFT_MS: u64 = 5_000;
const UNTIMED_HARD_MS: u64 = 10_000;

pub struct TimeManager<'a> {
    config: &'a EngineConfig,
}

impl<'a> TimeManager<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        TimeManager { config }
    }

    /// Translate clock state into soft/hard search bounds.
    ///
    /// `candidate_count` and `open_threats` drive the complexity multiplier;
    /// `difficulty_time_multiplier` comes from `DifficultyParams`.
    #[allow(clippy::too_many_arguments)]
    pub fn allocate(
        &self,
        time_remaining_ms: Option<u64>,
        increment_ms: u64,
        stones_on_board: u32,
        candidate_count: usize,
        open_threats: u32,
        difficulty_time_multiplier: f64,
    ) -> TimeAllocation {
        let phase = Phase::for_stone_count(stones_on_board);
        let complexity = complexity_multiplier(candidate_count, open_threats);

        let Some(remaining) = time_remaining_ms else {
            return TimeAllocation {
                soft_bound_ms: UNTIMED_SOFT_MS,
                hard_bound_ms: UNTIMED_HARD_MS,
                optimal_ms: UNTIMED_SOFT_MS,
                phase,
                complexity,
                is_emergency: false,
            };
        };

        let is_emergency = remaining < self.config.emergency_time_ms;
        let remaining_f = remaining as f64;
        let safety = SAFETY_MARGIN_MS as f64;
        let usable = (remaining_f - safety).max(1.0);

        let base = usable / phase.expected_moves_left() + 0.8 * increment_ms as f64;
        let soft = (base * complexity * difficulty_time_multiplier).max(1.0);
        let hard = (2.0 * soft).min((remaining_f - safety).max(1.0));

        TimeAllocation {
            soft_bound_ms: soft as u64,
            hard_bound_ms: hard.max(soft).max(1.0) as u64,
            optimal_ms: soft as u64,
            phase,
            complexity,
            is_emergency,
        }
    }
}

/// `[0.5, 2.0]` multiplier from how many candidates are live and how many
/// open forcing threats exist in the position.
fn complexity_multiplier(candidate_count: usize, open_threats: u32) -> f64 {
    let from_candidates = candidate_count as f64 / 40.0;
    let from_threats = open_threats as f64 * 0.2;
    (0.5 + from_candidates + from_threats).clamp(0.5, 2.0)
}

impl TimeAllocation {
    pub fn soft_bound(&self) -> Duration {
        Duration::from_millis(self.soft_bound_ms)
    }

    pub fn hard_bound(&self) -> Duration {
        Duration::from_millis(self.hard_bound_ms)
    }
}

/// Caps iterative-deepening depth from the soft time bound and search speed.
pub struct DepthPlanner;

impl DepthPlanner {
    /// `d = log(soft_bound * nps) / log(ebf)`, clamped to `[min_depth, 15]`.
    pub fn max_depth(soft_bound_ms: u64, min_depth: u8, nps: f64, ebf: f64) -> u8 {
        let soft_seconds = (soft_bound_ms as f64 / 1000.0).max(0.001);
        let ebf = ebf.max(1.01);
        let raw = (soft_seconds * nps.max(1.0)).ln() / ebf.ln();
        let depth = raw.round().clamp(min_depth as f64, 15.0);
        depth as u8
    }

    /// Whether another iteration is likely to finish inside the soft bound.
    pub fn should_continue(elapsed_ms: u64, soft_bound_ms: u64, ebf: f64) -> bool {
        let remaining = soft_bound_ms as f64 - elapsed_ms as f64;
        remaining >= 0.8 * elapsed_ms as f64 * ebf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_buckets_by_stone_count() {
        assert_eq!(Phase::for_stone_count(0), Phase::Opening);
        assert_eq!(Phase::for_stone_count(20), Phase::EarlyMid);
        assert_eq!(Phase::for_stone_count(50), Phase::LateMid);
        assert_eq!(Phase::for_stone_count(150), Phase::Endgame);
    }

    #[test]
    fn allocate_untimed_uses_fallback() {
        let config = EngineConfig::default();
        let tm = TimeManager::new(&config);
        let allocation = tm.allocate(None, 0, 10, 20, 0, 1.0);
        assert!(!allocation.is_emergency);
        assert_eq!(allocation.soft_bound_ms, UNTIMED_SOFT_MS);
    }

    #[test]
    fn allocate_flags_emergency_below_threshold() {
        let config = EngineConfig::default();
        let tm = TimeManager::new(&config);
        let allocation = tm.allocate(Some(500), 0, 10, 10, 0, 1.0);
        assert!(allocation.is_emergency);
    }

    #[test]
    fn hard_bound_never_exceeds_remaining_minus_safety() {
        let config = EngineConfig::default();
        let tm = TimeManager::new(&config);
        let allocation = tm.allocate(Some(10_000), 0, 5, 30, 3, 2.0);
        assert!(allocation.hard_bound_ms <= 10_000 - SAFETY_MARGIN_MS);
    }

    #[test]
    fn higher_difficulty_multiplier_allocates_more_time() {
        let config = EngineConfig::default();
        let tm = TimeManager::new(&config);
        let low = tm.allocate(Some(60_000), 0, 10, 15, 0, 0.3);
        let high = tm.allocate(Some(60_000), 0, 10, 15, 0, 1.2);
        assert!(high.soft_bound_ms > low.soft_bound_ms);
    }

    #[test]
    fn complexity_multiplier_is_bounded() {
        assert!(complexity_multiplier(0, 0) >= 0.5);
        assert!(complexity_multiplier(1000, 50) <= 2.0);
    }

    #[test]
    fn depth_planner_clamps_to_min_and_max() {
        let d = DepthPlanner::max_depth(1, 2, 1.0, 3.0);
        assert!(d >= 2);
        let d = DepthPlanner::max_depth(1_000_000_000, 2, 1_000_000.0, 1.5);
        assert!(d <= 15);
    }

    #[test]
    fn should_continue_true_when_plenty_of_budget_left() {
        assert!(DepthPlanner::should_continue(100, 10_000, 2.0));
    }

    #[test]
    fn should_continue_false_when_budget_nearly_spent() {
        assert!(!DepthPlanner::should_continue(9_000, 10_000, 3.0));
    }
}
