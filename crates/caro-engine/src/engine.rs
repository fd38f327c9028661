//! Top-level search entry point (spec §4.10, §6): `Engine::best_move`.
//!
//! Grounded on the teacher's `UciEngine::handle_go`/`Searcher::search` pair
//! in `cesso-uci`/`cesso-engine` — a long-lived object that owns the
//! transposition table and heuristic state across moves, translates clock
//! state into bounds via a time manager, and drives iterative deepening
//! until a bound or a mate score stops it — generalized past UCI's
//! `info`/`bestmove` protocol into the plain [`SearchOutcome`] record §6
//! names, and extended with the Open Rule, a critical-defense preguard, and
//! a VCF pre-check that the teacher's chess search has no counterpart for.

use std::cell::{Cell as StdCell, RefCell};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use caro_core::{Cell, Position, Side};

use crate::config::{Difficulty, EngineConfig};
use crate::control::SearchControl;
use crate::eval::{EvalWeights, evaluate_with};
use crate::heuristics::Heuristics;
use crate::lazy_smp::LazySmpPool;
use crate::movepicker::candidate_cells;
use crate::search_core::{INF, MATE_THRESHOLD, PvTable, SearchContext, aspiration_search};
use crate::telemetry::SearchTelemetry;
use crate::threats::{ThreatKind, detect_threats, is_forcing};
use crate::time::{DepthPlanner, TimeManager};
use crate::tt::TranspositionTable;
use crate::vcf::{VcfOutcome, VcfSolver};

use tracing::{debug, trace};

/// Everything the caller learns about one completed search (spec §6).
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub mv: Cell,
    pub depth_reached: u8,
    pub nodes: u64,
    pub score: i32,
    pub pv: Vec<Cell>,
    pub time_spent_ms: u64,
    pub tt_hit_rate: f32,
    pub vcf_hit: bool,
}

/// Tiny seeded xorshift used only to pick the Beginner/Easy "error move"
/// substitution — no property-testing or game-logic randomness depends on
/// it, so it doesn't warrant pulling in `rand`.
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Rng(seed.max(1))
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = (self.next_u64() % items.len() as u64) as usize;
        items.get(idx)
    }
}

/// A long-lived search engine: owns the transposition tables, VCF cache,
/// and heuristic state across moves within one game (spec §6
/// Configuration). Grounded on the teacher's `Searcher`, which owns its TT
/// across `go` commands the same way.
pub struct Engine {
    tt: RefCell<TranspositionTable>,
    pool: LazySmpPool,
    vcf: RefCell<VcfSolver>,
    heuristics: RefCell<Heuristics>,
    telemetry: RefCell<SearchTelemetry>,
    config: EngineConfig,
    age: StdCell<u8>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            tt: RefCell::new(TranspositionTable::new(config.tt_size_mb)),
            pool: LazySmpPool::new(config.tt_size_mb, config.tt_shard_count),
            vcf: RefCell::new(VcfSolver::new()),
            heuristics: RefCell::new(Heuristics::new()),
            telemetry: RefCell::new(SearchTelemetry::new()),
            config,
            age: StdCell::new(1),
        }
    }

    /// Drop all accumulated search state (new game).
    pub fn clear(&self) {
        self.tt.borrow_mut().clear();
        self.pool.clear();
        *self.heuristics.borrow_mut() = Heuristics::new();
        *self.telemetry.borrow_mut() = SearchTelemetry::new();
        self.age.set(1);
    }

    fn next_age(&self) -> u8 {
        self.tt.borrow_mut().increment_age();
        let age = (self.age.get() % 63) + 1;
        self.age.set(age);
        age
    }

    /// Find the best move for `side_to_move` in `position` (spec §4.10, §6).
    /// Always returns a legal move when one exists.
    #[allow(clippy::too_many_arguments)]
    pub fn best_move(
        &self,
        position: &Position,
        side_to_move: Side,
        difficulty: Difficulty,
        time_remaining_ms: Option<u64>,
        increment_ms: u64,
        move_number: u32,
        pondering_enabled: bool,
    ) -> SearchOutcome {
        let start = Instant::now();
        let params = difficulty.params();
        let age = self.next_age();

        // Step 1: candidate generation, honoring the Open Rule on the
        // literal third move of the game. The Open Rule binds exactly once
        // per game and the adjacency-based candidates at that point are
        // likely to sit entirely inside the forbidden zone, so it is
        // resolved directly here by one-ply evaluation across the whole
        // board rather than threading a root-only restriction through the
        // general search.
        if move_number == 3 && position.occupied().popcount() + 1 == 3 {
            if let Some(mv) = open_rule_move(position, side_to_move, params.open_rule_zone, &self.config) {
                debug!(?mv, "open rule restricted the third move");
                let score = evaluate_with(position, side_to_move, &EvalWeights::from_config(&self.config));
                return self.finish(mv, 0, 0, score, vec![mv], start, false);
            }
        }

        let mut candidates = candidate_cells(position);
        if candidates.is_empty() {
            candidates = position.legal_moves_mask().iter_set_bits().collect();
        }

        let opponent_threats: Vec<ThreatKind> =
            detect_threats(position, !side_to_move).iter().filter(|t| is_forcing(t.kind)).map(|t| t.kind).collect();

        // Step 2: time allocation.
        let time_manager = TimeManager::new(&self.config);
        let allocation = time_manager.allocate(
            time_remaining_ms,
            increment_ms,
            position.occupied().popcount(),
            candidates.len(),
            opponent_threats.len() as u32,
            params.time_multiplier,
        );

        let stopped = Arc::new(AtomicBool::new(false));
        let control = if pondering_enabled {
            SearchControl::new_ponder(stopped, allocation.soft_bound(), allocation.hard_bound())
        } else if time_remaining_ms.is_some() {
            SearchControl::new_timed(stopped, allocation.soft_bound(), allocation.hard_bound())
        } else {
            SearchControl::new_infinite(stopped)
        };

        trace!(phase = allocation.phase as u8, soft = allocation.soft_bound_ms, hard = allocation.hard_bound_ms, "time allocated");

        // Step 3: emergency path — a TT-only move at sufficient depth.
        if allocation.is_emergency && difficulty.is_at_least_medium() {
            if let Some(mv) = self.emergency_tt_move(position) {
                debug!(?mv, "emergency path: returning TT move");
                return self.finish(mv, 0, 0, 0, vec![mv], start, false);
            }
        }

        // Step 4: critical defense preguard.
        if difficulty.is_at_least_medium() {
            if let Some(mv) = critical_defense_move(position, side_to_move) {
                debug!(?mv, "critical defense preguard triggered");
                return self.finish(mv, 0, 0, MATE_THRESHOLD - 1, vec![mv], start, false);
            }
        }

        // Step 5: VCF pre-check with a small slice of the soft bound.
        let vcf_budget_ms = (allocation.soft_bound_ms / 10).max(1);
        let mut vcf_hit = false;
        {
            let mut solver = self.vcf.borrow_mut();
            solver.new_search();
            let result = solver.solve(position, side_to_move, vcf_budget_ms, None);
            if let VcfOutcome::Win(mv) = result.outcome {
                debug!(?mv, nodes = result.nodes, "VCF pre-check found a forced win");
                vcf_hit = true;
                return self.finish(mv, result.depth as u8, result.nodes, MATE_THRESHOLD, vec![mv], start, vcf_hit);
            }
        }

        // Step 6: iterative deepening, single-threaded or Lazy-SMP.
        let helper_threads = self.config.helper_threads(difficulty);
        let telemetry_snapshot = {
            let t = self.telemetry.borrow();
            (t.nps(), t.ebf())
        };
        let max_depth = DepthPlanner::max_depth(allocation.soft_bound_ms, params.min_depth, telemetry_snapshot.0, telemetry_snapshot.1);

        let (mut mv, score, depth_reached, nodes, pv) = if helper_threads > 0 {
            let mut telemetry = self.telemetry.borrow_mut();
            let result =
                self.pool.search(position, side_to_move, max_depth, &self.config, &control, helper_threads + 1, age, &mut telemetry);
            (result.best_move, result.score, result.depth_reached, result.nodes, result.pv)
        } else {
            self.search_single_threaded(position, side_to_move, max_depth, &control, age)
        };

        if mv.is_none() {
            mv = candidates.first().copied().or_else(|| position.legal_moves_mask().iter_set_bits().next());
        }

        let mut mv = mv.expect("a legal move must exist whenever the board is not full");

        // Difficulty error rate: substitute a random legal move.
        if params.error_rate > 0.0 {
            let seed = position.hash() ^ (move_number as u64) ^ 0xC4B0_0B1E_u64;
            let mut rng = Rng::new(seed);
            let roll = (rng.next_u64() % 10_000) as f64 / 10_000.0;
            if roll < params.error_rate {
                if let Some(&random_mv) = rng.pick(&candidates) {
                    debug!(?random_mv, "difficulty error rate substituted a weaker move");
                    mv = random_mv;
                }
            }
        }

        // Step 7: record telemetry and return.
        self.telemetry.borrow_mut().record_iteration(nodes, start.elapsed());
        self.finish(mv, depth_reached, nodes, score, pv, start, vcf_hit)
    }

    fn finish(
        &self,
        mv: Cell,
        depth_reached: u8,
        nodes: u64,
        score: i32,
        pv: Vec<Cell>,
        start: Instant,
        vcf_hit: bool,
    ) -> SearchOutcome {
        SearchOutcome {
            mv,
            depth_reached,
            nodes,
            score,
            pv,
            time_spent_ms: start.elapsed().as_millis() as u64,
            tt_hit_rate: 0.0,
            vcf_hit,
        }
    }

    /// Depth-≥5 TT-only move, used by the emergency path (spec §4.10 step 3).
    fn emergency_tt_move(&self, position: &Position) -> Option<Cell> {
        let probe = self.tt.borrow().lookup(position.hash(), 5, -INF, INF)?;
        if probe.depth < 5 {
            return None;
        }
        probe.mv.cell()
    }

    fn search_single_threaded(
        &self,
        position: &Position,
        root_side: Side,
        max_depth: u8,
        control: &SearchControl,
        age: u8,
    ) -> (Option<Cell>, i32, u8, u64, Vec<Cell>) {
        let mut heuristics = self.heuristics.borrow_mut();

        let mut best_move = None;
        let mut best_score = -INF;
        let mut best_depth = 0u8;
        let mut total_nodes = 0u64;
        let mut best_pv = Vec::new();
        let mut prev_score = 0i32;
        let mut last_move: Option<Cell> = None;
        let mut stable_iterations = 0u32;

        for depth in 1..=max_depth {
            if control.should_stop_iterating() {
                break;
            }

            let mut ctx = SearchContext {
                nodes: total_nodes,
                tt: &self.tt,
                pv: PvTable::new(),
                control,
                heuristics: &mut heuristics,
                prev_moves: Vec::new(),
                root_side,
                config: &self.config,
                age,
                thread_index: 0,
            };

            let score = aspiration_search(position, depth as i32, prev_score, &mut ctx);

            if control.should_stop(ctx.nodes) {
                total_nodes = ctx.nodes;
                break;
            }

            prev_score = score;
            total_nodes = ctx.nodes;
            let pv = ctx.pv.root_pv();
            if !pv.is_empty() {
                best_move = Some(pv[0]);
                best_pv = pv;
            }
            best_score = score;
            best_depth = depth;

            if best_move == last_move {
                stable_iterations += 1;
            } else {
                stable_iterations = 0;
            }
            last_move = best_move;
            control.update_soft_scale((100 - 15 * stable_iterations as i32).max(40));

            trace!(depth, score, nodes = total_nodes, "iteration complete");

            if score.abs() >= MATE_THRESHOLD {
                break;
            }
            if stable_iterations >= 2 && control.should_stop_iterating() {
                break;
            }
        }

        (best_move, best_score, best_depth, total_nodes, best_pv)
    }
}

/// Enforce the Open Rule (spec §4.10 step 1): on the third move of the
/// game, the `zone_size x zone_size` square around the center is off
/// limits. Picks the best-evaluated cell from everywhere else on the board.
fn open_rule_move(position: &Position, side_to_move: Side, zone_size: u8, config: &EngineConfig) -> Option<Cell> {
    let radius = (zone_size / 2) as u8;
    let weights = EvalWeights::from_config(config);
    position
        .legal_moves_mask()
        .iter_set_bits()
        .filter(|c| c.chebyshev_distance(Cell::CENTER) > radius)
        .max_by_key(|&c| {
            let mut trial = *position;
            if trial.place(c, side_to_move).is_err() {
                return i32::MIN;
            }
            evaluate_with(&trial, side_to_move, &weights)
        })
}

/// If the opponent holds a live `StraightFour`/`BrokenFour` or an open
/// three, return the blocking gain square closest to the center (spec
/// §4.10 step 4).
fn critical_defense_move(position: &Position, side_to_move: Side) -> Option<Cell> {
    let threats = detect_threats(position, !side_to_move);
    let mut best: Option<Cell> = None;
    for threat in &threats {
        if !matches!(threat.kind, ThreatKind::StraightFour | ThreatKind::BrokenFour | ThreatKind::StraightThree) {
            continue;
        }
        for &gain in &threat.gain_squares {
            let better = match best {
                None => true,
                Some(current) => gain.center_distance() < current.center_distance(),
            };
            if better {
                best = Some(gain);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_immediate_win_for_the_attacker() {
        let mut pos = Position::empty();
        for x in 5..9u8 {
            pos.place(Cell::new(x, 7).unwrap(), Side::Red).unwrap();
        }
        let engine = Engine::new(EngineConfig::default());
        let outcome = engine.best_move(&pos, Side::Red, Difficulty::Medium, Some(5_000), 0, 9, false);
        let winning = [Cell::new(4, 7).unwrap(), Cell::new(9, 7).unwrap()];
        assert!(winning.contains(&outcome.mv), "expected a completing move, got {:?}", outcome.mv);
        assert!(outcome.vcf_hit || outcome.score >= MATE_THRESHOLD);
    }

    #[test]
    fn blocks_a_live_opponent_four() {
        let mut pos = Position::empty();
        for x in 5..9u8 {
            pos.place(Cell::new(x, 7).unwrap(), Side::Blue).unwrap();
        }
        pos.place(Cell::new(0, 0).unwrap(), Side::Red).unwrap();
        let engine = Engine::new(EngineConfig::default());
        let outcome = engine.best_move(&pos, Side::Red, Difficulty::Hard, Some(5_000), 0, 10, false);
        let blocking = [Cell::new(4, 7).unwrap(), Cell::new(9, 7).unwrap()];
        assert!(blocking.contains(&outcome.mv), "expected a blocking move, got {:?}", outcome.mv);
    }

    #[test]
    fn open_rule_forbids_the_center_zone_on_the_third_move() {
        let mut pos = Position::empty();
        pos.place(Cell::CENTER, Side::Red).unwrap();
        pos.place(Cell::new(0, 0).unwrap(), Side::Blue).unwrap();
        let mv = open_rule_move(&pos, Side::Blue, 3, &EngineConfig::default()).expect("a move outside the zone must exist");
        assert!(mv.chebyshev_distance(Cell::CENTER) > 1);
    }

    #[test]
    fn engine_best_move_honors_the_open_rule_on_move_three() {
        let mut pos = Position::empty();
        pos.place(Cell::CENTER, Side::Red).unwrap();
        pos.place(Cell::new(8, 8).unwrap(), Side::Blue).unwrap();
        let engine = Engine::new(EngineConfig::default());
        let outcome = engine.best_move(&pos, Side::Red, Difficulty::Hard, Some(2_000), 0, 3, false);
        let radius = (Difficulty::Hard.params().open_rule_zone / 2) as u8;
        assert!(outcome.mv.chebyshev_distance(Cell::CENTER) > radius, "move {:?} fell inside the open-rule zone", outcome.mv);
    }

    #[test]
    fn always_returns_a_legal_move_on_a_near_empty_board() {
        let pos = Position::empty();
        let engine = Engine::new(EngineConfig::default());
        let outcome = engine.best_move(&pos, Side::Red, Difficulty::Beginner, Some(1_000), 0, 1, false);
        assert!(pos.is_empty(outcome.mv));
    }

    #[test]
    fn a_short_clock_still_returns_a_legal_move() {
        let mut pos = Position::empty();
        pos.place(Cell::CENTER, Side::Red).unwrap();
        pos.place(Cell::new(8, 8).unwrap(), Side::Blue).unwrap();
        let engine = Engine::new(EngineConfig::default());
        let outcome = engine.best_move(&pos, Side::Red, Difficulty::Easy, Some(200), 0, 3, false);
        assert!(pos.is_empty(outcome.mv));
    }
}
