//! Lazy-SMP parallel search driver (spec §4.11).
//!
//! Grounded on the teacher's `search/pool.rs` `ThreadPool` — the
//! `std::thread::scope` fan-out with the master running inline on the
//! calling thread and helpers writing only to the shared table — but
//! redesigned per spec §4.11/§5: the shared table is the sharded
//! [`LockFreeTt`] (not a single lockless table), helpers carry their own
//! RNG-seeded exploration jitter instead of sharing the master's
//! heuristics, and final move selection is master-authoritative with an
//! explicit three-stage fallback instead of "whichever thread finishes".
//!
//! `StabilityTracker` has no counterpart in the teacher's present source
//! (only its call site in `pool.rs` survived); it is reconstructed here
//! from that usage alone — see `DESIGN.md`.

use std::time::Instant;

use tracing::{debug, trace};

use caro_core::{Cell, Position, Side};

use crate::config::EngineConfig;
use crate::control::SearchControl;
use crate::heuristics::Heuristics;
use crate::search_core::{INF, MATE_THRESHOLD, SearchContext, aspiration_search};
use crate::telemetry::SearchTelemetry;
use crate::tt::LockFreeTt;

/// Tracks how long the root best move has stayed the same across
/// iterations, scaling the soft time bound down as the search stabilizes.
pub struct StabilityTracker {
    last_move: Option<Cell>,
    consecutive: u32,
}

impl StabilityTracker {
    pub fn new() -> Self {
        StabilityTracker { last_move: None, consecutive: 0 }
    }

    /// Record one completed iteration's result; returns the soft-scale
    /// factor in hundredths (100 = neutral, floor 40 = think much less).
    pub fn update(&mut self, completed_move: Option<Cell>, _score: i32) -> i32 {
        if completed_move.is_some() && completed_move == self.last_move {
            self.consecutive += 1;
        } else {
            self.consecutive = 0;
        }
        self.last_move = completed_move;
        (100 - 15 * self.consecutive as i32).max(40)
    }
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal deterministic RNG for helper exploration diversity, seeded from
/// `thread_index + wallclock` (spec §4.11 step "RNG seeded from thread
/// index and wallclock").
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

    /// Inclusive `[lo, hi]`.
    fn range_i32(&mut self, lo: i32, hi: i32) -> i32 {
        let span = (hi - lo + 1).max(1) as u64;
        lo + (self.next_u64() % span) as i32
    }
}

/// One worker's contribution to the pool search.
#[derive(Clone, Debug)]
pub struct WorkerResult {
    pub best_move: Option<Cell>,
    pub score: i32,
    pub depth_reached: u8,
    pub nodes: u64,
    pub pv: Vec<Cell>,
}

impl WorkerResult {
    fn empty() -> Self {
        WorkerResult { best_move: None, score: -INF, depth_reached: 0, nodes: 0, pv: Vec::new() }
    }
}

/// Final outcome of a pool search, after aggregation (spec §4.11 step 4).
pub struct PoolResult {
    pub best_move: Option<Cell>,
    pub score: i32,
    pub depth_reached: u8,
    pub nodes: u64,
    pub pv: Vec<Cell>,
}

/// Owns the shared lock-free transposition table for a Lazy-SMP search pool.
pub struct LazySmpPool {
    tt: LockFreeTt,
}

impl LazySmpPool {
    pub fn new(tt_size_mb: usize, shard_count: usize) -> Self {
        LazySmpPool { tt: LockFreeTt::new(tt_size_mb, shard_count) }
    }

    pub fn clear(&self) {
        self.tt.clear();
    }

    /// Run a Lazy-SMP search with `num_workers` threads (the master plus
    /// `num_workers - 1` helpers). Bypassed entirely when `num_workers <= 1`
    /// per spec §4.11 ("T = 0 means single-threaded path").
    #[allow(clippy::too_many_arguments)]
    pub fn search(
        &self,
        pos: &Position,
        root_side: Side,
        max_depth: u8,
        config: &EngineConfig,
        control: &SearchControl,
        num_workers: usize,
        age: u8,
        telemetry: &mut SearchTelemetry,
    ) -> PoolResult {
        let num_workers = num_workers.max(1);
        let start = Instant::now();
        debug!(num_workers, max_depth, "lazy-smp pool spawning workers");

        let mut master_result = WorkerResult::empty();
        let mut helper_results: Vec<WorkerResult> = Vec::new();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (1..num_workers)
                .map(|thread_index| {
                    let tt = &self.tt;
                    scope.spawn(move || {
                        run_worker(thread_index, tt, pos, root_side, max_depth, config, control, age, false, None)
                    })
                })
                .collect();

            master_result = run_worker(0, &self.tt, pos, root_side, max_depth, config, control, age, true, Some(telemetry));

            for handle in handles {
                if let Ok(result) = handle.join() {
                    helper_results.push(result);
                }
            }
        });

        let total_nodes = master_result.nodes + helper_results.iter().map(|r| r.nodes).sum::<u64>();
        let result = aggregate(master_result, helper_results, max_depth, total_nodes);
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            depth_reached = result.depth_reached,
            nodes = result.nodes,
            "lazy-smp pool search finished"
        );
        result
    }
}

fn aggregate(master: WorkerResult, helpers: Vec<WorkerResult>, target_depth: u8, total_nodes: u64) -> PoolResult {
    // Tier 1 & 2: the master's own (deepest-completed) result, if it found a move.
    if master.best_move.is_some() {
        return PoolResult {
            best_move: master.best_move,
            score: master.score,
            depth_reached: master.depth_reached,
            nodes: total_nodes,
            pv: master.pv,
        };
    }

    // Tier 3: best score among helpers that reached an acceptable depth.
    let min_acceptable_depth = target_depth.saturating_sub(2);
    if let Some(best) = helpers
        .iter()
        .filter(|r| r.best_move.is_some() && r.depth_reached >= min_acceptable_depth)
        .max_by_key(|r| r.score)
    {
        return PoolResult {
            best_move: best.best_move,
            score: best.score,
            depth_reached: best.depth_reached,
            nodes: total_nodes,
            pv: best.pv.clone(),
        };
    }

    // Tier 4: best score across every worker, regardless of depth.
    if let Some(best) = helpers.iter().filter(|r| r.best_move.is_some()).max_by_key(|r| r.score) {
        return PoolResult {
            best_move: best.best_move,
            score: best.score,
            depth_reached: best.depth_reached,
            nodes: total_nodes,
            pv: best.pv.clone(),
        };
    }

    PoolResult { best_move: None, score: master.score, depth_reached: 0, nodes: total_nodes, pv: Vec::new() }
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    thread_index: usize,
    tt: &LockFreeTt,
    pos: &Position,
    root_side: Side,
    max_depth: u8,
    base_config: &EngineConfig,
    control: &SearchControl,
    age: u8,
    is_master: bool,
    mut telemetry: Option<&mut SearchTelemetry>,
) -> WorkerResult {
    let mut config = *base_config;
    let mut start_depth: u8 = 1;

    if !is_master {
        let seed = thread_index as u64 ^ Instant::now().elapsed().as_nanos() as u64 ^ 0x9E37_79B9_7F4A_7C15;
        let mut rng = Rng::new(seed);
        start_depth = 1 + (thread_index % 2) as u8;
        config.null_move_reduction = (config.null_move_reduction + rng.range_i32(-1, 1)).max(1);
    }

    let mut heuristics = Heuristics::new();
    let mut stability = StabilityTracker::new();

    let mut completed = WorkerResult::empty();
    let mut prev_score = 0i32;

    for depth in start_depth..=max_depth {
        if control.should_stop_iterating() {
            break;
        }

        let mut ctx = SearchContext {
            nodes: completed.nodes,
            tt,
            pv: crate::search_core::PvTable::new(),
            control,
            heuristics: &mut heuristics,
            prev_moves: Vec::new(),
            root_side,
            config: &config,
            age,
            thread_index: thread_index as u8,
        };

        let score = aspiration_search(pos, depth as i32, prev_score, &mut ctx);

        if control.should_stop(ctx.nodes) {
            completed.nodes = ctx.nodes;
            break;
        }

        prev_score = score;
        let pv = ctx.pv.root_pv();
        completed.nodes = ctx.nodes;
        completed.depth_reached = depth;
        completed.score = score;
        if !pv.is_empty() {
            completed.best_move = Some(pv[0]);
            completed.pv = pv;
        }

        trace!(thread_index, depth, score, nodes = completed.nodes, "iteration complete");

        if is_master {
            if let Some(t) = telemetry.as_deref_mut() {
                t.record_iteration(completed.nodes, control.elapsed());
            }
            let scale = stability.update(completed.best_move, score);
            control.update_soft_scale(scale);
        }

        if score.abs() >= MATE_THRESHOLD {
            break;
        }
    }

    completed
}
