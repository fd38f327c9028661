//! Alpha-beta search core: `minimax`, `quiesce`, `search_root`, and
//! `aspiration_search` (spec §4.10).
//!
//! Grounded on the teacher's `search/negamax.rs` for the PVS/NMP/LMR/TT
//! shape and its triangular [`PvTable`], generalized from negamax's
//! sign-flipped relative scores to the spec's explicit `maximizing` flag —
//! every score this module returns is relative to the searching side
//! (`SearchContext::root_side`), never to whichever side is on move.
//! Pruning techniques the spec does not name (razoring, ProbCut, singular
//! extension, history pruning) are left behind; only PVS, null-move
//! pruning, late-move reductions, quiescence, and TT interaction survive.

use caro_core::{Cell, Position, Side};

use crate::config::EngineConfig;
use crate::control::SearchControl;
use crate::eval::{EvalWeights, evaluate_with};
use crate::heuristics::{Heuristics, MAX_PLY};
use crate::movepicker::{MovePicker, candidate_cells};
use crate::threats::{ThreatKind, detect_threats, is_forcing};
use crate::tt::ProbeStore;
use crate::win::creates_win;

/// Score representing an unreachable upper/lower bound.
pub const INF: i32 = 1_000_000;

/// Base score for a forced win, shaded by ply so shorter wins outscore longer ones.
pub const MATE_SCORE: i32 = 900_000;

/// Scores above this threshold indicate a forced win/loss.
pub const MATE_THRESHOLD: i32 = 800_000;

/// Quiescence search never extends past this many plies beyond the horizon.
const QUIESCENCE_MAX_PLY: u32 = 4;

/// Triangular principal-variation table, indexed by ply.
pub struct PvTable {
    moves: Vec<Vec<Option<Cell>>>,
    len: Vec<usize>,
}

impl PvTable {
    pub fn new() -> Self {
        PvTable { moves: vec![vec![None; MAX_PLY]; MAX_PLY], len: vec![0; MAX_PLY] }
    }

    pub fn clear_ply(&mut self, ply: usize) {
        if ply < MAX_PLY {
            self.len[ply] = 0;
        }
    }

    /// Record `mv` as the best move at `ply`, prefixed onto the child's PV line.
    pub fn update(&mut self, ply: usize, mv: Cell) {
        if ply >= MAX_PLY {
            return;
        }
        self.moves[ply][0] = Some(mv);
        let child_ply = ply + 1;
        let copy_len = if child_ply < MAX_PLY { self.len[child_ply].min(MAX_PLY - 1) } else { 0 };
        for i in 0..copy_len {
            self.moves[ply][1 + i] = self.moves[child_ply][i];
        }
        self.len[ply] = 1 + copy_len;
    }

    pub fn set_single(&mut self, ply: usize, mv: Cell) {
        if ply < MAX_PLY {
            self.moves[ply][0] = Some(mv);
            self.len[ply] = 1;
        }
    }

    pub fn root_pv(&self) -> Vec<Cell> {
        self.moves[0][..self.len[0]].iter().filter_map(|m| *m).collect()
    }
}

impl Default for PvTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Search state threaded through every `minimax`/`quiesce` call.
pub struct SearchContext<'a, Tt: ProbeStore> {
    pub nodes: u64,
    pub tt: &'a Tt,
    pub pv: PvTable,
    pub control: &'a SearchControl,
    pub heuristics: &'a mut Heuristics,
    pub prev_moves: Vec<Cell>,
    pub root_side: Side,
    pub config: &'a EngineConfig,
    pub age: u8,
    pub thread_index: u8,
}

impl<'a, Tt: ProbeStore> SearchContext<'a, Tt> {
    fn side_to_move(&self, maximizing: bool) -> Side {
        if maximizing { self.root_side } else { !self.root_side }
    }

    /// Static evaluation relative to [`Self::root_side`], independent of
    /// whose turn it is — the basis every returned score shares.
    fn leaf_eval(&self, pos: &Position) -> i32 {
        evaluate_with(pos, self.root_side, &EvalWeights::from_config(self.config))
    }
}

#[derive(Clone, Copy)]
struct NodeParams {
    depth: i32,
    ply: usize,
    maximizing: bool,
    do_null: bool,
}

/// Whether passing the move is safe to try: no opponent four, no opponent
/// open three, and the board is past its opening (spec §4.10 step "minimax").
fn null_move_safe(pos: &Position, side_to_move: Side) -> bool {
    if pos.occupied().popcount() < 10 {
        return false;
    }
    let opponent_threats = detect_threats(pos, !side_to_move);
    !opponent_threats
        .iter()
        .any(|t| matches!(t.kind, ThreatKind::StraightFour | ThreatKind::BrokenFour | ThreatKind::StraightThree))
}

/// Whether `mv` (now played by `side` in `child`) should be exempt from late
/// move reductions: it blocks a live opponent four, or itself creates a
/// forcing threat or a win.
fn is_critical_move(pos: &Position, child: &Position, mv: Cell, side: Side) -> bool {
    if creates_win(child, mv, side) {
        return true;
    }
    if detect_threats(child, side).iter().any(|t| is_forcing(t.kind)) {
        return true;
    }
    detect_threats(pos, !side)
        .iter()
        .any(|t| matches!(t.kind, ThreatKind::StraightFour | ThreatKind::BrokenFour) && t.gain_squares.contains(&mv))
}

/// Root-level search: thin wrapper over `minimax` at ply 0 — the root is
/// simply the shallowest node in the same recursion, as in the teacher's
/// negamax (an `is_root` check inside one function rather than a twin).
pub fn search_root<Tt: ProbeStore>(pos: &Position, depth: i32, alpha: i32, beta: i32, ctx: &mut SearchContext<Tt>) -> i32 {
    let params = NodeParams { depth, ply: 0, maximizing: true, do_null: true };
    minimax(pos, params, alpha, beta, ctx)
}

/// Iterative-deepening driver for one depth, widening the aspiration window
/// around `prev_score` on fail-high/fail-low (spec §4.10 step 6).
pub fn aspiration_search<Tt: ProbeStore>(pos: &Position, depth: i32, prev_score: i32, ctx: &mut SearchContext<Tt>) -> i32 {
    if depth <= 2 || prev_score.abs() >= MATE_THRESHOLD {
        return search_root(pos, depth, -INF, INF, ctx);
    }

    let mut window = 50;
    let mut alpha = (prev_score - window).max(-INF);
    let mut beta = (prev_score + window).min(INF);

    loop {
        let score = search_root(pos, depth, alpha, beta, ctx);
        if ctx.control.should_stop(ctx.nodes) {
            return score;
        }
        if score <= alpha {
            window *= 2;
            alpha = (prev_score - window).max(-INF);
        } else if score >= beta {
            window *= 2;
            beta = (prev_score + window).min(INF);
        } else {
            return score;
        }
        if window > 100_000 {
            return search_root(pos, depth, -INF, INF, ctx);
        }
    }
}

fn minimax<Tt: ProbeStore>(pos: &Position, params: NodeParams, mut alpha: i32, mut beta: i32, ctx: &mut SearchContext<Tt>) -> i32 {
    ctx.nodes += 1;
    if params.ply < MAX_PLY {
        ctx.pv.clear_ply(params.ply);
    }

    if ctx.control.should_stop(ctx.nodes) {
        return ctx.leaf_eval(pos);
    }

    let side_to_move = ctx.side_to_move(params.maximizing);
    let mover = !side_to_move;

    if let Some(last) = pos.last_move() {
        if creates_win(pos, last, mover) {
            let score = MATE_SCORE - params.ply as i32;
            return if mover == ctx.root_side { score } else { -score };
        }
    }

    if pos.occupied().popcount() as usize >= Cell::COUNT {
        return 0;
    }

    if params.depth <= 0 || params.ply >= MAX_PLY {
        return quiesce(pos, alpha, beta, params.ply, params.maximizing, ctx, 0);
    }

    let is_pv = beta - alpha > 1;

    if params.depth >= ctx.config.null_move_min_depth
        && !is_pv
        && params.do_null
        && null_move_safe(pos, side_to_move)
    {
        let reduced = NodeParams {
            depth: params.depth - 1 - ctx.config.null_move_reduction,
            ply: params.ply + 1,
            maximizing: !params.maximizing,
            do_null: false,
        };
        let score = minimax(pos, reduced, alpha, beta, ctx);
        if params.maximizing && score >= beta {
            return beta;
        }
        if !params.maximizing && score <= alpha {
            return alpha;
        }
    }

    let probe = ctx.tt.probe(pos.hash(), params.depth as i8, alpha, beta);
    let tt_move = probe.as_ref().and_then(|p| p.mv);
    if let Some(p) = &probe {
        if p.cutoff {
            if let Some(mv) = p.mv {
                ctx.pv.set_single(params.ply, mv);
            }
            return p.value;
        }
    }

    let mut picker = MovePicker::new(pos, side_to_move, tt_move, params.ply, ctx.heuristics, &ctx.prev_moves);
    if picker.is_empty() {
        return 0;
    }

    let orig_alpha = alpha;
    let orig_beta = beta;
    let mut best_value = if params.maximizing { -INF } else { INF };
    let mut best_move: Option<Cell> = None;
    let mut index: usize = 0;

    while let Some(mv) = picker.next_move() {
        let mut child = *pos;
        if child.place(mv, side_to_move).is_err() {
            continue;
        }
        ctx.prev_moves.push(mv);

        let score = if index == 0 && params.depth >= 2 {
            let child_params = NodeParams { depth: params.depth - 1, ply: params.ply + 1, maximizing: !params.maximizing, do_null: true };
            minimax(&child, child_params, alpha, beta, ctx)
        } else {
            let critical = is_critical_move(pos, &child, mv, side_to_move);
            let reduction = if params.depth >= ctx.config.lmr_min_depth && index >= ctx.config.lmr_full_depth_moves && !critical {
                1 + (((index - ctx.config.lmr_full_depth_moves) / 4).min(2)) as i32
            } else {
                0
            };
            let reduced_depth = (params.depth - 1 - reduction).max(0);
            let (null_alpha, null_beta) = if params.maximizing { (alpha, alpha + 1) } else { (beta - 1, beta) };
            let reduced_params =
                NodeParams { depth: reduced_depth, ply: params.ply + 1, maximizing: !params.maximizing, do_null: true };
            let mut s = minimax(&child, reduced_params, null_alpha, null_beta, ctx);

            let failed_high_or_low = if params.maximizing { s > alpha } else { s < beta };
            if failed_high_or_low {
                let full_params =
                    NodeParams { depth: params.depth - 1, ply: params.ply + 1, maximizing: !params.maximizing, do_null: true };
                s = minimax(&child, full_params, alpha, beta, ctx);
            }
            s
        };

        ctx.prev_moves.pop();

        let improves = if params.maximizing { score > best_value } else { score < best_value };
        if improves {
            best_value = score;
            best_move = Some(mv);
            ctx.pv.update(params.ply, mv);
        }

        if params.maximizing {
            alpha = alpha.max(score);
        } else {
            beta = beta.min(score);
        }

        if alpha >= beta {
            ctx.heuristics.on_cutoff(side_to_move, params.ply, mv, &ctx.prev_moves, params.depth);
            best_move = Some(mv);
            break;
        }
        ctx.heuristics.on_quiet_failure(side_to_move, mv, params.depth);
        index += 1;
    }

    if let Some(mv) = best_move {
        ctx.tt.store(
            pos.hash(),
            params.depth as i8,
            best_value,
            Some(mv),
            orig_alpha,
            orig_beta,
            ctx.leaf_eval(pos),
            ctx.age,
            ctx.thread_index,
        );
    }

    best_value
}

fn quiesce<Tt: ProbeStore>(
    pos: &Position,
    mut alpha: i32,
    mut beta: i32,
    ply: usize,
    maximizing: bool,
    ctx: &mut SearchContext<Tt>,
    qply: u32,
) -> i32 {
    ctx.nodes += 1;
    if ctx.control.should_stop(ctx.nodes) {
        return ctx.leaf_eval(pos);
    }

    let side_to_move = ctx.side_to_move(maximizing);
    let mover = !side_to_move;
    if let Some(last) = pos.last_move() {
        if creates_win(pos, last, mover) {
            let score = MATE_SCORE - ply as i32;
            return if mover == ctx.root_side { score } else { -score };
        }
    }

    let stand_pat = ctx.leaf_eval(pos);
    if maximizing {
        if stand_pat >= beta {
            return beta;
        }
        alpha = alpha.max(stand_pat);
    } else {
        if stand_pat <= alpha {
            return alpha;
        }
        beta = beta.min(stand_pat);
    }

    if qply >= QUIESCENCE_MAX_PLY {
        return stand_pat;
    }

    for mv in candidate_cells(pos) {
        let mut child = *pos;
        if child.place(mv, side_to_move).is_err() {
            continue;
        }
        let tactical =
            creates_win(&child, mv, side_to_move) || detect_threats(&child, side_to_move).iter().any(|t| is_forcing(t.kind));
        if !tactical {
            continue;
        }

        let score = quiesce(&child, alpha, beta, ply + 1, !maximizing, ctx, qply + 1);

        if maximizing {
            alpha = alpha.max(score);
            if alpha >= beta {
                return beta;
            }
        } else {
            beta = beta.min(score);
            if alpha >= beta {
                return alpha;
            }
        }
    }

    if maximizing { alpha } else { beta }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use crate::tt::TranspositionTable;

    fn fresh_ctx(config: &EngineConfig, control: &SearchControl, heuristics: &mut Heuristics) -> SearchContext<'_, RefCell<TranspositionTable>> {
        SearchContext {
            nodes: 0,
            tt: &*Box::leak(Box::new(RefCell::new(TranspositionTable::new(1)))),
            pv: PvTable::new(),
            control,
            heuristics,
            prev_moves: Vec::new(),
            root_side: Side::Red,
            config,
            age: 1,
            thread_index: 0,
        }
    }

    #[test]
    fn finds_one_move_win() {
        let mut pos = Position::empty();
        for x in 5..9u8 {
            pos.place(Cell::new(x, 7).unwrap(), Side::Red).unwrap();
        }
        let config = EngineConfig::default();
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(stopped);
        let mut heuristics = Heuristics::new();
        let mut ctx = fresh_ctx(&config, &control, &mut heuristics);
        ctx.root_side = Side::Red;

        let score = search_root(&pos, 3, -INF, INF, &mut ctx);
        assert!(score >= MATE_THRESHOLD, "expected a forced-win score, got {score}");
        let pv = ctx.pv.root_pv();
        assert!(!pv.is_empty());
    }

    #[test]
    fn full_board_scores_zero() {
        let mut pos = Position::empty();
        let mut side = Side::Red;
        for idx in 0..Cell::COUNT {
            let cell = Cell::from_index(idx as u16).unwrap();
            // avoid handing either side an accidental five-in-a-row
            let forced_side = if idx % 7 == 0 { !side } else { side };
            let _ = pos.place(cell, forced_side);
            side = !side;
        }
        let config = EngineConfig::default();
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(stopped);
        let mut heuristics = Heuristics::new();
        let mut ctx = fresh_ctx(&config, &control, &mut heuristics);

        if crate::win::winner(&pos).is_none() {
            let score = search_root(&pos, 1, -INF, INF, &mut ctx);
            assert_eq!(score, 0);
        }
    }

    #[test]
    fn aspiration_search_matches_full_window_score() {
        let mut pos = Position::empty();
        pos.place(Cell::CENTER, Side::Red).unwrap();
        pos.place(Cell::new(8, 8).unwrap(), Side::Blue).unwrap();

        let config = EngineConfig::default();
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(stopped);
        let mut heuristics = Heuristics::new();
        let mut ctx = fresh_ctx(&config, &control, &mut heuristics);

        let full = search_root(&pos, 2, -INF, INF, &mut ctx);

        let mut heuristics2 = Heuristics::new();
        let mut ctx2 = fresh_ctx(&config, &control, &mut heuristics2);
        let aspirated = aspiration_search(&pos, 2, full, &mut ctx2);
        assert_eq!(full, aspirated);
    }
}
