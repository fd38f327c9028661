//! Staged move generation and ordering (spec §4.9).
//!
//! A one-shot constructor scores every candidate into a stage (TT →
//! MustBlock → Winning → ThreatCreate → KillerCounter → GoodQuiet →
//! BadQuiet) and a secondary score, then yields moves stage-by-stage via
//! [`MovePicker::next_move`]. Grounded on the teacher's selection-sort
//! `MovePicker` in `search/ordering.rs`, generalized from a flat
//! MVV-LVA score to the spec's multi-stage admission table.

use std::collections::HashSet;

use caro_core::{Cell, Position, Side};

use crate::heuristics::Heuristics;
use crate::threats::{Threat, ThreatKind, detect_threats, is_forcing};
use crate::win::creates_win;

/// Stage ordinal; lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Tt = 0,
    MustBlock = 1,
    Winning = 2,
    ThreatCreate = 3,
    KillerCounter = 4,
    GoodQuiet = 5,
    BadQuiet = 6,
}

/// Secondary scores at or above this are promoted from BadQuiet to GoodQuiet.
const GOOD_QUIET_THRESHOLD: i32 = 0;

/// Candidate empty cells within Chebyshev radius 2 of any stone, or the
/// center cell on an empty board.
pub fn candidate_cells(pos: &Position) -> Vec<Cell> {
    let occupied: Vec<Cell> = pos.occupied().iter_set_bits().collect();
    if occupied.is_empty() {
        return vec![Cell::CENTER];
    }
    let mut found = Vec::new();
    for idx in 0..Cell::COUNT as u16 {
        let cell = Cell::from_index(idx).expect("idx < Cell::COUNT");
        if !pos.is_empty(cell) {
            continue;
        }
        if occupied.iter().any(|&o| o.chebyshev_distance(cell) <= 2) {
            found.push(cell);
        }
    }
    found
}

/// What placing `side`'s stone at `cell` accomplishes, for ordering purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveShape {
    Winning,
    ThreatCreate,
    Quiet,
}

fn classify_move(pos: &Position, cell: Cell, side: Side) -> MoveShape {
    let mut trial = *pos;
    if trial.place(cell, side).is_err() {
        return MoveShape::Quiet;
    }
    if creates_win(&trial, cell, side) {
        return MoveShape::Winning;
    }

    let threats = detect_threats(&trial, side);
    let forcing: Vec<&Threat> = threats.iter().filter(|t| is_forcing(t.kind)).collect();

    // An open four (two gain squares) cannot be blocked with a single reply.
    if forcing.iter().any(|t| t.kind == ThreatKind::StraightFour && t.gain_squares.len() >= 2) {
        return MoveShape::Winning;
    }
    // A fork: two forcing threats whose gain squares don't overlap, so one
    // blocking move can't answer both (spec's Flex4Flex3 / DoubleFlex3 family).
    if has_disjoint_pair(&forcing) {
        return MoveShape::Winning;
    }
    if forcing.iter().any(|t| t.kind == ThreatKind::StraightThree) {
        return MoveShape::ThreatCreate;
    }
    MoveShape::Quiet
}

fn has_disjoint_pair(threats: &[&Threat]) -> bool {
    for i in 0..threats.len() {
        let a: HashSet<Cell> = threats[i].gain_squares.iter().copied().collect();
        for j in (i + 1)..threats.len() {
            let b: HashSet<Cell> = threats[j].gain_squares.iter().copied().collect();
            if a.is_disjoint(&b) {
                return true;
            }
        }
    }
    false
}

/// Opponent's gain squares for a live StraightFour/BrokenFour — a candidate
/// that lands on one of these must be searched first (spec's MustBlock stage).
fn must_block_squares(pos: &Position, side: Side) -> HashSet<Cell> {
    detect_threats(pos, !side)
        .into_iter()
        .filter(|t| matches!(t.kind, ThreatKind::StraightFour | ThreatKind::BrokenFour))
        .flat_map(|t| t.gain_squares)
        .collect()
}

struct Scored {
    cell: Cell,
    stage: Stage,
    secondary: i32,
}

/// A one-shot, pre-scored, stably-ordered staged move list.
pub struct MovePicker {
    moves: Vec<Scored>,
    cursor: usize,
}

impl MovePicker {
    /// Build the full staged ordering for a search node.
    pub fn new(
        pos: &Position,
        side: Side,
        tt_move: Option<Cell>,
        ply: usize,
        heuristics: &Heuristics,
        prev_moves: &[Cell],
    ) -> Self {
        let candidates = candidate_cells(pos);
        let must_block = must_block_squares(pos, side);
        let prev_cell = prev_moves.last().copied();

        let mut moves: Vec<Scored> = candidates
            .into_iter()
            .map(|cell| {
                let stage = if Some(cell) == tt_move {
                    Stage::Tt
                } else if must_block.contains(&cell) {
                    Stage::MustBlock
                } else {
                    match classify_move(pos, cell, side) {
                        MoveShape::Winning => Stage::Winning,
                        MoveShape::ThreatCreate => Stage::ThreatCreate,
                        MoveShape::Quiet => {
                            let is_killer = heuristics.killers.is_killer(ply, cell);
                            let counter_positive =
                                prev_cell.map(|p| heuristics.counter_move.score(side, p, cell) > 0).unwrap_or(false);
                            if is_killer || counter_positive {
                                Stage::KillerCounter
                            } else {
                                Stage::BadQuiet // re-classified below by secondary score
                            }
                        }
                    }
                };

                let secondary = secondary_score(side, cell, prev_cell, heuristics);
                let stage = if stage == Stage::BadQuiet && secondary >= GOOD_QUIET_THRESHOLD {
                    Stage::GoodQuiet
                } else {
                    stage
                };

                Scored { cell, stage, secondary }
            })
            .collect();

        moves.sort_by(|a, b| a.stage.cmp(&b.stage).then(b.secondary.cmp(&a.secondary)));

        MovePicker { moves, cursor: 0 }
    }

    /// Yield the next move in stage order, or `None` once exhausted.
    pub fn next_move(&mut self) -> Option<Cell> {
        let scored = self.moves.get(self.cursor)?;
        self.cursor += 1;
        Some(scored.cell)
    }

    /// Total candidate count, for callers sizing per-move arrays.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

fn secondary_score(side: Side, cell: Cell, prev_cell: Option<Cell>, heuristics: &Heuristics) -> i32 {
    let history = heuristics.history.score(side, cell);
    let continuation = prev_cell.map(|p| heuristics.continuation.score(1, side, p, cell)).unwrap_or(0);
    let center_bonus = (14 - cell.center_distance() as i32) * 10;
    history + continuation + center_bonus
}

#[cfg(test)]
mod tests {
    use super::*;
    use caro_core::Cell;

    #[test]
    fn empty_board_yields_only_center() {
        let pos = Position::empty();
        assert_eq!(candidate_cells(&pos), vec![Cell::CENTER]);
    }

    #[test]
    fn candidates_stay_within_radius_two() {
        let mut pos = Position::empty();
        pos.place(Cell::new(7, 7).unwrap(), Side::Red).unwrap();
        let candidates = candidate_cells(&pos);
        assert!(candidates.iter().all(|&c| c.chebyshev_distance(Cell::new(7, 7).unwrap()) <= 2));
        assert!(!candidates.is_empty());
    }

    #[test]
    fn tt_move_is_first() {
        let mut pos = Position::empty();
        pos.place(Cell::new(7, 7).unwrap(), Side::Red).unwrap();
        let heuristics = Heuristics::new();
        let tt = Cell::new(8, 8).unwrap();
        let mut picker = MovePicker::new(&pos, Side::Blue, Some(tt), 0, &heuristics, &[]);
        assert_eq!(picker.next_move(), Some(tt));
    }

    #[test]
    fn must_block_precedes_quiet_moves() {
        let mut pos = Position::empty();
        for x in 5..9u8 {
            pos.place(Cell::new(x, 7).unwrap(), Side::Red).unwrap();
        }
        let heuristics = Heuristics::new();
        let mut picker = MovePicker::new(&pos, Side::Blue, None, 0, &heuristics, &[]);
        let first = picker.next_move().unwrap();
        let blockers: HashSet<Cell> = must_block_squares(&pos, Side::Blue);
        assert!(blockers.contains(&first));
    }

    #[test]
    fn winning_move_completing_five_is_an_early_stage() {
        let mut pos = Position::empty();
        for x in 5..9u8 {
            pos.place(Cell::new(x, 7).unwrap(), Side::Red).unwrap();
        }
        let heuristics = Heuristics::new();
        let mut picker = MovePicker::new(&pos, Side::Red, None, 0, &heuristics, &[]);
        let first = picker.next_move().unwrap();
        assert!(creates_win(&{ let mut p = pos; p.place(first, Side::Red).unwrap(); p }, first, Side::Red));
    }

    #[test]
    fn exhausts_after_all_candidates_yielded() {
        let pos = Position::empty();
        let heuristics = Heuristics::new();
        let mut picker = MovePicker::new(&pos, Side::Red, None, 0, &heuristics, &[]);
        assert_eq!(picker.len(), 1);
        assert!(picker.next_move().is_some());
        assert!(picker.next_move().is_none());
    }
}
