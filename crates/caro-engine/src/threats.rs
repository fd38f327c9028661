//! `ThreatDetector` — classifies forcing patterns and enumerates the empty
//! cells ("gain squares") that would promote them (spec §4.4).

use caro_core::{Cell, Position, Side};

use crate::line::{DIRECTIONS, Mark, mark_at, step};
use crate::win::creates_win;

/// The four threat shapes the detector recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreatKind {
    /// Four in a row with at least one open flank: `XXXX_` or `_XXXX_`.
    StraightFour,
    /// Four stones with one internal gap: `XXX_X` or `X_XXX`.
    BrokenFour,
    /// Three in a row, both flanks open: `_XXX_`.
    StraightThree,
    /// Three stones with one internal gap, at least one side open: `XX_X_` / `_X_XX`.
    BrokenThree,
}

/// A detected threat: its owner, the stones that compose it, the empty
/// cells that would promote it, and the line direction it runs along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Threat {
    pub kind: ThreatKind,
    pub owner: Side,
    pub stones: Vec<Cell>,
    pub gain_squares: Vec<Cell>,
    pub direction: (i8, i8),
}

/// All four/three types except [`ThreatKind::BrokenThree`] are forcing: the
/// opponent must respond to a gain square or lose material threat-tempo.
pub fn is_forcing(kind: ThreatKind) -> bool {
    !matches!(kind, ThreatKind::BrokenThree)
}

/// Whether placing `side` at `(x, y)` would complete a win (spec §4.5).
pub fn is_winning_move(pos: &Position, cell: Cell, side: Side) -> bool {
    let mut trial = *pos;
    if trial.place(cell, side).is_err() {
        return false;
    }
    creates_win(&trial, cell, side)
}

/// A candidate gain square is only accepted if filling it does not create an
/// overline (6+) or a sandwiched five (both disqualified wins, spec §3/§4.5).
fn gain_square_is_sound(pos: &Position, cell: Cell, side: Side) -> bool {
    let mut trial = *pos;
    if trial.place(cell, side).is_err() {
        return false;
    }
    // A sound gain square either wins outright (Exactly5, not sandwiched/overline)
    // or does not overextend the run past five.
    creates_win(&trial, cell, side) || !creates_overline_or_sandwich(&trial, cell, side)
}

fn creates_overline_or_sandwich(pos: &Position, cell: Cell, side: Side) -> bool {
    for &dir in &DIRECTIONS {
        // Walk backward to the run start, then forward to measure full length.
        let mut back = 0i32;
        while mark_at(pos, cell, dir, -(back + 1), side) == Mark::Mine {
            back += 1;
        }
        let mut fwd = 0i32;
        while mark_at(pos, cell, dir, fwd + 1, side) == Mark::Mine {
            fwd += 1;
        }
        let len = back + fwd + 1;
        let before = mark_at(pos, cell, dir, -(back + 1), side);
        let after = mark_at(pos, cell, dir, fwd + 1, side);
        if len >= 6 {
            return true;
        }
        if len == 5 && before == Mark::Theirs && after == Mark::Theirs {
            return true;
        }
    }
    false
}

/// Scan `side`'s occupied cells along every direction and classify threats.
///
/// Deduplicated by `(kind, stones)` — the same physical run is only reported
/// once even though every stone in it is scanned as an anchor.
pub fn detect_threats(pos: &Position, side: Side) -> Vec<Threat> {
    let mut found: Vec<Threat> = Vec::new();
    let mut seen: std::collections::HashSet<(ThreatKind, Vec<Cell>)> = std::collections::HashSet::new();

    for anchor in pos.stones(side).iter_set_bits() {
        for &dir in &DIRECTIONS {
            for threat in classify_at(pos, anchor, dir, side) {
                let key = (threat.kind, {
                    let mut s = threat.stones.clone();
                    s.sort_by_key(|c| c.index());
                    s
                });
                if seen.insert(key) {
                    found.push(threat);
                }
            }
        }
    }
    found
}

/// Classify the threat(s) anchored at `anchor` along `dir`. Anchors are only
/// examined when they are the first `Mine` cell encountered scanning backward
/// so each physical shape is considered once per direction.
fn classify_at(pos: &Position, anchor: Cell, dir: (i8, i8), side: Side) -> Vec<Threat> {
    let mut out = Vec::new();

    // Straight run classification (four or three, open ends).
    if mark_at(pos, anchor, dir, -1, side) != Mark::Mine {
        let mut len = 0i32;
        while mark_at(pos, anchor, dir, len, side) == Mark::Mine {
            len += 1;
        }
        let before = step(anchor, dir, -1);
        let after = step(anchor, dir, len);
        let before_mark = mark_at(pos, anchor, dir, -1, side);
        let after_mark = mark_at(pos, anchor, dir, len, side);

        if len == 4 {
            let mut gains = Vec::new();
            if before_mark == Mark::Empty {
                if let Some(c) = before {
                    if gain_square_is_sound(pos, c, side) {
                        gains.push(c);
                    }
                }
            }
            if after_mark == Mark::Empty {
                if let Some(c) = after {
                    if gain_square_is_sound(pos, c, side) {
                        gains.push(c);
                    }
                }
            }
            if !gains.is_empty() {
                out.push(Threat {
                    kind: ThreatKind::StraightFour,
                    owner: side,
                    stones: (0..len).filter_map(|n| step(anchor, dir, n)).collect(),
                    gain_squares: gains,
                    direction: dir,
                });
            }
        } else if len == 3 && before_mark == Mark::Empty && after_mark == Mark::Empty {
            let mut gains = Vec::new();
            if let Some(c) = before {
                if gain_square_is_sound(pos, c, side) {
                    gains.push(c);
                }
            }
            if let Some(c) = after {
                if gain_square_is_sound(pos, c, side) {
                    gains.push(c);
                }
            }
            if !gains.is_empty() {
                out.push(Threat {
                    kind: ThreatKind::StraightThree,
                    owner: side,
                    stones: (0..len).filter_map(|n| step(anchor, dir, n)).collect(),
                    gain_squares: gains,
                    direction: dir,
                });
            }
        }
    }

    // Broken patterns: `XXX_X` / `X_XXX` (broken four) and `XX_X_` / `_X_XX`
    // (broken three) over a 5-cell window starting at `anchor`.
    if let Some(window) = gapped_window(pos, anchor, dir, side, 5) {
        if let Some(threat) = classify_gapped(pos, anchor, dir, side, &window) {
            out.push(threat);
        }
    }

    out
}

/// Read a window of `len` cells starting at `anchor` (indices `0..len`).
/// Returns `None` if any cell runs off the board.
fn gapped_window(pos: &Position, anchor: Cell, dir: (i8, i8), side: Side, len: i32) -> Option<Vec<Mark>> {
    let marks: Vec<Mark> = (0..len).map(|n| mark_at(pos, anchor, dir, n, side)).collect();
    if marks.iter().any(|m| *m == Mark::Border) {
        None
    } else {
        Some(marks)
    }
}

/// Classify a 5-cell window (`marks[0..5]`, starting at `anchor`) as a broken
/// four or broken three, if it matches exactly one of those shapes.
fn classify_gapped(
    pos: &Position,
    anchor: Cell,
    dir: (i8, i8),
    side: Side,
    marks: &[Mark],
) -> Option<Threat> {
    use Mark::{Empty, Mine};

    let cell_at = |n: i32| step(anchor, dir, n);
    let stone_count = marks.iter().filter(|m| **m == Mine).count();
    let gap_count = marks.iter().filter(|m| **m == Empty).count();

    // Broken four: XXX_X or X_XXX — 4 stones, 1 gap, no Theirs in the window.
    if stone_count == 4 && gap_count == 1 {
        let gap_idx = marks.iter().position(|m| *m == Empty)?;
        if gap_idx == 0 || gap_idx == 4 {
            return None; // that's a plain straight four, already classified
        }
        let gap = cell_at(gap_idx as i32)?;
        if !gain_square_is_sound(pos, gap, side) {
            return None;
        }
        let stones = (0..5i32).filter(|&n| n as usize != gap_idx).filter_map(cell_at).collect();
        return Some(Threat {
            kind: ThreatKind::BrokenFour,
            owner: side,
            stones,
            gain_squares: vec![gap],
            direction: dir,
        });
    }

    // Broken three: exactly 3 stones + 2 gaps within the 5-window, with the
    // stones split by exactly one internal gap (XX_X_ / _X_XX shape family).
    if stone_count == 3 && gap_count == 2 {
        // Find the "inner" gap that sits strictly between two stones.
        for gap_idx in 1..4usize {
            if marks[gap_idx] != Empty {
                continue;
            }
            let left_mine = marks[..gap_idx].iter().any(|m| *m == Mine);
            let right_mine = marks[gap_idx + 1..].iter().any(|m| *m == Mine);
            if left_mine && right_mine {
                let gap = cell_at(gap_idx as i32)?;
                if !gain_square_is_sound(pos, gap, side) {
                    continue;
                }
                let stones: Vec<Cell> = (0..5i32)
                    .filter(|&n| marks[n as usize] == Mine)
                    .filter_map(cell_at)
                    .collect();
                return Some(Threat {
                    kind: ThreatKind::BrokenThree,
                    owner: side,
                    stones,
                    gain_squares: vec![gap],
                    direction: dir,
                });
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use caro_core::Cell;

    #[test]
    fn straight_four_has_two_gain_squares_when_open() {
        let mut pos = Position::empty();
        for x in 5..9u8 {
            pos.place(Cell::new(x, 7).unwrap(), Side::Red).unwrap();
        }
        let threats = detect_threats(&pos, Side::Red);
        let four = threats.iter().find(|t| t.kind == ThreatKind::StraightFour).expect("four");
        assert_eq!(four.gain_squares.len(), 2);
    }

    #[test]
    fn straight_four_semi_open_has_one_gain_square() {
        let mut pos = Position::empty();
        pos.place(Cell::new(4, 7).unwrap(), Side::Blue).unwrap();
        for x in 5..9u8 {
            pos.place(Cell::new(x, 7).unwrap(), Side::Red).unwrap();
        }
        let threats = detect_threats(&pos, Side::Red);
        let four = threats.iter().find(|t| t.kind == ThreatKind::StraightFour).expect("four");
        assert_eq!(four.gain_squares.len(), 1);
        assert_eq!(four.gain_squares[0], Cell::new(9, 7).unwrap());
    }

    #[test]
    fn broken_four_gain_square_is_the_gap() {
        let mut pos = Position::empty();
        for x in [5u8, 6, 7, 9] {
            pos.place(Cell::new(x, 7).unwrap(), Side::Red).unwrap();
        }
        let threats = detect_threats(&pos, Side::Red);
        let four = threats.iter().find(|t| t.kind == ThreatKind::BrokenFour).expect("broken four");
        assert_eq!(four.gain_squares, vec![Cell::new(8, 7).unwrap()]);
    }

    #[test]
    fn straight_three_open_both_ends() {
        let mut pos = Position::empty();
        for x in 5..8u8 {
            pos.place(Cell::new(x, 7).unwrap(), Side::Red).unwrap();
        }
        let threats = detect_threats(&pos, Side::Red);
        let three = threats.iter().find(|t| t.kind == ThreatKind::StraightThree).expect("three");
        assert_eq!(three.gain_squares.len(), 2);
    }

    #[test]
    fn broken_three_is_not_forcing() {
        assert!(!is_forcing(ThreatKind::BrokenThree));
        assert!(is_forcing(ThreatKind::StraightThree));
        assert!(is_forcing(ThreatKind::StraightFour));
        assert!(is_forcing(ThreatKind::BrokenFour));
    }

    #[test]
    fn is_winning_move_detects_completion() {
        let mut pos = Position::empty();
        for x in 5..9u8 {
            pos.place(Cell::new(x, 7).unwrap(), Side::Red).unwrap();
        }
        assert!(is_winning_move(&pos, Cell::new(9, 7).unwrap(), Side::Red));
        assert!(is_winning_move(&pos, Cell::new(4, 7).unwrap(), Side::Red));
    }

    #[test]
    fn sandwiched_gain_square_not_a_winning_move() {
        let mut pos = Position::empty();
        for x in 4..8u8 {
            pos.place(Cell::new(x, 4).unwrap(), Side::Red).unwrap();
        }
        pos.place(Cell::new(3, 4).unwrap(), Side::Blue).unwrap();
        // completing at (8,4) sandwiches the five between (3,4) and a future blue stone at (9,4)
        pos.place(Cell::new(9, 4).unwrap(), Side::Blue).unwrap();
        assert!(!is_winning_move(&pos, Cell::new(8, 4).unwrap(), Side::Red));
    }
}
