//! `WinDetector` — exactly-five win rule (spec §4.5).
//!
//! A maximal run of exactly five stones wins; six-or-more (overline) and a
//! five sandwiched by the opponent on both ends do not.

use caro_core::{Cell, Position, Side};

use crate::line::{DIRECTIONS, runs_in_direction};

/// Scan the whole board for a side with a qualifying (non-overline,
/// non-sandwiched) exactly-five run. Returns the first winner found, or
/// `None` if neither side has won.
pub fn winner(pos: &Position) -> Option<Side> {
    for side in [Side::Red, Side::Blue] {
        if has_won(pos, side) {
            return Some(side);
        }
    }
    None
}

/// Whether `side` currently has a qualifying win anywhere on the board.
pub fn has_won(pos: &Position, side: Side) -> bool {
    DIRECTIONS.iter().any(|&dir| {
        runs_in_direction(pos, side, dir)
            .iter()
            .any(|run| run.length == 5 && !run.sandwiched)
    })
}

/// Whether the run through `cell` (just played by `side`) is itself a
/// qualifying win. Cheaper than [`has_won`] when the caller already knows
/// which cell changed (VCF search, move validation).
pub fn creates_win(pos: &Position, cell: Cell, side: Side) -> bool {
    DIRECTIONS.iter().any(|&dir| {
        runs_in_direction(pos, side, dir)
            .iter()
            .any(|run| run.length == 5 && !run.sandwiched && run.stones().contains(&cell))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_five_wins() {
        let mut pos = Position::empty();
        for x in 4..9u8 {
            pos.place(Cell::new(x, 4).unwrap(), Side::Red).unwrap();
        }
        assert_eq!(winner(&pos), Some(Side::Red));
    }

    #[test]
    fn overline_does_not_win() {
        let mut pos = Position::empty();
        for y in 0..6u8 {
            pos.place(Cell::new(2, y).unwrap(), Side::Red).unwrap();
        }
        assert_eq!(winner(&pos), None);
    }

    #[test]
    fn sandwiched_five_does_not_win() {
        let mut pos = Position::empty();
        for y in 4..9u8 {
            pos.place(Cell::new(4, y).unwrap(), Side::Red).unwrap();
        }
        pos.place(Cell::new(4, 3).unwrap(), Side::Blue).unwrap();
        pos.place(Cell::new(4, 9).unwrap(), Side::Blue).unwrap();
        assert_eq!(winner(&pos), None);
    }

    #[test]
    fn no_winner_on_empty_board() {
        assert_eq!(winner(&Position::empty()), None);
    }
}
