//! The board position: stones for both sides, incremental hash, and ply counter.

use crate::bitboard::Bitboard;
use crate::cell::Cell;
use crate::error::PositionError;
use crate::side::Side;
use crate::zobrist;

/// What occupies a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Empty,
    Red,
    Blue,
}

/// Complete Caro/Gomoku position state: stones for both sides plus the
/// incremental Zobrist hash, ply counter, and last move played.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Position {
    red: Bitboard,
    blue: Bitboard,
    hash: u64,
    ply: u32,
    last_move: Option<Cell>,
}

impl Position {
    /// The empty board, Red to move first, ply 0.
    pub fn empty() -> Position {
        Position {
            red: Bitboard::EMPTY,
            blue: Bitboard::EMPTY,
            hash: 0,
            ply: 0,
            last_move: None,
        }
    }

    /// Bitboard of Red's stones.
    #[inline]
    pub const fn red(&self) -> Bitboard {
        self.red
    }

    /// Bitboard of Blue's stones.
    #[inline]
    pub const fn blue(&self) -> Bitboard {
        self.blue
    }

    /// Bitboard for the given side.
    #[inline]
    pub const fn stones(&self, side: Side) -> Bitboard {
        match side {
            Side::Red => self.red,
            Side::Blue => self.blue,
        }
    }

    /// Union of both sides' stones.
    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.red | self.blue
    }

    /// Incremental Zobrist hash, equal to the XOR of keys for every occupied cell.
    #[inline]
    pub const fn hash(&self) -> u64 {
        self.hash
    }

    /// Number of stones placed so far.
    #[inline]
    pub const fn ply(&self) -> u32 {
        self.ply
    }

    /// The most recently played cell, if any.
    #[inline]
    pub const fn last_move(&self) -> Option<Cell> {
        self.last_move
    }

    /// Whether `cell` holds no stone.
    #[inline]
    pub fn is_empty(&self, cell: Cell) -> bool {
        !self.red.get(cell) && !self.blue.get(cell)
    }

    /// The occupant of `cell`.
    #[inline]
    pub fn at(&self, cell: Cell) -> Occupant {
        if self.red.get(cell) {
            Occupant::Red
        } else if self.blue.get(cell) {
            Occupant::Blue
        } else {
            Occupant::Empty
        }
    }

    /// Mask of cells with no stone: `NOT (red | blue)`.
    #[inline]
    pub fn legal_moves_mask(&self) -> Bitboard {
        !self.occupied()
    }

    /// Place a stone for `side` at `cell`, updating both bitboards and the
    /// hash incrementally, setting `last_move`, and incrementing `ply`.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::CellOccupied`] if `cell` is already taken by
    /// either side.
    pub fn place(&mut self, cell: Cell, side: Side) -> Result<(), PositionError> {
        if !self.is_empty(cell) {
            return Err(PositionError::CellOccupied { x: cell.x(), y: cell.y() });
        }
        match side {
            Side::Red => self.red.set(cell),
            Side::Blue => self.blue.set(cell),
        }
        self.hash ^= zobrist::key(side, cell);
        self.last_move = Some(cell);
        self.ply += 1;
        Ok(())
    }

    /// Remove `side`'s stone from `cell`, the exact inverse of [`place`](Self::place).
    ///
    /// Does not restore `last_move` to its prior value — callers that need
    /// make/unmake symmetry on `last_move` must save and restore it themselves.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::CellNotOwned`] if `cell` is not currently
    /// owned by `side`.
    pub fn unplace(&mut self, cell: Cell, side: Side) -> Result<(), PositionError> {
        let owns = match side {
            Side::Red => self.red.get(cell),
            Side::Blue => self.blue.get(cell),
        };
        if !owns {
            return Err(PositionError::CellNotOwned { x: cell.x(), y: cell.y() });
        }
        match side {
            Side::Red => self.red.clear(cell),
            Side::Blue => self.blue.clear(cell),
        }
        self.hash ^= zobrist::key(side, cell);
        self.ply -= 1;
        Ok(())
    }

    /// Recompute the hash from scratch over every occupied cell; used to
    /// validate the incremental hash invariant.
    pub fn hash_from_scratch(&self) -> u64 {
        let mut hash = 0u64;
        for cell in self.red.iter_set_bits() {
            hash ^= zobrist::key(Side::Red, cell);
        }
        for cell in self.blue.iter_set_bits() {
            hash ^= zobrist::key(Side::Blue, cell);
        }
        hash
    }
}

impl Default for Position {
    fn default() -> Position {
        Position::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_position_has_zero_hash_and_ply() {
        let pos = Position::empty();
        assert_eq!(pos.hash(), 0);
        assert_eq!(pos.ply(), 0);
        assert!(pos.last_move().is_none());
    }

    #[test]
    fn place_updates_occupancy_hash_ply_and_last_move() {
        let mut pos = Position::empty();
        let c = Cell::new(7, 7).unwrap();
        pos.place(c, Side::Red).unwrap();
        assert!(matches!(pos.at(c), Occupant::Red));
        assert_eq!(pos.ply(), 1);
        assert_eq!(pos.last_move(), Some(c));
        assert_eq!(pos.hash(), pos.hash_from_scratch());
        assert_ne!(pos.hash(), 0);
    }

    #[test]
    fn place_on_occupied_cell_fails() {
        let mut pos = Position::empty();
        let c = Cell::new(3, 3).unwrap();
        pos.place(c, Side::Red).unwrap();
        let err = pos.place(c, Side::Blue).unwrap_err();
        assert!(matches!(err, PositionError::CellOccupied { .. }));
    }

    #[test]
    fn unplace_is_inverse_of_place() {
        let mut pos = Position::empty();
        let c = Cell::new(4, 9).unwrap();
        let before = pos;
        pos.place(c, Side::Blue).unwrap();
        pos.unplace(c, Side::Blue).unwrap();
        assert_eq!(pos.red, before.red);
        assert_eq!(pos.blue, before.blue);
        assert_eq!(pos.hash, before.hash);
        assert_eq!(pos.ply, before.ply);
    }

    #[test]
    fn unplace_wrong_side_fails() {
        let mut pos = Position::empty();
        let c = Cell::new(1, 1).unwrap();
        pos.place(c, Side::Red).unwrap();
        let err = pos.unplace(c, Side::Blue).unwrap_err();
        assert!(matches!(err, PositionError::CellNotOwned { .. }));
    }

    #[test]
    fn red_and_blue_are_disjoint() {
        let mut pos = Position::empty();
        pos.place(Cell::new(0, 0).unwrap(), Side::Red).unwrap();
        pos.place(Cell::new(1, 1).unwrap(), Side::Blue).unwrap();
        assert!((pos.red() & pos.blue()).is_empty());
    }

    #[test]
    fn hash_matches_scratch_after_many_moves() {
        let mut pos = Position::empty();
        let cells = [(0, 0), (1, 1), (2, 2), (14, 14), (7, 7), (3, 9)];
        for (i, &(x, y)) in cells.iter().enumerate() {
            let side = if i % 2 == 0 { Side::Red } else { Side::Blue };
            pos.place(Cell::new(x, y).unwrap(), side).unwrap();
            assert_eq!(pos.hash(), pos.hash_from_scratch());
        }
    }

    #[test]
    fn legal_moves_mask_excludes_occupied() {
        let mut pos = Position::empty();
        let c = Cell::new(5, 5).unwrap();
        pos.place(c, Side::Red).unwrap();
        assert!(!pos.legal_moves_mask().get(c));
        let other = Cell::new(6, 6).unwrap();
        assert!(pos.legal_moves_mask().get(other));
    }
}
