//! Error types for position mutation and validation.

use std::fmt;

/// Errors from mutating a [`Position`](crate::position::Position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    /// `place` was called on a cell already occupied by either side.
    #[error("cell ({x}, {y}) is already occupied")]
    CellOccupied {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
    },
    /// `unplace` was called for a side that does not own the cell.
    #[error("cell ({x}, {y}) is not occupied by the given side")]
    CellNotOwned {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
    },
}

/// Errors surfaced when a [`Position`](crate::position::Position) received from a caller
/// fails structural validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidPosition {
    /// A cell is claimed by both sides simultaneously.
    OverlappingStones {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
    },
    /// The stored hash does not match the hash recomputed from scratch.
    HashMismatch {
        /// Hash carried by the position.
        stored: u64,
        /// Hash recomputed from the occupied cells.
        recomputed: u64,
    },
}

impl fmt::Display for InvalidPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidPosition::OverlappingStones { x, y } => {
                write!(f, "cell ({x}, {y}) is claimed by both sides")
            }
            InvalidPosition::HashMismatch { stored, recomputed } => {
                write!(
                    f,
                    "position hash {stored:#x} does not match recomputed hash {recomputed:#x}"
                )
            }
        }
    }
}

impl std::error::Error for InvalidPosition {}
