//! Core Caro/Gomoku types: bitboards, cells, sides, and the game position.

mod bitboard;
mod cell;
mod error;
mod position;
mod side;
mod zobrist;

pub use bitboard::{Bitboard, BitboardIter};
pub use cell::{BOARD_SIZE, Cell};
pub use error::{InvalidPosition, PositionError};
pub use position::{Occupant, Position};
pub use side::Side;
