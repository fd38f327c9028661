//! Zobrist hashing keys for position deduplication.

use crate::cell::Cell;
use crate::side::Side;

/// Zobrist key for each `(side, cell)` pair. Indexed by `[side.index()][cell.index()]`.
static KEYS: [[u64; Cell::COUNT]; Side::COUNT] = {
    let mut table = [[0u64; Cell::COUNT]; Side::COUNT];
    let mut state = SEED;
    let mut side = 0;
    while side < Side::COUNT {
        let mut cell = 0;
        while cell < Cell::COUNT {
            let (val, next) = xorshift64(state);
            table[side][cell] = val;
            state = next;
            cell += 1;
        }
        side += 1;
    }
    table
};

const SEED: u64 = 0x4341_524f_2d5a_4f42; // "CARO-ZOB"

/// Xorshift64 PRNG. Returns (value, next_state).
const fn xorshift64(mut state: u64) -> (u64, u64) {
    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;
    (state, state)
}

/// Look up the Zobrist key for a stone of `side` at `cell`.
#[inline]
pub(crate) fn key(side: Side, cell: Cell) -> u64 {
    KEYS[side.index()][cell.index()]
}
