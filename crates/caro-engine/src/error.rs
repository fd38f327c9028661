//! Engine-level error kinds (spec §7).
//!
//! `BudgetExhausted` is constructed internally but never propagated to the
//! caller (the search always falls back to its best move so far); it is
//! kept as a variant anyway so internal call sites that detect budget
//! exhaustion have a typed value to log before recovering.

use caro_core::InvalidPosition;

/// Errors the engine can raise. Mirrors `caro_core::PositionError` at the
/// call boundary but adds the search-level failure kinds from spec §7.
#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum EngineError {
    /// The caller handed in a structurally invalid position.
    #[error("invalid position: {0}")]
    InvalidPosition(#[from] InvalidPosition),

    /// The board is completely full; there is no legal move to make.
    #[error("no legal move: the board is full")]
    NoLegalMove,

    /// The search ran out of its time/node budget. Never surfaced to the
    /// caller — recovered by returning the best move found so far.
    #[error("search budget exhausted at depth {depth_reached}")]
    BudgetExhausted {
        /// Deepest iteration completed before the budget ran out.
        depth_reached: u8,
    },

    /// A broken internal invariant (make/unmake imbalance, a TT key
    /// collision that survived hash validation). Unrecoverable.
    #[error("internal assertion failed: {0}")]
    InternalAssertion(&'static str),
}
