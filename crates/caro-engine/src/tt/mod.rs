//! Transposition tables: a single-threaded 3-way cluster table
//! ([`sequential::TranspositionTable`]) and a sharded lock-free table for
//! Lazy-SMP ([`lockfree::LockFreeTt`]).
//!
//! [`ProbeStore`] lets the search core address either table through the
//! same interface: the single-thread fast path wraps the sequential table
//! in a `RefCell` (exclusive, no atomics needed); Lazy-SMP workers share a
//! [`LockFreeTt`] directly.

use std::cell::RefCell;

use caro_core::Cell;

pub mod lockfree;
pub mod sequential;

pub use lockfree::LockFreeTt;
pub use sequential::{Bound, TranspositionTable, TtMove};

/// Outcome of a [`ProbeStore::probe`] call, uniform across both table kinds.
pub struct ProbeResult {
    pub cutoff: bool,
    pub value: i32,
    pub mv: Option<Cell>,
    pub depth: i8,
}

/// Common probe/store interface the search core addresses either
/// transposition table through.
pub trait ProbeStore {
    fn probe(&self, hash: u64, depth: i8, alpha: i32, beta: i32) -> Option<ProbeResult>;

    #[allow(clippy::too_many_arguments)]
    fn store(
        &self,
        hash: u64,
        depth: i8,
        value: i32,
        mv: Option<Cell>,
        alpha: i32,
        beta: i32,
        static_eval: i32,
        age: u8,
        thread_index: u8,
    );
}

impl ProbeStore for RefCell<TranspositionTable> {
    fn probe(&self, hash: u64, depth: i8, alpha: i32, beta: i32) -> Option<ProbeResult> {
        self.borrow()
            .lookup(hash, depth, alpha, beta)
            .map(|p| ProbeResult { cutoff: p.cutoff, value: p.value, mv: p.mv.cell(), depth: p.depth })
    }

    fn store(
        &self,
        hash: u64,
        depth: i8,
        value: i32,
        mv: Option<Cell>,
        alpha: i32,
        beta: i32,
        static_eval: i32,
        _age: u8,
        _thread_index: u8,
    ) {
        let tt_move = mv.map(TtMove::from_cell).unwrap_or(TtMove::NONE);
        self.borrow_mut().store(hash, depth, value, tt_move, alpha, beta, static_eval);
    }
}

impl ProbeStore for LockFreeTt {
    fn probe(&self, hash: u64, depth: i8, alpha: i32, beta: i32) -> Option<ProbeResult> {
        let p = LockFreeTt::probe(self, hash)?;
        let cutoff = p.depth as i32 >= depth as i32
            && match p.bound {
                Bound::Exact => true,
                Bound::LowerBound => p.value >= beta,
                Bound::UpperBound => p.value <= alpha,
            };
        Some(ProbeResult { cutoff, value: p.value, mv: p.mv, depth: p.depth })
    }

    fn store(
        &self,
        hash: u64,
        depth: i8,
        value: i32,
        mv: Option<Cell>,
        alpha: i32,
        beta: i32,
        static_eval: i32,
        age: u8,
        thread_index: u8,
    ) {
        let bound = if value <= alpha {
            Bound::UpperBound
        } else if value >= beta {
            Bound::LowerBound
        } else {
            Bound::Exact
        };
        LockFreeTt::store(self, hash, depth, value, static_eval, mv, bound, age, thread_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caro_core::Cell;

    #[test]
    fn refcell_sequential_probe_store_roundtrip() {
        let tt = RefCell::new(TranspositionTable::new(1));
        let mv = Cell::new(7, 7).unwrap();
        ProbeStore::store(&tt, 42, 4, 10, Some(mv), -100, 100, 5, 1, 0);
        let probe = ProbeStore::probe(&tt, 42, 4, -100, 100).unwrap();
        assert!(probe.cutoff);
        assert_eq!(probe.mv, Some(mv));
    }

    #[test]
    fn lockfree_probe_store_roundtrip() {
        let tt = LockFreeTt::new(1, 4);
        let mv = Cell::new(3, 3).unwrap();
        ProbeStore::store(&tt, 99, 5, 40, Some(mv), -10, 10, 0, 1, 0);
        let probe = ProbeStore::probe(&tt, 99, 5, -10, 10).unwrap();
        assert!(probe.cutoff);
        assert_eq!(probe.mv, Some(mv));
    }
}
