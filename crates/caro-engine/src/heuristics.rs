//! Move-ordering heuristic tables: killers, history, butterfly, counter-move
//! and continuation history (spec §3 "Heuristic tables", §4.9).
//!
//! `History`/`Butterfly`/`CounterMove`/`ContinuationHistory` all share the
//! same bounded-gravity update: `new = old + b - |old * b| / MAX`, which
//! keeps every score inside `[-MAX, MAX]` without ever needing a hard clamp.

use caro_core::{Cell, Side};

/// Maximum search ply the heuristic tables are indexed by.
pub const MAX_PLY: usize = 128;

/// Saturation bound for every bounded-gravity table.
const MAX: i32 = 30_000;

/// Apply the bounded-gravity update used by every scored heuristic table.
fn bounded_update(old: i32, bonus: i32) -> i32 {
    let bonus = bonus.clamp(-MAX, MAX);
    old + bonus - (old as i64 * bonus.abs() as i64 / MAX as i64) as i32
}

/// Two killer moves per ply: quiet moves that caused a beta cutoff.
pub struct KillerTable {
    slots: Vec<[Option<Cell>; 2]>,
}

impl KillerTable {
    pub fn new() -> Self {
        KillerTable { slots: vec![[None, None]; MAX_PLY] }
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = [None, None];
        }
    }

    /// Record a cutoff move at `ply`. A move already in slot 0 is not
    /// re-inserted; otherwise slot 0 shifts to slot 1.
    pub fn store(&mut self, ply: usize, mv: Cell) {
        let Some(slot) = self.slots.get_mut(ply) else { return };
        if slot[0] != Some(mv) {
            slot[1] = slot[0];
            slot[0] = Some(mv);
        }
    }

    pub fn is_killer(&self, ply: usize, mv: Cell) -> bool {
        match self.slots.get(ply) {
            Some(slot) => slot[0] == Some(mv) || slot[1] == Some(mv),
            None => false,
        }
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// `[side][cell]` bounded-gravity score table, shared shape for History and
/// Butterfly (Butterfly just receives a larger bonus per cutoff).
pub struct CellScoreTable {
    red: Vec<i32>,
    blue: Vec<i32>,
}

impl CellScoreTable {
    pub fn new() -> Self {
        CellScoreTable { red: vec![0; Cell::COUNT], blue: vec![0; Cell::COUNT] }
    }

    pub fn clear(&mut self) {
        self.red.iter_mut().for_each(|v| *v = 0);
        self.blue.iter_mut().for_each(|v| *v = 0);
    }

    fn table_mut(&mut self, side: Side) -> &mut [i32] {
        match side {
            Side::Red => &mut self.red,
            Side::Blue => &mut self.blue,
        }
    }

    fn table(&self, side: Side) -> &[i32] {
        match side {
            Side::Red => &self.red,
            Side::Blue => &self.blue,
        }
    }

    pub fn update(&mut self, side: Side, cell: Cell, bonus: i32) {
        let idx = cell.index();
        let table = self.table_mut(side);
        table[idx] = bounded_update(table[idx], bonus);
    }

    pub fn score(&self, side: Side, cell: Cell) -> i32 {
        self.table(side)[cell.index()]
    }
}

impl Default for CellScoreTable {
    fn default() -> Self {
        Self::new()
    }
}

/// `[side][previous_cell][current_cell]` counter-move score table.
pub struct CounterMoveTable {
    red: Vec<i32>,
    blue: Vec<i32>,
}

impl CounterMoveTable {
    pub fn new() -> Self {
        let n = Cell::COUNT * Cell::COUNT;
        CounterMoveTable { red: vec![0; n], blue: vec![0; n] }
    }

    pub fn clear(&mut self) {
        self.red.iter_mut().for_each(|v| *v = 0);
        self.blue.iter_mut().for_each(|v| *v = 0);
    }

    fn index(prev: Cell, cur: Cell) -> usize {
        prev.index() * Cell::COUNT + cur.index()
    }

    fn table_mut(&mut self, side: Side) -> &mut [i32] {
        match side {
            Side::Red => &mut self.red,
            Side::Blue => &mut self.blue,
        }
    }

    fn table(&self, side: Side) -> &[i32] {
        match side {
            Side::Red => &self.red,
            Side::Blue => &self.blue,
        }
    }

    pub fn update(&mut self, side: Side, prev: Cell, cur: Cell, bonus: i32) {
        let idx = Self::index(prev, cur);
        let table = self.table_mut(side);
        table[idx] = bounded_update(table[idx], bonus);
    }

    pub fn score(&self, side: Side, prev: Cell, cur: Cell) -> i32 {
        self.table(side)[Self::index(prev, cur)]
    }
}

impl Default for CounterMoveTable {
    fn default() -> Self {
        Self::new()
    }
}

/// How many previous plies of continuation history are tracked.
pub const CONTINUATION_DEPTH: usize = 6;

/// `[side][previous_cell][current_cell]` for each of up to
/// [`CONTINUATION_DEPTH`] previous plies, reusing [`CounterMoveTable`]'s
/// shape per offset.
pub struct ContinuationHistory {
    tables: Vec<CounterMoveTable>,
}

impl ContinuationHistory {
    pub fn new() -> Self {
        ContinuationHistory { tables: (0..CONTINUATION_DEPTH).map(|_| CounterMoveTable::new()).collect() }
    }

    pub fn clear(&mut self) {
        for table in self.tables.iter_mut() {
            table.clear();
        }
    }

    /// `offset` is how many plies back the earlier move was played (1..=6).
    pub fn update(&mut self, offset: usize, side: Side, prev: Cell, cur: Cell, bonus: i32) {
        if let Some(table) = self.tables.get_mut(offset.saturating_sub(1)) {
            table.update(side, prev, cur, bonus);
        }
    }

    pub fn score(&self, offset: usize, side: Side, prev: Cell, cur: Cell) -> i32 {
        self.tables.get(offset.saturating_sub(1)).map(|t| t.score(side, prev, cur)).unwrap_or(0)
    }
}

impl Default for ContinuationHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// All move-ordering heuristics for one search thread, bundled for the
/// cutoff-update call site in the search core.
pub struct Heuristics {
    pub killers: KillerTable,
    pub history: CellScoreTable,
    pub butterfly: CellScoreTable,
    pub counter_move: CounterMoveTable,
    pub continuation: ContinuationHistory,
}

impl Heuristics {
    pub fn new() -> Self {
        Heuristics {
            killers: KillerTable::new(),
            history: CellScoreTable::new(),
            butterfly: CellScoreTable::new(),
            counter_move: CounterMoveTable::new(),
            continuation: ContinuationHistory::new(),
        }
    }

    /// Clear every table for a new game (spec §3: "a new-game reset clears
    /// all heuristic state and the TT").
    pub fn new_game(&mut self) {
        self.killers.clear();
        self.history.clear();
        self.butterfly.clear();
        self.counter_move.clear();
        self.continuation.clear();
    }

    /// Apply a beta-cutoff update at `ply`: push the killer, add `depth^2`
    /// to history and `2*depth^2` to butterfly, and bump counter-move /
    /// continuation for the immediately preceding move.
    pub fn on_cutoff(&mut self, side: Side, ply: usize, mv: Cell, prev_moves: &[Cell], depth: i32) {
        self.killers.store(ply, mv);
        let d2 = depth * depth;
        self.history.update(side, mv, d2);
        self.butterfly.update(side, mv, 2 * d2);
        if let Some(&prev) = prev_moves.last() {
            self.counter_move.update(side, prev, mv, d2);
        }
        for offset in 1..=CONTINUATION_DEPTH {
            if let Some(&prev) = prev_moves.iter().rev().nth(offset - 1) {
                self.continuation.update(offset, side, prev, mv, d2);
            }
        }
    }

    /// Apply the matching penalty to a quiet move that was searched but did
    /// not cause a cutoff, so that future ordering pulls it down.
    pub fn on_quiet_failure(&mut self, side: Side, mv: Cell, depth: i32) {
        let d2 = depth * depth;
        self.history.update(side, mv, -d2);
        self.butterfly.update(side, mv, -2 * d2);
    }
}

impl Default for Heuristics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn killer_store_and_check() {
        let mut kt = KillerTable::new();
        let a = Cell::new(3, 3).unwrap();
        let b = Cell::new(4, 4).unwrap();
        kt.store(5, a);
        assert!(kt.is_killer(5, a));
        assert!(!kt.is_killer(5, b));
        kt.store(5, b);
        assert!(kt.is_killer(5, a));
        assert!(kt.is_killer(5, b));
    }

    #[test]
    fn killer_repeat_does_not_shift() {
        let mut kt = KillerTable::new();
        let a = Cell::new(1, 1).unwrap();
        let b = Cell::new(2, 2).unwrap();
        kt.store(0, a);
        kt.store(0, b);
        kt.store(0, b);
        assert!(kt.is_killer(0, a));
        assert!(kt.is_killer(0, b));
    }

    #[test]
    fn history_update_grows_then_decays_towards_max() {
        let mut t = CellScoreTable::new();
        let c = Cell::new(7, 7).unwrap();
        for _ in 0..50 {
            t.update(Side::Red, c, 900);
        }
        assert!(t.score(Side::Red, c) <= MAX);
        assert!(t.score(Side::Red, c) > 0);
    }

    #[test]
    fn bounded_update_never_exceeds_max_in_either_direction() {
        let mut old = 0;
        for _ in 0..1000 {
            old = bounded_update(old, MAX);
        }
        assert!(old <= MAX);
        old = 0;
        for _ in 0..1000 {
            old = bounded_update(old, -MAX);
        }
        assert!(old >= -MAX);
    }

    #[test]
    fn counter_move_independent_per_side_and_pair() {
        let mut cm = CounterMoveTable::new();
        let prev = Cell::new(0, 0).unwrap();
        let cur = Cell::new(1, 1).unwrap();
        cm.update(Side::Red, prev, cur, 100);
        assert!(cm.score(Side::Red, prev, cur) > 0);
        assert_eq!(cm.score(Side::Blue, prev, cur), 0);
        assert_eq!(cm.score(Side::Red, cur, prev), 0);
    }

    #[test]
    fn on_cutoff_updates_killer_history_and_counter_move() {
        let mut h = Heuristics::new();
        let prev = Cell::new(5, 5).unwrap();
        let mv = Cell::new(6, 6).unwrap();
        h.on_cutoff(Side::Red, 2, mv, &[prev], 4);
        assert!(h.killers.is_killer(2, mv));
        assert!(h.history.score(Side::Red, mv) > 0);
        assert!(h.butterfly.score(Side::Red, mv) > h.history.score(Side::Red, mv));
        assert!(h.counter_move.score(Side::Red, prev, mv) > 0);
    }

    #[test]
    fn new_game_clears_everything() {
        let mut h = Heuristics::new();
        let mv = Cell::new(8, 8).unwrap();
        h.on_cutoff(Side::Blue, 0, mv, &[], 3);
        h.new_game();
        assert!(!h.killers.is_killer(0, mv));
        assert_eq!(h.history.score(Side::Blue, mv), 0);
    }
}
