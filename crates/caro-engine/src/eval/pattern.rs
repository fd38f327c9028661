//! `PatternEvaluator` — per-direction run scan producing an asymmetric,
//! defense-heavy position score (spec §4.3).

use caro_core::{Position, Side};

use crate::eval::weights::EvalWeights;
use crate::line::{DIRECTIONS, Run, runs_in_direction};

fn run_score(run: &Run, w: &EvalWeights) -> i32 {
    match run.length {
        0 | 1 => 0,
        2 => {
            if run.open_ends == 2 {
                w.w_open_two
            } else {
                0
            }
        }
        3 => match run.open_ends {
            2 => 2 * w.w_open_three,
            1 => w.w_open_three,
            _ => w.w_closed_three,
        },
        4 => {
            if run.open_ends >= 1 {
                w.w_open_four
            } else {
                w.w_closed_four
            }
        }
        5 => {
            if run.sandwiched {
                0
            } else {
                w.w5
            }
        }
        // Overline (6+): never a win (spec §3), so it is capped at the
        // open-four value rather than rewarded as a completed five.
        _ => {
            if run.sandwiched {
                0
            } else {
                w.w_open_four
            }
        }
    }
}

/// Sum of run scores for `side`'s stones over all four directions.
fn side_run_total(pos: &Position, side: Side, w: &EvalWeights) -> i32 {
    DIRECTIONS
        .iter()
        .flat_map(|&dir| runs_in_direction(pos, side, dir))
        .map(|run| run_score(&run, w))
        .sum()
}

/// Center-zone bonus for `side`'s own stones: `CENTER - 5 * manhattan_distance`
/// for every stone within `w.center_zone_radius` (Chebyshev) of `(7, 7)`.
fn center_bonus(pos: &Position, side: Side, w: &EvalWeights) -> i32 {
    pos.stones(side)
        .iter_set_bits()
        .filter_map(|cell| {
            let dx = (cell.x() as i32 - 7).abs();
            let dy = (cell.y() as i32 - 7).abs();
            if dx <= w.center_zone_radius && dy <= w.center_zone_radius {
                Some(w.center - 5 * (dx + dy))
            } else {
                None
            }
        })
        .sum()
}

/// Evaluate `pos` from `side`'s perspective using the default weight set.
pub fn evaluate(pos: &Position, side: Side) -> i32 {
    evaluate_with(pos, side, &EvalWeights::default())
}

/// Evaluate `pos` from `side`'s perspective with an explicit weight set.
///
/// `own_total + center_bonus(own) - defense_multiplier * opponent_total`,
/// all integer math (`x * num / den`, per spec).
pub fn evaluate_with(pos: &Position, side: Side, w: &EvalWeights) -> i32 {
    let own = side_run_total(pos, side, w);
    let opp = side_run_total(pos, !side, w);
    let defended_opp = opp * w.defense_multiplier_num / w.defense_multiplier_den;
    own + center_bonus(pos, side, w) - defended_opp
}
