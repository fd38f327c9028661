//! Position evaluation: the asymmetric, defense-heavy pattern scorer.

pub mod pattern;
pub mod weights;

pub use pattern::{evaluate, evaluate_with};
pub use weights::EvalWeights;
