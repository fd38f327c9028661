//! Search and evaluation for a 15x15 Caro/Gomoku engine: pattern
//! evaluation, threat detection, VCF solving, transposition tables, staged
//! move ordering, the alpha-beta search core, the Lazy-SMP parallel
//! driver, and the time manager that ties them together behind a single
//! [`Engine::best_move`] entry point.

pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod eval;
pub mod heuristics;
pub mod lazy_smp;
pub mod line;
pub mod movepicker;
pub mod search_core;
pub mod telemetry;
pub mod threats;
pub mod time;
pub mod tt;
pub mod vcf;
pub mod win;

pub use config::{Difficulty, DifficultyParams, EngineConfig};
pub use engine::{Engine, SearchOutcome};
pub use error::EngineError;
pub use eval::{EvalWeights, evaluate};
