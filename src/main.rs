//! Not a CLI or a protocol front end — this binary exists only to
//! initialize the ambient stack and run the engine once as a smoke check,
//! the way the teacher's own root `src/main.rs` brings up logging before
//! handing off to its real entry point.

use anyhow::Result;
use tracing::info;

use caro_core::{Position, Side};
use caro_engine::{Difficulty, Engine, EngineConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    info!("caro engine starting");

    let position = Position::empty();
    let engine = Engine::new(EngineConfig::default());
    let outcome = engine.best_move(&position, Side::Red, Difficulty::Medium, Some(1_000), 0, 1, false);

    info!(
        mv = ?outcome.mv,
        depth = outcome.depth_reached,
        nodes = outcome.nodes,
        score = outcome.score,
        "opening move search finished"
    );

    Ok(())
}
