//! Platform free simulation
//!
//! Nothing in here touches the browser, so it all runs under `cargo test`.
//! - `state`: session data, catcher input, countdown, restart
//! - `step`: per-frame difficulty, spawning, falling and catching

pub mod state;
pub mod step;

pub use state::{
    Bounds, Catcher, Direction, FallingObject, GameEvent, Session, Surface, CATCHER_COLOR,
};
pub use step::{catcher_width, difficulty_factor, max_live_objects, spawn_interval_ms, step};
