//! Terra application: window, event loop, and the fixed-timestep driver that
//! spins the earth scene.

pub mod game_loop;
pub mod platform;
pub mod window;

pub use window::{AppError, AppState, run_with_config};
