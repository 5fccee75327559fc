//! Pointer input for the orbit camera.

pub mod mouse;

pub use mouse::{MouseState, OrbitInput};
