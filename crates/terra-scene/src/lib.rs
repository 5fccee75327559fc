//! Scene assembly: sphere geometry, a small node graph, the earth scene with
//! its spin animation, the sun light, and orbit camera controls.

pub mod controls;
pub mod earth;
mod error;
pub mod geometry;
pub mod light;
pub mod node;

pub use controls::OrbitControls;
pub use earth::{EarthScene, SpinRates, restart_required};
pub use error::SceneError;
pub use geometry::SphereGeometry;
pub use light::{DirectionalLight, DirectionalLightUniform};
pub use node::{Node, NodeId, NodeKind, Scene, Transform};
