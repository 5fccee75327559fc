use terra_materials::{ColorError, MaterialError};
use terra_space::StarfieldError;
use thiserror::Error;

/// Errors raised while assembling a scene. Nothing is built when one occurs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SceneError {
    #[error("starfield: {0}")]
    Starfield(#[from] StarfieldError),

    #[error("material: {0}")]
    Material(#[from] MaterialError),

    #[error("sun color: {0}")]
    Color(#[from] ColorError),
}
