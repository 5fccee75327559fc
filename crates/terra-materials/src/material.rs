//! Material descriptors consumed by the renderer.
//!
//! Descriptors are plain data: texture references, colors, blending and
//! depth state. The renderer maps each variant onto a wgpu pipeline.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Color, ColorError, UniformValue, Uniforms};

// ---------------------------------------------------------------------------
// MaterialError
// ---------------------------------------------------------------------------

/// Errors returned during material validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MaterialError {
    /// A color input was malformed.
    #[error("invalid color: {0}")]
    Color(#[from] ColorError),

    /// A scalar parameter is NaN or infinite.
    #[error("material parameter '{name}' is not finite")]
    NonFiniteParameter { name: &'static str },

    /// Opacity must lie in `[0.0, 1.0]`.
    #[error("opacity {0} is outside [0, 1]")]
    OpacityOutOfRange(f32),

    /// Alpha-test threshold must lie in `[0.0, 1.0]`.
    #[error("alpha test {0} is outside [0, 1]")]
    AlphaTestOutOfRange(f32),

    /// Point size must be positive.
    #[error("point size {0} must be positive")]
    InvalidPointSize(f32),

    /// A shader material is missing a uniform it needs.
    #[error("uniform '{0}' is missing or has the wrong type")]
    MissingUniform(String),

    /// A shader uniform holds NaN or infinity.
    #[error("uniform '{0}' is not finite")]
    NonFiniteUniform(String),
}

pub(crate) fn ensure_finite(name: &'static str, value: f32) -> Result<f32, MaterialError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MaterialError::NonFiniteParameter { name })
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Reference to a texture file, relative to the texture directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureRef(pub PathBuf);

impl TextureRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// How fragments combine with the color already in the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Blending {
    /// Source-over alpha blending (or replace when opaque).
    #[default]
    Normal,
    /// `dst + src`: brightens whatever is behind.
    Additive,
}

/// Which faces are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

/// Composition options shared by every material kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    /// Whether the material is sorted and blended as transparent.
    pub transparent: bool,
    /// Global opacity multiplier, `[0, 1]`.
    pub opacity: f32,
    pub blending: Blending,
    /// Discard fragments whose alpha is below this threshold.
    pub alpha_test: Option<f32>,
    pub depth_write: bool,
    pub side: Side,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            transparent: false,
            opacity: 1.0,
            blending: Blending::Normal,
            alpha_test: None,
            depth_write: true,
            side: Side::Front,
        }
    }
}

impl RenderState {
    /// Transparent, additive, no depth writes: a glow layered over a surface.
    pub fn additive() -> Self {
        Self {
            transparent: true,
            blending: Blending::Additive,
            depth_write: false,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), MaterialError> {
        let opacity = ensure_finite("opacity", self.opacity)?;
        if !(0.0..=1.0).contains(&opacity) {
            return Err(MaterialError::OpacityOutOfRange(opacity));
        }
        if let Some(threshold) = self.alpha_test {
            let threshold = ensure_finite("alpha_test", threshold)?;
            if !(0.0..=1.0).contains(&threshold) {
                return Err(MaterialError::AlphaTestOutOfRange(threshold));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Material kinds
// ---------------------------------------------------------------------------

/// Unlit material: color times optional texture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasicMaterial {
    pub color: Color,
    pub map: Option<TextureRef>,
    pub state: RenderState,
}

impl Default for BasicMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            map: None,
            state: RenderState::default(),
        }
    }
}

/// `0x111111`, a faint grey highlight.
const DEFAULT_SPECULAR: Color = Color {
    r: 17.0 / 255.0,
    g: 17.0 / 255.0,
    b: 17.0 / 255.0,
};

/// Blinn-Phong lit material with optional specular and bump maps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhongMaterial {
    pub color: Color,
    pub map: Option<TextureRef>,
    pub specular: Color,
    pub specular_map: Option<TextureRef>,
    pub bump_map: Option<TextureRef>,
    pub bump_scale: f32,
    pub shininess: f32,
    pub state: RenderState,
}

impl Default for PhongMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            map: None,
            specular: DEFAULT_SPECULAR,
            specular_map: None,
            bump_map: None,
            bump_scale: 1.0,
            shininess: 30.0,
            state: RenderState::default(),
        }
    }
}

/// Diffuse-lit material whose alpha can come from a greyscale map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardMaterial {
    pub color: Color,
    pub map: Option<TextureRef>,
    pub alpha_map: Option<TextureRef>,
    pub roughness: f32,
    pub metalness: f32,
    pub state: RenderState,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            map: None,
            alpha_map: None,
            roughness: 1.0,
            metalness: 0.0,
            state: RenderState::default(),
        }
    }
}

/// Point-sprite material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointsMaterial {
    /// Sprite edge length in world units (or pixels without attenuation).
    pub size: f32,
    /// Shrink sprites with distance like regular geometry.
    pub size_attenuation: bool,
    /// Multiply the sprite by the per-vertex color attribute.
    pub vertex_colors: bool,
    pub color: Color,
    pub map: Option<TextureRef>,
    pub state: RenderState,
}

impl Default for PointsMaterial {
    fn default() -> Self {
        Self {
            size: 1.0,
            size_attenuation: true,
            vertex_colors: false,
            color: Color::WHITE,
            map: None,
            state: RenderState::default(),
        }
    }
}

/// Custom shader pair plus uniform bindings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShaderMaterial {
    /// Debug label, also used as the pipeline cache key.
    pub label: Cow<'static, str>,
    /// WGSL source with a `vs_main` entry point.
    pub vertex_shader: Cow<'static, str>,
    /// WGSL source with an `fs_main` entry point.
    pub fragment_shader: Cow<'static, str>,
    pub uniforms: Uniforms,
    pub state: RenderState,
}

/// Any material the renderer knows how to draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MaterialDescriptor {
    Basic(BasicMaterial),
    Phong(PhongMaterial),
    Standard(StandardMaterial),
    Points(PointsMaterial),
    Shader(ShaderMaterial),
}

impl MaterialDescriptor {
    /// Composition state of the wrapped material.
    pub fn state(&self) -> &RenderState {
        match self {
            Self::Basic(m) => &m.state,
            Self::Phong(m) => &m.state,
            Self::Standard(m) => &m.state,
            Self::Points(m) => &m.state,
            Self::Shader(m) => &m.state,
        }
    }

    /// Short name of the material kind, used in logs and pipeline labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Basic(_) => "basic",
            Self::Phong(_) => "phong",
            Self::Standard(_) => "standard",
            Self::Points(_) => "points",
            Self::Shader(_) => "shader",
        }
    }

    /// Every texture this material samples, in binding order.
    pub fn textures(&self) -> Vec<&TextureRef> {
        match self {
            Self::Basic(m) => m.map.iter().collect(),
            Self::Phong(m) => [&m.map, &m.specular_map, &m.bump_map]
                .into_iter()
                .flatten()
                .collect(),
            Self::Standard(m) => [&m.map, &m.alpha_map].into_iter().flatten().collect(),
            Self::Points(m) => m.map.iter().collect(),
            Self::Shader(_) => Vec::new(),
        }
    }

    /// Validate colors, scalars and composition state.
    ///
    /// # Errors
    ///
    /// Returns the first [`MaterialError`] found.
    pub fn validated(self) -> Result<Self, MaterialError> {
        self.state().validate()?;
        match &self {
            Self::Basic(m) => {
                m.color.validated()?;
            }
            Self::Phong(m) => {
                m.color.validated()?;
                m.specular.validated()?;
                ensure_finite("bump_scale", m.bump_scale)?;
                ensure_finite("shininess", m.shininess)?;
            }
            Self::Standard(m) => {
                m.color.validated()?;
                ensure_finite("roughness", m.roughness)?;
                ensure_finite("metalness", m.metalness)?;
            }
            Self::Points(m) => {
                m.color.validated()?;
                let size = ensure_finite("size", m.size)?;
                if size <= 0.0 {
                    return Err(MaterialError::InvalidPointSize(size));
                }
            }
            Self::Shader(m) => {
                for (name, value) in m.uniforms.iter() {
                    match value {
                        UniformValue::Float(v) if !v.is_finite() => {
                            return Err(MaterialError::NonFiniteUniform(name.to_string()));
                        }
                        UniformValue::Vec3(v) if v.iter().any(|c| !c.is_finite()) => {
                            return Err(MaterialError::NonFiniteUniform(name.to_string()));
                        }
                        UniformValue::Color(c) => {
                            c.validated()?;
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(self)
    }
}

impl From<BasicMaterial> for MaterialDescriptor {
    fn from(m: BasicMaterial) -> Self {
        Self::Basic(m)
    }
}

impl From<PhongMaterial> for MaterialDescriptor {
    fn from(m: PhongMaterial) -> Self {
        Self::Phong(m)
    }
}

impl From<StandardMaterial> for MaterialDescriptor {
    fn from(m: StandardMaterial) -> Self {
        Self::Standard(m)
    }
}

impl From<PointsMaterial> for MaterialDescriptor {
    fn from(m: PointsMaterial) -> Self {
        Self::Points(m)
    }
}

impl From<ShaderMaterial> for MaterialDescriptor {
    fn from(m: ShaderMaterial) -> Self {
        Self::Shader(m)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
