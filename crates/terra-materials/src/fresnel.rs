//! Fresnel rim-glow shader material.
//!
//! Surfaces glow in the rim color where they are seen edge-on and fade to the
//! facing color where they face the camera. The layer is blended additively
//! over whatever is behind it, which makes it suitable for an atmosphere halo
//! drawn on a slightly enlarged copy of a planet's sphere.
//!
//! Per vertex:
//!
//! ```text
//! I = normalize(world_position - camera_position)
//! reflection_factor = bias + scale * (1 + dot(I, world_normal)) ^ power
//! ```
//!
//! Per fragment the interpolated factor is clamped to `[0, 1]` and used both
//! as the mix weight between facing and rim color and as the output alpha.

use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::material::ensure_finite;
use crate::{Color, MaterialError, RenderState, ShaderMaterial, UniformValue, Uniforms};

/// Uniform holding the rim color.
pub const RIM_COLOR: &str = "rim_color";
/// Uniform holding the facing color.
pub const FACING_COLOR: &str = "facing_color";
/// Uniform holding the additive bias.
pub const FRESNEL_BIAS: &str = "fresnel_bias";
/// Uniform holding the multiplicative scale.
pub const FRESNEL_SCALE: &str = "fresnel_scale";
/// Uniform holding the exponent.
pub const FRESNEL_POWER: &str = "fresnel_power";

/// Label given to materials built by [`FresnelMaterialFactory`].
pub const FRESNEL_LABEL: &str = "fresnel";

/// WGSL vertex stage.
///
/// Bindings: group 0 camera, group 1 model transform, group 2 [`FresnelUniform`].
pub const FRESNEL_VERTEX_SHADER: &str = r#"
struct CameraUniform {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
};

struct ModelUniform {
    model: mat4x4<f32>,
};

struct FresnelUniform {
    rim_color: vec3<f32>,
    fresnel_bias: f32,
    facing_color: vec3<f32>,
    fresnel_scale: f32,
    fresnel_power: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
};

@group(0) @binding(0) var<uniform> camera: CameraUniform;
@group(1) @binding(0) var<uniform> object: ModelUniform;
@group(2) @binding(0) var<uniform> fresnel: FresnelUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) reflection_factor: f32,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let world_position = object.model * vec4<f32>(in.position, 1.0);
    let normal_matrix = mat3x3<f32>(
        object.model[0].xyz,
        object.model[1].xyz,
        object.model[2].xyz,
    );
    let world_normal = normalize(normal_matrix * in.normal);
    let incident = normalize(world_position.xyz - camera.camera_pos.xyz);

    let base = max(1.0 + dot(incident, world_normal), 0.0);
    let falloff = select(pow(base, fresnel.fresnel_power), 1.0, fresnel.fresnel_power == 0.0);

    var out: VertexOutput;
    out.clip_position = camera.view_proj * world_position;
    out.reflection_factor = fresnel.fresnel_bias + fresnel.fresnel_scale * falloff;
    return out;
}
"#;

/// WGSL fragment stage. Shares group 2 with [`FRESNEL_VERTEX_SHADER`].
pub const FRESNEL_FRAGMENT_SHADER: &str = r#"
struct FresnelUniform {
    rim_color: vec3<f32>,
    fresnel_bias: f32,
    facing_color: vec3<f32>,
    fresnel_scale: f32,
    fresnel_power: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
};

@group(2) @binding(0) var<uniform> fresnel: FresnelUniform;

struct FragmentInput {
    @location(0) reflection_factor: f32,
};

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    let f = clamp(in.reflection_factor, 0.0, 1.0);
    return vec4<f32>(mix(fresnel.facing_color, fresnel.rim_color, f), f);
}
"#;

// ---------------------------------------------------------------------------
// FresnelConfig
// ---------------------------------------------------------------------------

/// Inputs to [`FresnelMaterialFactory::build`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FresnelConfig {
    /// Color at grazing angles. Default `0x0088ff`.
    pub rim_color: Color,
    /// Color where the surface faces the camera. Default black.
    pub facing_color: Color,
    pub fresnel_bias: f32,
    pub fresnel_scale: f32,
    pub fresnel_power: f32,
}

impl Default for FresnelConfig {
    fn default() -> Self {
        Self {
            rim_color: Color {
                r: 0.0,
                g: 136.0 / 255.0,
                b: 1.0,
            },
            facing_color: Color::BLACK,
            fresnel_bias: 0.1,
            fresnel_scale: 1.0,
            fresnel_power: 4.0,
        }
    }
}

impl FresnelConfig {
    /// Default parameters with the two colors given as packed `0xRRGGBB`.
    pub fn from_hex(rim_hex: u32, facing_hex: u32) -> Result<Self, MaterialError> {
        Ok(Self {
            rim_color: Color::from_hex(rim_hex)?,
            facing_color: Color::from_hex(facing_hex)?,
            ..Self::default()
        })
    }

    /// Reject malformed colors and non-finite scalars.
    pub fn validated(self) -> Result<Self, MaterialError> {
        self.rim_color.validated()?;
        self.facing_color.validated()?;
        ensure_finite(FRESNEL_BIAS, self.fresnel_bias)?;
        ensure_finite(FRESNEL_SCALE, self.fresnel_scale)?;
        ensure_finite(FRESNEL_POWER, self.fresnel_power)?;
        Ok(self)
    }

    /// Uniform map carrying these parameters.
    pub fn to_uniforms(&self) -> Uniforms {
        Uniforms::new()
            .with(RIM_COLOR, UniformValue::Color(self.rim_color))
            .with(FACING_COLOR, UniformValue::Color(self.facing_color))
            .with(FRESNEL_BIAS, UniformValue::Float(self.fresnel_bias))
            .with(FRESNEL_SCALE, UniformValue::Float(self.fresnel_scale))
            .with(FRESNEL_POWER, UniformValue::Float(self.fresnel_power))
    }

    /// Read parameters back out of a (possibly mutated) uniform map.
    pub fn from_uniforms(uniforms: &Uniforms) -> Result<Self, MaterialError> {
        let color = |name: &str| {
            uniforms
                .color(name)
                .ok_or_else(|| MaterialError::MissingUniform(name.to_string()))
        };
        let float = |name: &str| {
            uniforms
                .float(name)
                .ok_or_else(|| MaterialError::MissingUniform(name.to_string()))
        };
        Self {
            rim_color: color(RIM_COLOR)?,
            facing_color: color(FACING_COLOR)?,
            fresnel_bias: float(FRESNEL_BIAS)?,
            fresnel_scale: float(FRESNEL_SCALE)?,
            fresnel_power: float(FRESNEL_POWER)?,
        }
        .validated()
    }
}

// ---------------------------------------------------------------------------
// FresnelMaterialFactory
// ---------------------------------------------------------------------------

/// Builds transparent, additively blended Fresnel shader materials.
pub struct FresnelMaterialFactory;

impl FresnelMaterialFactory {
    /// Build a shader material from `config`.
    ///
    /// Every call returns an independent material; mutating one material's
    /// uniforms does not affect another.
    ///
    /// # Errors
    ///
    /// Returns [`MaterialError`] if a color is malformed or a scalar is not
    /// finite. Nothing is built in that case.
    pub fn build(config: &FresnelConfig) -> Result<ShaderMaterial, MaterialError> {
        let config = config.clone().validated()?;
        log::debug!(
            "Building fresnel material: rim={}, facing={}, bias={}, scale={}, power={}",
            config.rim_color,
            config.facing_color,
            config.fresnel_bias,
            config.fresnel_scale,
            config.fresnel_power,
        );
        Ok(Self::material(&config))
    }

    /// Build with [`FresnelConfig::default`].
    pub fn build_default() -> ShaderMaterial {
        Self::material(&FresnelConfig::default())
    }

    /// Assemble the material from an already validated config.
    fn material(config: &FresnelConfig) -> ShaderMaterial {
        ShaderMaterial {
            label: Cow::Borrowed(FRESNEL_LABEL),
            vertex_shader: Cow::Borrowed(FRESNEL_VERTEX_SHADER),
            fragment_shader: Cow::Borrowed(FRESNEL_FRAGMENT_SHADER),
            uniforms: config.to_uniforms(),
            state: RenderState::additive(),
        }
    }
}

// ---------------------------------------------------------------------------
// GPU layout
// ---------------------------------------------------------------------------

/// GPU-side layout of the Fresnel uniform block (48 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FresnelUniform {
    pub rim_color: [f32; 3],
    pub fresnel_bias: f32,
    pub facing_color: [f32; 3],
    pub fresnel_scale: f32,
    pub fresnel_power: f32,
    pub _padding: [f32; 3],
}

impl From<&FresnelConfig> for FresnelUniform {
    fn from(config: &FresnelConfig) -> Self {
        Self {
            rim_color: config.rim_color.to_array(),
            fresnel_bias: config.fresnel_bias,
            facing_color: config.facing_color.to_array(),
            fresnel_scale: config.fresnel_scale,
            fresnel_power: config.fresnel_power,
            _padding: [0.0; 3],
        }
    }
}

impl FresnelUniform {
    /// Pack the current values of a Fresnel material's uniform map.
    pub fn from_uniforms(uniforms: &Uniforms) -> Result<Self, MaterialError> {
        Ok(Self::from(&FresnelConfig::from_uniforms(uniforms)?))
    }
}

// ---------------------------------------------------------------------------
// CPU mirror
// ---------------------------------------------------------------------------

/// Unclamped reflection factor the vertex stage computes for one vertex.
pub fn reflection_factor(
    config: &FresnelConfig,
    world_position: Vec3,
    camera_position: Vec3,
    world_normal: Vec3,
) -> f32 {
    let incident = (world_position - camera_position).normalize_or_zero();
    let normal = world_normal.normalize_or_zero();
    let base = (1.0 + incident.dot(normal)).max(0.0);
    let falloff = if config.fresnel_power == 0.0 {
        1.0
    } else {
        base.powf(config.fresnel_power)
    };
    config.fresnel_bias + config.fresnel_scale * falloff
}

/// RGBA the fragment stage outputs for an interpolated reflection factor.
pub fn fragment_color(config: &FresnelConfig, reflection_factor: f32) -> [f32; 4] {
    let f = reflection_factor.clamp(0.0, 1.0);
    let c = config.facing_color.lerp(config.rim_color, f);
    [c.r, c.g, c.b, f]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Blending, ColorError};

    const EPS: f32 = 1e-6;

    #[test]
    fn test_default_parameters() {
        let config = FresnelConfig::default();
        assert_eq!(config.rim_color.to_hex(), 0x0088ff);
        assert_eq!(config.facing_color, Color::BLACK);
        assert_eq!(config.fresnel_bias, 0.1);
        assert_eq!(config.fresnel_scale, 1.0);
        assert_eq!(config.fresnel_power, 4.0);
        assert_eq!(FresnelConfig::from_hex(0x0088ff, 0x000000).unwrap(), config);
    }

    #[test]
    fn test_build_default_uniforms_and_state() {
        let material = FresnelMaterialFactory::build_default();
        assert_eq!(material.uniforms.len(), 5);
        assert_eq!(material.uniforms.color(RIM_COLOR).unwrap().to_hex(), 0x0088ff);
        assert_eq!(material.uniforms.color(FACING_COLOR), Some(Color::BLACK));
        assert_eq!(material.uniforms.float(FRESNEL_BIAS), Some(0.1));
        assert_eq!(material.uniforms.float(FRESNEL_SCALE), Some(1.0));
        assert_eq!(material.uniforms.float(FRESNEL_POWER), Some(4.0));
        assert!(material.state.transparent);
        assert_eq!(material.state.blending, Blending::Additive);
        assert!(!material.state.depth_write);
        assert_eq!(
            FresnelMaterialFactory::build(&FresnelConfig::default()).unwrap(),
            material
        );
    }

    #[test]
    fn test_custom_colors_reach_uniforms() {
        let config = FresnelConfig::from_hex(0xff0000, 0x00ff00).unwrap();
        let material = FresnelMaterialFactory::build(&config).unwrap();
        assert_eq!(material.uniforms.color(RIM_COLOR).unwrap().to_hex(), 0xff0000);
        assert_eq!(material.uniforms.color(FACING_COLOR).unwrap().to_hex(), 0x00ff00);
    }

    #[test]
    fn test_custom_and_default_share_shaders_and_state() {
        let custom = FresnelMaterialFactory::build(&FresnelConfig {
            fresnel_power: 2.0,
            ..FresnelConfig::from_hex(0xffffff, 0x202020).unwrap()
        })
        .unwrap();
        let default = FresnelMaterialFactory::build_default();
        assert_eq!(custom.label, default.label);
        assert_eq!(custom.label, FRESNEL_LABEL);
        assert_eq!(custom.vertex_shader, default.vertex_shader);
        assert_eq!(custom.fragment_shader, default.fragment_shader);
        assert_eq!(custom.state, default.state);
        assert_ne!(custom.uniforms, default.uniforms);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(matches!(
            FresnelConfig::from_hex(0x1_000000, 0),
            Err(MaterialError::Color(ColorError::HexOutOfRange(_)))
        ));

        let config = FresnelConfig {
            fresnel_power: f32::NAN,
            ..FresnelConfig::default()
        };
        assert_eq!(
            FresnelMaterialFactory::build(&config),
            Err(MaterialError::NonFiniteParameter {
                name: FRESNEL_POWER
            })
        );

        let config = FresnelConfig {
            rim_color: Color {
                r: -0.5,
                g: 0.0,
                b: 0.0,
            },
            ..FresnelConfig::default()
        };
        assert!(matches!(
            FresnelMaterialFactory::build(&config),
            Err(MaterialError::Color(_))
        ));
    }

    #[test]
    fn test_materials_are_independent() {
        let mut a = FresnelMaterialFactory::build_default();
        let b = FresnelMaterialFactory::build_default();
        a.uniforms.set(FRESNEL_POWER, UniformValue::Float(2.0));
        assert_eq!(b.uniforms.float(FRESNEL_POWER), Some(4.0));
    }

    #[test]
    fn test_facing_surface_yields_bias() {
        let config = FresnelConfig::default();
        // Camera at +Z looking at a point whose normal points back at it.
        let f = reflection_factor(&config, Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert!((f - config.fresnel_bias).abs() < EPS, "factor {f}");
        assert_eq!(fragment_color(&config, f)[3], config.fresnel_bias);
    }

    #[test]
    fn test_grazing_surface_yields_bias_plus_scale() {
        let config = FresnelConfig::default();
        // Normal perpendicular to the view ray.
        let f = reflection_factor(&config, Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 5.0), Vec3::X);
        assert!((f - 1.1).abs() < EPS, "factor {f}");
        assert_eq!(fragment_color(&config, f), [0.0, 136.0 / 255.0, 1.0, 1.0]);
    }

    #[test]
    fn test_zero_power_is_constant() {
        let config = FresnelConfig {
            fresnel_power: 0.0,
            fresnel_bias: 0.2,
            fresnel_scale: 0.5,
            ..FresnelConfig::default()
        };
        let camera = Vec3::new(0.0, 0.0, 5.0);
        for normal in [Vec3::Z, Vec3::X, Vec3::NEG_Z, Vec3::new(1.0, 1.0, 1.0)] {
            let f = reflection_factor(&config, Vec3::ZERO, camera, normal);
            assert!((f - 0.7).abs() < EPS, "factor {f} for normal {normal}");
        }
    }

    #[test]
    fn test_fragment_color_endpoints() {
        let config = FresnelConfig::from_hex(0x0088ff, 0x202020).unwrap();
        let facing = fragment_color(&config, 0.0);
        assert_eq!(&facing[..3], &config.facing_color.to_array());
        assert_eq!(facing[3], 0.0);

        let rim = fragment_color(&config, 1.0);
        assert_eq!(&rim[..3], &config.rim_color.to_array());
        assert_eq!(rim[3], 1.0);
    }

    #[test]
    fn test_fragment_color_clamps_factor() {
        let config = FresnelConfig::default();
        assert_eq!(fragment_color(&config, 3.5), fragment_color(&config, 1.0));
        assert_eq!(fragment_color(&config, -2.0), fragment_color(&config, 0.0));
    }

    #[test]
    fn test_gpu_uniform_layout() {
        assert_eq!(std::mem::size_of::<FresnelUniform>(), 48);
        let packed = FresnelUniform::from_uniforms(&FresnelConfig::default().to_uniforms()).unwrap();
        assert_eq!(packed.fresnel_bias, 0.1);
        assert_eq!(packed.fresnel_power, 4.0);
        assert_eq!(packed.rim_color, [0.0, 136.0 / 255.0, 1.0]);
        let bytes: &[u8] = bytemuck::bytes_of(&packed);
        assert_eq!(bytes.len(), 48);
    }

    #[test]
    fn test_from_uniforms_reports_missing_entry() {
        let mut uniforms = FresnelConfig::default().to_uniforms();
        uniforms.set(FRESNEL_SCALE, UniformValue::Vec3([1.0; 3]));
        assert_eq!(
            FresnelUniform::from_uniforms(&uniforms),
            Err(MaterialError::MissingUniform(FRESNEL_SCALE.to_string()))
        );
    }

    #[test]
    fn test_shader_sources_declare_entry_points() {
        assert!(FRESNEL_VERTEX_SHADER.contains("fn vs_main"));
        assert!(FRESNEL_FRAGMENT_SHADER.contains("fn fs_main"));
        assert!(FRESNEL_FRAGMENT_SHADER.contains("mix(fresnel.facing_color, fresnel.rim_color, f)"));
    }
}
