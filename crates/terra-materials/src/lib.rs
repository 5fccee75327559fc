//! Material system: colors, material descriptors, uniform maps, and the Fresnel rim-glow factory.

mod color;
pub mod fresnel;
mod material;
mod uniforms;

pub use color::{Color, ColorError, Hsl};
pub use fresnel::{FresnelConfig, FresnelMaterialFactory, FresnelUniform};
pub use material::{
    BasicMaterial, Blending, MaterialDescriptor, MaterialError, PhongMaterial, PointsMaterial,
    RenderState, ShaderMaterial, Side, StandardMaterial, TextureRef,
};
pub use uniforms::{UniformValue, Uniforms};
