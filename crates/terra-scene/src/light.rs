//! Directional sun light.
//!
//! [`DirectionalLight`] is the CPU-side description; [`DirectionalLightUniform`]
//! is what the renderer writes to its uniform buffer each frame.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use terra_materials::Color;

/// Infinitely distant light shining from `position` toward `target`.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    /// Scalar intensity multiplier.
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            intensity: 1.0,
            position: Vec3::Y,
            target: Vec3::ZERO,
        }
    }
}

impl DirectionalLight {
    /// Unit vector pointing from the light toward its target.
    ///
    /// Falls back to straight down when position and target coincide.
    pub fn direction(&self) -> Vec3 {
        let dir = self.target - self.position;
        if dir.length_squared() < 1e-12 {
            Vec3::NEG_Y
        } else {
            dir.normalize()
        }
    }

    pub fn to_uniform(&self) -> DirectionalLightUniform {
        let d = self.direction();
        DirectionalLightUniform {
            direction_intensity: [d.x, d.y, d.z, self.intensity],
            color_padding: [self.color.r, self.color.g, self.color.b, 0.0],
        }
    }
}

/// GPU-side representation, 32 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DirectionalLightUniform {
    /// xyz = direction the light travels, w = intensity.
    pub direction_intensity: [f32; 4],
    /// xyz = color, w = padding.
    pub color_padding: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_points_at_target() {
        let light = DirectionalLight {
            position: Vec3::new(-2.0, 0.5, 1.5),
            ..DirectionalLight::default()
        };
        let d = light.direction();
        assert!((d.length() - 1.0).abs() < 1e-6);
        assert!(d.dot(-light.position.normalize()) > 0.9999);
    }

    #[test]
    fn test_degenerate_direction_falls_back() {
        let light = DirectionalLight {
            position: Vec3::ZERO,
            ..DirectionalLight::default()
        };
        assert_eq!(light.direction(), Vec3::NEG_Y);
    }

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<DirectionalLightUniform>(), 32);
        assert_eq!(std::mem::offset_of!(DirectionalLightUniform, color_padding), 16);
        let u = DirectionalLight {
            intensity: 2.0,
            ..DirectionalLight::default()
        }
        .to_uniform();
        assert_eq!(u.direction_intensity, [0.0, -1.0, 0.0, 2.0]);
        assert_eq!(u.color_padding, [1.0, 1.0, 1.0, 0.0]);
    }
}
