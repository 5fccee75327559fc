//! Perspective look-at camera with a reverse-Z projection.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Per-frame camera data shared by every pipeline (group 0, binding 0).
///
/// Shaders that only need `view_proj` and `camera_pos` may declare a prefix of
/// this struct.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    /// xyz = eye position, w unused.
    pub camera_pos: [f32; 4],
    /// World-space right vector for billboards.
    pub camera_right: [f32; 4],
    /// World-space up vector for billboards.
    pub camera_up: [f32; 4],
    /// Width, height, 1/width, 1/height in physical pixels.
    pub viewport: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    /// Near clip plane distance (always positive).
    pub near: f32,
    /// Far clip plane distance (always positive, > near).
    pub far: f32,
    /// Surface size in physical pixels.
    pub viewport: (u32, u32),
}

impl Camera {
    /// Camera at `position` looking at the origin.
    pub fn perspective(fov_y_deg: f32, near: f32, far: f32, position: Vec3) -> Self {
        Self {
            position,
            fov_y: fov_y_deg.to_radians(),
            near,
            far,
            ..Self::default()
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Reverse-Z: near and far are swapped so the near plane lands on z = 1.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.far, self.near)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize_or(Vec3::X)
    }

    /// Up vector orthogonal to the view direction.
    pub fn true_up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    /// Track a new surface size. Zero sizes are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = (width, height);
        self.aspect_ratio = width as f32 / height as f32;
    }

    pub fn to_uniform(&self) -> CameraUniform {
        let right = self.right();
        let up = self.true_up();
        let (w, h) = (self.viewport.0 as f32, self.viewport.1 as f32);
        CameraUniform {
            view_proj: self.view_projection_matrix().to_cols_array_2d(),
            camera_pos: self.position.extend(1.0).to_array(),
            camera_right: right.extend(0.0).to_array(),
            camera_up: up.extend(0.0).to_array(),
            viewport: [w, h, 1.0 / w, 1.0 / h],
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 75f32.to_radians(),
            aspect_ratio: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            viewport: (1280, 720),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn clip_depth(camera: &Camera, world: Vec3) -> f32 {
        let clip = camera.view_projection_matrix() * world.extend(1.0);
        clip.z / clip.w
    }

    #[test]
    fn test_uniform_is_128_bytes() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 128);
        assert_eq!(std::mem::offset_of!(CameraUniform, camera_pos), 64);
    }

    #[test]
    fn test_reverse_z_near_is_one_far_is_zero() {
        let camera = Camera::default();
        let near = clip_depth(&camera, Vec3::new(0.0, 0.0, 5.0 - camera.near));
        let far = clip_depth(&camera, Vec3::new(0.0, 0.0, 5.0 - camera.far));
        assert!((near - 1.0).abs() < 1e-4, "near depth {near}");
        assert!(far.abs() < 1e-4, "far depth {far}");
    }

    #[test]
    fn test_closer_points_have_greater_depth() {
        let camera = Camera::default();
        let globe_front = clip_depth(&camera, Vec3::new(0.0, 0.0, 1.0));
        let star = clip_depth(&camera, Vec3::new(0.0, 0.0, -40.0));
        assert!(globe_front > star);
    }

    #[test]
    fn test_target_projects_to_screen_centre() {
        let camera = Camera::perspective(75.0, 0.1, 1000.0, Vec3::new(3.0, 2.0, 4.0));
        let clip = camera.view_projection_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((clip.x / clip.w).abs() < 1e-5);
        assert!((clip.y / clip.w).abs() < 1e-5);
    }

    #[test]
    fn test_billboard_axes_are_orthonormal() {
        let camera = Camera::perspective(75.0, 0.1, 1000.0, Vec3::new(1.0, 4.0, 2.0));
        let (r, u, f) = (camera.right(), camera.true_up(), camera.forward());
        for v in [r, u, f] {
            assert!((v.length() - 1.0).abs() < 1e-5);
        }
        assert!(r.dot(u).abs() < 1e-5);
        assert!(r.dot(f).abs() < 1e-5);
        assert!(u.dot(f).abs() < 1e-5);
    }

    #[test]
    fn test_set_viewport_updates_aspect_and_ignores_zero() {
        let mut camera = Camera::default();
        camera.set_viewport(800, 800);
        assert_eq!(camera.aspect_ratio, 1.0);
        camera.set_viewport(0, 600);
        assert_eq!(camera.viewport, (800, 800));
        let u = camera.to_uniform();
        assert_eq!(u.viewport, [800.0, 800.0, 1.0 / 800.0, 1.0 / 800.0]);
    }
}
