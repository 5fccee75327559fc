//! Window size tracking that never reports a zero-sized surface.
//!
//! Wayland can hand out 0×0 windows before the compositor assigns a size and
//! minimized windows on Windows report 0×0; wgpu panics on either.

/// Smallest edge the surface is configured with.
pub const MIN_SURFACE_DIMENSION: u32 = 1;

/// Surface size in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysicalSize {
    pub width: u32,
    pub height: u32,
}

impl PhysicalSize {
    /// Width over height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Emitted when the physical size or scale factor actually changed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceResizeEvent {
    pub physical: PhysicalSize,
    pub scale_factor: f64,
}

/// Tracks the drawable size of the window across resizes and DPI changes.
#[derive(Clone, Debug)]
pub struct SurfaceWrapper {
    size: PhysicalSize,
    scale_factor: f64,
    /// False until a non-zero size has been seen.
    configured: bool,
}

impl SurfaceWrapper {
    pub fn new(physical_width: u32, physical_height: u32, scale_factor: f64) -> Self {
        Self {
            size: clamp_size(physical_width, physical_height),
            scale_factor,
            configured: physical_width > 0 && physical_height > 0,
        }
    }

    /// Record a new physical size. Returns `None` if nothing changed.
    pub fn handle_resize(
        &mut self,
        physical_width: u32,
        physical_height: u32,
    ) -> Option<SurfaceResizeEvent> {
        let size = clamp_size(physical_width, physical_height);
        if physical_width > 0 && physical_height > 0 {
            self.configured = true;
        }
        if size == self.size {
            return None;
        }
        self.size = size;
        Some(SurfaceResizeEvent {
            physical: size,
            scale_factor: self.scale_factor,
        })
    }

    /// Record a DPI change together with the window's new physical size.
    pub fn handle_scale_factor_changed(
        &mut self,
        scale_factor: f64,
        physical_width: u32,
        physical_height: u32,
    ) -> Option<SurfaceResizeEvent> {
        self.scale_factor = scale_factor;
        self.handle_resize(physical_width, physical_height)
    }

    pub fn physical_size(&self) -> PhysicalSize {
        self.size
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Logical size in points, for UI-scale decisions.
    pub fn logical_size(&self) -> (f64, f64) {
        (
            self.size.width as f64 / self.scale_factor,
            self.size.height as f64 / self.scale_factor,
        )
    }

    /// Whether a real (non-zero) size has been reported yet.
    pub fn is_configured(&self) -> bool {
        self.configured
    }
}

fn clamp_size(width: u32, height: u32) -> PhysicalSize {
    PhysicalSize {
        width: width.max(MIN_SURFACE_DIMENSION),
        height: height.max(MIN_SURFACE_DIMENSION),
    }
}
