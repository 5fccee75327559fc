//! Shader module cache keyed by name.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};

/// Built-in mesh shader for basic, phong and standard materials.
pub const MESH_SHADER_SOURCE: &str = include_str!("mesh.wgsl");

/// Built-in point sprite shader.
pub const POINTS_SHADER_SOURCE: &str = include_str!("points.wgsl");

/// Compiled WGSL modules shared between pipelines.
#[derive(Default)]
pub struct ShaderCache {
    modules: HashMap<String, Arc<wgpu::ShaderModule>>,
}

impl ShaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the module registered as `name`, compiling `source` on first use.
    ///
    /// Shader materials reuse a module as long as they keep the same label.
    pub fn get_or_compile(
        &mut self,
        device: &wgpu::Device,
        name: &str,
        source: &str,
    ) -> Arc<wgpu::ShaderModule> {
        if let Some(module) = self.modules.get(name) {
            debug!("Reusing shader '{name}'");
            return Arc::clone(module);
        }

        let module = Arc::new(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        }));
        info!("Compiled shader '{name}'");
        self.modules.insert(name.to_string(), Arc::clone(&module));
        module
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
