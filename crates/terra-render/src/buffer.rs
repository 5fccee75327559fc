//! Vertex, index and instance buffers for the globe mesh and the starfield.

use bytemuck::{Pod, Zeroable};
use terra_scene::SphereGeometry;
use terra_space::PointCloud;
use wgpu::util::DeviceExt;

/// Sphere vertex: position, normal, and equirectangular UV.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Interleave a sphere's attribute arrays.
pub fn mesh_vertices(geometry: &SphereGeometry) -> Vec<MeshVertex> {
    geometry
        .positions
        .iter()
        .zip(&geometry.normals)
        .zip(&geometry.uvs)
        .map(|((p, n), uv)| MeshVertex {
            position: p.to_array(),
            normal: n.to_array(),
            uv: *uv,
        })
        .collect()
}

/// One star sprite, drawn as an instanced quad.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct StarInstance {
    pub position: [f32; 3],
    /// Linear RGB.
    pub color: [f32; 3],
}

impl StarInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<StarInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-star instances.
///
/// Star colors come out of HSL already in linear space and are uploaded
/// unchanged. Without vertex colors every star is white and the material
/// color alone tints the sprite.
pub fn star_instances(cloud: &PointCloud) -> Vec<StarInstance> {
    let vertex_colors = cloud.material.vertex_colors;
    cloud
        .positions
        .chunks_exact(3)
        .zip(cloud.colors.chunks_exact(3))
        .map(|(p, c)| {
            let color = if vertex_colors {
                [c[0], c[1], c[2]]
            } else {
                [1.0; 3]
            };
            StarInstance {
                position: [p[0], p[1], p[2]],
                color,
            }
        })
        .collect()
}

/// Indexed triangle mesh on the GPU.
pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffer {
    pub fn from_geometry(device: &wgpu::Device, label: &str, geometry: &SphereGeometry) -> Self {
        let vertices = mesh_vertices(geometry);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        log::debug!(
            "Uploaded mesh '{label}': {} vertices, {} indices",
            vertices.len(),
            geometry.indices.len()
        );

        Self {
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
        }
    }

    pub fn bind<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass) {
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Star instances on the GPU. An empty cloud has no buffer and draws nothing.
pub struct InstanceBuffer {
    pub buffer: Option<wgpu::Buffer>,
    pub instance_count: u32,
}

impl InstanceBuffer {
    /// Vertices per sprite quad (two triangles, no index buffer).
    pub const QUAD_VERTICES: u32 = 6;

    pub fn from_cloud(device: &wgpu::Device, label: &str, cloud: &PointCloud) -> Self {
        let instances = star_instances(cloud);
        let buffer = (!instances.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}-instances")),
                contents: bytemuck::cast_slice(&instances),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
        Self {
            buffer,
            instance_count: instances.len() as u32,
        }
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        if let Some(buffer) = &self.buffer {
            render_pass.set_vertex_buffer(0, buffer.slice(..));
            render_pass.draw(0..Self::QUAD_VERTICES, 0..self.instance_count);
        }
    }
}
