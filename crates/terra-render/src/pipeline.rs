//! Bind group layouts, material uniform packing, and render pipelines per
//! material kind and composition state.
//!
//! Every pipeline shares the same first two groups:
//!
//! - group 0: camera (binding 0) and sun light (binding 1), written once per frame
//! - group 1: the node's model matrix
//! - group 2: material data, whose layout depends on the material kind

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use terra_materials::{Blending, MaterialDescriptor, PointsMaterial, RenderState, Side};

use crate::buffer::{MeshVertex, StarInstance};
use crate::depth::DepthBuffer;
use crate::shader::{MESH_SHADER_SOURCE, POINTS_SHADER_SOURCE, ShaderCache};

/// Model matrix uniform (group 1).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
}

/// Uniform block for basic, phong and standard materials (group 2, binding 0).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshMaterialUniform {
    /// Linear RGB, opacity.
    pub color_opacity: [f32; 4],
    /// Linear specular RGB, shininess.
    pub specular_shininess: [f32; 4],
    pub kind: u32,
    pub alpha_test: f32,
    pub bump_scale: f32,
    pub premultiply: u32,
}

impl MeshMaterialUniform {
    pub const KIND_BASIC: u32 = 0;
    pub const KIND_PHONG: u32 = 1;
    pub const KIND_STANDARD: u32 = 2;

    /// Pack a surface material. Returns `None` for points and shader materials.
    pub fn from_material(material: &MaterialDescriptor) -> Option<Self> {
        let state = material.state();
        let (kind, color, specular, shininess, bump_scale) = match material {
            MaterialDescriptor::Basic(m) => (Self::KIND_BASIC, m.color, m.color, 0.0, 0.0),
            MaterialDescriptor::Phong(m) => (
                Self::KIND_PHONG,
                m.color,
                m.specular,
                m.shininess,
                if m.bump_map.is_some() { m.bump_scale } else { 0.0 },
            ),
            MaterialDescriptor::Standard(m) => (Self::KIND_STANDARD, m.color, m.color, 0.0, 0.0),
            MaterialDescriptor::Points(_) | MaterialDescriptor::Shader(_) => return None,
        };
        let color = color.to_linear().to_array();
        let specular = specular.to_linear().to_array();

        Some(Self {
            color_opacity: [color[0], color[1], color[2], state.opacity],
            specular_shininess: [specular[0], specular[1], specular[2], shininess],
            kind,
            alpha_test: state.alpha_test.unwrap_or(0.0),
            bump_scale,
            premultiply: premultiplies(state) as u32,
        })
    }
}

/// Uniform block for point sprites (group 2, binding 0).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PointsUniform {
    pub color_opacity: [f32; 4],
    pub size: f32,
    pub size_attenuation: u32,
    pub alpha_test: f32,
    pub premultiply: u32,
}

impl From<&PointsMaterial> for PointsUniform {
    fn from(material: &PointsMaterial) -> Self {
        let c = material.color.to_linear();
        Self {
            color_opacity: [c.r, c.g, c.b, material.state.opacity],
            size: material.size,
            size_attenuation: material.size_attenuation as u32,
            alpha_test: material.state.alpha_test.unwrap_or(0.0),
            premultiply: premultiplies(&material.state) as u32,
        }
    }
}

/// Whether the shader should scale its color by alpha.
///
/// Everything except straight alpha blending ignores destination alpha, so
/// coverage has to be folded into the color.
pub fn premultiplies(state: &RenderState) -> bool {
    !(state.transparent && state.blending == Blending::Normal)
}

/// `dst + src` on color; alpha composited over.
pub const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::OVER,
};

pub fn blend_state(state: &RenderState) -> Option<wgpu::BlendState> {
    match state.blending {
        Blending::Additive => Some(ADDITIVE_BLENDING),
        Blending::Normal if state.transparent => Some(wgpu::BlendState::ALPHA_BLENDING),
        Blending::Normal => None,
    }
}

/// Faces are counter-clockwise from outside; `Front` culls the back faces.
pub fn cull_mode(side: Side) -> Option<wgpu::Face> {
    match side {
        Side::Front => Some(wgpu::Face::Back),
        Side::Back => Some(wgpu::Face::Front),
        Side::Double => None,
    }
}

/// Shader family a pipeline is built from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Mesh,
    Points,
    /// Custom shader material, keyed by its label.
    Shader(String),
}

/// Everything that changes pipeline state.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub kind: PipelineKind,
    pub blending: Blending,
    pub transparent: bool,
    pub depth_write: bool,
    pub side: Side,
}

impl PipelineKey {
    pub fn for_material(material: &MaterialDescriptor) -> Self {
        let state = material.state();
        let kind = match material {
            MaterialDescriptor::Points(_) => PipelineKind::Points,
            MaterialDescriptor::Shader(m) => PipelineKind::Shader(m.label.to_string()),
            _ => PipelineKind::Mesh,
        };
        Self {
            kind,
            blending: state.blending,
            transparent: state.transparent,
            depth_write: state.depth_write,
            side: state.side,
        }
    }

    fn label(&self) -> String {
        let kind = match &self.kind {
            PipelineKind::Mesh => "mesh",
            PipelineKind::Points => "points",
            PipelineKind::Shader(label) => label.as_str(),
        };
        format!(
            "{kind}-{:?}{}-pipeline",
            self.blending,
            if self.transparent { "-transparent" } else { "" }
        )
        .to_lowercase()
    }
}

/// Bind group layouts shared by all pipelines.
pub struct BindLayouts {
    pub frame: wgpu::BindGroupLayout,
    pub object: wgpu::BindGroupLayout,
    /// Mesh and points materials: uniform, map, aux map, bump map, sampler.
    pub material: wgpu::BindGroupLayout,
    /// Shader materials: a single uniform block.
    pub shader: wgpu::BindGroupLayout,
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

impl BindLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let both = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;

        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame-bind-group-layout"),
            entries: &[
                uniform_entry(0, both),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let object = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object-bind-group-layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });
        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material-bind-group-layout"),
            entries: &[
                uniform_entry(0, both),
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let shader = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shader-material-bind-group-layout"),
            entries: &[uniform_entry(0, both)],
        });

        Self {
            frame,
            object,
            material,
            shader,
        }
    }
}

/// Builds pipelines on first use and hands out shared handles afterwards.
pub struct PipelineCache {
    layouts: BindLayouts,
    material_pipeline_layout: wgpu::PipelineLayout,
    shader_pipeline_layout: wgpu::PipelineLayout,
    shaders: ShaderCache,
    pipelines: HashMap<PipelineKey, Arc<wgpu::RenderPipeline>>,
    surface_format: wgpu::TextureFormat,
    polygon_mode: wgpu::PolygonMode,
}

impl PipelineCache {
    /// `wireframe` must only be set when the device has `POLYGON_MODE_LINE`.
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, wireframe: bool) -> Self {
        let layouts = BindLayouts::new(device);
        let material_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("material-pipeline-layout"),
                bind_group_layouts: &[&layouts.frame, &layouts.object, &layouts.material],
                immediate_size: 0,
            });
        let shader_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("shader-material-pipeline-layout"),
                bind_group_layouts: &[&layouts.frame, &layouts.object, &layouts.shader],
                immediate_size: 0,
            });

        Self {
            layouts,
            material_pipeline_layout,
            shader_pipeline_layout,
            shaders: ShaderCache::new(),
            pipelines: HashMap::new(),
            surface_format,
            polygon_mode: if wireframe {
                wgpu::PolygonMode::Line
            } else {
                wgpu::PolygonMode::Fill
            },
        }
    }

    pub fn layouts(&self) -> &BindLayouts {
        &self.layouts
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Pipeline able to draw `material`.
    pub fn get(
        &mut self,
        device: &wgpu::Device,
        material: &MaterialDescriptor,
    ) -> Arc<wgpu::RenderPipeline> {
        let key = PipelineKey::for_material(material);
        if let Some(pipeline) = self.pipelines.get(&key) {
            return Arc::clone(pipeline);
        }

        let label = key.label();
        let (vertex_module, fragment_module, layout, buffers, polygon_mode) = match material {
            MaterialDescriptor::Points(_) => {
                let module = self
                    .shaders
                    .get_or_compile(device, "points", POINTS_SHADER_SOURCE);
                (
                    Arc::clone(&module),
                    module,
                    &self.material_pipeline_layout,
                    StarInstance::layout(),
                    wgpu::PolygonMode::Fill,
                )
            }
            MaterialDescriptor::Shader(m) => {
                let vs = self.shaders.get_or_compile(
                    device,
                    &format!("{}-vs", m.label),
                    &m.vertex_shader,
                );
                let fs = self.shaders.get_or_compile(
                    device,
                    &format!("{}-fs", m.label),
                    &m.fragment_shader,
                );
                (
                    vs,
                    fs,
                    &self.shader_pipeline_layout,
                    MeshVertex::layout(),
                    self.polygon_mode,
                )
            }
            _ => {
                let module = self.shaders.get_or_compile(device, "mesh", MESH_SHADER_SOURCE);
                (
                    Arc::clone(&module),
                    module,
                    &self.material_pipeline_layout,
                    MeshVertex::layout(),
                    self.polygon_mode,
                )
            }
        };

        // Sprites always face the camera, so culling never applies to them.
        let cull = match key.kind {
            PipelineKind::Points => None,
            _ => cull_mode(key.side),
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("vs_main"),
                buffers: &[buffers],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: cull,
                unclipped_depth: false,
                polygon_mode,
                conservative: false,
            },
            depth_stencil: Some(DepthBuffer::depth_stencil_state(key.depth_write)),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: blend_state(material.state()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        log::info!("Created pipeline '{label}'");
        let pipeline = Arc::new(pipeline);
        self.pipelines.insert(key, Arc::clone(&pipeline));
        pipeline
    }
}
