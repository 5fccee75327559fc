//! Draws a [`Scene`] into the window surface.
//!
//! GPU resources for every drawable node are created once in
//! [`SceneRenderer::new`]. Each frame only rewrites uniforms: camera, sun,
//! model matrices and material blocks, so values changed on the CPU side show
//! up on the next frame.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use terra_materials::fresnel::FRESNEL_LABEL;
use terra_materials::{
    FresnelConfig, FresnelUniform, MaterialDescriptor, MaterialError, TextureRef, Uniforms,
};
use terra_scene::{DirectionalLight, NodeId, NodeKind, Scene, SphereGeometry};
use terra_space::PointCloud;
use wgpu::util::DeviceExt;

use crate::buffer::{InstanceBuffer, MeshBuffer};
use crate::camera::Camera;
use crate::depth::DepthBuffer;
use crate::gpu::{RenderContext, SurfaceError};
use crate::pipeline::{MeshMaterialUniform, ModelUniform, PipelineCache, PointsUniform};
use crate::texture::{ColorSpace, TextureCache, TextureError};

/// Errors raised while preparing scene resources.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error(transparent)]
    Material(#[from] MaterialError),

    #[error("shader material '{0}' has no known uniform layout")]
    UnsupportedShader(String),

    #[error("{0} material cannot be drawn on a mesh")]
    UnsupportedMaterial(&'static str),
}

/// Startup options for [`SceneRenderer`].
#[derive(Clone, Debug)]
pub struct RendererOptions {
    /// Directory texture references are resolved against.
    pub texture_dir: PathBuf,
    /// Linear RGB.
    pub clear_color: [f64; 3],
    /// Draw meshes as lines. Ignored unless the device supports it.
    pub wireframe: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            texture_dir: PathBuf::from("textures"),
            clear_color: [0.0; 3],
            wireframe: false,
        }
    }
}

enum DrawGeometry {
    Mesh(Arc<MeshBuffer>),
    Points(InstanceBuffer),
}

struct DrawItem {
    node: NodeId,
    pipeline: Arc<wgpu::RenderPipeline>,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    material_bind_group: wgpu::BindGroup,
    /// Material uniform block, re-packed from the scene every frame.
    material_uniform: wgpu::Buffer,
    uniform_error_logged: bool,
    transparent: bool,
    geometry: DrawGeometry,
}

/// Pack a Fresnel uniform map with its colors decoded to linear.
fn linear_fresnel_uniform(uniforms: &Uniforms) -> Result<FresnelUniform, MaterialError> {
    let config = FresnelConfig::from_uniforms(uniforms)?;
    let config = FresnelConfig {
        rim_color: config.rim_color.to_linear(),
        facing_color: config.facing_color.to_linear(),
        ..config
    };
    Ok(FresnelUniform::from(&config))
}

/// The uniform block a node's material uploads, packed from its current
/// values. `None` for nodes without a drawable material.
fn material_uniform_bytes(kind: &NodeKind) -> Result<Option<Vec<u8>>, MaterialError> {
    let bytes = match kind {
        NodeKind::Group => return Ok(None),
        NodeKind::Points(cloud) => {
            bytemuck::bytes_of(&PointsUniform::from(&cloud.material)).to_vec()
        }
        NodeKind::Mesh { material, .. } => match material {
            MaterialDescriptor::Shader(m) => {
                bytemuck::bytes_of(&linear_fresnel_uniform(&m.uniforms)?).to_vec()
            }
            MaterialDescriptor::Points(m) => bytemuck::bytes_of(&PointsUniform::from(m)).to_vec(),
            surface => match MeshMaterialUniform::from_material(surface) {
                Some(uniform) => bytemuck::bytes_of(&uniform).to_vec(),
                None => return Ok(None),
            },
        },
    };
    Ok(Some(bytes))
}

/// Color map, auxiliary map and bump map of a surface material.
///
/// The auxiliary slot holds the specular map for phong and the alpha map for
/// standard materials. Empty slots are filled with white.
fn surface_maps(material: &MaterialDescriptor) -> [(Option<&TextureRef>, ColorSpace); 3] {
    let (map, aux, bump) = match material {
        MaterialDescriptor::Phong(m) => (
            m.map.as_ref(),
            m.specular_map.as_ref(),
            m.bump_map.as_ref(),
        ),
        MaterialDescriptor::Standard(m) => (m.map.as_ref(), m.alpha_map.as_ref(), None),
        MaterialDescriptor::Basic(m) => (m.map.as_ref(), None, None),
        MaterialDescriptor::Points(m) => (m.map.as_ref(), None, None),
        MaterialDescriptor::Shader(_) => (None, None, None),
    };
    [
        (map, ColorSpace::Srgb),
        (aux, ColorSpace::Linear),
        (bump, ColorSpace::Linear),
    ]
}

/// Order in which nodes are drawn: opaque ones first, then transparent ones,
/// each group in scene order.
fn draw_order(transparent: &[bool]) -> Vec<usize> {
    let opaque = (0..transparent.len()).filter(|&i| !transparent[i]);
    let blended = (0..transparent.len()).filter(|&i| transparent[i]);
    opaque.chain(blended).collect()
}

/// Owns every GPU resource needed to draw one scene.
pub struct SceneRenderer {
    pipelines: PipelineCache,
    textures: TextureCache,
    depth: DepthBuffer,
    camera_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draws: Vec<DrawItem>,
    clear_color: wgpu::Color,
}

impl SceneRenderer {
    /// Upload meshes, textures and materials for every drawable node in `scene`.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        size: (u32, u32),
        scene: &Scene,
        options: &RendererOptions,
    ) -> Result<Self, RendererError> {
        let pipelines = PipelineCache::new(device, surface_format, options.wireframe);
        let textures = TextureCache::new(device, queue, &options.texture_dir)?;
        let depth = DepthBuffer::new(device, size.0.max(1), size.1.max(1));

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("camera-uniform"),
            size: std::mem::size_of::<crate::CameraUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("light-uniform"),
            size: std::mem::size_of::<terra_scene::DirectionalLightUniform>()
                as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bind-group"),
            layout: &pipelines.layouts().frame,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
            ],
        });

        let [r, g, b] = options.clear_color;
        let mut renderer = Self {
            pipelines,
            textures,
            depth,
            camera_buffer,
            light_buffer,
            frame_bind_group,
            draws: Vec::new(),
            clear_color: wgpu::Color { r, g, b, a: 1.0 },
        };

        let world = scene.world_matrices();
        let mut meshes: HashMap<*const SphereGeometry, Arc<MeshBuffer>> = HashMap::new();
        let mut draws = Vec::new();
        for (id, node) in scene.iter() {
            let model = world[id.index()];
            let item = match &node.kind {
                NodeKind::Group => continue,
                NodeKind::Mesh { geometry, material } => {
                    let mesh = meshes
                        .entry(Arc::as_ptr(geometry))
                        .or_insert_with(|| {
                            Arc::new(MeshBuffer::from_geometry(device, &node.name, geometry))
                        })
                        .clone();
                    renderer.prepare_mesh(device, queue, id, model, material, mesh)?
                }
                NodeKind::Points(cloud) => {
                    renderer.prepare_points(device, queue, id, &node.name, model, cloud)
                }
            };
            draws.push(item);
        }

        let transparent: Vec<bool> = draws.iter().map(|d: &DrawItem| d.transparent).collect();
        let mut slots: Vec<Option<DrawItem>> = draws.into_iter().map(Some).collect();
        renderer.draws = draw_order(&transparent)
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect();

        log::info!(
            "Scene renderer ready: {} draws, {} pipelines, {} textures",
            renderer.draws.len(),
            renderer.pipelines.len(),
            renderer.textures.len()
        );
        Ok(renderer)
    }

    fn model_binding(
        &self,
        device: &wgpu::Device,
        model: glam::Mat4,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("model-uniform"),
            contents: bytemuck::bytes_of(&ModelUniform {
                model: model.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("model-bind-group"),
            layout: &self.pipelines.layouts().object,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        (buffer, bind_group)
    }

    /// Bind group for the shared material layout: uniform plus three maps.
    fn textured_bind_group(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        uniform: &[u8],
        maps: [(Option<&TextureRef>, ColorSpace); 3],
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("material-uniform"),
            contents: uniform,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let [map, aux, bump] =
            maps.map(|(texture, space)| self.textures.load_or_white(device, queue, texture, space));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material-bind-group"),
            layout: &self.pipelines.layouts().material,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&aux.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&bump.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(self.textures.sampler()),
                },
            ],
        });
        (uniform_buffer, bind_group)
    }

    fn prepare_mesh(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        node: NodeId,
        model: glam::Mat4,
        material: &MaterialDescriptor,
        mesh: Arc<MeshBuffer>,
    ) -> Result<DrawItem, RendererError> {
        let pipeline = self.pipelines.get(device, material);
        let (model_buffer, model_bind_group) = self.model_binding(device, model);

        let (material_uniform, material_bind_group) = match material {
            MaterialDescriptor::Shader(m) => {
                if m.label != FRESNEL_LABEL {
                    return Err(RendererError::UnsupportedShader(m.label.to_string()));
                }
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("fresnel-uniform"),
                    contents: bytemuck::bytes_of(&linear_fresnel_uniform(&m.uniforms)?),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("fresnel-bind-group"),
                    layout: &self.pipelines.layouts().shader,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                });
                (buffer, bind_group)
            }
            MaterialDescriptor::Points(m) => {
                let uniform = PointsUniform::from(m);
                self.textured_bind_group(
                    device,
                    queue,
                    bytemuck::bytes_of(&uniform),
                    surface_maps(material),
                )
            }
            surface => {
                let uniform = MeshMaterialUniform::from_material(surface)
                    .ok_or(RendererError::UnsupportedMaterial(surface.kind()))?;
                self.textured_bind_group(
                    device,
                    queue,
                    bytemuck::bytes_of(&uniform),
                    surface_maps(surface),
                )
            }
        };

        Ok(DrawItem {
            node,
            pipeline,
            model_buffer,
            model_bind_group,
            material_bind_group,
            material_uniform,
            uniform_error_logged: false,
            transparent: material.state().transparent,
            geometry: DrawGeometry::Mesh(mesh),
        })
    }

    fn prepare_points(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        node: NodeId,
        name: &str,
        model: glam::Mat4,
        cloud: &PointCloud,
    ) -> DrawItem {
        let material = MaterialDescriptor::Points(cloud.material.clone());
        let pipeline = self.pipelines.get(device, &material);
        let (model_buffer, model_bind_group) = self.model_binding(device, model);
        let uniform = PointsUniform::from(&cloud.material);
        let (material_uniform, material_bind_group) = self.textured_bind_group(
            device,
            queue,
            bytemuck::bytes_of(&uniform),
            surface_maps(&material),
        );

        DrawItem {
            node,
            pipeline,
            model_buffer,
            model_bind_group,
            material_bind_group,
            material_uniform,
            uniform_error_logged: false,
            transparent: cloud.material.state.transparent,
            geometry: DrawGeometry::Points(InstanceBuffer::from_cloud(device, name, cloud)),
        }
    }

    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    /// Track a new surface size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth.resize(device, width.max(1), height.max(1));
    }

    /// Write this frame's uniforms.
    pub fn update(
        &mut self,
        queue: &wgpu::Queue,
        scene: &Scene,
        camera: &Camera,
        sun: &DirectionalLight,
    ) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera.to_uniform()));

        let linear_sun = DirectionalLight {
            color: sun.color.to_linear(),
            ..sun.clone()
        };
        queue.write_buffer(
            &self.light_buffer,
            0,
            bytemuck::bytes_of(&linear_sun.to_uniform()),
        );

        let world = scene.world_matrices();
        for draw in &mut self.draws {
            let Some(model) = world.get(draw.node.index()) else {
                continue;
            };
            queue.write_buffer(
                &draw.model_buffer,
                0,
                bytemuck::bytes_of(&ModelUniform {
                    model: model.to_cols_array_2d(),
                }),
            );

            let Some(node) = scene.get(draw.node) else {
                continue;
            };
            match material_uniform_bytes(&node.kind) {
                Ok(Some(bytes)) => {
                    queue.write_buffer(&draw.material_uniform, 0, &bytes);
                    draw.uniform_error_logged = false;
                }
                Ok(None) => {}
                Err(e) if !draw.uniform_error_logged => {
                    log::warn!("Keeping previous uniforms for '{}': {e}", node.name);
                    draw.uniform_error_logged = true;
                }
                Err(_) => {}
            }
        }
    }

    /// Update uniforms, draw every node, and present.
    pub fn render(
        &mut self,
        ctx: &RenderContext,
        scene: &Scene,
        camera: &Camera,
        sun: &DirectionalLight,
    ) -> Result<(), SurfaceError> {
        self.update(&ctx.queue, scene, camera, sun);

        let frame = ctx.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        self.encode(&mut encoder, &view);
        ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Record the scene pass into `encoder`.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(self.depth.attachment()),
            ..Default::default()
        });

        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        for draw in &self.draws {
            pass.set_pipeline(&draw.pipeline);
            pass.set_bind_group(1, &draw.model_bind_group, &[]);
            pass.set_bind_group(2, &draw.material_bind_group, &[]);
            match &draw.geometry {
                DrawGeometry::Mesh(mesh) => {
                    mesh.bind(&mut pass);
                    mesh.draw(&mut pass);
                }
                DrawGeometry::Points(instances) => instances.draw(&mut pass),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::tests::create_test_device;
    use terra_materials::fresnel::{FRESNEL_POWER, RIM_COLOR};
    use terra_materials::{Color, FresnelMaterialFactory, UniformValue};

    #[test]
    fn test_draw_order_puts_transparent_last() {
        // surface, lights, clouds, glow, stars
        let order = draw_order(&[false, false, true, true, false]);
        assert_eq!(order, vec![0, 1, 4, 2, 3]);
    }

    #[test]
    fn test_surface_maps_slots() {
        let phong = MaterialDescriptor::from(terra_materials::PhongMaterial {
            map: Some(TextureRef::new("a.jpg")),
            bump_map: Some(TextureRef::new("b.jpg")),
            ..Default::default()
        });
        let [map, aux, bump] = surface_maps(&phong);
        assert_eq!(map, (Some(&TextureRef::new("a.jpg")), ColorSpace::Srgb));
        assert_eq!(aux, (None, ColorSpace::Linear));
        assert_eq!(bump, (Some(&TextureRef::new("b.jpg")), ColorSpace::Linear));
    }

    #[test]
    fn test_draw_order_empty() {
        assert!(draw_order(&[]).is_empty());
    }

    #[test]
    fn test_fresnel_uniform_linearises_colors() {
        let material = FresnelMaterialFactory::build_default();
        let u = linear_fresnel_uniform(&material.uniforms).unwrap();
        let rim = Color::from_hex(0x0088ff).unwrap().to_linear();
        assert_eq!(u.rim_color, rim.to_array());
        assert_eq!(u.facing_color, [0.0; 3]);
        assert_eq!(u.fresnel_power, 4.0);
    }

    #[test]
    fn test_fresnel_uniform_follows_mutations() {
        let mut material = FresnelMaterialFactory::build_default();
        material
            .uniforms
            .set(FRESNEL_POWER, UniformValue::Float(2.0));
        material
            .uniforms
            .set(RIM_COLOR, UniformValue::Color(Color::WHITE));
        let u = linear_fresnel_uniform(&material.uniforms).unwrap();
        assert_eq!(u.fresnel_power, 2.0);
        assert_eq!(u.rim_color, [1.0; 3]);
    }

    #[test]
    fn test_material_blocks_follow_live_settings() {
        let mut config = terra_config::Config::default();
        config.scene.num_stars = 10;
        config.scene.star_seed = Some(3);
        let mut earth = terra_scene::EarthScene::from_config(&config).unwrap();

        let mut live = config.scene.clone();
        live.cloud_opacity = 0.3;
        live.glow_rim_hex = 0xffffff;
        earth.apply_live_settings(&live).unwrap();

        let clouds = earth.scene.get(earth.clouds).unwrap();
        let bytes = material_uniform_bytes(&clouds.kind).unwrap().unwrap();
        let uniform: MeshMaterialUniform = bytemuck::pod_read_unaligned(&bytes);
        assert!((uniform.color_opacity[3] - 0.3).abs() < 1e-6);

        let glow = earth.scene.get(earth.glow).unwrap();
        let bytes = material_uniform_bytes(&glow.kind).unwrap().unwrap();
        let uniform: FresnelUniform = bytemuck::pod_read_unaligned(&bytes);
        assert_eq!(uniform.rim_color, [1.0; 3]);
    }

    #[test]
    fn test_group_nodes_have_no_material_block() {
        assert_eq!(material_uniform_bytes(&NodeKind::Group).unwrap(), None);
    }

    #[test]
    fn test_renderer_builds_earth_scene_without_textures() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let mut config = terra_config::Config::default();
        config.scene.num_stars = 50;
        config.scene.star_seed = Some(1);
        config.render.sphere_detail = 2;
        let earth = terra_scene::EarthScene::from_config(&config).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let options = RendererOptions {
            texture_dir: dir.path().to_path_buf(),
            ..RendererOptions::default()
        };

        let renderer = SceneRenderer::new(
            &device,
            &queue,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            (64, 64),
            &earth.scene,
            &options,
        )
        .unwrap();
        // surface, lights, clouds, glow, stars
        assert_eq!(renderer.draw_count(), 5);
        assert!(renderer.textures.is_empty());
        assert!(renderer.draws.iter().rev().take(2).all(|d| d.transparent));
    }
}
