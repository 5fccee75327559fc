//! wgpu rendering: device setup, surface and depth management, textures,
//! material pipelines, and the scene renderer.

pub mod buffer;
pub mod camera;
pub mod depth;
pub mod gpu;
pub mod pipeline;
pub mod renderer;
pub mod shader;
pub mod surface;
pub mod texture;

pub use buffer::{InstanceBuffer, MeshBuffer, MeshVertex, StarInstance};
pub use camera::{Camera, CameraUniform};
pub use depth::DepthBuffer;
pub use gpu::{
    RenderContext, RenderContextError, SurfaceError, SurfaceOptions, init_render_context_blocking,
};
pub use pipeline::{BindLayouts, PipelineCache, PipelineKey, PipelineKind};
pub use renderer::{RendererError, RendererOptions, SceneRenderer};
pub use shader::ShaderCache;
pub use surface::{PhysicalSize, SurfaceResizeEvent, SurfaceWrapper};
pub use texture::{ColorSpace, GpuTexture, TextureCache, TextureError};
