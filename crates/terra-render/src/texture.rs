//! Texture loading, mip generation and caching.
//!
//! Images are decoded with the `image` crate, mip levels are downsampled on the
//! CPU, and [`TextureCache`] keeps one GPU copy per file and color space.
//! Files that fail to load are replaced with a 1×1 white texture so a missing
//! map degrades the look instead of aborting the frame.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{RgbaImage, imageops::FilterType};
use terra_materials::TextureRef;

/// Errors that can occur while loading or creating a texture.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to load texture {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(
        "texture data size ({actual}) does not match expected ({expected}) for {width}x{height}"
    )]
    DataSizeMismatch {
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },
}

/// How texel values are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Albedo and emissive maps: decoded from sRGB on sampling.
    Srgb,
    /// Specular, alpha and height maps: sampled as stored.
    Linear,
}

impl ColorSpace {
    pub fn format(self) -> wgpu::TextureFormat {
        match self {
            ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// Number of mip levels down to 1×1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Decode an image file into RGBA8.
pub fn load_image(path: &Path) -> Result<RgbaImage, TextureError> {
    let image = image::open(path).map_err(|source| TextureError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = image.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(TextureError::ZeroDimensions {
            width: rgba.width(),
            height: rgba.height(),
        });
    }
    Ok(rgba)
}

/// Base image followed by successively halved levels.
pub fn build_mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let levels = mip_level_count(base.width(), base.height());
    let mut chain = Vec::with_capacity(levels as usize);
    chain.push(base);
    for _ in 1..levels {
        let Some(prev) = chain.last() else { break };
        let w = (prev.width() / 2).max(1);
        let h = (prev.height() / 2).max(1);
        let next = image::imageops::resize(prev, w, h, FilterType::Triangle);
        chain.push(next);
    }
    chain
}

/// A sampled 2D texture on the GPU.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub dimensions: (u32, u32),
    pub format: wgpu::TextureFormat,
    pub mip_level_count: u32,
}

impl GpuTexture {
    /// Upload tightly packed RGBA8 data, one slice per mip level.
    pub fn from_levels(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        levels: &[(u32, u32, &[u8])],
        color_space: ColorSpace,
    ) -> Result<Self, TextureError> {
        let Some(&(width, height, _)) = levels.first() else {
            return Err(TextureError::ZeroDimensions {
                width: 0,
                height: 0,
            });
        };
        if width == 0 || height == 0 {
            return Err(TextureError::ZeroDimensions { width, height });
        }
        for &(w, h, data) in levels {
            let expected = (w * h * 4) as usize;
            if data.len() != expected {
                return Err(TextureError::DataSizeMismatch {
                    actual: data.len(),
                    expected,
                    width: w,
                    height: h,
                });
            }
        }

        let format = color_space.format();
        let mip_level_count = levels.len() as u32;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, &(w, h, data)) in levels.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * w),
                    rows_per_image: None,
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            texture,
            view,
            dimensions: (width, height),
            format,
            mip_level_count,
        })
    }

    /// Single-texel texture of the given RGBA value.
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        rgba: [u8; 4],
        color_space: ColorSpace,
    ) -> Result<Self, TextureError> {
        Self::from_levels(device, queue, label, &[(1, 1, &rgba)], color_space)
    }
}

/// Loads textures relative to a directory and shares them between materials.
pub struct TextureCache {
    dir: PathBuf,
    textures: HashMap<(PathBuf, ColorSpace), Arc<GpuTexture>>,
    white_srgb: Arc<GpuTexture>,
    white_linear: Arc<GpuTexture>,
    sampler: wgpu::Sampler,
}

impl TextureCache {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        dir: impl Into<PathBuf>,
    ) -> Result<Self, TextureError> {
        let white_srgb = Arc::new(GpuTexture::solid(
            device,
            queue,
            "white-srgb",
            [255; 4],
            ColorSpace::Srgb,
        )?);
        let white_linear = Arc::new(GpuTexture::solid(
            device,
            queue,
            "white-linear",
            [255; 4],
            ColorSpace::Linear,
        )?);

        // u wraps across the seam duplicates; v stops at the poles.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("globe-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            anisotropy_clamp: 4,
            ..Default::default()
        });

        Ok(Self {
            dir: dir.into(),
            textures: HashMap::new(),
            white_srgb,
            white_linear,
            sampler,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// The 1×1 white fallback in the given color space.
    pub fn white(&self, color_space: ColorSpace) -> Arc<GpuTexture> {
        match color_space {
            ColorSpace::Srgb => Arc::clone(&self.white_srgb),
            ColorSpace::Linear => Arc::clone(&self.white_linear),
        }
    }

    /// Load (or reuse) the texture behind `texture`.
    pub fn load(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &TextureRef,
        color_space: ColorSpace,
    ) -> Result<Arc<GpuTexture>, TextureError> {
        let key = (texture.path().to_path_buf(), color_space);
        if let Some(cached) = self.textures.get(&key) {
            return Ok(Arc::clone(cached));
        }

        let path = self.dir.join(texture.path());
        let chain = build_mip_chain(load_image(&path)?);
        let levels: Vec<(u32, u32, &[u8])> = chain
            .iter()
            .map(|img| (img.width(), img.height(), img.as_raw().as_slice()))
            .collect();
        let label = texture.path().to_string_lossy();
        let gpu = Arc::new(GpuTexture::from_levels(
            device,
            queue,
            &label,
            &levels,
            color_space,
        )?);

        log::info!(
            "Loaded texture {} ({}x{}, {} mips)",
            path.display(),
            gpu.dimensions.0,
            gpu.dimensions.1,
            gpu.mip_level_count
        );
        self.textures.insert(key, Arc::clone(&gpu));
        Ok(gpu)
    }

    /// Like [`load`](Self::load), but substitutes white on failure.
    pub fn load_or_white(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: Option<&TextureRef>,
        color_space: ColorSpace,
    ) -> Arc<GpuTexture> {
        let Some(texture) = texture else {
            return self.white(color_space);
        };
        match self.load(device, queue, texture, color_space) {
            Ok(gpu) => gpu,
            Err(e) => {
                log::warn!("{e}; using a white placeholder");
                self.white(color_space)
            }
        }
    }
}
