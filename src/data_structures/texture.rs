//! Textures, as decoded pixels and as GPU resources.
//!
//! [`TextureDescriptor`] is plain RGBA8 data that can be built on any thread.
//! [`Texture`] is its uploaded counterpart, created on the render thread.

use std::sync::atomic::{AtomicU64, Ordering};

use image::GenericImageView;

use crate::{
    error::{Error, Result},
    math::Color,
    shading::TextureSlot,
};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(u64);

/// Decoded RGBA8 pixels, not yet on the GPU.
///
/// The pixel buffer always holds exactly `width * height` texels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    id: TextureId,
    label: String,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl TextureDescriptor {
    /// `rgba` must hold `width * height * 4` bytes and both sides must be
    /// at least one texel.
    pub fn new(label: impl Into<String>, width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        let label = label.into();
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(Error::InvalidTextureData {
                label,
                width,
                height,
                len: rgba.len(),
            });
        }
        Ok(Self::from_parts(label, width, height, rgba))
    }

    fn from_parts(label: String, width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self {
            id: TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed)),
            label,
            width,
            height,
            rgba,
        }
    }

    pub fn from_image(label: impl Into<String>, img: &image::DynamicImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        Self::new(label, width, height, img.to_rgba8().into_raw())
    }

    /// A 1x1 texture of one colour.
    pub fn solid(label: impl Into<String>, color: Color) -> Self {
        Self::from_parts(label.into(), 1, 1, color.to_rgba8().to_vec())
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// RGBA8 texel at `(x, y)`, wrapping like the GPU sampler does.
    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let x = (x % self.width) as usize;
        let y = (y % self.height) as usize;
        let i = (y * self.width as usize + x) * 4;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }
}

/// An uploaded texture. Materials sample it through the cache's shared
/// sampler.
#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Texture {
    /// Upload decoded pixels. `srgb` picks the colour space of the format.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        descriptor: &TextureDescriptor,
        srgb: bool,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: descriptor.width,
            height: descriptor.height,
            depth_or_array_layers: 1,
        };
        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&descriptor.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &descriptor.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// The 1x1 texture bound to `slot` when a material leaves it empty.
    pub fn neutral(device: &wgpu::Device, queue: &wgpu::Queue, slot: TextureSlot) -> Self {
        // neutral colours are authored in linear space, so always upload linearly
        let descriptor = TextureDescriptor::solid(format!("neutral {}", slot.name()), slot.neutral());
        Self::upload(device, queue, &descriptor, false)
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}
