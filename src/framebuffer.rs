//! The G-buffer: multi-sampled colour, normal, tangent and depth attachments
//! written by the geometry pass and read texel by texel in the composite.
//!
//! Binding the G-buffer opens a render pass on it and marks it as the active
//! target in a [`TargetTracker`]. The returned [`GBufferPass`] ends the pass
//! and restores the default target when dropped, so an early return cannot
//! leave the G-buffer bound.

use std::{
    cell::Cell,
    ops::{Deref, DerefMut},
};

use crate::{
    error::{Error, Result},
    math::Color,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    Color,
    Normal,
    Tangent,
    Depth,
}

impl Attachment {
    pub const ALL: [Attachment; 4] = [
        Attachment::Color,
        Attachment::Normal,
        Attachment::Tangent,
        Attachment::Depth,
    ];
    pub const COLOR_TARGETS: [Attachment; 3] =
        [Attachment::Color, Attachment::Normal, Attachment::Tangent];

    pub fn format(self) -> wgpu::TextureFormat {
        match self {
            Attachment::Color | Attachment::Normal | Attachment::Tangent => {
                wgpu::TextureFormat::Rgba16Float
            }
            Attachment::Depth => wgpu::TextureFormat::Depth32Float,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Attachment::Color => "gbuffer color",
            Attachment::Normal => "gbuffer normal",
            Attachment::Tangent => "gbuffer tangent",
            Attachment::Depth => "gbuffer depth",
        }
    }

    /// Binding index in the composite pass.
    pub fn binding(self) -> u32 {
        self as u32
    }

    /// What the geometry pass clears the attachment to.
    pub fn clear_value(self, color: Color) -> wgpu::Color {
        match self {
            Attachment::Color => color.into(),
            Attachment::Normal | Attachment::Tangent => wgpu::Color::TRANSPARENT,
            Attachment::Depth => wgpu::Color::WHITE,
        }
    }
}

/// Validated size and sample count of a G-buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GBufferSpec {
    width: u32,
    height: u32,
    sample_count: u32,
}

impl GBufferSpec {
    pub const MAX_SAMPLE_COUNT: u32 = 16;

    pub fn new(width: u32, height: u32, sample_count: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidTargetSize { width, height });
        }
        if sample_count == 0 || sample_count > Self::MAX_SAMPLE_COUNT || !sample_count.is_power_of_two() {
            return Err(Error::InvalidSampleCount(sample_count));
        }
        Ok(Self {
            width,
            height,
            sample_count,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    pub fn texture_descriptor(&self, attachment: Attachment) -> wgpu::TextureDescriptor<'static> {
        wgpu::TextureDescriptor {
            label: Some(attachment.label()),
            size: self.extent(),
            mip_level_count: 1,
            sample_count: self.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: attachment.format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveTarget {
    Default,
    GBuffer,
}

/// Which render target the frame currently draws into.
#[derive(Debug)]
pub struct TargetTracker {
    active: Cell<ActiveTarget>,
}

impl TargetTracker {
    pub fn new() -> Self {
        Self {
            active: Cell::new(ActiveTarget::Default),
        }
    }

    pub fn active(&self) -> ActiveTarget {
        self.active.get()
    }

    /// Make `target` active until the guard drops.
    pub fn bind(&self, target: ActiveTarget) -> TargetGuard<'_> {
        if self.active.get() != ActiveTarget::Default {
            log::warn!("binding {:?} while {:?} is still bound", target, self.active.get());
        }
        self.active.set(target);
        TargetGuard { tracker: self }
    }
}

impl Default for TargetTracker {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TargetGuard<'t> {
    tracker: &'t TargetTracker,
}

impl Drop for TargetGuard<'_> {
    fn drop(&mut self) {
        self.tracker.active.set(ActiveTarget::Default);
    }
}

#[derive(Debug)]
struct AttachmentTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

#[derive(Debug)]
pub struct GBuffer {
    spec: GBufferSpec,
    attachments: Vec<AttachmentTexture>,
}

impl GBuffer {
    /// Create every attachment. Fails if the adapter cannot multi-sample one
    /// of the formats at the requested count or the size exceeds its limits.
    pub fn create(device: &wgpu::Device, adapter: &wgpu::Adapter, spec: GBufferSpec) -> Result<Self> {
        let max = device.limits().max_texture_dimension_2d;
        if spec.width > max || spec.height > max {
            return Err(Error::InvalidTargetSize {
                width: spec.width,
                height: spec.height,
            });
        }
        for attachment in Attachment::ALL {
            let features = adapter.get_texture_format_features(attachment.format());
            if !features.flags.sample_count_supported(spec.sample_count) {
                return Err(Error::UnsupportedAttachment {
                    format: attachment.format(),
                    sample_count: spec.sample_count,
                });
            }
        }

        let attachments = Attachment::ALL
            .iter()
            .map(|attachment| {
                let texture = device.create_texture(&spec.texture_descriptor(*attachment));
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                AttachmentTexture { texture, view }
            })
            .collect();

        log::info!(
            "created {}x{} G-buffer with {} samples",
            spec.width,
            spec.height,
            spec.sample_count
        );
        Ok(Self { spec, attachments })
    }

    pub fn spec(&self) -> GBufferSpec {
        self.spec
    }

    pub fn width(&self) -> u32 {
        self.spec.width
    }

    pub fn height(&self) -> u32 {
        self.spec.height
    }

    pub fn sample_count(&self) -> u32 {
        self.spec.sample_count
    }

    pub fn texture(&self, attachment: Attachment) -> &wgpu::Texture {
        &self.attachments[attachment as usize].texture
    }

    pub fn view(&self, attachment: Attachment) -> &wgpu::TextureView {
        &self.attachments[attachment as usize].view
    }

    /// Begin a pass that clears and renders into every attachment.
    pub fn bind<'e, 't>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        tracker: &'t TargetTracker,
        clear: Color,
    ) -> GBufferPass<'e, 't> {
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = Attachment::COLOR_TARGETS
            .iter()
            .map(|attachment| {
                Some(wgpu::RenderPassColorAttachment {
                    view: self.view(*attachment),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(attachment.clear_value(clear)),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let guard = tracker.bind(ActiveTarget::GBuffer);
        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Geometry Pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.view(Attachment::Depth),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        GBufferPass {
            pass,
            _guard: guard,
        }
    }
}

/// An open render pass on the G-buffer. Dropping it unbinds.
pub struct GBufferPass<'e, 't> {
    // fields drop in order: the pass ends before the target is released
    pass: wgpu::RenderPass<'e>,
    _guard: TargetGuard<'t>,
}

impl GBufferPass<'_, '_> {
    pub fn unbind(self) {}
}

impl<'e> Deref for GBufferPass<'e, '_> {
    type Target = wgpu::RenderPass<'e>;

    fn deref(&self) -> &Self::Target {
        &self.pass
    }
}

impl DerefMut for GBufferPass<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.pass
    }
}
