//! The composite pass program: G-buffer in, lit and occluded frame out.

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    camera::{Camera, Projection},
    config::SsaoConfig,
    error::Result,
    framebuffer::{Attachment, GBuffer},
    pipelines::basic::{mk_render_pipeline, uniform_bind_group, uniform_layout_entry},
    shader::{ShaderProgram, UniformBlock, UniformType},
};

pub fn composite_uniforms() -> UniformBlock {
    UniformBlock::new(
        "composite uniforms",
        &[
            ("mat_inv_proj", UniformType::Mat4),
            ("mat_inv_view", UniformType::Mat4),
            ("mat_view_proj", UniformType::Mat4),
            ("near", UniformType::F32),
            ("far", UniformType::F32),
            ("radius", UniformType::F32),
            ("depth_tolerance", UniformType::F32),
            ("bias", UniformType::F32),
            ("occlusion_min", UniformType::F32),
            ("occlusion_max", UniformType::F32),
            ("sample_count", UniformType::U32),
            ("kernel_size", UniformType::U32),
            ("debug_view", UniformType::U32),
        ],
    )
}

/// WGSL source specialised for single or multi-sampled attachments.
pub fn shader_source(sample_count: u32) -> String {
    let (color, depth) = if sample_count > 1 {
        ("texture_multisampled_2d<f32>", "texture_depth_multisampled_2d")
    } else {
        ("texture_2d<f32>", "texture_depth_2d")
    };
    include_str!("composite.wgsl")
        .replace("{{COLOR_TEXTURE}}", color)
        .replace("{{DEPTH_TEXTURE}}", depth)
}

pub fn gbuffer_layout(device: &wgpu::Device, sample_count: u32) -> wgpu::BindGroupLayout {
    let multisampled = sample_count > 1;
    let entries: Vec<wgpu::BindGroupLayoutEntry> = Attachment::ALL
        .iter()
        .map(|attachment| {
            let sample_type = match attachment {
                Attachment::Depth => wgpu::TextureSampleType::Depth,
                _ => wgpu::TextureSampleType::Float { filterable: false },
            };
            wgpu::BindGroupLayoutEntry {
                binding: attachment.binding(),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type,
                },
                count: None,
            }
        })
        .collect();
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some("gbuffer_bind_group_layout"),
    })
}

pub struct CompositeProgram {
    program: ShaderProgram,
    sample_count: u32,
    gbuffer_layout: wgpu::BindGroupLayout,
    uniforms: UniformBlock,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

impl CompositeProgram {
    pub async fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Result<Self> {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_layout_entry(0, wgpu::ShaderStages::FRAGMENT)],
            label: Some("composite_bind_group_layout"),
        });
        let gbuffer_layout = gbuffer_layout(device, sample_count);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Composite Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &gbuffer_layout],
            push_constant_ranges: &[],
        });

        let program = ShaderProgram::new(device, "composite", shader_source(sample_count), |shader| {
            mk_render_pipeline(
                device,
                "Composite Pipeline",
                &layout,
                &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                None,
                1,
                None,
                &[],
                shader,
            )
        })
        .await?;

        let mut uniforms = composite_uniforms();
        uniforms.set_u32("sample_count", sample_count);
        let uniform_buffer = uniforms.create_buffer(device);
        let uniform_bind_group =
            uniform_bind_group(device, "composite_bind_group", &uniform_layout, &uniform_buffer);

        Ok(Self {
            program,
            sample_count,
            gbuffer_layout,
            uniforms,
            uniform_buffer,
            uniform_bind_group,
        })
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        self.program.pipeline()
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn uniform_bind_group(&self) -> &wgpu::BindGroup {
        &self.uniform_bind_group
    }

    /// Bind group over the attachments of `gbuffer`. Recreate it whenever
    /// the G-buffer is.
    pub fn bind_gbuffer(&self, device: &wgpu::Device, gbuffer: &GBuffer) -> wgpu::BindGroup {
        let entries: Vec<wgpu::BindGroupEntry> = Attachment::ALL
            .iter()
            .map(|attachment| wgpu::BindGroupEntry {
                binding: attachment.binding(),
                resource: wgpu::BindingResource::TextureView(gbuffer.view(*attachment)),
            })
            .collect();
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.gbuffer_layout,
            entries: &entries,
            label: Some("gbuffer_bind_group"),
        })
    }

    pub fn update(
        &mut self,
        queue: &wgpu::Queue,
        camera: &Camera,
        projection: &Projection,
        ssao: &SsaoConfig,
        debug_view: bool,
    ) {
        let view = camera.view_matrix();
        let proj = projection.calc_matrix();
        self.uniforms.set_mat4("mat_inv_proj", projection.inverse_matrix());
        self.uniforms
            .set_mat4("mat_inv_view", view.invert().unwrap_or_else(Matrix4::identity));
        self.uniforms.set_mat4("mat_view_proj", proj * view);
        self.uniforms.set_f32("near", projection.znear());
        self.uniforms.set_f32("far", projection.zfar());
        self.uniforms.set_f32("radius", ssao.radius);
        self.uniforms.set_f32("depth_tolerance", ssao.depth_tolerance);
        self.uniforms.set_f32("bias", ssao.bias);
        self.uniforms.set_f32("occlusion_min", ssao.occlusion_range[0]);
        self.uniforms.set_f32("occlusion_max", ssao.occlusion_range[1]);
        self.uniforms.set_u32("kernel_size", ssao.kernel_size());
        self.uniforms.set_u32("debug_view", debug_view as u32);
        self.uniforms.flush(queue, &self.uniform_buffer);
    }
}
