//! The geometry pass program.

use cgmath::{EuclideanSpace, Vector3};

use crate::{
    camera::{Camera, Projection},
    config::LightConfig,
    data_structures::{
        instance::EntityRaw,
        model::{ModelVertex, Vertex},
    },
    error::Result,
    framebuffer::{Attachment, GBufferSpec},
    pipelines::basic::{mk_render_pipeline, uniform_bind_group, uniform_layout_entry},
    shader::{ShaderProgram, UniformBlock, UniformType},
    shading::TextureSlot,
};

/// Per-frame uniforms, group 0.
pub fn frame_uniforms() -> UniformBlock {
    UniformBlock::new(
        "frame uniforms",
        &[
            ("mat_view", UniformType::Mat4),
            ("mat_proj", UniformType::Mat4),
            ("light_pos", UniformType::Vec3),
            ("eye_pos", UniformType::Vec3),
            ("light_ambient", UniformType::Vec4),
            ("light_diffuse", UniformType::Vec4),
            ("light_specular", UniformType::Vec4),
        ],
    )
}

/// Per-material uniforms, group 1 binding 0.
pub fn material_uniforms() -> UniformBlock {
    UniformBlock::new(
        "material uniforms",
        &[
            ("mat_ambient", UniformType::Vec4),
            ("mat_diffuse", UniformType::Vec4),
            ("mat_specular", UniformType::Vec4),
            ("mat_shininess", UniformType::F32),
            ("bound_mask", UniformType::U32),
        ],
    )
}

pub fn frame_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[uniform_layout_entry(
            0,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        )],
        label: Some("frame_bind_group_layout"),
    })
}

/// Uniforms at binding 0, the seven slot textures at 1 to 7, the sampler last.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let mut entries = vec![uniform_layout_entry(0, wgpu::ShaderStages::FRAGMENT)];
    for slot in TextureSlot::ALL {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1 + slot.index() as u32,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        });
    }
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: 1 + TextureSlot::COUNT as u32,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    });
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some("material_bind_group_layout"),
    })
}

pub struct GeometryProgram {
    program: ShaderProgram,
    material_layout: wgpu::BindGroupLayout,
    uniforms: UniformBlock,
    uniform_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
}

impl GeometryProgram {
    pub async fn new(device: &wgpu::Device, spec: GBufferSpec) -> Result<Self> {
        let frame_layout = frame_layout(device);
        let material_layout = material_layout(device);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Geometry Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let targets: Vec<Option<wgpu::ColorTargetState>> = Attachment::COLOR_TARGETS
            .iter()
            .map(|attachment| {
                let blend = match attachment {
                    Attachment::Color => wgpu::BlendState::ALPHA_BLENDING,
                    _ => wgpu::BlendState::REPLACE,
                };
                Some(wgpu::ColorTargetState {
                    format: attachment.format(),
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let program = ShaderProgram::new(
            device,
            "geometry",
            include_str!("geometry.wgsl").to_string(),
            |shader| {
                mk_render_pipeline(
                    device,
                    "Geometry Pipeline",
                    &layout,
                    &targets,
                    Some(Attachment::Depth.format()),
                    spec.sample_count(),
                    Some(wgpu::Face::Back),
                    &[ModelVertex::desc(), EntityRaw::desc()],
                    shader,
                )
            },
        )
        .await?;

        let mut uniforms = frame_uniforms();
        let uniform_buffer = uniforms.create_buffer(device);
        let frame_bind_group = uniform_bind_group(device, "frame_bind_group", &frame_layout, &uniform_buffer);

        Ok(Self {
            program,
            material_layout,
            uniforms,
            uniform_buffer,
            frame_bind_group,
        })
    }

    pub fn material_layout(&self) -> &wgpu::BindGroupLayout {
        &self.material_layout
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        self.program.pipeline()
    }

    pub fn frame_bind_group(&self) -> &wgpu::BindGroup {
        &self.frame_bind_group
    }

    /// Stage view, projection, eye and light for this frame and upload them.
    pub fn update(
        &mut self,
        queue: &wgpu::Queue,
        camera: &Camera,
        projection: &Projection,
        light: &LightConfig,
    ) {
        let eye: Vector3<f32> = camera.position.to_vec();
        self.uniforms.set_mat4("mat_view", camera.view_matrix());
        self.uniforms.set_mat4("mat_proj", projection.calc_matrix());
        self.uniforms.set_vec3("eye_pos", eye.into());
        self.uniforms.set_vec3("light_pos", light.position.into());
        self.uniforms.set_color("light_ambient", light.ambient);
        self.uniforms.set_color("light_diffuse", light.diffuse);
        self.uniforms.set_color("light_specular", light.specular);
        self.uniforms.flush(queue, &self.uniform_buffer);
    }
}
