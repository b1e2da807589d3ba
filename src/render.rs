//! Frame orchestration: geometry pass into the G-buffer, then the composite
//! pass onto the surface.
//!
//! The [`Renderer`] owns every GPU object of the engine and lives on the
//! render thread only. Entities reach it through [`Renderer::prepare`] when
//! they leave the finalize queue and through [`Renderer::render_frame`], which
//! reads their transforms under the entity lock once per frame. Models that
//! skipped finalization are uploaded there, and uploads no live entity uses
//! any more are released.

use std::sync::Arc;

use winit::window::Window;

use crate::{
    camera::{Camera, Projection},
    config::EngineConfig,
    context::Context,
    data_structures::{
        instance::EntityRaw,
        model::{DrawModel, ModelCache, ModelDescriptor},
    },
    error::Result,
    framebuffer::{ActiveTarget, GBuffer, GBufferSpec, TargetTracker},
    pipelines::{composite::CompositeProgram, geometry::GeometryProgram},
    world::{Entity, World},
};

const INITIAL_INSTANCE_CAPACITY: usize = 64;

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Entity Instance Buffer"),
        size: (capacity * std::mem::size_of::<EntityRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

pub struct Renderer {
    ctx: Context,
    config: EngineConfig,
    projection: Projection,
    geometry: GeometryProgram,
    composite: CompositeProgram,
    gbuffer: GBuffer,
    gbuffer_bind_group: wgpu::BindGroup,
    targets: TargetTracker,
    models: ModelCache,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
}

impl Renderer {
    /// Acquire the GPU, compile both programs and create the G-buffer.
    /// Any failure here is fatal to the engine.
    pub async fn new(window: Arc<Window>, config: &EngineConfig) -> Result<Self> {
        let ctx = Context::new(window).await?;
        let (width, height) = ctx.size();
        let spec = GBufferSpec::new(width, height, config.sample_count)?;
        let gbuffer = GBuffer::create(&ctx.device, &ctx.adapter, spec)?;

        let geometry = GeometryProgram::new(&ctx.device, spec).await?;
        let composite =
            CompositeProgram::new(&ctx.device, ctx.config.format, spec.sample_count()).await?;
        let gbuffer_bind_group = composite.bind_gbuffer(&ctx.device, &gbuffer);

        let projection = Projection::new(width, height, cgmath::Rad(config.fovy), config.znear, config.zfar);
        let models = ModelCache::new(&ctx.device, &ctx.queue);
        let instance_buffer = create_instance_buffer(&ctx.device, INITIAL_INSTANCE_CAPACITY);

        Ok(Self {
            ctx,
            config: config.clone(),
            projection,
            geometry,
            composite,
            gbuffer,
            gbuffer_bind_group,
            targets: TargetTracker::new(),
            models,
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
        })
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    /// Upload the entity's model if no other entity did already.
    pub fn prepare(&mut self, entity: &Entity) {
        self.models.prepare(
            &self.ctx.device,
            &self.ctx.queue,
            self.geometry.material_layout(),
            entity.model(),
        );
    }

    /// Follow a window resize: surface, projection and a new G-buffer.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.ctx.resize(width, height) {
            return Ok(());
        }
        self.projection.resize(width, height);
        let spec = GBufferSpec::new(width, height, self.gbuffer.sample_count())?;
        self.gbuffer = GBuffer::create(&self.ctx.device, &self.ctx.adapter, spec)?;
        self.gbuffer_bind_group = self.composite.bind_gbuffer(&self.ctx.device, &self.gbuffer);
        Ok(())
    }

    pub fn reconfigure(&self) {
        self.ctx.reconfigure();
    }

    fn upload_instances(&mut self, instances: &[EntityRaw]) {
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            self.instance_buffer = create_instance_buffer(&self.ctx.device, self.instance_capacity);
        }
        if !instances.is_empty() {
            self.ctx
                .queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(instances));
        }
    }

    /// Render every live entity from `camera` and present.
    pub fn render_frame(&mut self, world: &World, camera: &Camera) -> std::result::Result<(), wgpu::SurfaceError> {
        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let (draws, instances): (Vec<Arc<ModelDescriptor>>, Vec<EntityRaw>) = world.with_entities(|entities| {
            entities
                .iter()
                .map(|e| (e.model().clone(), EntityRaw::from_transform(e.body.transform())))
                .unzip()
        });
        self.models.sync(
            &self.ctx.device,
            &self.ctx.queue,
            self.geometry.material_layout(),
            &draws,
        );
        self.upload_instances(&instances);

        self.geometry
            .update(&self.ctx.queue, camera, &self.projection, &self.config.light);
        self.composite.update(
            &self.ctx.queue,
            camera,
            &self.projection,
            &self.config.ssao,
            self.config.debug_gbuffer,
        );

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut pass = self
                .gbuffer
                .bind(&mut encoder, &self.targets, self.config.geometry_clear);
            pass.set_pipeline(self.geometry.pipeline());
            pass.set_bind_group(0, self.geometry.frame_bind_group(), &[]);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for (i, descriptor) in draws.iter().enumerate() {
                if let Some(model) = self.models.get(descriptor.id()) {
                    pass.draw_model_instanced(model, i as u32..i as u32 + 1);
                }
            }
        }
        debug_assert_eq!(self.targets.active(), ActiveTarget::Default);

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Composite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.config.composite_clear.into()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(self.composite.pipeline());
            pass.set_bind_group(0, self.composite.uniform_bind_group(), &[]);
            pass.set_bind_group(1, &self.gbuffer_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        self.ctx.window.pre_present_notify();
        output.present();
        Ok(())
    }
}
