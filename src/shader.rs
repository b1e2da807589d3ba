//! Shader programs and their uniform blocks.
//!
//! A program is a WGSL module plus the render pipeline built from it.
//! Compilation and pipeline creation run inside a validation error scope so
//! that a broken shader surfaces as [`Error::ShaderCompilation`] with the
//! driver's log instead of a panic on the next draw.
//!
//! Uniforms are addressed by name. [`UniformBlock`] computes every field's
//! byte offset once, following WGSL's uniform layout rules, and keeps a CPU
//! staging copy that is written to the GPU buffer on [`UniformBlock::flush`].

use std::collections::HashMap;

use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use crate::{
    error::{Error, Result},
    math::Color,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    F32,
    U32,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformType {
    fn align(self) -> usize {
        match self {
            UniformType::F32 | UniformType::U32 => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 | UniformType::Vec4 | UniformType::Mat4 => 16,
        }
    }

    fn size(self) -> usize {
        match self {
            UniformType::F32 | UniformType::U32 => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 => 12,
            UniformType::Vec4 => 16,
            UniformType::Mat4 => 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub offset: usize,
    pub ty: UniformType,
}

fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Named fields of one WGSL uniform struct and their staged values.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    label: &'static str,
    slots: HashMap<&'static str, UniformSlot>,
    data: Vec<u8>,
    dirty: bool,
}

impl UniformBlock {
    /// Fields must be listed in the order the WGSL struct declares them.
    pub fn new(label: &'static str, fields: &[(&'static str, UniformType)]) -> Self {
        let mut slots = HashMap::with_capacity(fields.len());
        let mut offset = 0;
        for &(name, ty) in fields {
            offset = round_up(offset, ty.align());
            slots.insert(name, UniformSlot { offset, ty });
            offset += ty.size();
        }
        // uniform structs are 16 byte aligned
        let size = round_up(offset.max(16), 16);
        Self {
            label,
            slots,
            data: vec![0; size],
            dirty: true,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn slot(&self, name: &str) -> Option<UniformSlot> {
        self.slots.get(name).copied()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_f32(&mut self, name: &str, value: f32) {
        self.write(name, UniformType::F32, bytemuck::bytes_of(&value));
    }

    pub fn set_u32(&mut self, name: &str, value: u32) {
        self.write(name, UniformType::U32, bytemuck::bytes_of(&value));
    }

    pub fn set_vec2(&mut self, name: &str, value: [f32; 2]) {
        self.write(name, UniformType::Vec2, bytemuck::cast_slice(&value));
    }

    pub fn set_vec3(&mut self, name: &str, value: [f32; 3]) {
        self.write(name, UniformType::Vec3, bytemuck::cast_slice(&value));
    }

    pub fn set_vec4(&mut self, name: &str, value: [f32; 4]) {
        self.write(name, UniformType::Vec4, bytemuck::cast_slice(&value));
    }

    pub fn set_color(&mut self, name: &str, value: Color) {
        self.set_vec4(name, value.to_array());
    }

    pub fn set_mat4(&mut self, name: &str, value: Matrix4<f32>) {
        let columns: [[f32; 4]; 4] = value.into();
        self.write(name, UniformType::Mat4, bytemuck::cast_slice(&columns));
    }

    /// Unknown names and type mismatches are ignored with a warning, like a
    /// uniform the shader compiler optimized away.
    fn write(&mut self, name: &str, ty: UniformType, bytes: &[u8]) {
        let Some(slot) = self.slots.get(name) else {
            log::warn!("uniform block `{}` has no field `{}`", self.label, name);
            return;
        };
        if slot.ty != ty {
            log::warn!(
                "uniform `{}.{}` is {:?}, not {:?}",
                self.label,
                name,
                slot.ty,
                ty
            );
            return;
        }
        let range = slot.offset..slot.offset + bytes.len();
        if self.data[range.clone()] != *bytes {
            self.data[range].copy_from_slice(bytes);
            self.dirty = true;
        }
    }

    pub fn create_buffer(&mut self, device: &wgpu::Device) -> wgpu::Buffer {
        self.dirty = false;
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(self.label),
            contents: &self.data,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
    }

    /// Upload staged values if anything changed since the last flush.
    pub fn flush(&mut self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        if self.dirty {
            queue.write_buffer(buffer, 0, &self.data);
            self.dirty = false;
        }
    }
}

/// Run `build` inside a validation error scope and turn any captured error
/// into [`Error::ShaderCompilation`].
pub async fn validated<T>(device: &wgpu::Device, label: &str, build: impl FnOnce() -> T) -> Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    match device.pop_error_scope().await {
        Some(error) => {
            log::error!("shader program `{}` rejected: {}", label, error);
            Err(Error::ShaderCompilation {
                label: label.to_string(),
                log: error.to_string(),
            })
        }
        None => Ok(value),
    }
}

/// A compiled WGSL module and the pipeline linked from it.
#[derive(Debug)]
pub struct ShaderProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
}

impl ShaderProgram {
    /// Compile `source` and link it with `link`, which receives the module.
    pub async fn new(
        device: &wgpu::Device,
        label: &str,
        source: String,
        link: impl FnOnce(wgpu::ShaderModuleDescriptor<'_>) -> wgpu::RenderPipeline,
    ) -> Result<Self> {
        let pipeline = validated(device, label, || {
            link(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })
        .await?;
        log::info!("shader program `{}` ready", label);
        Ok(Self {
            label: label.to_string(),
            pipeline,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }
}
