//! Per-entity transform data for the geometry pass.
//!
//! Each live entity gets one [`EntityRaw`] in the instance buffer per frame;
//! the vertex shader reads it at locations 5 to 11.

use cgmath::Matrix3;

use crate::{
    data_structures::model::Vertex,
    math::{Mat4, to_f32_matrix},
};

/// The raw instance is the actual data stored on the GPU.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EntityRaw {
    world: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

impl EntityRaw {
    /// Bodies only translate and rotate, so the upper 3x3 block doubles as
    /// the normal matrix.
    pub fn from_transform(transform: Mat4) -> Self {
        let world = to_f32_matrix(transform);
        let normal = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
        Self {
            world: world.into(),
            normal: normal.into(),
        }
    }

    pub fn world(&self) -> [[f32; 4]; 4] {
        self.world
    }
}

impl Vertex for EntityRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<EntityRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // A mat4 takes up 4 vertex slots as it is technically 4 vec4s.
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}
