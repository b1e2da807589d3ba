//! Geometry and materials.
//!
//! Models exist twice. [`ModelDescriptor`] is the CPU side: vertices, meshes
//! and materials with decoded textures, cheap to share between entities and
//! safe to build on any thread. [`Model`] is the GPU side, created from a
//! descriptor on the render thread by [`ModelCache`], which uploads each
//! descriptor and each texture once.

use std::{
    collections::{HashMap, HashSet},
    ops::Range,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::{Texture, TextureDescriptor, TextureId, create_default_sampler},
    math::Color,
    pipelines::geometry,
    shading::{MaterialParams, TextureSlot},
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDescriptor {
    pub name: String,
    pub params: MaterialParams,
    pub textures: [Option<Arc<TextureDescriptor>>; TextureSlot::COUNT],
}

impl MaterialDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: MaterialParams::default(),
            textures: Default::default(),
        }
    }

    pub fn with_diffuse(mut self, color: Color) -> Self {
        self.params.diffuse = color;
        self
    }

    pub fn with_texture(mut self, slot: TextureSlot, texture: Arc<TextureDescriptor>) -> Self {
        self.textures[slot.index()] = Some(texture);
        self
    }

    pub fn texture(&self, slot: TextureSlot) -> Option<&Arc<TextureDescriptor>> {
        self.textures[slot.index()].as_ref()
    }

    /// One bit per bound slot, in [`TextureSlot`] order.
    pub fn bound_mask(&self) -> u32 {
        TextureSlot::ALL
            .iter()
            .filter(|slot| self.texture(**slot).is_some())
            .fold(0, |mask, slot| mask | slot.mask_bit())
    }
}

impl Default for MaterialDescriptor {
    fn default() -> Self {
        Self::new("default")
    }
}

/// A range of triangles drawn with one material.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDescriptor {
    pub name: String,
    pub indices: Vec<u32>,
    pub material: MaterialDescriptor,
}

impl MeshDescriptor {
    pub fn new(name: impl Into<String>, indices: Vec<u32>, material: MaterialDescriptor) -> Self {
        Self {
            name: name.into(),
            indices,
            material,
        }
    }
}

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(u64);

/// Meshes indexing into one shared vertex list.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    id: ModelId,
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub meshes: Vec<MeshDescriptor>,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>, vertices: Vec<ModelVertex>, meshes: Vec<MeshDescriptor>) -> Self {
        Self {
            id: ModelId(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            vertices,
            meshes,
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len() / 3).sum()
    }
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub textures: Vec<Arc<Texture>>,
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: Material,
}

#[derive(Debug)]
pub struct Model {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub meshes: Vec<Mesh>,
}

/// Memoized uploads of models and textures.
pub struct ModelCache {
    models: HashMap<ModelId, Model>,
    textures: HashMap<(TextureId, bool), Arc<Texture>>,
    neutral: Vec<Arc<Texture>>,
    sampler: wgpu::Sampler,
}

impl ModelCache {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let neutral = TextureSlot::ALL
            .iter()
            .map(|slot| Arc::new(Texture::neutral(device, queue, *slot)))
            .collect();
        Self {
            models: HashMap::new(),
            textures: HashMap::new(),
            neutral,
            sampler: create_default_sampler(device),
        }
    }

    pub fn get(&self, id: ModelId) -> Option<&Model> {
        self.models.get(&id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Upload `descriptor` unless it already is. Meshes with indices past the
    /// end of the vertex list are skipped with a warning.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material_layout: &wgpu::BindGroupLayout,
        descriptor: &ModelDescriptor,
    ) -> &Model {
        if !self.models.contains_key(&descriptor.id) {
            let model = self.upload(device, queue, material_layout, descriptor);
            self.models.insert(descriptor.id, model);
        }
        &self.models[&descriptor.id]
    }

    /// Make the uploads match the models in `live`: missing ones are uploaded,
    /// models no entry of `live` uses are dropped together with the textures
    /// only they bound.
    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material_layout: &wgpu::BindGroupLayout,
        live: &[Arc<ModelDescriptor>],
    ) {
        let mut used = HashSet::with_capacity(live.len());
        for descriptor in live {
            if used.insert(descriptor.id) && !self.models.contains_key(&descriptor.id) {
                log::debug!("model `{}` was not uploaded at finalize", descriptor.name);
                self.prepare(device, queue, material_layout, descriptor);
            }
        }

        let before = self.models.len();
        self.models.retain(|id, _| used.contains(id));
        if self.models.len() != before {
            // the cache itself holds one reference, materials hold the rest
            self.textures.retain(|_, texture| Arc::strong_count(texture) > 1);
            log::debug!(
                "evicted {} models, {} textures remain",
                before - self.models.len(),
                self.textures.len()
            );
        }
    }

    fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material_layout: &wgpu::BindGroupLayout,
        descriptor: &ModelDescriptor,
    ) -> Model {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", descriptor.name)),
            contents: bytemuck::cast_slice(&descriptor.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let vertex_count = descriptor.vertices.len();
        let meshes = descriptor
            .meshes
            .iter()
            .filter(|mesh| {
                let valid = mesh.indices.iter().all(|i| (*i as usize) < vertex_count);
                if !valid {
                    log::warn!(
                        "mesh `{}` of model `{}` indexes past its {} vertices, skipping it",
                        mesh.name,
                        descriptor.name,
                        vertex_count
                    );
                }
                valid && !mesh.indices.is_empty()
            })
            .map(|mesh| {
                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Index Buffer", mesh.name)),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                Mesh {
                    name: mesh.name.clone(),
                    index_buffer,
                    num_elements: mesh.indices.len() as u32,
                    material: self.upload_material(device, queue, material_layout, &mesh.material),
                }
            })
            .collect();

        log::debug!("uploaded model `{}`", descriptor.name);
        Model {
            name: descriptor.name.clone(),
            vertex_buffer,
            meshes,
        }
    }

    fn upload_material(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        descriptor: &MaterialDescriptor,
    ) -> Material {
        let mut uniforms = geometry::material_uniforms();
        uniforms.set_color("mat_ambient", descriptor.params.ambient);
        uniforms.set_color("mat_diffuse", descriptor.params.diffuse);
        uniforms.set_color("mat_specular", descriptor.params.specular);
        uniforms.set_f32("mat_shininess", descriptor.params.shininess);
        uniforms.set_u32("bound_mask", descriptor.bound_mask());
        let uniform_buffer = uniforms.create_buffer(device);

        let textures: Vec<Arc<Texture>> = TextureSlot::ALL
            .iter()
            .map(|slot| match descriptor.texture(*slot) {
                Some(texture) => self
                    .textures
                    .entry((texture.id(), slot.is_srgb()))
                    .or_insert_with(|| Arc::new(Texture::upload(device, queue, texture, slot.is_srgb())))
                    .clone(),
                None => self.neutral[slot.index()].clone(),
            })
            .collect();

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }];
        for (i, texture) in textures.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 1 + i as u32,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: 1 + TextureSlot::COUNT as u32,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &entries,
            label: Some(&descriptor.name),
        });

        Material {
            name: descriptor.name.clone(),
            uniform_buffer,
            bind_group,
            textures,
        }
    }
}

pub trait DrawModel {
    fn draw_mesh_instanced(&mut self, mesh: &Mesh, instances: Range<u32>);
    fn draw_model_instanced(&mut self, model: &Model, instances: Range<u32>);
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh_instanced(&mut self, mesh: &Mesh, instances: Range<u32>) {
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(1, &mesh.material.bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_model_instanced(&mut self, model: &Model, instances: Range<u32>) {
        self.set_vertex_buffer(0, model.vertex_buffer.slice(..));
        for mesh in &model.meshes {
            self.draw_mesh_instanced(mesh, instances.clone());
        }
    }
}
