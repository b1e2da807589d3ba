use cgmath::{InnerSpace, Vector3};

use crate::data_structures::model::{MaterialDescriptor, MeshDescriptor, ModelDescriptor, ModelVertex};

/// Merge the meshes of an OBJ file into one model with a shared vertex list.
pub fn build_model(name: &str, models: &[tobj::Model], materials: &[MaterialDescriptor]) -> ModelDescriptor {
    let mut vertices: Vec<ModelVertex> = Vec::new();
    let mut meshes = Vec::with_capacity(models.len());

    for m in models {
        let base = vertices.len() as u32;
        let count = m.mesh.positions.len() / 3;
        vertices.extend((0..count).map(|i| ModelVertex {
            position: [
                m.mesh.positions[i * 3],
                m.mesh.positions[i * 3 + 1],
                m.mesh.positions[i * 3 + 2],
            ],
            tex_coords: [
                m.mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                1.0 - m.mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
            ],
            normal: [
                m.mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                m.mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                m.mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
            ],
            // calculated below
            tangent: [0.0; 3],
        }));

        let indices: Vec<u32> = m.mesh.indices.iter().map(|i| base + i).collect();
        let material = m
            .mesh
            .material_id
            .and_then(|id| materials.get(id))
            .cloned()
            .unwrap_or_default();
        meshes.push(MeshDescriptor::new(m.name.clone(), indices, material));
    }

    for mesh in &meshes {
        compute_tangents(&mut vertices, &mesh.indices);
    }
    finish_tangents(&mut vertices);

    ModelDescriptor::new(name, vertices, meshes)
}

/// Accumulate per-triangle tangents into `vertices`.
///
/// OBJ files don't come with tangents, so they are solved from the edge
/// and texture coordinate deltas of each triangle. Triangles with degenerate
/// texture coordinates or out of range indices contribute nothing.
pub fn compute_tangents(vertices: &mut [ModelVertex], indices: &[u32]) {
    for c in indices.chunks_exact(3) {
        let [a, b, d] = [c[0] as usize, c[1] as usize, c[2] as usize];
        if a >= vertices.len() || b >= vertices.len() || d >= vertices.len() {
            continue;
        }
        let (v0, v1, v2) = (vertices[a], vertices[b], vertices[d]);

        let pos0: Vector3<f32> = v0.position.into();
        let pos1: Vector3<f32> = v1.position.into();
        let pos2: Vector3<f32> = v2.position.into();

        let uv0: cgmath::Vector2<f32> = v0.tex_coords.into();
        let uv1: cgmath::Vector2<f32> = v1.tex_coords.into();
        let uv2: cgmath::Vector2<f32> = v2.tex_coords.into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        // delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) / det;

        for i in [a, b, d] {
            vertices[i].tangent = (tangent + Vector3::from(vertices[i].tangent)).into();
        }
    }
}

/// Orthonormalize accumulated tangents against the normals. Vertices that
/// got none get an arbitrary perpendicular.
pub fn finish_tangents(vertices: &mut [ModelVertex]) {
    for v in vertices {
        let n = Vector3::from(v.normal);
        let t = Vector3::from(v.tangent);
        let n = if n.magnitude2() > 1e-12 { n.normalize() } else { Vector3::unit_z() };
        let projected = t - n * n.dot(t);
        let tangent = if projected.magnitude2() > 1e-12 {
            projected.normalize()
        } else {
            let axis = if n.x.abs() < 0.9 { Vector3::unit_x() } else { Vector3::unit_y() };
            (axis - n * n.dot(axis)).normalize()
        };
        v.tangent = tangent.into();
    }
}
