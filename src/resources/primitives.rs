//! Procedural models for scenes without asset files.

use std::{f32::consts::PI, sync::Arc};

use cgmath::{InnerSpace, Vector3};

use crate::{
    data_structures::model::{MaterialDescriptor, MeshDescriptor, ModelDescriptor, ModelVertex},
    math::{Color, UP},
};

/// Axis-aligned cube with edge length `size`, centred at the origin.
pub fn cube(size: f32, color: Color) -> Arc<ModelDescriptor> {
    let h = size * 0.5;
    // (normal, tangent); the bitangent is normal x tangent
    let faces: [([f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0]),
    ];
    let corners = [(-1.0, -1.0, [0.0, 1.0]), (1.0, -1.0, [1.0, 1.0]), (1.0, 1.0, [1.0, 0.0]), (-1.0, 1.0, [0.0, 0.0])];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, tangent) in faces {
        let n = Vector3::from(normal);
        let t = Vector3::from(tangent);
        let b = n.cross(t);
        let base = vertices.len() as u32;
        for (u, v, tex_coords) in corners {
            let p = (n + t * u + b * v) * h;
            vertices.push(ModelVertex {
                position: p.into(),
                tex_coords,
                normal,
                tangent,
            });
        }
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    let material = MaterialDescriptor::new("cube").with_diffuse(color);
    Arc::new(ModelDescriptor::new(
        "cube",
        vertices,
        vec![MeshDescriptor::new("cube", indices, material)],
    ))
}

/// Regular icosahedron inscribed in a sphere of `radius`.
pub fn icosahedron(radius: f32, color: Color) -> Arc<ModelDescriptor> {
    let t = (1.0 + 5.0f32.sqrt()) / 2.0;
    let corners = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 11, 5,  0, 5, 1,  0, 1, 7,  0, 7, 10,  0, 10, 11,
        1, 5, 9,  5, 11, 4,  11, 10, 2,  10, 7, 6,  7, 1, 8,
        3, 9, 4,  3, 4, 2,  3, 2, 6,  3, 6, 8,  3, 8, 9,
        4, 9, 5,  2, 4, 11,  6, 2, 10,  8, 6, 7,  9, 8, 1,
    ];

    let vertices = corners
        .iter()
        .map(|c| {
            let n = Vector3::from(*c).normalize();
            let tangent = UP.cross(n);
            let tangent = if tangent.magnitude2() > 1e-6 {
                tangent.normalize()
            } else {
                Vector3::unit_x()
            };
            ModelVertex {
                position: (n * radius).into(),
                tex_coords: [0.5 + n.z.atan2(n.x) / (2.0 * PI), 0.5 - n.y.asin() / PI],
                normal: n.into(),
                tangent: tangent.into(),
            }
        })
        .collect();

    let material = MaterialDescriptor::new("icosahedron").with_diffuse(color);
    Arc::new(ModelDescriptor::new(
        "icosahedron",
        vertices,
        vec![MeshDescriptor::new("icosahedron", indices, material)],
    ))
}
