use std::{collections::HashMap, sync::Arc};

use crate::{
    data_structures::{model::MaterialDescriptor, texture::TextureDescriptor},
    math::Color,
    resources::{load_binary, sibling},
    shading::{MaterialParams, TextureSlot},
};

/// Decode an image file (TGA and PNG are supported).
pub async fn load_texture(file_name: &str) -> anyhow::Result<TextureDescriptor> {
    let data = load_binary(file_name).await?;
    let img = match image::ImageFormat::from_path(file_name) {
        Ok(format) => image::load_from_memory_with_format(&data, format)?,
        Err(_) => image::load_from_memory(&data)?,
    };
    Ok(TextureDescriptor::from_image(file_name, &img)?)
}

/// MTL texture statements may carry options before the file name.
fn texture_file(statement: &str) -> Option<&str> {
    statement.split_whitespace().last()
}

fn slot_files(m: &tobj::Material) -> Vec<(TextureSlot, &str)> {
    [
        (TextureSlot::Ambient, m.ambient_texture.as_deref()),
        (TextureSlot::Diffuse, m.diffuse_texture.as_deref()),
        (TextureSlot::Alpha, m.dissolve_texture.as_deref()),
        (TextureSlot::Bump, m.normal_texture.as_deref()),
        (TextureSlot::SpecularHighlight, m.shininess_texture.as_deref()),
        (TextureSlot::Specular, m.specular_texture.as_deref()),
        (
            TextureSlot::StencilDecal,
            m.unknown_param.get("decal").map(String::as_str),
        ),
    ]
    .into_iter()
    .filter_map(|(slot, statement)| Some((slot, texture_file(statement?)?)))
    .collect()
}

pub fn material_params(m: &tobj::Material) -> MaterialParams {
    let defaults = MaterialParams::default();
    let color = |c: Option<[f32; 3]>, fallback: Color| c.map_or(fallback, |[r, g, b]| Color::rgb(r, g, b));
    let mut diffuse = color(m.diffuse, defaults.diffuse);
    diffuse.a = m.dissolve.unwrap_or(1.0);
    MaterialParams {
        ambient: color(m.ambient, defaults.ambient),
        diffuse,
        specular: color(m.specular, defaults.specular),
        shininess: m.shininess.unwrap_or(defaults.shininess),
    }
}

/// Build material descriptors for the materials of `obj_file`.
///
/// Each distinct texture file is decoded once, all of them concurrently.
/// A texture that fails to load is logged and its slot left unbound.
pub async fn load_materials(obj_file: &str, materials: &[tobj::Material]) -> Vec<MaterialDescriptor> {
    let mut files: Vec<String> = materials
        .iter()
        .flat_map(slot_files)
        .map(|(_, file)| sibling(obj_file, file))
        .collect();
    files.sort();
    files.dedup();

    let decoded = futures::future::join_all(files.iter().map(|file| load_texture(file))).await;
    let textures: HashMap<&str, Arc<TextureDescriptor>> = files
        .iter()
        .zip(decoded)
        .filter_map(|(file, result)| match result {
            Ok(texture) => Some((file.as_str(), Arc::new(texture))),
            Err(e) => {
                log::warn!("texture {} could not be loaded, slot stays unbound: {}", file, e);
                None
            }
        })
        .collect();

    materials
        .iter()
        .map(|m| {
            let mut material = MaterialDescriptor::new(m.name.clone());
            material.params = material_params(m);
            for (slot, file) in slot_files(m) {
                if let Some(texture) = textures.get(sibling(obj_file, file).as_str()) {
                    material = material.with_texture(slot, texture.clone());
                }
            }
            material
        })
        .collect()
}
