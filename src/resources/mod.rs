//! Loading models and textures from disk.
//!
//! Everything here produces CPU descriptors only, so it can run on any
//! thread before the renderer exists. Relative paths resolve against
//! `./assets`; material and texture paths resolve against the directory of
//! the file that names them.

pub mod mesh;
pub mod primitives;
pub mod texture;

use std::{
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    data_structures::model::ModelDescriptor,
    error::{Error, Result},
};

pub fn asset_path(file_name: &str) -> PathBuf {
    let path = Path::new(file_name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new("./").join("assets").join(path)
    }
}

/// `file_name` relative to the directory of `base`.
pub fn sibling(base: &str, file_name: &str) -> String {
    match Path::new(base).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(file_name).to_string_lossy().into_owned(),
        _ => file_name.to_string(),
    }
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    let txt = std::fs::read_to_string(asset_path(file_name))?;
    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let data = std::fs::read(asset_path(file_name))?;
    Ok(data)
}

/// Load a Wavefront OBJ file and its materials.
///
/// A missing or malformed OBJ is an error. Missing material libraries and
/// textures are logged and replaced by defaults.
pub async fn load_model_obj(file_name: &str) -> Result<Arc<ModelDescriptor>> {
    let resource_error = |source: anyhow::Error| Error::Resource {
        path: file_name.to_string(),
        source,
    };

    let obj_text = load_string(file_name).await.map_err(resource_error)?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| async move {
            let path = sibling(file_name, &p);
            match load_string(&path).await {
                Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                Err(e) => {
                    log::warn!("material library {} not found: {}", path, e);
                    Err(tobj::LoadError::OpenFileFailed)
                }
            }
        },
    )
    .await
    .map_err(|e| resource_error(e.into()))?;

    let materials = match obj_materials {
        Ok(materials) => texture::load_materials(file_name, &materials).await,
        Err(e) => {
            log::warn!("{} has no usable materials ({}), using defaults", file_name, e);
            Vec::new()
        }
    };

    let model = mesh::build_model(file_name, &models, &materials);
    log::info!(
        "loaded {} with {} meshes and {} triangles",
        file_name,
        model.meshes.len(),
        model.triangle_count()
    );
    Ok(Arc::new(model))
}
