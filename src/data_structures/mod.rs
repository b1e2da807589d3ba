//! Engine data structures: models, textures and per-entity instance data.
//!
//! - `model` holds CPU model descriptors, their GPU counterparts and the upload cache
//! - `texture` holds decoded textures and the GPU texture wrapper
//! - `instance` holds the per-entity transform uploaded each frame

pub mod instance;
pub mod model;
pub mod texture;
