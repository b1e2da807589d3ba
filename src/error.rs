//! Engine error taxonomy.
//!
//! Setup errors (shader compilation, framebuffer configuration, GPU
//! acquisition) are fatal: they bubble out of [`crate::engine::Engine::run`] and the
//! host prints them and exits. Physics input validation errors leave the body
//! untouched. Per-frame conditions never surface here, they degrade silently.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("shader program `{label}` failed to compile or link:\n{log}")]
    ShaderCompilation { label: String, log: String },

    #[error("attachment format {format:?} does not support {sample_count}x multisampling on this adapter")]
    UnsupportedAttachment {
        format: wgpu::TextureFormat,
        sample_count: u32,
    },

    #[error("render target size {width}x{height} is not allowed")]
    InvalidTargetSize { width: u32, height: u32 },

    #[error("sample count {0} is not a power of two between 1 and 16")]
    InvalidSampleCount(u32),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),

    #[error("GPU device request failed: {0}")]
    Device(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("mass must be finite and greater than zero, got {0}")]
    InvalidMass(f64),

    #[error("inverse mass must be finite and not negative, got {0}")]
    InvalidInverseMass(f64),

    #[error("inertia tensor is singular and cannot be inverted")]
    SingularInertiaTensor,

    #[error("texture `{label}` of {width}x{height} texels cannot hold {len} bytes of RGBA8 data")]
    InvalidTextureData {
        label: String,
        width: u32,
        height: u32,
        len: usize,
    },

    #[error("failed to load resource `{path}`")]
    Resource {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}
