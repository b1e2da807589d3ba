//! lux-ngin
//!
//! A small deferred renderer with a rigid-body simulation behind it. Entities
//! pair a [`physics::body::Body`] with a shared model. Each frame the
//! geometry pass shades them into a multi-sampled G-buffer (colour, normal,
//! tangent, depth) and the composite pass darkens the result with screen-space
//! ambient occlusion. Force generators push the bodies between frames.
//!
//! High-level modules
//! - `engine`: the engine handle and main loop
//! - `world`: entities and the queue that brings them into the frame
//! - `physics`: bodies, force generators and the integrator
//! - `render`: frame orchestration over the two passes
//! - `framebuffer`: the G-buffer and render target binding
//! - `shader`: shader programs and named uniform blocks
//! - `shading`, `ssao`: CPU versions of the shader policies
//! - `data_structures`, `resources`: models, textures and their loaders
//! - `camera`, `input`, `config`: view, bindings and settings
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod engine;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod math;
pub mod physics;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod shader;
pub mod shading;
pub mod ssao;
mod sync;
pub mod world;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use engine::Engine;
pub use error::{Error, Result};
pub use wgpu;
pub use winit;
