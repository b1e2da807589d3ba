//! Render pipelines of the two passes.
//!
//! - `basic` has the shared pipeline and bind group helpers
//! - `geometry` renders entities into the G-buffer
//! - `composite` turns the G-buffer into the final frame

pub mod basic;
pub mod composite;
pub mod geometry;
