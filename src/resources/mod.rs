//! Resource management
//!
//! Converts generated terrain into GPU-ready vertex and index data.

mod mesh;

pub use mesh::*;
