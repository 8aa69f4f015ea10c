//! Terrain generation
//!
//! - [`noise`] - Deterministic gradient and fractal noise
//! - [`heightmap`] - Height grids, image and procedural sources
//! - [`mesh_builder`] - Grid to vertex/index/normal buffers
//! - [`pipeline`] - Source to mesh orchestration

pub mod heightmap;
pub mod mesh_builder;
pub mod noise;
pub mod pipeline;

pub use heightmap::{
    DecodedImage, HeightGrid, HeightMapping, HeightSampleSource, HeightStats,
    ImageHeightSource, NoiseHeightSource, DEFAULT_GRID_SIZE,
};
pub use mesh_builder::{
    face_normal, IndexTopology, MeshBuilder, NormalMode, TerrainMesh, VertexPlacement,
};
pub use noise::{NoiseField, DEFAULT_GAIN, DEFAULT_OCTAVES};
pub use pipeline::{GridParams, GridSize, TerrainPipeline};
