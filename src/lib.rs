//! Terrain Viewer - heightmap and fractal-noise terrain on wgpu
//!
//! The library splits into a pure generation core and a small viewer shell:
//! - [`terrain`]: noise, height sources, mesh building and the pipeline tying them together
//! - [`resources`]: interleaved GPU vertex data
//! - [`scene`]: camera and free-fly controller
//! - [`session`]: per-window state driven by the event loop
//! - [`renderer`] and [`overlay`]: wgpu drawing and the egui stats window
//!
//! # Example
//! ```
//! use terrain_viewer::terrain::{GridParams, NoiseHeightSource, TerrainPipeline};
//!
//! let source = NoiseHeightSource::new(32);
//! let mesh = TerrainPipeline::default()
//!     .generate(&source, &GridParams::native())
//!     .unwrap();
//! assert_eq!(mesh.vertex_count(), 32 * 32);
//! ```

pub mod error;
pub mod overlay;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod session;
pub mod terrain;

use std::path::PathBuf;

use glam::Vec2;

pub use error::{TerrainError, TerrainResult};
pub use renderer::{RenderError, RenderResult, TerrainRenderer};
pub use session::ViewerSession;
pub use terrain::{
    GridParams, GridSize, HeightMapping, HeightSampleSource, ImageHeightSource, IndexTopology,
    MeshBuilder, NoiseField, NoiseHeightSource, NormalMode, TerrainMesh, TerrainPipeline,
    VertexPlacement, DEFAULT_GRID_SIZE,
};

/// Terrain generation settings
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainConfig {
    /// Heightmap image; procedural noise when `None` or when decoding fails
    pub heightmap: Option<PathBuf>,
    /// Pixel intensity to height mapping for image sources
    pub mapping: HeightMapping,
    /// Octaves and gain for procedural terrain
    pub noise: NoiseField,
    /// Native grid size and coordinate divisor of the procedural source
    pub grid_size: u32,
    /// Procedural sampling offset, in grid cells
    pub noise_offset: Vec2,
    /// Grid resolution handed to the pipeline
    pub size: GridSize,
    pub placement: VertexPlacement,
    pub topology: IndexTopology,
    pub normals: NormalMode,
    /// Multiplier applied to every height sample
    pub vertical_scale: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            heightmap: None,
            mapping: HeightMapping::default(),
            noise: NoiseField::default(),
            grid_size: DEFAULT_GRID_SIZE,
            noise_offset: Vec2::ZERO,
            size: GridSize::Native,
            placement: VertexPlacement::Normalized,
            topology: IndexTopology::TriangleList,
            normals: NormalMode::Smooth,
            vertical_scale: 1.0,
        }
    }
}

impl TerrainConfig {
    /// Mesh builder configured from these settings
    pub fn mesh_builder(&self) -> MeshBuilder {
        MeshBuilder::new()
            .with_placement(self.placement)
            .with_topology(self.topology)
            .with_normals(self.normals)
            .with_vertical_scale(self.vertical_scale)
    }

    pub fn pipeline(&self) -> TerrainPipeline {
        TerrainPipeline::new(self.mesh_builder())
    }

    pub fn grid_params(&self) -> GridParams {
        GridParams { size: self.size }
    }

    /// Procedural source at the given offset
    pub fn noise_source(&self, offset: Vec2) -> NoiseHeightSource {
        NoiseHeightSource::new(self.grid_size)
            .with_noise(self.noise)
            .with_offset(offset)
    }
}

/// Configuration for the viewer window
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable vsync
    pub vsync: bool,
    /// Start in wireframe mode
    pub wireframe: bool,
    pub terrain: TerrainConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Terrain Viewer".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            wireframe: false,
            terrain: TerrainConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ViewerConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(config.vsync);
        assert_eq!(config.terrain.grid_size, 127);
        assert_eq!(config.terrain.noise.octaves, 12);
        assert!(config.terrain.heightmap.is_none());
    }

    #[test]
    fn test_config_builds_pipeline() {
        let config = TerrainConfig {
            grid_size: 9,
            topology: IndexTopology::TriangleStrip,
            normals: NormalMode::Face,
            ..Default::default()
        };
        let source = config.noise_source(Vec2::new(3.0, 4.0));
        assert_eq!(source.offset(), Vec2::new(3.0, 4.0));

        let mesh = config
            .pipeline()
            .generate(&source, &config.grid_params())
            .unwrap();
        assert_eq!(mesh.grid_size(), (9, 9));
        assert_eq!(mesh.topology(), IndexTopology::TriangleStrip);
        assert_eq!(mesh.normals().len(), 2 * 8 * 8);
    }
}
