//! Height source to mesh orchestration.

use std::time::Instant;

use super::heightmap::{HeightSampleSource, DEFAULT_GRID_SIZE};
use super::mesh_builder::{IndexTopology, MeshBuilder, TerrainMesh};
use crate::error::TerrainResult;

/// Requested grid resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridSize {
    /// Whatever the source produces naturally (image size, noise grid size)
    #[default]
    Native,
    /// Resample the source to a fixed resolution
    Fixed { width: u32, height: u32 },
}

/// Parameters for a single generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridParams {
    pub size: GridSize,
}

impl GridParams {
    pub fn native() -> Self {
        Self {
            size: GridSize::Native,
        }
    }

    pub fn fixed(width: u32, height: u32) -> Self {
        Self {
            size: GridSize::Fixed { width, height },
        }
    }

    /// Concrete dimensions for `source`. Sources without a native size
    /// fall back to a square of [`DEFAULT_GRID_SIZE`].
    pub fn resolve(&self, source: &dyn HeightSampleSource) -> (u32, u32) {
        match self.size {
            GridSize::Fixed { width, height } => (width, height),
            GridSize::Native => source
                .native_size()
                .unwrap_or((DEFAULT_GRID_SIZE, DEFAULT_GRID_SIZE)),
        }
    }
}

/// Samples a source and builds a mesh from it.
///
/// Holds no state between runs; regenerating means calling
/// [`TerrainPipeline::generate`] again with new parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerrainPipeline {
    builder: MeshBuilder,
}

impl TerrainPipeline {
    pub fn new(builder: MeshBuilder) -> Self {
        Self { builder }
    }

    pub fn generate(
        &self,
        source: &dyn HeightSampleSource,
        params: &GridParams,
    ) -> TerrainResult<TerrainMesh> {
        let (width, height) = params.resolve(source);

        let started = Instant::now();
        let grid = source.sample_grid(width, height)?;
        let sampled = started.elapsed();

        let mesh = self.builder.build(&grid)?;
        let total = started.elapsed();

        log::debug!(
            "Sampled {}x{} {} in {:.2?} ({}), built mesh in {:.2?}",
            width,
            height,
            source.label(),
            sampled,
            grid.stats(),
            total - sampled
        );

        match mesh.topology() {
            IndexTopology::TriangleList => log::info!(
                "Generated terrain from {}: {} vertices, {} indices, {} triangles",
                source.label(),
                mesh.vertex_count(),
                mesh.index_count(),
                mesh.triangle_count()
            ),
            IndexTopology::TriangleStrip => log::info!(
                "Generated terrain from {}: {} vertices, {} indices, {} strips of {} vertices",
                source.label(),
                mesh.vertex_count(),
                mesh.index_count(),
                mesh.strip_count(),
                u64::from(width) * 2
            ),
        }

        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TerrainError;
    use crate::terrain::heightmap::{HeightGrid, NoiseHeightSource};
    use crate::terrain::mesh_builder::NormalMode;

    struct Sizeless;

    impl HeightSampleSource for Sizeless {
        fn sample_grid(&self, width: u32, height: u32) -> TerrainResult<HeightGrid> {
            HeightGrid::flat(width, height, 0.0)
        }

        fn label(&self) -> &str {
            "sizeless"
        }
    }

    #[test]
    fn test_native_size_from_source() {
        let source = NoiseHeightSource::new(16);
        let mesh = TerrainPipeline::default()
            .generate(&source, &GridParams::native())
            .unwrap();
        assert_eq!(mesh.grid_size(), (16, 16));
        assert_eq!(mesh.vertex_count(), 256);
        assert_eq!(mesh.triangle_count(), 2 * 15 * 15);
    }

    #[test]
    fn test_native_size_fallback() {
        let params = GridParams::native();
        assert_eq!(
            params.resolve(&Sizeless),
            (DEFAULT_GRID_SIZE, DEFAULT_GRID_SIZE)
        );
    }

    #[test]
    fn test_fixed_size_overrides_native() {
        let source = NoiseHeightSource::new(64);
        let mesh = TerrainPipeline::default()
            .generate(&source, &GridParams::fixed(8, 5))
            .unwrap();
        assert_eq!(mesh.grid_size(), (8, 5));
        assert_eq!(mesh.vertex_count(), 40);
    }

    #[test]
    fn test_zero_size_is_degenerate() {
        let err = TerrainPipeline::default()
            .generate(&Sizeless, &GridParams::fixed(0, 4))
            .unwrap_err();
        assert!(matches!(err, TerrainError::DegenerateGeometry(_)));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let source = NoiseHeightSource::new(12);
        let pipeline = TerrainPipeline::new(
            MeshBuilder::new()
                .with_topology(IndexTopology::TriangleStrip)
                .with_normals(NormalMode::Face),
        );
        let a = pipeline.generate(&source, &GridParams::native()).unwrap();
        let b = pipeline.generate(&source, &GridParams::native()).unwrap();
        assert_eq!(a.positions(), b.positions());
        assert_eq!(a.indices(), b.indices());
        assert_eq!(a.normals(), b.normals());
    }
}
