//! Height grid to triangle mesh conversion.
//!
//! Every grid sample becomes one vertex. Each interior quad is split into
//! two triangles along the `(x, y)-(x+1, y+1)` diagonal, emitted either as a
//! triangle list or as one triangle strip per row. Both topologies wind the
//! triangles so that [`face_normal`] of a flat grid points along `+Y`.

use std::ops::Range;

use glam::Vec3;

use super::heightmap::HeightGrid;
use crate::error::{TerrainError, TerrainResult};

/// How grid coordinates map to the XZ plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexPlacement {
    /// One world unit per grid cell, origin at sample (0, 0)
    Grid,
    /// Coordinates divided by the grid dimensions (world size independent of resolution)
    #[default]
    Normalized,
    /// One world unit per grid cell, centered on the origin
    Centered,
}

/// Index buffer encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexTopology {
    /// Three indices per triangle
    #[default]
    TriangleList,
    /// One strip of `2 * width` indices per row of quads
    TriangleStrip,
}

/// Normal generation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalMode {
    /// One normal per triangle, in triangle order
    Face,
    /// One normal per vertex, averaged from adjacent faces
    #[default]
    Smooth,
}

/// Normal of triangle `(a, b, c)`: `normalize(-cross(b - a, c - a))`.
///
/// Zero-area triangles give `Vec3::ZERO` instead of NaN.
pub fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let u = b - a;
    let v = c - a;
    (-u.cross(v)).normalize_or_zero()
}

/// Renderable terrain geometry
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    normals: Vec<Vec3>,
    topology: IndexTopology,
    normal_mode: NormalMode,
    grid_width: u32,
    grid_height: u32,
    degenerate_triangles: usize,
}

impl TerrainMesh {
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Positions as `x, y, z` floats
    pub fn flat_positions(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Normals as `x, y, z` floats
    pub fn flat_normals(&self) -> &[f32] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn topology(&self) -> IndexTopology {
        self.topology
    }

    pub fn normal_mode(&self) -> NormalMode {
        self.normal_mode
    }

    /// Dimensions of the source grid
    pub fn grid_size(&self) -> (u32, u32) {
        (self.grid_width, self.grid_height)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        match self.topology {
            IndexTopology::TriangleList => self.indices.len() / 3,
            IndexTopology::TriangleStrip => self
                .strip_ranges()
                .map(|range| range.len().saturating_sub(2))
                .sum(),
        }
    }

    /// Number of strips (zero for triangle lists)
    pub fn strip_count(&self) -> usize {
        match self.topology {
            IndexTopology::TriangleList => 0,
            IndexTopology::TriangleStrip => {
                if self.indices.is_empty() {
                    0
                } else {
                    self.grid_height as usize - 1
                }
            }
        }
    }

    /// Index range of each strip, in draw order
    pub fn strip_ranges(&self) -> impl Iterator<Item = Range<u32>> + '_ {
        // Fits in u32: `build` rejects grids whose index count does not
        let per_strip = u64::from(self.grid_width) * 2;
        (0..self.strip_count() as u64).map(move |strip| {
            let start = strip * per_strip;
            start as u32..(start + per_strip) as u32
        })
    }

    /// Triangles as index triples, consistently wound for both topologies
    pub fn triangles(&self) -> Box<dyn Iterator<Item = [u32; 3]> + '_> {
        match self.topology {
            IndexTopology::TriangleList => Box::new(
                self.indices
                    .chunks_exact(3)
                    .map(|tri| [tri[0], tri[1], tri[2]]),
            ),
            IndexTopology::TriangleStrip => Box::new(self.strip_ranges().flat_map(move |range| {
                let strip = &self.indices[range.start as usize..range.end as usize];
                strip.windows(3).enumerate().map(|(k, w)| {
                    if k % 2 == 0 {
                        [w[0], w[1], w[2]]
                    } else {
                        [w[1], w[0], w[2]]
                    }
                })
            })),
        }
    }

    /// Triangles whose normal fell back to the zero vector
    pub fn degenerate_triangles(&self) -> usize {
        self.degenerate_triangles
    }

    /// Lowest and highest vertex height, `None` for an empty mesh
    pub fn height_range(&self) -> Option<(f32, f32)> {
        if self.positions.is_empty() {
            return None;
        }
        Some(self.positions.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(lo, hi), p| (lo.min(p.y), hi.max(p.y)),
        ))
    }
}

/// Builds [`TerrainMesh`] values from height grids
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBuilder {
    pub placement: VertexPlacement,
    pub topology: IndexTopology,
    pub normals: NormalMode,
    /// Multiplier applied to every sample before it becomes the vertex height
    pub vertical_scale: f32,
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self {
            placement: VertexPlacement::default(),
            topology: IndexTopology::default(),
            normals: NormalMode::default(),
            vertical_scale: 1.0,
        }
    }
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placement(mut self, placement: VertexPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_topology(mut self, topology: IndexTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_normals(mut self, normals: NormalMode) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_vertical_scale(mut self, scale: f32) -> Self {
        self.vertical_scale = scale;
        self
    }

    /// Convert a grid into positions, indices and normals
    pub fn build(&self, grid: &HeightGrid) -> TerrainResult<TerrainMesh> {
        let (width, height) = (grid.width(), grid.height());
        let vertex_count = grid.len();
        if u32::try_from(vertex_count).is_err() {
            return Err(TerrainError::degenerate(format!(
                "{}x{} grid exceeds the u32 index range",
                width, height
            )));
        }

        let index_count = expected_index_count(self.topology, width, height);
        if u32::try_from(index_count).is_err() {
            return Err(TerrainError::degenerate(format!(
                "{}x{} grid needs {} indices, beyond the u32 range",
                width, height, index_count
            )));
        }

        let positions = self.generate_positions(grid);

        let indices = if grid.has_quads() {
            match self.topology {
                IndexTopology::TriangleList => triangle_list_indices(width, height),
                IndexTopology::TriangleStrip => triangle_strip_indices(width, height),
            }
        } else {
            log::debug!(
                "{}x{} height grid has no quads, building an empty mesh",
                width,
                height
            );
            Vec::new()
        };

        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(TerrainError::degenerate(format!(
                "index {} out of range for {} vertices",
                bad, vertex_count
            )));
        }

        let mut mesh = TerrainMesh {
            positions,
            indices,
            normals: Vec::new(),
            topology: self.topology,
            normal_mode: self.normals,
            grid_width: width,
            grid_height: height,
            degenerate_triangles: 0,
        };
        self.generate_normals(&mut mesh);

        if mesh.degenerate_triangles > 0 {
            log::debug!(
                "{} degenerate triangles received a zero normal",
                mesh.degenerate_triangles
            );
        }

        Ok(mesh)
    }

    fn generate_positions(&self, grid: &HeightGrid) -> Vec<Vec3> {
        let (width, height) = (grid.width(), grid.height());
        let (w, h) = (width as f32, height as f32);
        let mut positions = Vec::with_capacity(grid.len());

        for (i, &sample) in grid.samples().iter().enumerate() {
            let x = (i % width as usize) as f32;
            let y = (i / width as usize) as f32;
            let elevation = sample * self.vertical_scale;
            let position = match self.placement {
                VertexPlacement::Grid => Vec3::new(x, elevation, y),
                VertexPlacement::Normalized => Vec3::new(x / w, elevation, y / h),
                VertexPlacement::Centered => Vec3::new(x - w / 2.0, elevation, y - h / 2.0),
            };
            positions.push(position);
        }

        debug_assert_eq!(positions.len(), (width * height) as usize);
        positions
    }

    fn generate_normals(&self, mesh: &mut TerrainMesh) {
        let mut degenerate = 0;
        let normals = match self.normals {
            NormalMode::Face => {
                let mut normals = Vec::with_capacity(mesh.triangle_count());
                for [a, b, c] in mesh.triangles() {
                    let n = triangle_normal(&mesh.positions, a, b, c);
                    if n == Vec3::ZERO {
                        degenerate += 1;
                    }
                    normals.push(n);
                }
                normals
            }
            NormalMode::Smooth => {
                let mut normals = vec![Vec3::ZERO; mesh.positions.len()];
                for [a, b, c] in mesh.triangles() {
                    let n = triangle_normal(&mesh.positions, a, b, c);
                    if n == Vec3::ZERO {
                        degenerate += 1;
                        continue;
                    }
                    normals[a as usize] += n;
                    normals[b as usize] += n;
                    normals[c as usize] += n;
                }
                for n in &mut normals {
                    *n = n.normalize_or_zero();
                }
                normals
            }
        };
        mesh.normals = normals;
        mesh.degenerate_triangles = degenerate;
    }
}

fn triangle_normal(positions: &[Vec3], a: u32, b: u32, c: u32) -> Vec3 {
    face_normal(
        positions[a as usize],
        positions[b as usize],
        positions[c as usize],
    )
}

/// Index count a `width x height` grid produces, zero without quads
fn expected_index_count(topology: IndexTopology, width: u32, height: u32) -> u64 {
    if width < 2 || height < 2 {
        return 0;
    }
    let (w, h) = (u64::from(width), u64::from(height));
    match topology {
        IndexTopology::TriangleList => 6 * (w - 1) * (h - 1),
        IndexTopology::TriangleStrip => 2 * w * (h - 1),
    }
}

fn triangle_list_indices(width: u32, height: u32) -> Vec<u32> {
    let quads = (width as usize - 1) * (height as usize - 1);
    let mut indices = Vec::with_capacity(quads * 6);

    for y in 0..height - 1 {
        for x in 0..width - 1 {
            let pos = x + y * width;

            // Top left triangle of the quad
            indices.extend_from_slice(&[pos + width, pos, pos + width + 1]);
            // Bottom right triangle of the quad
            indices.extend_from_slice(&[pos + 1, pos + 1 + width, pos]);
        }
    }

    indices
}

fn triangle_strip_indices(width: u32, height: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity((height as usize - 1) * width as usize * 2);

    for y in 0..height - 1 {
        for x in 0..width {
            indices.push(x + width * (y + 1));
            indices.push(x + width * y);
        }
    }

    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_all_up(normals: &[Vec3]) {
        for n in normals {
            assert!((*n - Vec3::Y).length() < 1e-6, "normal {n} is not up");
        }
    }

    #[test]
    fn test_flat_3x3_face_normals() {
        let grid = HeightGrid::flat(3, 3, 0.0).unwrap();
        let mesh = MeshBuilder::new()
            .with_normals(NormalMode::Face)
            .build(&grid)
            .unwrap();

        assert_eq!(mesh.vertex_count(), 9);
        assert_eq!(mesh.triangle_count(), 8);
        assert_eq!(mesh.index_count(), 24);
        assert_eq!(mesh.normals().len(), 8);
        assert_all_up(mesh.normals());
        assert_eq!(mesh.degenerate_triangles(), 0);
    }

    #[test]
    fn test_flat_smooth_normals() {
        let grid = HeightGrid::flat(5, 4, 2.5).unwrap();
        let mesh = MeshBuilder::new().build(&grid).unwrap();
        assert_eq!(mesh.normals().len(), mesh.vertex_count());
        assert_all_up(mesh.normals());
    }

    #[test]
    fn test_counts_for_rectangular_grids() {
        for &(w, h) in &[(2, 2), (4, 7), (9, 3), (16, 16)] {
            let grid = HeightGrid::from_fn(w, h, |x, y| (x * y) as f32 * 0.1).unwrap();
            for topology in [IndexTopology::TriangleList, IndexTopology::TriangleStrip] {
                let mesh = MeshBuilder::new()
                    .with_topology(topology)
                    .with_normals(NormalMode::Face)
                    .build(&grid)
                    .unwrap();
                let expected = 2 * (w as usize - 1) * (h as usize - 1);
                assert_eq!(mesh.vertex_count(), (w * h) as usize);
                assert_eq!(mesh.triangle_count(), expected, "{w}x{h} {topology:?}");
                assert_eq!(mesh.triangles().count(), expected);
                assert_eq!(mesh.normals().len(), expected);
            }
        }
    }

    #[test]
    fn test_list_indices_skip_last_row_and_column() {
        let grid = HeightGrid::flat(3, 3, 0.0).unwrap();
        let mesh = MeshBuilder::new().build(&grid).unwrap();
        assert_eq!(&mesh.indices()[..6], &[3, 0, 4, 1, 4, 0]);
        assert!(mesh.indices().iter().all(|&i| i < 9));
    }

    #[test]
    fn test_strip_layout() {
        let grid = HeightGrid::flat(3, 3, 0.0).unwrap();
        let mesh = MeshBuilder::new()
            .with_topology(IndexTopology::TriangleStrip)
            .with_normals(NormalMode::Face)
            .build(&grid)
            .unwrap();

        assert_eq!(mesh.strip_count(), 2);
        let ranges: Vec<_> = mesh.strip_ranges().collect();
        assert_eq!(ranges, vec![0..6, 6..12]);
        assert_eq!(&mesh.indices()[..6], &[3, 0, 4, 1, 5, 2]);
        assert_all_up(mesh.normals());
    }

    #[test]
    fn test_topologies_agree_on_triangles() {
        let grid = HeightGrid::from_fn(4, 3, |x, y| ((x + 2 * y) % 3) as f32).unwrap();
        let list = MeshBuilder::new()
            .with_normals(NormalMode::Smooth)
            .build(&grid)
            .unwrap();
        let strip = MeshBuilder::new()
            .with_topology(IndexTopology::TriangleStrip)
            .with_normals(NormalMode::Smooth)
            .build(&grid)
            .unwrap();

        for (a, b) in list.normals().iter().zip(strip.normals()) {
            assert!((*a - *b).length() < 1e-5);
        }
    }

    #[test]
    fn test_thin_grids_have_no_triangles() {
        for &(w, h) in &[(1, 5), (5, 1), (1, 1)] {
            let grid = HeightGrid::flat(w, h, 0.0).unwrap();
            for topology in [IndexTopology::TriangleList, IndexTopology::TriangleStrip] {
                let mesh = MeshBuilder::new()
                    .with_topology(topology)
                    .build(&grid)
                    .unwrap();
                assert_eq!(mesh.vertex_count(), (w * h) as usize);
                assert_eq!(mesh.triangle_count(), 0);
                assert!(mesh.indices().is_empty());
                assert_eq!(mesh.strip_count(), 0);
                // Vertices without faces keep the zero normal
                assert!(mesh.normals().iter().all(|n| *n == Vec3::ZERO));
            }
        }
    }

    #[test]
    fn test_expected_index_count_matches_buffers() {
        for topology in [IndexTopology::TriangleList, IndexTopology::TriangleStrip] {
            for (w, h) in [(2, 2), (5, 3), (1, 9), (9, 1)] {
                let mesh = MeshBuilder::new()
                    .with_topology(topology)
                    .build(&HeightGrid::flat(w, h, 0.0).unwrap())
                    .unwrap();
                assert_eq!(expected_index_count(topology, w, h), mesh.index_count() as u64);
            }
        }
    }

    #[test]
    fn test_expected_index_count_beyond_u32() {
        // 65536 x 65536 vertices still fit, their indices do not
        let count = expected_index_count(IndexTopology::TriangleStrip, 65_536, 65_536);
        assert!(u32::try_from(count).is_err());
        let count = expected_index_count(IndexTopology::TriangleList, 30_000, 30_000);
        assert!(u32::try_from(count).is_err());
        assert_eq!(expected_index_count(IndexTopology::TriangleStrip, u32::MAX, 1), 0);
    }

    #[test]
    fn test_face_normal_degenerate_is_zero() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(face_normal(p, p, p), Vec3::ZERO);

        let collinear = face_normal(
            Vec3::ZERO,
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(2.0, 2.0, 2.0),
        );
        assert_eq!(collinear, Vec3::ZERO);
        assert!(!collinear.is_nan());
    }

    #[test]
    fn test_face_normal_winding() {
        let n = face_normal(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
        );
        assert_eq!(n, Vec3::Y);
    }

    #[test]
    fn test_vertical_scale_zero_stays_flat() {
        let grid = HeightGrid::from_fn(4, 4, |x, y| (x + y) as f32).unwrap();
        let mesh = MeshBuilder::new()
            .with_vertical_scale(0.0)
            .with_normals(NormalMode::Face)
            .build(&grid)
            .unwrap();
        assert_all_up(mesh.normals());
        assert_eq!(mesh.height_range(), Some((0.0, 0.0)));
    }

    #[test]
    fn test_placements() {
        let grid = HeightGrid::from_fn(4, 2, |x, _| x as f32).unwrap();

        let normalized = MeshBuilder::new().build(&grid).unwrap();
        assert_eq!(normalized.positions()[5], Vec3::new(0.25, 1.0, 0.5));

        let grid_units = MeshBuilder::new()
            .with_placement(VertexPlacement::Grid)
            .build(&grid)
            .unwrap();
        assert_eq!(grid_units.positions()[5], Vec3::new(1.0, 1.0, 1.0));

        let centered = MeshBuilder::new()
            .with_placement(VertexPlacement::Centered)
            .build(&grid)
            .unwrap();
        assert_eq!(centered.positions()[0], Vec3::new(-2.0, 0.0, -1.0));
    }

    #[test]
    fn test_slope_normal_tilts_downhill() {
        // Height rises with x, so the surface normal leans towards -x
        let grid = HeightGrid::from_fn(3, 3, |x, _| x as f32).unwrap();
        let mesh = MeshBuilder::new()
            .with_placement(VertexPlacement::Grid)
            .with_normals(NormalMode::Face)
            .build(&grid)
            .unwrap();
        let expected = Vec3::new(-1.0, 1.0, 0.0).normalize();
        for n in mesh.normals() {
            assert!((*n - expected).length() < 1e-5, "normal {n}");
        }
    }

    #[test]
    fn test_flat_views_match_buffers() {
        let grid = HeightGrid::flat(2, 2, 1.0).unwrap();
        let mesh = MeshBuilder::new()
            .with_placement(VertexPlacement::Grid)
            .build(&grid)
            .unwrap();
        assert_eq!(mesh.flat_positions().len(), 12);
        assert_eq!(&mesh.flat_positions()[3..6], &[1.0, 1.0, 0.0]);
        assert_eq!(mesh.flat_normals().len(), 12);
    }
}
