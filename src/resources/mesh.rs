//! GPU-ready mesh data

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::error::{TerrainError, TerrainResult};
use crate::terrain::{IndexTopology, NormalMode, TerrainMesh};

/// Vertices needed to give each of `triangles` its own three corners
fn flat_shaded_vertex_count(triangles: usize) -> TerrainResult<u32> {
    triangles
        .checked_mul(3)
        .and_then(|count| u32::try_from(count).ok())
        .ok_or_else(|| {
            TerrainError::degenerate(format!(
                "flat shading {} triangles exceeds the u32 index range",
                triangles
            ))
        })
}

/// Interleaved terrain vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: Vec3,
    pub normal: Vec3,
}

impl TerrainVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// How the index buffer is submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawMode {
    /// One triangle-list draw over the whole index buffer
    TriangleList,
    /// One triangle-strip draw per index range
    TriangleStrips(Vec<Range<u32>>),
}

/// A mesh with vertex and index data
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
    pub draw_mode: DrawMode,
    pub name: String,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            draw_mode: DrawMode::TriangleList,
            name: name.to_string(),
        }
    }

    /// Interleave a terrain mesh for upload.
    ///
    /// Smooth normals keep the shared vertex grid and the original
    /// topology. Face normals need one normal per triangle, so every
    /// triangle gets its own three vertices and the mesh becomes a list.
    pub fn from_terrain(terrain: &TerrainMesh, name: &str) -> TerrainResult<Self> {
        let mut mesh = Mesh::new(name);

        match terrain.normal_mode() {
            NormalMode::Smooth => {
                mesh.vertices = terrain
                    .positions()
                    .iter()
                    .zip(terrain.normals())
                    .map(|(&position, &normal)| TerrainVertex { position, normal })
                    .collect();
                mesh.indices = terrain.indices().to_vec();
                if terrain.topology() == IndexTopology::TriangleStrip {
                    mesh.draw_mode = DrawMode::TriangleStrips(terrain.strip_ranges().collect());
                }
            }
            NormalMode::Face => {
                let vertex_count = flat_shaded_vertex_count(terrain.triangle_count())?;
                let positions = terrain.positions();
                mesh.vertices.reserve(vertex_count as usize);

                for (tri, &normal) in terrain.triangles().zip(terrain.normals()) {
                    mesh.vertices.extend(tri.iter().map(|&index| TerrainVertex {
                        position: positions[index as usize],
                        normal,
                    }));
                }
                mesh.indices = (0..vertex_count).collect();
            }
        }

        Ok(mesh)
    }

    /// Calculate vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Calculate index count
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Calculate triangle count
    pub fn triangle_count(&self) -> usize {
        match &self.draw_mode {
            DrawMode::TriangleList => self.indices.len() / 3,
            DrawMode::TriangleStrips(ranges) => ranges
                .iter()
                .map(|range| range.len().saturating_sub(2))
                .sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Get vertex data as bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Get index data as bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Axis-aligned bounds, `None` when there are no vertices
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = self.vertices.first()?.position;
        Some(
            self.vertices
                .iter()
                .fold((first, first), |(min, max), v| {
                    (min.min(v.position), max.max(v.position))
                }),
        )
    }
}
