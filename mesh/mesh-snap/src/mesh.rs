//! Raw mesh buffers as delivered by the model loader.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{SnapError, SnapResult};

/// Flat triangle buffers for one model element.
///
/// This is the read-only input of the snap engine. Positions and normals are
/// stored as `f32` triples exactly as they arrive from the loader; all snap
/// math is done in `f64`.
///
/// # Memory Layout
///
/// - `positions`: `[x0, y0, z0, x1, y1, z1, ...]`
/// - `normals`: per-vertex normals in the same layout (may be empty)
/// - `indices`: `[a0, b0, c0, a1, b1, c1, ...]`, three per triangle
///
/// # Example
///
/// ```
/// use mesh_snap::MeshData;
///
/// let mesh = MeshData::new(
///     7,
///     vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
///     Vec::new(),
///     vec![0, 1, 2],
/// );
///
/// assert_eq!(mesh.vertex_count(), 3);
/// assert_eq!(mesh.triangle_count(), 1);
/// assert!(mesh.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshData {
    /// Stable identifier of the owning model element.
    pub express_id: u32,
    /// Vertex positions, three floats per vertex.
    pub positions: Vec<f32>,
    /// Vertex normals, three floats per vertex.
    pub normals: Vec<f32>,
    /// Triangle indices, three per triangle.
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Create mesh data from raw buffers.
    #[inline]
    #[must_use]
    pub const fn new(
        express_id: u32,
        positions: Vec<f32>,
        normals: Vec<f32>,
        indices: Vec<u32>,
    ) -> Self {
        Self {
            express_id,
            positions,
            normals,
            indices,
        }
    }

    /// Number of complete vertices in the position buffer.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of complete triangles in the index buffer.
    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns `true` if the mesh has no positions or no triangles.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0 || self.triangle_count() == 0
    }

    /// Position of a vertex.
    ///
    /// Returns `None` if the index is out of range or any coordinate is
    /// non-finite.
    #[must_use]
    pub fn position(&self, index: u32) -> Option<Point3<f64>> {
        read_triple(&self.positions, index).map(|[x, y, z]| Point3::new(x, y, z))
    }

    /// Normal of a vertex, if the normal buffer covers it.
    #[must_use]
    pub fn normal(&self, index: u32) -> Option<Vector3<f64>> {
        read_triple(&self.normals, index).map(|[x, y, z]| Vector3::new(x, y, z))
    }

    /// Vertex indices of a triangle.
    #[must_use]
    pub fn triangle(&self, triangle_index: usize) -> Option<[u32; 3]> {
        let start = triangle_index.checked_mul(3)?;
        let end = start.checked_add(3)?;
        match self.indices.get(start..end)? {
            &[a, b, c] => Some([a, b, c]),
            _ => None,
        }
    }

    /// Corner positions of a triangle.
    ///
    /// Returns `None` if the triangle does not exist or references an
    /// invalid vertex.
    #[must_use]
    pub fn triangle_positions(&self, triangle_index: usize) -> Option<[Point3<f64>; 3]> {
        let [a, b, c] = self.triangle(triangle_index)?;
        Some([self.position(a)?, self.position(b)?, self.position(c)?])
    }

    /// Iterate over all complete triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
    }

    /// Check the buffers for structural problems.
    ///
    /// Detection tolerates every problem reported here by skipping the
    /// affected data; this is meant for loaders and diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::MalformedBuffer`] if a buffer length is not a
    /// multiple of three, the normal buffer does not match the position
    /// buffer, or an index is out of range.
    pub fn validate(&self) -> SnapResult<()> {
        if self.positions.len() % 3 != 0 {
            return Err(SnapError::malformed_buffer(
                self.express_id,
                format!(
                    "position buffer length {} is not a multiple of 3",
                    self.positions.len()
                ),
            ));
        }
        if !self.normals.is_empty() && self.normals.len() != self.positions.len() {
            return Err(SnapError::malformed_buffer(
                self.express_id,
                format!(
                    "normal buffer length {} does not match position buffer length {}",
                    self.normals.len(),
                    self.positions.len()
                ),
            ));
        }
        if self.indices.len() % 3 != 0 {
            return Err(SnapError::malformed_buffer(
                self.express_id,
                format!(
                    "index buffer length {} is not a multiple of 3",
                    self.indices.len()
                ),
            ));
        }
        let vertex_count = self.vertex_count();
        if let Some(&bad) = self
            .indices
            .iter()
            .find(|&&i| usize::try_from(i).map_or(true, |i| i >= vertex_count))
        {
            return Err(SnapError::malformed_buffer(
                self.express_id,
                format!("index {bad} out of range for {vertex_count} vertices"),
            ));
        }
        Ok(())
    }
}

fn read_triple(buffer: &[f32], index: u32) -> Option<[f64; 3]> {
    let start = usize::try_from(index).ok()?.checked_mul(3)?;
    let end = start.checked_add(3)?;
    let chunk = buffer.get(start..end)?;
    let coords = [
        f64::from(chunk[0]),
        f64::from(chunk[1]),
        f64::from(chunk[2]),
    ];
    coords.iter().all(|c| c.is_finite()).then_some(coords)
}

/// Create a unit cube spanning `[0, 1]^3`.
///
/// Eight shared vertices, twelve outward-facing (CCW) triangles. Every face
/// quad is split along one diagonal, so the cube has twelve real edges and
/// six triangulation diagonals.
///
/// # Example
///
/// ```
/// use mesh_snap::unit_cube;
///
/// let cube = unit_cube(1);
/// assert_eq!(cube.vertex_count(), 8);
/// assert_eq!(cube.triangle_count(), 12);
/// ```
#[must_use]
pub fn unit_cube(express_id: u32) -> MeshData {
    let corners: [[f32; 3]; 8] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
        [1.0, 1.0, 1.0],
        [0.0, 1.0, 1.0],
    ];

    let positions = corners.iter().flatten().copied().collect();

    // Smooth corner normals pointing away from the cube center
    let normals = corners
        .iter()
        .flat_map(|c| {
            let n = Vector3::new(c[0] - 0.5, c[1] - 0.5, c[2] - 0.5).normalize();
            [n.x, n.y, n.z]
        })
        .collect();

    let indices = vec![
        0, 2, 1, 0, 3, 2, // bottom (-Z)
        4, 5, 6, 4, 6, 7, // top (+Z)
        0, 1, 5, 0, 5, 4, // front (-Y)
        3, 7, 6, 3, 6, 2, // back (+Y)
        0, 4, 7, 0, 7, 3, // left (-X)
        1, 2, 6, 1, 6, 5, // right (+X)
    ];

    MeshData::new(express_id, positions, normals, indices)
}

/// Create a square in the XY plane split into two triangles.
///
/// Corners are `(0,0,0)`, `(size,0,0)`, `(size,size,0)`, `(0,size,0)`; the
/// shared diagonal runs from corner 0 to corner 2.
#[must_use]
pub fn planar_quad(express_id: u32, size: f32) -> MeshData {
    MeshData::new(
        express_id,
        vec![
            0.0, 0.0, 0.0, size, 0.0, 0.0, size, size, 0.0, 0.0, size, 0.0,
        ],
        vec![
            0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
        ],
        vec![0, 1, 2, 0, 2, 3],
    )
}
