//! Derived per-mesh topology: welded vertices, real edges and vertex valence.
//!
//! Mesh buffers arrive as a triangle soup. Snapping needs the edges a user
//! would recognise on the model, which means throwing away the diagonals that
//! only exist because a planar polygon was triangulated. An edge shared by two
//! coplanar triangles is such a diagonal; an edge with a single triangle is a
//! boundary; anything else is a crease.
//!
//! Results are memoized per element in [`GeometryCache`] and never mutated
//! after construction.

// Mesh processing uses indices; casts are safe for practical mesh sizes.
#![allow(clippy::cast_possible_truncation)]

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

use crate::geometry::triangle_normal;
use crate::mesh::MeshData;

/// Scale applied before rounding coordinates into a [`VertexKey`].
///
/// Four decimal places: positions closer than roughly `1e-4` share a key.
pub const QUANTIZE_SCALE: f64 = 10_000.0;

/// Absolute dot product above which two adjacent faces count as coplanar.
pub const COPLANAR_THRESHOLD: f64 = 0.98;

/// Quantized position used to weld vertices and index valence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexKey([i64; 3]);

impl VertexKey {
    /// Quantize a position.
    ///
    /// Returns `None` for non-finite coordinates.
    #[must_use]
    pub fn from_point(p: &Point3<f64>) -> Option<Self> {
        if !p.iter().all(|c| c.is_finite()) {
            return None;
        }
        Some(Self([
            (p.x * QUANTIZE_SCALE).round() as i64,
            (p.y * QUANTIZE_SCALE).round() as i64,
            (p.z * QUANTIZE_SCALE).round() as i64,
        ]))
    }
}

/// A welded vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedVertex {
    /// Position of the first buffer vertex that produced this key.
    pub position: Point3<f64>,
    /// Normal of that buffer vertex, if the mesh carries normals.
    pub normal: Option<Vector3<f64>>,
    /// Quantized key.
    pub key: VertexKey,
    /// Index of that buffer vertex.
    pub source_index: u32,
}

/// Why an edge was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Used by exactly one triangle.
    Boundary,
    /// Shared by triangles that are not coplanar.
    Crease,
}

/// A real model edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedEdge {
    /// Stable position in [`MeshGeometryCache::edges`].
    pub index: usize,
    /// First endpoint.
    pub start: Point3<f64>,
    /// Second endpoint.
    pub end: Point3<f64>,
    /// Quantized key of `start`.
    pub start_key: VertexKey,
    /// Quantized key of `end`.
    pub end_key: VertexKey,
    /// Boundary or crease.
    pub kind: EdgeKind,
    /// Number of triangles sharing the edge.
    pub face_count: usize,
}

impl CachedEdge {
    /// Midpoint of the edge.
    #[must_use]
    pub fn midpoint(&self) -> Point3<f64> {
        Point3::from((self.start.coords + self.end.coords) * 0.5)
    }

    /// Edge length.
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }
}

/// Snap topology derived from one mesh.
#[derive(Debug, Clone, Default)]
pub struct MeshGeometryCache {
    express_id: u32,
    vertices: Vec<CachedVertex>,
    edges: Vec<CachedEdge>,
    valence: HashMap<VertexKey, usize>,
    vertex_edges: HashMap<VertexKey, Vec<usize>>,
    discarded_diagonals: usize,
}

impl MeshGeometryCache {
    /// An empty cache for an element without usable geometry.
    #[must_use]
    pub fn empty(express_id: u32) -> Self {
        Self {
            express_id,
            ..Self::default()
        }
    }

    /// Build the cache with the default coplanarity threshold.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_snap::{MeshGeometryCache, planar_quad};
    ///
    /// let cache = MeshGeometryCache::build(&planar_quad(1, 1.0));
    ///
    /// // The quad's diagonal is not a real edge
    /// assert_eq!(cache.edges().len(), 4);
    /// assert_eq!(cache.discarded_diagonal_count(), 1);
    /// ```
    #[must_use]
    pub fn build(mesh: &MeshData) -> Self {
        Self::build_with_threshold(mesh, COPLANAR_THRESHOLD)
    }

    /// Build the cache with a custom coplanarity threshold.
    ///
    /// Never fails: non-finite positions, out-of-range indices and
    /// degenerate triangles are skipped.
    #[must_use]
    pub fn build_with_threshold(mesh: &MeshData, coplanar_threshold: f64) -> Self {
        if mesh.positions.len() < 3 {
            return Self::empty(mesh.express_id);
        }

        let position_remainder = mesh.positions.len() % 3;
        let index_remainder = mesh.indices.len() % 3;
        if position_remainder != 0 || index_remainder != 0 {
            warn!(
                express_id = mesh.express_id,
                position_remainder, index_remainder, "Ignored ragged buffer tails"
            );
        }

        let vertices = weld_vertices(mesh);

        // Edge (lo, hi) -> normals of the faces using it, in first-seen order
        let mut adjacency: HashMap<(u32, u32), Vec<Vector3<f64>>> = HashMap::new();
        let mut order: Vec<(u32, u32)> = Vec::new();
        let mut skipped_triangles = 0_usize;

        for tri in mesh.triangles() {
            let (Some(a), Some(b), Some(c)) = (
                mesh.position(tri[0]),
                mesh.position(tri[1]),
                mesh.position(tri[2]),
            ) else {
                skipped_triangles += 1;
                continue;
            };
            let normal = triangle_normal(&a, &b, &c).unwrap_or_else(Vector3::z);

            for (u, v) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                if u == v {
                    continue;
                }
                let key = normalize_edge(u, v);
                let normals = adjacency.entry(key).or_insert_with(|| {
                    order.push(key);
                    Vec::with_capacity(2)
                });
                normals.push(normal);
            }
        }

        if skipped_triangles > 0 {
            warn!(
                express_id = mesh.express_id,
                skipped_triangles, "Skipped triangles with invalid vertices"
            );
        }

        let mut edges = Vec::new();
        let mut valence: HashMap<VertexKey, usize> = HashMap::new();
        let mut vertex_edges: HashMap<VertexKey, Vec<usize>> = HashMap::new();
        let mut seen: HashSet<(VertexKey, VertexKey)> = HashSet::new();
        let mut discarded_diagonals = 0_usize;
        let mut boundary = 0_usize;

        for key in order {
            let Some(normals) = adjacency.get(&key) else {
                continue;
            };
            let kind = match normals.as_slice() {
                [_] => EdgeKind::Boundary,
                [n0, n1, ..] if n0.dot(n1).abs() > coplanar_threshold => {
                    discarded_diagonals += 1;
                    continue;
                }
                [_, _, ..] => EdgeKind::Crease,
                [] => continue,
            };

            let (Some(start), Some(end)) = (mesh.position(key.0), mesh.position(key.1)) else {
                continue;
            };
            let (Some(start_key), Some(end_key)) =
                (VertexKey::from_point(&start), VertexKey::from_point(&end))
            else {
                continue;
            };
            if start_key == end_key {
                continue;
            }
            // Split vertices produce the same model edge once per face
            let pair = if start_key < end_key {
                (start_key, end_key)
            } else {
                (end_key, start_key)
            };
            if !seen.insert(pair) {
                continue;
            }

            let index = edges.len();
            if kind == EdgeKind::Boundary {
                boundary += 1;
            }
            edges.push(CachedEdge {
                index,
                start,
                end,
                start_key,
                end_key,
                kind,
                face_count: normals.len(),
            });
            for vertex in [start_key, end_key] {
                *valence.entry(vertex).or_insert(0) += 1;
                vertex_edges.entry(vertex).or_default().push(index);
            }
        }

        debug!(
            express_id = mesh.express_id,
            vertices = vertices.len(),
            edges = edges.len(),
            boundary,
            crease = edges.len() - boundary,
            discarded_diagonals,
            "Built snap geometry cache"
        );

        Self {
            express_id: mesh.express_id,
            vertices,
            edges,
            valence,
            vertex_edges,
            discarded_diagonals,
        }
    }

    /// Element the cache was built for.
    #[must_use]
    pub const fn express_id(&self) -> u32 {
        self.express_id
    }

    /// Welded vertices.
    #[must_use]
    pub fn vertices(&self) -> &[CachedVertex] {
        &self.vertices
    }

    /// Real edges.
    #[must_use]
    pub fn edges(&self) -> &[CachedEdge] {
        &self.edges
    }

    /// Edge by index.
    #[must_use]
    pub fn edge(&self, index: usize) -> Option<&CachedEdge> {
        self.edges.get(index)
    }

    /// Number of real edges touching a vertex.
    #[must_use]
    pub fn valence(&self, key: &VertexKey) -> usize {
        self.valence.get(key).copied().unwrap_or(0)
    }

    /// Valence of the vertex at `position` (quantized lookup).
    #[must_use]
    pub fn valence_at(&self, position: &Point3<f64>) -> usize {
        VertexKey::from_point(position).map_or(0, |key| self.valence(&key))
    }

    /// Indices of the real edges touching a vertex.
    #[must_use]
    pub fn edges_at(&self, key: &VertexKey) -> &[usize] {
        self.vertex_edges.get(key).map_or(&[], Vec::as_slice)
    }

    /// Number of coplanar diagonals dropped during the build.
    #[must_use]
    pub const fn discarded_diagonal_count(&self) -> usize {
        self.discarded_diagonals
    }

    /// Returns `true` if the mesh produced no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

fn weld_vertices(mesh: &MeshData) -> Vec<CachedVertex> {
    let mut seen: HashSet<VertexKey> = HashSet::new();
    let mut vertices = Vec::new();

    for index in 0..mesh.vertex_count() {
        let Ok(index) = u32::try_from(index) else {
            break;
        };
        let Some(position) = mesh.position(index) else {
            continue;
        };
        let Some(key) = VertexKey::from_point(&position) else {
            continue;
        };
        if seen.insert(key) {
            vertices.push(CachedVertex {
                position,
                normal: mesh.normal(index),
                key,
                source_index: index,
            });
        }
    }

    vertices
}

/// Normalize edge direction so v0 < v1.
#[inline]
fn normalize_edge(v0: u32, v1: u32) -> (u32, u32) {
    if v0 < v1 { (v0, v1) } else { (v1, v0) }
}

/// Memoized [`MeshGeometryCache`] entries keyed by element id.
///
/// Entries are built on first access and shared as [`Arc`]s; they are never
/// modified afterwards. Callers must [`clear`](Self::clear) or
/// [`invalidate`](Self::invalidate) when mesh buffers change.
#[derive(Debug, Clone)]
pub struct GeometryCache {
    entries: HashMap<u32, Arc<MeshGeometryCache>>,
    coplanar_threshold: f64,
}

impl Default for GeometryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryCache {
    /// Create an empty cache table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_coplanar_threshold(COPLANAR_THRESHOLD)
    }

    /// Create an empty cache table with a custom coplanarity threshold.
    #[must_use]
    pub fn with_coplanar_threshold(coplanar_threshold: f64) -> Self {
        Self {
            entries: HashMap::new(),
            coplanar_threshold,
        }
    }

    /// Return the cached topology for `mesh`, building it on first access.
    pub fn get_or_build(&mut self, mesh: &MeshData) -> Arc<MeshGeometryCache> {
        let threshold = self.coplanar_threshold;
        let entry = self
            .entries
            .entry(mesh.express_id)
            .or_insert_with(|| Arc::new(MeshGeometryCache::build_with_threshold(mesh, threshold)));
        Arc::clone(entry)
    }

    /// Cached topology for an element, if already built.
    #[must_use]
    pub fn get(&self, express_id: u32) -> Option<Arc<MeshGeometryCache>> {
        self.entries.get(&express_id).cloned()
    }

    /// Drop the entry for one element. Returns `true` if one existed.
    pub fn invalidate(&mut self, express_id: u32) -> bool {
        self.entries.remove(&express_id).is_some()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        let cleared = self.entries.len();
        self.entries.clear();
        debug!(cleared, "Cleared snap geometry cache");
    }

    /// Number of cached elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::mesh::{planar_quad, unit_cube};

    fn has_edge(cache: &MeshGeometryCache, a: [f64; 3], b: [f64; 3]) -> bool {
        let a = Point3::new(a[0], a[1], a[2]);
        let b = Point3::new(b[0], b[1], b[2]);
        cache
            .edges()
            .iter()
            .any(|e| (e.start == a && e.end == b) || (e.start == b && e.end == a))
    }

    #[test]
    fn quad_diagonal_is_discarded() {
        let cache = MeshGeometryCache::build(&planar_quad(1, 1.0));

        assert_eq!(cache.edges().len(), 4);
        assert_eq!(cache.discarded_diagonal_count(), 1);
        assert!(!has_edge(&cache, [0.0, 0.0, 0.0], [1.0, 1.0, 0.0]));
        assert!(cache.edges().iter().all(|e| e.kind == EdgeKind::Boundary));
    }

    #[test]
    fn cube_has_twelve_creases() {
        let cache = MeshGeometryCache::build(&unit_cube(1));

        assert_eq!(cache.vertices().len(), 8);
        assert_eq!(cache.edges().len(), 12);
        assert_eq!(cache.discarded_diagonal_count(), 6);
        assert!(cache.edges().iter().all(|e| e.kind == EdgeKind::Crease));
        assert!(cache.edges().iter().all(|e| (e.length() - 1.0).abs() < 1e-12));
        assert!(has_edge(&cache, [0.0, 0.0, 1.0], [1.0, 0.0, 1.0]));
        // Top face diagonal
        assert!(!has_edge(&cache, [0.0, 0.0, 1.0], [1.0, 1.0, 1.0]));
    }

    #[test]
    fn cube_corners_have_valence_three() {
        let cache = MeshGeometryCache::build(&unit_cube(1));
        for v in cache.vertices() {
            assert_eq!(cache.valence(&v.key), 3);
            assert_eq!(cache.edges_at(&v.key).len(), 3);
        }
        assert_eq!(cache.valence_at(&Point3::new(1.0, 1.0, 1.0)), 3);
        assert_eq!(cache.valence_at(&Point3::new(0.5, 0.5, 0.5)), 0);
    }

    #[test]
    fn edge_indices_are_positions() {
        let cache = MeshGeometryCache::build(&unit_cube(1));
        for (i, e) in cache.edges().iter().enumerate() {
            assert_eq!(e.index, i);
            assert_eq!(cache.edge(i), Some(e));
        }
        assert!(cache.edge(12).is_none());
    }

    #[test]
    fn boundary_edge_kept_next_to_fold() {
        // Two triangles folded 90 degrees along the shared edge 0-2
        let mesh = MeshData::new(
            1,
            vec![
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0, //
            ],
            Vec::new(),
            vec![0, 1, 2, 0, 2, 3],
        );
        let cache = MeshGeometryCache::build(&mesh);

        assert_eq!(cache.edges().len(), 5);
        assert_eq!(cache.discarded_diagonal_count(), 0);
        let crease: Vec<_> = cache
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::Crease)
            .collect();
        assert_eq!(crease.len(), 1);
        assert_eq!(crease[0].face_count, 2);
    }

    #[test]
    fn nearly_flat_fold_counts_as_coplanar() {
        // Second triangle tilted by ~5 degrees: |dot| ~ 0.996 > 0.98
        let tilt = 5_f32.to_radians();
        let mesh = MeshData::new(
            1,
            vec![
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                -tilt.cos(), 0.5, tilt.sin(), //
            ],
            Vec::new(),
            vec![0, 1, 2, 0, 2, 3],
        );
        let cache = MeshGeometryCache::build(&mesh);
        assert_eq!(cache.discarded_diagonal_count(), 1);
        assert_eq!(cache.edges().len(), 4);
    }

    #[test]
    fn split_vertices_are_welded_and_deduplicated() {
        // Two coplanar triangles that do not share buffer vertices
        let mesh = MeshData::new(
            1,
            vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, //
            ],
            Vec::new(),
            vec![0, 1, 2, 3, 4, 5],
        );
        let cache = MeshGeometryCache::build(&mesh);

        assert_eq!(cache.vertices().len(), 4);
        // Diagonal appears twice as a boundary but is kept once
        assert_eq!(cache.edges().len(), 5);
        assert_eq!(cache.valence_at(&Point3::origin()), 3);
    }

    #[test]
    fn near_duplicate_positions_weld() {
        let mesh = MeshData::new(
            1,
            vec![0.0, 0.0, 0.0, 0.000_01, 0.0, 0.0, 1.0, 0.0, 0.0],
            Vec::new(),
            Vec::new(),
        );
        let cache = MeshGeometryCache::build(&mesh);
        assert_eq!(cache.vertices().len(), 2);
        assert_eq!(cache.vertices()[0].source_index, 0);
    }

    #[test]
    fn empty_mesh_yields_empty_cache() {
        let cache = MeshGeometryCache::build(&MeshData::default());
        assert!(cache.is_empty());
        assert!(cache.edges().is_empty());
    }

    #[test]
    fn malformed_input_is_skipped() {
        let mesh = MeshData::new(
            9,
            vec![
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                f32::NAN, 1.0, 0.0, //
                0.0, 1.0, 0.0, //
            ],
            Vec::new(),
            vec![0, 1, 2, 0, 1, 3, 0, 1, 99, 0, 0, 1],
        );
        let cache = MeshGeometryCache::build(&mesh);

        assert_eq!(cache.express_id(), 9);
        assert_eq!(cache.vertices().len(), 3);
        // Only 0-1-3 and the degenerate 0-0-1 survive. The degenerate one gets
        // the +Z fallback normal, so 0-1 looks like a coplanar diagonal.
        assert!(!has_edge(&cache, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]));
        assert!(has_edge(&cache, [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]));
        assert!(has_edge(&cache, [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]));
    }

    #[test]
    fn ragged_tails_are_ignored() {
        let mut positions = vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
        ];
        positions.push(5.0);
        let mesh = MeshData::new(4, positions, Vec::new(), vec![0, 1, 2, 0]);
        let cache = MeshGeometryCache::build(&mesh);

        assert_eq!(cache.vertices().len(), 3);
        assert_eq!(cache.edges().len(), 3);
        assert!(cache.edges().iter().all(|e| e.kind == EdgeKind::Boundary));
    }

    #[test]
    fn store_memoizes_by_express_id() {
        let mut store = GeometryCache::new();
        let cube = unit_cube(7);

        let first = store.get_or_build(&cube);
        let second = store.get_or_build(&cube);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
        assert!(store.get(7).is_some());
        assert!(store.get(8).is_none());
    }

    #[test]
    fn store_invalidate_and_clear() {
        let mut store = GeometryCache::new();
        let _ = store.get_or_build(&unit_cube(1));
        let _ = store.get_or_build(&planar_quad(2, 1.0));
        assert_eq!(store.len(), 2);

        assert!(store.invalidate(1));
        assert!(!store.invalidate(1));
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn store_rebuilds_after_clear() {
        let mut store = GeometryCache::new();
        let before = store.get_or_build(&planar_quad(1, 1.0));
        store.clear();
        // Same id, different geometry: the new buffers are picked up
        let after = store.get_or_build(&unit_cube(1));
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.edges().len(), 12);
    }

    #[test]
    fn custom_threshold_keeps_diagonals() {
        let mut store = GeometryCache::with_coplanar_threshold(1.5);
        let cache = store.get_or_build(&planar_quad(1, 1.0));
        assert_eq!(cache.edges().len(), 5);
    }
}
