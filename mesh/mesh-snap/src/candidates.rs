//! Scored vertex, edge and face candidates around a world point.
//!
//! Capture radii are multiples of the base snap radius:
//!
//! | Kind | Radius | Confidence |
//! |------|--------|------------|
//! | vertex | `0.2 r` | `0.95 - d / 0.2 r` |
//! | edge | `3 r` | `0.999 (1 - d / 3 r)` |
//! | edge midpoint | `0.33 r` around the midpoint | up to `1.0` |
//! | face | always | `0.5` |
//! | face center | `r` | `1 - d / r` |
//!
//! Vertices get a tight radius so they only win when the cursor is right on
//! them; edges are the forgiving default.

use nalgebra::{Point3, Vector3};

use crate::cache::{CachedEdge, MeshGeometryCache};
use crate::geometry::{Intersection, SegmentProjection, project_onto_segment};
use crate::mesh::MeshData;
use crate::target::{SnapTarget, SnapType};

/// Vertex capture radius as a fraction of the base radius.
pub const VERTEX_RADIUS_FACTOR: f64 = 0.2;
/// Edge capture radius as a multiple of the base radius.
pub const EDGE_RADIUS_FACTOR: f64 = 3.0;
/// Midpoint capture radius as a fraction of the base radius.
pub const MIDPOINT_RADIUS_FACTOR: f64 = 0.33;
/// Confidence of the plain face candidate.
pub const FACE_CONFIDENCE: f64 = 0.5;

const VERTEX_BASE_CONFIDENCE: f64 = 0.95;
const EDGE_BASE_CONFIDENCE: f64 = 0.999;

/// An edge near a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeProximity {
    /// The edge.
    pub edge: CachedEdge,
    /// Projection of the query point onto it.
    pub projection: SegmentProjection,
}

/// Welded vertices within `0.2 * radius` of `point`.
#[must_use]
pub fn find_vertex_candidates(
    cache: &MeshGeometryCache,
    point: &Point3<f64>,
    radius: f64,
) -> Vec<SnapTarget> {
    let capture = radius * VERTEX_RADIUS_FACTOR;
    if capture <= 0.0 {
        return Vec::new();
    }

    cache
        .vertices()
        .iter()
        .filter_map(|vertex| {
            let distance = (vertex.position - point).norm();
            (distance <= capture).then(|| {
                SnapTarget::new(
                    SnapType::Vertex,
                    vertex.position,
                    cache.express_id(),
                    VERTEX_BASE_CONFIDENCE - distance / capture,
                )
                .with_normal(vertex.normal)
                .with_valence(cache.valence(&vertex.key))
            })
        })
        .collect()
}

/// Edge points within `3 * radius` of `point`, plus midpoint candidates.
///
/// `normal` is copied onto the targets; it does not filter.
#[must_use]
pub fn find_edge_candidates(
    cache: &MeshGeometryCache,
    point: &Point3<f64>,
    radius: f64,
    normal: Option<Vector3<f64>>,
) -> Vec<SnapTarget> {
    let capture = radius * EDGE_RADIUS_FACTOR;
    let midpoint_capture = radius * MIDPOINT_RADIUS_FACTOR;
    let mut targets = Vec::new();

    for hit in edges_within(cache, point, capture, None, -1.0) {
        let edge = hit.edge;
        let distance = hit.projection.distance;
        targets.push(
            SnapTarget::new(
                SnapType::Edge,
                hit.projection.point,
                cache.express_id(),
                EDGE_BASE_CONFIDENCE * (1.0 - distance / capture),
            )
            .with_normal(normal)
            .with_edge(edge.start, edge.end, edge.index),
        );

        let midpoint = edge.midpoint();
        let from_midpoint = (hit.projection.point - midpoint).norm();
        if midpoint_capture > 0.0 && from_midpoint <= midpoint_capture {
            targets.push(
                SnapTarget::new(
                    SnapType::EdgeMidpoint,
                    midpoint,
                    cache.express_id(),
                    1.0 - 0.5 * (from_midpoint / midpoint_capture),
                )
                .with_normal(normal)
                .with_edge(edge.start, edge.end, edge.index),
            );
        }
    }

    targets
}

/// The hit triangle and, if close enough, its centroid.
#[must_use]
pub fn find_face_candidates(mesh: &MeshData, hit: &Intersection, radius: f64) -> Vec<SnapTarget> {
    let mut targets = vec![
        SnapTarget::new(SnapType::Face, hit.point, mesh.express_id, FACE_CONFIDENCE)
            .with_normal(Some(hit.normal))
            .with_face(hit.triangle_index),
    ];

    if let Some([a, b, c]) = mesh.triangle_positions(hit.triangle_index) {
        let centroid = Point3::from((a.coords + b.coords + c.coords) / 3.0);
        let distance = (centroid - hit.point).norm();
        if radius > 0.0 && distance <= radius {
            targets.push(
                SnapTarget::new(
                    SnapType::FaceCenter,
                    centroid,
                    mesh.express_id,
                    1.0 - distance / radius,
                )
                .with_normal(Some(hit.normal))
                .with_face(hit.triangle_index),
            );
        }
    }

    targets
}

/// Edges whose closest point lies within `max_distance` of `point`, nearest
/// first.
///
/// With a `surface_normal`, edges whose direction from `point` makes a cosine
/// below `visibility_cosine` with the normal are skipped: they lie behind the
/// surface the cursor is on.
#[must_use]
pub fn edges_within(
    cache: &MeshGeometryCache,
    point: &Point3<f64>,
    max_distance: f64,
    surface_normal: Option<Vector3<f64>>,
    visibility_cosine: f64,
) -> Vec<EdgeProximity> {
    if max_distance <= 0.0 {
        return Vec::new();
    }

    let mut hits: Vec<EdgeProximity> = cache
        .edges()
        .iter()
        .filter_map(|edge| {
            let projection = project_onto_segment(point, &edge.start, &edge.end);
            if projection.distance > max_distance {
                return None;
            }
            if surface_normal
                .is_some_and(|n| !is_visible(point, &projection.point, &n, visibility_cosine))
            {
                return None;
            }
            Some(EdgeProximity {
                edge: *edge,
                projection,
            })
        })
        .collect();

    hits.sort_by(|a, b| a.projection.distance.total_cmp(&b.projection.distance));
    hits
}

fn is_visible(
    from: &Point3<f64>,
    to: &Point3<f64>,
    normal: &Vector3<f64>,
    visibility_cosine: f64,
) -> bool {
    let offset = to - from;
    let len = offset.norm();
    let normal_len = normal.norm();
    if len < 1e-9 || normal_len < f64::EPSILON {
        return true;
    }
    offset.dot(normal) / (len * normal_len) >= visibility_cosine
}
