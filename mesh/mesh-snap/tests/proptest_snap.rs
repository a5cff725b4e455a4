//! Property-based tests for snap detection.
//!
//! These tests use proptest to generate random buffers, grids and cursor
//! positions and verify invariants that must hold for any input.
//!
//! Run with: cargo test -p mesh-snap -- proptest

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]

use mesh_snap::{
    EdgeKind, EdgeLock, LockedEdge, MagneticConfig, MeshData, MeshGeometryCache, Point3,
    SnapTarget, SnapType, maintain_lock, project_onto_segment, screen_to_world_radius,
    select_best_target, unit_cube,
};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Arbitrary, possibly malformed, mesh buffers.
fn arb_buffers() -> impl Strategy<Value = MeshData> {
    (
        prop::collection::vec(any::<f32>(), 0..60),
        prop::collection::vec(-10.0f32..10.0, 0..60),
        prop::collection::vec(0u32..25, 0..60),
    )
        .prop_map(|(positions, normals, indices)| MeshData::new(9, positions, normals, indices))
}

/// Well-formed buffers with finite coordinates and in-range indices.
fn arb_finite_mesh() -> impl Strategy<Value = MeshData> {
    (3usize..16).prop_flat_map(|vertex_count| {
        let positions = prop::collection::vec(-5.0f32..5.0, vertex_count * 3);
        let indices = prop::collection::vec(0..vertex_count as u32, 3..48)
            .prop_map(|mut i| {
                i.truncate(i.len() / 3 * 3);
                i
            });
        (positions, indices)
            .prop_map(|(positions, indices)| MeshData::new(4, positions, Vec::new(), indices))
    })
}

fn arb_snap_type() -> impl Strategy<Value = SnapType> {
    prop_oneof![
        Just(SnapType::Vertex),
        Just(SnapType::EdgeMidpoint),
        Just(SnapType::Edge),
        Just(SnapType::FaceCenter),
        Just(SnapType::Face),
    ]
}

fn arb_target() -> impl Strategy<Value = SnapTarget> {
    (arb_snap_type(), 0.0f64..1.0).prop_map(|(snap_type, confidence)| {
        SnapTarget::new(snap_type, Point3::origin(), 1, confidence)
    })
}

/// Flat `cols x rows` grid in the XY plane, two triangles per cell.
fn grid(cols: u32, rows: u32, spacing: f32) -> MeshData {
    let mut positions = Vec::new();
    for j in 0..=rows {
        for i in 0..=cols {
            positions.extend([i as f32 * spacing, j as f32 * spacing, 0.0]);
        }
    }

    let stride = cols + 1;
    let mut indices = Vec::new();
    for j in 0..rows {
        for i in 0..cols {
            let a = j * stride + i;
            let b = a + 1;
            let c = a + stride + 1;
            let d = a + stride;
            indices.extend([a, b, c, a, c, d]);
        }
    }

    MeshData::new(2, positions, Vec::new(), indices)
}

fn top_front_lock(cache: &MeshGeometryCache, strength: f64) -> EdgeLock {
    let edge = cache
        .edges()
        .iter()
        .find(|e| e.start.y == 0.0 && e.end.y == 0.0 && e.start.z == 1.0 && e.end.z == 1.0)
        .unwrap();
    EdgeLock {
        edge: LockedEdge::from(edge),
        express_id: cache.express_id(),
        t: 0.5,
        strength,
        corner: None,
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Building topology tolerates any buffer contents.
    #[test]
    fn proptest_cache_build_never_panics(mesh in arb_buffers()) {
        let cache = MeshGeometryCache::build(&mesh);

        let mut valence_total = 0;
        for vertex in cache.vertices() {
            prop_assert!(vertex.position.iter().all(|c| c.is_finite()));
            valence_total += cache.valence(&vertex.key);
        }
        for edge in cache.edges() {
            prop_assert_ne!(edge.start_key, edge.end_key);
            prop_assert!(edge.face_count >= 1);
        }
        prop_assert_eq!(valence_total, cache.edges().len() * 2);
    }

    /// Kept edges are unique and their endpoints are welded vertices.
    #[test]
    fn proptest_edges_are_unique(mesh in arb_finite_mesh()) {
        let cache = MeshGeometryCache::build(&mesh);

        let mut pairs: Vec<_> = cache
            .edges()
            .iter()
            .map(|e| {
                if e.start_key < e.end_key {
                    (e.start_key, e.end_key)
                } else {
                    (e.end_key, e.start_key)
                }
            })
            .collect();
        let total = pairs.len();
        pairs.sort();
        pairs.dedup();
        prop_assert_eq!(pairs.len(), total);

        for (i, edge) in cache.edges().iter().enumerate() {
            prop_assert_eq!(edge.index, i);
            prop_assert!(cache.edges_at(&edge.start_key).contains(&i));
            prop_assert!(cache.edges_at(&edge.end_key).contains(&i));
        }
    }

    /// A flat grid has no creases: only its outline survives.
    #[test]
    fn proptest_planar_grid_outline(cols in 1u32..6, rows in 1u32..6, spacing in 0.1f32..10.0) {
        let cache = MeshGeometryCache::build(&grid(cols, rows, spacing));

        prop_assert_eq!(cache.edges().len() as u32, 2 * (cols + rows));
        prop_assert!(cache.edges().iter().all(|e| e.kind == EdgeKind::Boundary));

        let interior = cols * rows + cols * (rows - 1) + rows * (cols - 1);
        prop_assert_eq!(cache.discarded_diagonal_count() as u32, interior);
    }

    /// Type priority dominates confidence.
    #[test]
    fn proptest_selection_honors_priority(targets in prop::collection::vec(arb_target(), 1..20)) {
        let best = select_best_target(targets.clone()).unwrap();
        let top = targets.iter().map(|t| t.snap_type.priority()).max().unwrap();
        prop_assert_eq!(best.snap_type.priority(), top);

        let top_confidence = targets
            .iter()
            .filter(|t| t.snap_type.priority() == top)
            .map(|t| t.confidence)
            .fold(f64::NEG_INFINITY, f64::max);
        prop_assert!((best.confidence - top_confidence).abs() < 1e-12);
    }

    /// A maintained lock always reports a point on the locked segment.
    #[test]
    fn proptest_locked_position_on_segment(
        x in -2.0f64..3.0,
        y in -1.0f64..1.0,
        z in 0.0f64..2.0,
        strength in 0.0f64..1.0,
    ) {
        let cache = MeshGeometryCache::build(&unit_cube(1));
        let config = MagneticConfig::default();
        let lock = top_front_lock(&cache, strength);
        let cursor = Point3::new(x, y, z);

        let held = maintain_lock(&lock, &cursor, 0.1, Some(&cache), None, &config);
        if let Some((next, target)) = held {
            let on_edge = project_onto_segment(&target.position, &lock.edge.start, &lock.edge.end);
            prop_assert!(on_edge.distance < 1e-9);
            prop_assert!((0.0..=1.0).contains(&next.t));
            prop_assert!(next.strength >= lock.strength);
            prop_assert!(next.strength <= config.max_lock_strength);
            prop_assert!((0.0..=1.0).contains(&target.confidence));
            prop_assert!(matches!(
                target.snap_type,
                SnapType::Edge | SnapType::EdgeMidpoint | SnapType::Vertex
            ));
        }
    }

    /// A stronger lock never escapes where a weaker one holds.
    #[test]
    fn proptest_strength_only_widens(
        x in 0.0f64..1.0,
        y in 0.0f64..0.5,
        weak in 0.0f64..0.5,
        extra in 0.0f64..0.5,
    ) {
        let cache = MeshGeometryCache::build(&unit_cube(1));
        let config = MagneticConfig::default();
        let cursor = Point3::new(x, y, 1.0);

        let weak_lock = top_front_lock(&cache, weak);
        let strong_lock = top_front_lock(&cache, weak + extra);
        let weak_hold = maintain_lock(&weak_lock, &cursor, 0.1, Some(&cache), None, &config);
        let strong_hold = maintain_lock(&strong_lock, &cursor, 0.1, Some(&cache), None, &config);
        prop_assert!(weak_hold.is_none() || strong_hold.is_some());
    }

    /// World radius grows linearly with distance.
    #[test]
    fn proptest_world_radius_linear(
        pixels in 1.0f64..100.0,
        height in 100.0f64..4000.0,
        distance in 0.01f64..1000.0,
        fov in 0.1f64..3.0,
    ) {
        let near = screen_to_world_radius(pixels, height, distance, fov).unwrap();
        let far = screen_to_world_radius(pixels, height, distance * 2.0, fov).unwrap();
        prop_assert!(near > 0.0);
        prop_assert!((far - 2.0 * near).abs() <= 1e-9 * far.max(1.0));
    }
}
