//! Interactive raycast-and-snap engine for measurement tools.
//!
//! Given the nearest ray hit under the cursor, this crate proposes a precise
//! snap target on the hit mesh: a corner, an edge, an edge midpoint, the hit
//! face, or the face centroid. Measurement and annotation tools bind to it.
//!
//! # Features
//!
//! - **Topology recovery**: Welded vertices, real edges and vertex valence
//!   rebuilt from flat triangle buffers, with triangulation diagonals removed
//! - **Candidate scoring**: Distance-based confidence with per-kind capture radii
//! - **Fixed priority**: `vertex > edge_midpoint > edge > face_center > face`
//! - **Magnetic edges**: Stick-and-slide edge locking with corner and midpoint
//!   detection, released when the cursor escapes
//! - **Zoom-independent tolerance**: Pixel radius converted to world units at
//!   the hit distance
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It can be used in:
//! - Web applications (WASM)
//! - Desktop viewers
//! - CLI tools
//! - Servers
//!
//! The raycaster that finds the initial hit is a collaborator: hosts plug in
//! their BVH through [`Raycaster`]; [`MeshRaycaster`] is a brute-force
//! implementation.
//!
//! # Example
//!
//! ```
//! use mesh_snap::{
//!     Camera, EdgeLockState, MeshRaycaster, Ray, Raycaster, SnapDetector, SnapOptions,
//!     SnapQuery, SnapType, unit_cube,
//! };
//! use nalgebra::Point3;
//!
//! let meshes = vec![unit_cube(1)];
//! let camera = Camera::from_degrees(Point3::new(0.5, 0.5, 5.0), 60.0).unwrap();
//! let raycaster = MeshRaycaster::default();
//! let options = SnapOptions::default();
//! let mut detector = SnapDetector::new();
//! let mut lock = EdgeLockState::Unlocked;
//!
//! // Cursor slides along the top-front edge of the cube
//! for x in [0.3, 0.35, 0.4] {
//!     let ray = Ray::through(camera.position, Point3::new(x, 0.01, 1.0));
//!     let hit = raycaster.intersect(&ray, &meshes);
//!     let query = SnapQuery::new(&ray, &meshes, hit.as_ref(), &camera, 800.0);
//!
//!     let snap = detector.detect_magnetic_snap(&query, &lock, &options);
//!     let target = snap.snap_target.unwrap();
//!     assert_eq!(target.snap_type, SnapType::Edge);
//!     assert!(target.position.y.abs() < 1e-12);
//!     lock = snap.edge_lock;
//! }
//! assert!(lock.is_locked());
//! ```
//!
//! # Threading
//!
//! Everything runs synchronously on the calling thread. [`SnapDetector`]
//! needs `&mut self` only to populate its topology cache; cached entries are
//! immutable and shared as `Arc`s.

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod cache;
mod candidates;
mod detector;
mod error;
mod geometry;
mod magnetic;
mod mesh;
mod options;
mod raycast;
mod target;

// Re-export main types and functions
pub use cache::{
    COPLANAR_THRESHOLD, CachedEdge, CachedVertex, EdgeKind, GeometryCache, MeshGeometryCache,
    QUANTIZE_SCALE, VertexKey,
};
pub use candidates::{
    EDGE_RADIUS_FACTOR, EdgeProximity, FACE_CONFIDENCE, MIDPOINT_RADIUS_FACTOR,
    VERTEX_RADIUS_FACTOR, edges_within, find_edge_candidates, find_face_candidates,
    find_vertex_candidates,
};
pub use detector::{SnapDetector, SnapQuery};
pub use error::{SnapError, SnapResult};
pub use geometry::{
    Camera, Intersection, Ray, SegmentProjection, closest_point_on_ray_to_line,
    project_onto_segment, screen_to_world_radius, triangle_normal,
};
pub use magnetic::{
    CornerInfo, EdgeLock, EdgeLockState, LockTransition, LockedEdge, MagneticSnap,
    acquire_lock, corner_confidence, detect_corner, maintain_lock,
};
pub use mesh::{MeshData, planar_quad, unit_cube};
pub use options::{MagneticConfig, SnapOptions};
pub use raycast::{MeshRaycaster, Raycaster, ray_triangle_intersect};
pub use target::{SnapMetadata, SnapTarget, SnapType, select_best_target};

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
