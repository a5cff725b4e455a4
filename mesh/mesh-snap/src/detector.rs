//! Snap detection entry points.

use nalgebra::Point3;
use tracing::trace;

use crate::cache::GeometryCache;
use crate::candidates::{find_edge_candidates, find_face_candidates, find_vertex_candidates};
use crate::geometry::{Camera, Intersection, Ray, closest_point_on_ray_to_line};
use crate::magnetic::{
    EdgeLock, EdgeLockState, LockTransition, MagneticSnap, acquire_lock, maintain_lock,
};
use crate::mesh::MeshData;
use crate::options::{MagneticConfig, SnapOptions};
use crate::target::{SnapTarget, select_best_target};

/// Everything known about the cursor for one frame.
#[derive(Debug, Clone, Copy)]
pub struct SnapQuery<'a> {
    /// Cursor ray.
    pub ray: &'a Ray,
    /// Candidate meshes; `intersection.mesh_index` points into this slice.
    pub meshes: &'a [MeshData],
    /// Nearest hit from the raycaster, if the ray hit anything.
    pub intersection: Option<&'a Intersection>,
    /// Viewing camera.
    pub camera: &'a Camera,
    /// Viewport height in pixels.
    pub screen_height: f64,
}

impl<'a> SnapQuery<'a> {
    /// Bundle the per-frame inputs.
    #[must_use]
    pub const fn new(
        ray: &'a Ray,
        meshes: &'a [MeshData],
        intersection: Option<&'a Intersection>,
        camera: &'a Camera,
        screen_height: f64,
    ) -> Self {
        Self {
            ray,
            meshes,
            intersection,
            camera,
            screen_height,
        }
    }

    fn hit_mesh(&self) -> Option<(&'a Intersection, &'a MeshData)> {
        let hit = self.intersection?;
        Some((hit, self.meshes.get(hit.mesh_index)?))
    }
}

/// Finds snap targets and drives magnetic edge locking.
///
/// The detector owns the memoized per-element topology; the lock state is
/// owned by the caller and passed through [`detect_magnetic_snap`].
///
/// [`detect_magnetic_snap`]: SnapDetector::detect_magnetic_snap
///
/// # Example
///
/// ```
/// use mesh_snap::{
///     Camera, EdgeLockState, MeshRaycaster, Ray, Raycaster, SnapDetector, SnapOptions,
///     SnapQuery, SnapType, unit_cube,
/// };
/// use nalgebra::Point3;
///
/// let meshes = vec![unit_cube(1)];
/// let camera = Camera::from_degrees(Point3::new(0.5, -2.0, 3.0), 60.0).unwrap();
/// let ray = Ray::through(camera.position, Point3::new(0.5, 0.0001, 1.0));
/// let hit = MeshRaycaster::default().intersect(&ray, &meshes);
///
/// let mut detector = SnapDetector::new();
/// let query = SnapQuery::new(&ray, &meshes, hit.as_ref(), &camera, 800.0);
/// let options = SnapOptions::default();
/// let snap = detector.detect_magnetic_snap(&query, &EdgeLockState::Unlocked, &options);
///
/// let target = snap.snap_target.unwrap();
/// assert_eq!(target.snap_type, SnapType::EdgeMidpoint);
/// assert!(snap.edge_lock.is_locked());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SnapDetector {
    cache: GeometryCache,
    config: MagneticConfig,
}

impl SnapDetector {
    /// Create a detector with the default magnetism tuning.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with custom magnetism tuning.
    #[must_use]
    pub fn with_config(config: MagneticConfig) -> Self {
        Self {
            cache: GeometryCache::new(),
            config,
        }
    }

    /// Magnetism tuning in use.
    #[must_use]
    pub const fn config(&self) -> &MagneticConfig {
        &self.config
    }

    /// Memoized topology.
    #[must_use]
    pub const fn cache(&self) -> &GeometryCache {
        &self.cache
    }

    /// Number of elements with cached topology.
    #[must_use]
    pub fn cached_mesh_count(&self) -> usize {
        self.cache.len()
    }

    /// Forget all cached topology. Call whenever mesh buffers change.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Forget the cached topology of one element.
    pub fn invalidate(&mut self, express_id: u32) -> bool {
        self.cache.invalidate(express_id)
    }

    /// World-space snap radius at `distance` from the eye.
    ///
    /// Falls back to `options.snap_radius` when the pixel radius cannot be
    /// converted.
    #[must_use]
    pub fn base_radius(&self, query: &SnapQuery<'_>, distance: f64, options: &SnapOptions) -> f64 {
        query
            .camera
            .world_radius(options.screen_snap_radius, query.screen_height, distance)
            .unwrap_or(options.snap_radius)
    }

    /// Single-shot detection without magnetism.
    ///
    /// Looks only at the hit mesh. Returns `None` if nothing was hit or no
    /// enabled candidate kind is in range.
    pub fn detect_snap_target(
        &mut self,
        query: &SnapQuery<'_>,
        options: &SnapOptions,
    ) -> Option<SnapTarget> {
        let (hit, mesh) = query.hit_mesh()?;
        let radius = self.base_radius(query, hit.distance, options);
        let mut candidates = Vec::new();

        if options.snap_to_vertices || options.snap_to_edges {
            let cache = self.cache.get_or_build(mesh);
            if options.snap_to_vertices {
                candidates.extend(find_vertex_candidates(&cache, &hit.point, radius));
            }
            if options.snap_to_edges {
                candidates.extend(find_edge_candidates(
                    &cache,
                    &hit.point,
                    radius,
                    Some(hit.normal),
                ));
            }
        }
        if options.snap_to_faces {
            candidates.extend(find_face_candidates(mesh, hit, radius));
        }

        select_best_target(candidates)
    }

    /// Stateful detection with magnetic edge locking.
    ///
    /// `current_lock` must be the `edge_lock` returned by the previous call.
    /// Passing [`EdgeLockState::Unlocked`] every time still works but loses
    /// the stick-and-slide behaviour.
    pub fn detect_magnetic_snap(
        &mut self,
        query: &SnapQuery<'_>,
        current_lock: &EdgeLockState,
        options: &SnapOptions,
    ) -> MagneticSnap {
        let was_locked = current_lock.is_locked();

        if !options.snap_to_edges {
            let transition = if was_locked {
                trace!("Edge snapping disabled, releasing lock");
                LockTransition::Released
            } else {
                LockTransition::Idle
            };
            return MagneticSnap::unlocked(self.detect_snap_target(query, options), transition);
        }

        if let EdgeLockState::Locked(lock) = current_lock {
            if let Some((lock, target)) = self.maintain(query, lock, options) {
                return MagneticSnap {
                    snap_target: Some(target),
                    edge_lock: EdgeLockState::Locked(lock),
                    transition: LockTransition::Maintained,
                };
            }
        }

        let (acquired, lost) = if was_locked {
            (LockTransition::Reacquired, LockTransition::Released)
        } else {
            (LockTransition::Acquired, LockTransition::Idle)
        };

        let Some((hit, mesh)) = query.hit_mesh() else {
            return MagneticSnap::unlocked(None, lost);
        };

        let cache = self.cache.get_or_build(mesh);
        let radius = self.base_radius(query, hit.distance, options);
        if let Some((mut lock, target)) =
            acquire_lock(&cache, &hit.point, radius, Some(hit.normal), &self.config)
        {
            // Escaped and re-acquired the same edge: the lock was never lost
            if let Some(previous) = current_lock
                .lock()
                .filter(|p| p.express_id == lock.express_id && p.edge.index == lock.edge.index)
            {
                lock.strength = self.config.grow_strength(previous.strength);
                return MagneticSnap {
                    snap_target: Some(target),
                    edge_lock: EdgeLockState::Locked(lock),
                    transition: LockTransition::Maintained,
                };
            }
            return MagneticSnap {
                snap_target: Some(target),
                edge_lock: EdgeLockState::Locked(lock),
                transition: acquired,
            };
        }

        let fallback = options.snap_to_edges(false);
        MagneticSnap::unlocked(self.detect_snap_target(query, &fallback), lost)
    }

    fn maintain(
        &mut self,
        query: &SnapQuery<'_>,
        lock: &EdgeLock,
        options: &SnapOptions,
    ) -> Option<(EdgeLock, SnapTarget)> {
        let (cursor, distance, normal): (Point3<f64>, f64, _) = match query.intersection {
            Some(hit) => (hit.point, hit.distance, Some(hit.normal)),
            None => {
                // Off the model: slide along the edge where the ray passes closest
                let cursor =
                    closest_point_on_ray_to_line(query.ray, &lock.edge.start, &lock.edge.end)?;
                (cursor, (cursor - query.camera.position).norm(), None)
            }
        };

        let cache = query
            .meshes
            .iter()
            .find(|mesh| mesh.express_id == lock.express_id)
            .map(|mesh| self.cache.get_or_build(mesh));
        let radius = self.base_radius(query, distance, options);

        maintain_lock(
            lock,
            &cursor,
            radius,
            cache.as_deref(),
            normal,
            &self.config,
        )
    }
}
