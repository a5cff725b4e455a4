//! Nearest-hit raycasting against mesh buffers.
//!
//! Interactive hosts normally answer this query with a BVH. [`MeshRaycaster`]
//! is the brute-force reference: every triangle of every mesh is tested with
//! the Möller–Trumbore algorithm. It is exact and adequate for small scenes,
//! tools and tests.

use nalgebra::{Point3, Vector3};

use crate::geometry::{Intersection, Ray, triangle_normal};
use crate::mesh::MeshData;

/// Source of the nearest ray/mesh intersection.
pub trait Raycaster {
    /// Nearest hit of `ray` against `meshes`, if any.
    ///
    /// `Intersection::mesh_index` indexes into `meshes`.
    fn intersect(&self, ray: &Ray, meshes: &[MeshData]) -> Option<Intersection>;
}

/// Brute-force [`Raycaster`].
///
/// # Example
///
/// ```
/// use mesh_snap::{MeshRaycaster, Ray, Raycaster, unit_cube};
/// use nalgebra::{Point3, Vector3};
///
/// let meshes = vec![unit_cube(1)];
/// let ray = Ray::new(Point3::new(0.5, 0.5, 5.0), -Vector3::z());
/// let hit = MeshRaycaster::default().intersect(&ray, &meshes).unwrap();
///
/// assert!((hit.distance - 4.0).abs() < 1e-9);
/// assert!((hit.normal.z - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshRaycaster {
    /// Parallelism and self-hit tolerance.
    pub epsilon: f64,
    /// Hits beyond this distance are ignored.
    pub max_distance: f64,
}

impl Default for MeshRaycaster {
    fn default() -> Self {
        Self {
            epsilon: 1e-9,
            max_distance: f64::INFINITY,
        }
    }
}

impl MeshRaycaster {
    /// Set the maximum hit distance.
    #[must_use]
    pub const fn max_distance(mut self, distance: f64) -> Self {
        self.max_distance = distance;
        self
    }
}

impl Raycaster for MeshRaycaster {
    fn intersect(&self, ray: &Ray, meshes: &[MeshData]) -> Option<Intersection> {
        let mut best: Option<Intersection> = None;

        for (mesh_index, mesh) in meshes.iter().enumerate() {
            for triangle_index in 0..mesh.triangle_count() {
                let Some(corners) = mesh.triangle_positions(triangle_index) else {
                    continue;
                };
                let Some(distance) = ray_triangle_intersect(ray, &corners, self.epsilon) else {
                    continue;
                };
                if distance > self.max_distance
                    || best.as_ref().is_some_and(|b| distance >= b.distance)
                {
                    continue;
                }

                let [a, b, c] = corners;
                let mut normal = triangle_normal(&a, &b, &c).unwrap_or_else(Vector3::z);
                if normal.dot(&ray.direction) > 0.0 {
                    normal = -normal;
                }

                best = Some(Intersection {
                    point: ray.point_at(distance),
                    normal,
                    mesh_index,
                    triangle_index,
                    distance,
                });
            }
        }

        best
    }
}

/// Ray/triangle intersection distance, or `None` on a miss.
///
/// Both windings are accepted; hits closer than `epsilon` are ignored.
#[must_use]
pub fn ray_triangle_intersect(ray: &Ray, corners: &[Point3<f64>; 3], epsilon: f64) -> Option<f64> {
    let [v0, v1, v2] = corners;
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(&edge2);
    let a = edge1.dot(&h);

    // Ray is parallel to triangle
    if a.abs() < epsilon {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(&h);

    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * ray.direction.dot(&q);

    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);

    if t > epsilon { Some(t) } else { None }
}
