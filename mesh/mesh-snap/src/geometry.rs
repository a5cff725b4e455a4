//! Rays, hits, cameras and the small amount of line geometry snapping needs.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{SnapError, SnapResult};

/// A ray with a unit-length direction.
///
/// # Example
///
/// ```
/// use mesh_snap::Ray;
/// use nalgebra::{Point3, Vector3};
///
/// let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, -4.0));
/// assert!((ray.direction.norm() - 1.0).abs() < 1e-12);
///
/// let p = ray.point_at(2.0);
/// assert!((p.z + 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ray {
    /// Ray origin, usually the camera position.
    pub origin: Point3<f64>,
    /// Normalized direction. Zero if constructed from a zero vector.
    pub direction: Vector3<f64>,
}

impl Ray {
    /// Create a ray, normalizing the direction.
    #[must_use]
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        let norm = direction.norm();
        let direction = if norm < f64::EPSILON {
            Vector3::zeros()
        } else {
            direction / norm
        };
        Self { origin, direction }
    }

    /// Create a ray from `origin` through `target`.
    #[must_use]
    pub fn through(origin: Point3<f64>, target: Point3<f64>) -> Self {
        Self::new(origin, target - origin)
    }

    /// Point at distance `t` along the ray.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }
}

/// Nearest ray/surface hit, supplied by the raycaster every call.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Intersection {
    /// Hit point in world space.
    pub point: Point3<f64>,
    /// Surface normal at the hit, facing the viewer.
    pub normal: Vector3<f64>,
    /// Index of the hit mesh in the mesh list passed alongside.
    pub mesh_index: usize,
    /// Index of the hit triangle within that mesh.
    pub triangle_index: usize,
    /// Distance from the ray origin to the hit point.
    pub distance: f64,
}

/// The camera parameters the snap radius depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Camera {
    /// Eye position in world space.
    pub position: Point3<f64>,
    /// Vertical field of view in radians.
    pub fov: f64,
}

impl Camera {
    /// Create a camera with a vertical field of view in radians.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::InvalidCamera`] if `fov` is not in `(0, π)` or the
    /// position is not finite.
    pub fn new(position: Point3<f64>, fov: f64) -> SnapResult<Self> {
        if !(fov.is_finite() && fov > 0.0 && fov < std::f64::consts::PI) {
            return Err(SnapError::invalid_camera(format!(
                "field of view {fov} rad is outside (0, pi)"
            )));
        }
        if !position.iter().all(|c| c.is_finite()) {
            return Err(SnapError::invalid_camera("position is not finite"));
        }
        Ok(Self { position, fov })
    }

    /// Create a camera with a vertical field of view in degrees.
    ///
    /// # Errors
    ///
    /// Same as [`Camera::new`].
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_snap::Camera;
    /// use nalgebra::Point3;
    ///
    /// let camera = Camera::from_degrees(Point3::new(0.0, 0.0, 10.0), 60.0).unwrap();
    /// assert!((camera.fov - std::f64::consts::FRAC_PI_3).abs() < 1e-12);
    /// ```
    pub fn from_degrees(position: Point3<f64>, fov_degrees: f64) -> SnapResult<Self> {
        Self::new(position, fov_degrees.to_radians())
    }

    /// Convert a pixel tolerance to world units at `distance` from the eye.
    ///
    /// See [`screen_to_world_radius`].
    #[must_use]
    pub fn world_radius(
        &self,
        screen_pixels: f64,
        screen_height: f64,
        distance: f64,
    ) -> Option<f64> {
        screen_to_world_radius(screen_pixels, screen_height, distance, self.fov)
    }
}

/// Convert a screen-space pixel radius to a world-space radius.
///
/// `radius = (pixels / height) * (2 * distance * tan(fov / 2))`
///
/// The visible frustum height at `distance` is divided evenly among the
/// screen's pixel rows, so the apparent tolerance stays constant while
/// zooming. Only the screen height is used; the aspect ratio is ignored.
///
/// Returns `None` if any input makes the conversion meaningless
/// (non-positive height, pixels or distance, or non-finite values).
///
/// # Example
///
/// ```
/// use mesh_snap::screen_to_world_radius;
///
/// let fov = 90_f64.to_radians();
/// let r = screen_to_world_radius(10.0, 1000.0, 5.0, fov).unwrap();
/// // Frustum height at distance 5 with 90° fov is 10 world units
/// assert!((r - 0.1).abs() < 1e-9);
/// ```
#[must_use]
pub fn screen_to_world_radius(
    screen_pixels: f64,
    screen_height: f64,
    distance: f64,
    fov: f64,
) -> Option<f64> {
    let usable = screen_pixels.is_finite()
        && screen_height.is_finite()
        && distance.is_finite()
        && fov.is_finite()
        && screen_pixels > 0.0
        && screen_height > 0.0
        && distance > 0.0
        && fov > 0.0;
    if !usable {
        return None;
    }
    let frustum_height = 2.0 * distance * (fov / 2.0).tan();
    Some((screen_pixels / screen_height) * frustum_height)
}

/// Projection of a point onto a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Closest point on the segment.
    pub point: Point3<f64>,
    /// Parametric position of `point`, clamped to `[0, 1]`.
    pub t: f64,
    /// Perpendicular distance to the segment's infinite line.
    pub line_distance: f64,
    /// Distance to `point`.
    pub distance: f64,
}

/// Project `p` onto the segment `a`–`b`.
///
/// A degenerate segment projects everything onto `a`.
#[must_use]
pub fn project_onto_segment(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
) -> SegmentProjection {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < f64::EPSILON * f64::EPSILON {
        let distance = (p - a).norm();
        return SegmentProjection {
            point: *a,
            t: 0.0,
            line_distance: distance,
            distance,
        };
    }

    let raw_t = (p - a).dot(&ab) / len_sq;
    let line_point = a + ab * raw_t;
    let t = raw_t.clamp(0.0, 1.0);
    let point = a + ab * t;

    SegmentProjection {
        point,
        t,
        line_distance: (p - line_point).norm(),
        distance: (p - point).norm(),
    }
}

/// Point on `ray` closest to the infinite line through `a` and `b`.
///
/// Returns `None` if the ray is (nearly) parallel to the line or the line is
/// degenerate. Points behind the ray origin are clamped to the origin.
#[must_use]
pub fn closest_point_on_ray_to_line(
    ray: &Ray,
    a: &Point3<f64>,
    b: &Point3<f64>,
) -> Option<Point3<f64>> {
    let d = ray.direction;
    let e = b - a;
    let w0 = ray.origin - a;

    let dd = d.dot(&d);
    let de = d.dot(&e);
    let ee = e.dot(&e);
    let dw = d.dot(&w0);
    let ew = e.dot(&w0);

    let denom = dd.mul_add(ee, -(de * de));
    if ee < f64::EPSILON || denom <= 1e-12 * dd * ee {
        return None;
    }

    let s = de.mul_add(ew, -(ee * dw)) / denom;
    Some(ray.point_at(s.max(0.0)))
}

/// Unit normal of a triangle, or `None` if it is degenerate.
#[must_use]
pub fn triangle_normal(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Vector3<f64>> {
    let n = (b - a).cross(&(c - a));
    let len = n.norm();
    if len < 1e-12 { None } else { Some(n / len) }
}
