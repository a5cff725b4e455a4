//! Magnetic edge locking.
//!
//! Once the cursor is attracted to an edge the snap target sticks to it and
//! slides along it, frame after frame, until the cursor moves far enough away
//! to escape. The lock is plain data owned by the caller: every call takes
//! the previous [`EdgeLockState`] and returns the next one.
//!
//! ```text
//!             edge within attraction radius
//!  Unlocked ─────────────────────────────────▶ Locked(edge, t, strength)
//!     ▲                                           │   ▲
//!     │      distance > escape threshold          │   │ distance <= escape threshold
//!     └───────────────────────────────────────────┘   └── (strength grows)
//! ```
//!
//! While locked, the position is clamped onto the edge segment. Near an end
//! whose vertex joins at least two real edges the target becomes that
//! vertex; near the middle it becomes the exact midpoint.

use nalgebra::{Point3, Vector3};
use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cache::{CachedEdge, MeshGeometryCache};
use crate::candidates::edges_within;
use crate::geometry::project_onto_segment;
use crate::options::MagneticConfig;
use crate::target::{SnapTarget, SnapType};

const EDGE_LOCK_CONFIDENCE: f64 = 0.999;

/// The edge a lock holds on to.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LockedEdge {
    /// First endpoint.
    pub start: Point3<f64>,
    /// Second endpoint.
    pub end: Point3<f64>,
    /// Index in the owning element's geometry cache.
    pub index: usize,
}

impl LockedEdge {
    /// Point at parametric position `t`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.start + (self.end - self.start) * t
    }

    /// Midpoint.
    #[must_use]
    pub fn midpoint(&self) -> Point3<f64> {
        self.point_at(0.5)
    }
}

impl From<&CachedEdge> for LockedEdge {
    fn from(edge: &CachedEdge) -> Self {
        Self {
            start: edge.start,
            end: edge.end,
            index: edge.index,
        }
    }
}

/// A corner the lock is currently resting on.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CornerInfo {
    /// Exact vertex position.
    pub position: Point3<f64>,
    /// Real edges meeting at the vertex.
    pub valence: usize,
    /// Whether the corner is the edge's start (otherwise its end).
    pub at_start: bool,
}

/// An active lock.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EdgeLock {
    /// Locked edge.
    pub edge: LockedEdge,
    /// Element owning the edge.
    pub express_id: u32,
    /// Parametric position of the cursor along the edge, in `[0, 1]`.
    pub t: f64,
    /// Grows while the lock is held; widens the escape threshold.
    pub strength: f64,
    /// Set while the position is snapped to a corner.
    pub corner: Option<CornerInfo>,
}

/// Lock state carried between calls.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EdgeLockState {
    /// No edge is held.
    #[default]
    Unlocked,
    /// An edge is held.
    Locked(EdgeLock),
}

impl EdgeLockState {
    /// Returns `true` if an edge is held.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::Locked(_))
    }

    /// The active lock, if any.
    #[must_use]
    pub const fn lock(&self) -> Option<&EdgeLock> {
        match self {
            Self::Locked(lock) => Some(lock),
            Self::Unlocked => None,
        }
    }

    /// Element of the held edge, if any.
    #[must_use]
    pub const fn express_id(&self) -> Option<u32> {
        match self {
            Self::Locked(lock) => Some(lock.express_id),
            Self::Unlocked => None,
        }
    }
}

/// What happened to the lock during one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LockTransition {
    /// Unlocked before and after.
    Idle,
    /// A new lock was taken.
    Acquired,
    /// The existing lock was kept. Escaping and re-acquiring the same edge
    /// in one call also counts, and the strength keeps growing.
    Maintained,
    /// The lock was dropped and nothing replaced it.
    Released,
    /// The lock was dropped and a different edge taken in the same call.
    Reacquired,
}

/// Result of a magnetic snap call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagneticSnap {
    /// Target to show, if any.
    pub snap_target: Option<SnapTarget>,
    /// State to hand back on the next call.
    pub edge_lock: EdgeLockState,
    /// Transition taken.
    pub transition: LockTransition,
}

impl MagneticSnap {
    /// Result without a lock.
    #[must_use]
    pub const fn unlocked(snap_target: Option<SnapTarget>, transition: LockTransition) -> Self {
        Self {
            snap_target,
            edge_lock: EdgeLockState::Unlocked,
            transition,
        }
    }
}

/// Corner at parametric position `t`, if `t` is near an end whose vertex has
/// enough real edges.
///
/// Without a cache there is no valence information and no corner.
#[must_use]
pub fn detect_corner(
    edge: &LockedEdge,
    t: f64,
    cache: Option<&MeshGeometryCache>,
    config: &MagneticConfig,
) -> Option<CornerInfo> {
    let cache = cache?;
    let (position, at_start) = if t <= config.corner_threshold {
        (edge.start, true)
    } else if t >= 1.0 - config.corner_threshold {
        (edge.end, false)
    } else {
        return None;
    };

    let valence = cache.valence_at(&position);
    (valence >= config.min_corner_valence).then_some(CornerInfo {
        position,
        valence,
        at_start,
    })
}

/// Confidence of a corner target: `min(1, 0.99 + valence * boost)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn corner_confidence(valence: usize, config: &MagneticConfig) -> f64 {
    (valence as f64)
        .mul_add(config.corner_confidence_boost, 0.99)
        .min(1.0)
}

/// Build the target for a lock positioned at `lock.t`.
///
/// `distance` is the cursor's distance from the edge and `reach` the radius it
/// is scored against. Corner and midpoint detection run here; the returned
/// lock carries the detected corner.
fn locked_target(
    mut lock: EdgeLock,
    distance: f64,
    reach: f64,
    cache: Option<&MeshGeometryCache>,
    normal: Option<Vector3<f64>>,
    config: &MagneticConfig,
) -> (EdgeLock, SnapTarget) {
    let edge = lock.edge;
    lock.corner = detect_corner(&edge, lock.t, cache, config);

    let target = if let Some(corner) = lock.corner {
        SnapTarget::new(
            SnapType::Vertex,
            corner.position,
            lock.express_id,
            corner_confidence(corner.valence, config),
        )
        .with_valence(corner.valence)
    } else if (lock.t - 0.5).abs() <= config.midpoint_threshold {
        SnapTarget::new(
            SnapType::EdgeMidpoint,
            edge.midpoint(),
            lock.express_id,
            config.midpoint_confidence,
        )
    } else {
        let score = if reach > 0.0 {
            1.0 - distance / reach
        } else {
            1.0
        };
        SnapTarget::new(
            SnapType::Edge,
            edge.point_at(lock.t),
            lock.express_id,
            EDGE_LOCK_CONFIDENCE * score,
        )
    };

    let target = target
        .with_normal(normal)
        .with_edge(edge.start, edge.end, edge.index);
    (lock, target)
}

/// Keep `lock` for a cursor at `cursor`, or return `None` if it escapes.
///
/// The cursor is projected onto the edge's infinite line; escape compares the
/// perpendicular distance against the strength-dependent threshold.
#[must_use]
pub fn maintain_lock(
    lock: &EdgeLock,
    cursor: &Point3<f64>,
    base_radius: f64,
    cache: Option<&MeshGeometryCache>,
    normal: Option<Vector3<f64>>,
    config: &MagneticConfig,
) -> Option<(EdgeLock, SnapTarget)> {
    let projection = project_onto_segment(cursor, &lock.edge.start, &lock.edge.end);
    let threshold = config.escape_threshold(base_radius, lock.strength);

    if projection.line_distance.is_nan() || projection.line_distance > threshold {
        trace!(
            express_id = lock.express_id,
            edge = lock.edge.index,
            distance = projection.line_distance,
            threshold,
            "Edge lock released"
        );
        return None;
    }

    let next = EdgeLock {
        t: projection.t,
        strength: config.grow_strength(lock.strength),
        ..*lock
    };
    let (next, target) = locked_target(
        next,
        projection.line_distance,
        threshold,
        cache,
        normal,
        config,
    );
    trace!(
        express_id = next.express_id,
        edge = next.edge.index,
        t = next.t,
        strength = next.strength,
        corner = next.corner.is_some(),
        "Edge lock maintained"
    );
    Some((next, target))
}

/// Take a new lock on the closest visible edge within the attraction radius.
#[must_use]
pub fn acquire_lock(
    cache: &MeshGeometryCache,
    cursor: &Point3<f64>,
    base_radius: f64,
    normal: Option<Vector3<f64>>,
    config: &MagneticConfig,
) -> Option<(EdgeLock, SnapTarget)> {
    let reach = base_radius * config.edge_attraction_radius;
    let nearest = edges_within(cache, cursor, reach, normal, config.visibility_cosine)
        .into_iter()
        .next()?;

    let lock = EdgeLock {
        edge: LockedEdge::from(&nearest.edge),
        express_id: cache.express_id(),
        t: nearest.projection.t,
        strength: 0.0,
        corner: None,
    };
    let (lock, target) = locked_target(
        lock,
        nearest.projection.distance,
        reach,
        Some(cache),
        normal,
        config,
    );
    trace!(
        express_id = lock.express_id,
        edge = lock.edge.index,
        t = lock.t,
        snap_type = %target.snap_type,
        "Edge lock acquired"
    );
    Some((lock, target))
}
