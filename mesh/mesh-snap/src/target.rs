//! Snap targets and the fixed-priority selector.

use std::cmp::Ordering;
use std::fmt;

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of geometry a snap target sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SnapType {
    /// A mesh corner.
    Vertex,
    /// A point on a real edge.
    Edge,
    /// The exact middle of a real edge.
    EdgeMidpoint,
    /// A point on the hit triangle.
    Face,
    /// The centroid of the hit triangle.
    FaceCenter,
}

impl SnapType {
    /// Selection rank. Higher wins regardless of confidence.
    ///
    /// `Vertex > EdgeMidpoint > Edge > FaceCenter > Face`
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Vertex => 5,
            Self::EdgeMidpoint => 4,
            Self::Edge => 3,
            Self::FaceCenter => 2,
            Self::Face => 1,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Edge => "edge",
            Self::EdgeMidpoint => "edge_midpoint",
            Self::Face => "face",
            Self::FaceCenter => "face_center",
        }
    }
}

impl fmt::Display for SnapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional context attached to a target.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SnapMetadata {
    /// Endpoints of the edge the target belongs to.
    pub edge: Option<[Point3<f64>; 2]>,
    /// Index of that edge in the element's geometry cache.
    pub edge_index: Option<usize>,
    /// Index of the triangle the target belongs to.
    pub face_index: Option<usize>,
    /// Number of real edges meeting at a vertex target.
    pub vertex_valence: Option<usize>,
}

/// A precise point a measurement tool can bind to.
///
/// # Example
///
/// ```
/// use mesh_snap::{SnapTarget, SnapType};
/// use nalgebra::Point3;
///
/// let target = SnapTarget::new(SnapType::Vertex, Point3::origin(), 12, 1.4);
/// assert_eq!(target.confidence, 1.0); // clamped
/// assert_eq!(target.express_id, 12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SnapTarget {
    /// Kind of geometry.
    pub snap_type: SnapType,
    /// World position.
    pub position: Point3<f64>,
    /// Surface normal, when known.
    pub normal: Option<Vector3<f64>>,
    /// Owning element.
    pub express_id: u32,
    /// Score in `[0, 1]`.
    pub confidence: f64,
    /// Edge/face context.
    pub metadata: SnapMetadata,
}

impl SnapTarget {
    /// Create a target. Confidence is clamped to `[0, 1]`; NaN becomes 0.
    #[must_use]
    pub fn new(
        snap_type: SnapType,
        position: Point3<f64>,
        express_id: u32,
        confidence: f64,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            snap_type,
            position,
            normal: None,
            express_id,
            confidence,
            metadata: SnapMetadata::default(),
        }
    }

    /// Attach a surface normal.
    #[must_use]
    pub const fn with_normal(mut self, normal: Option<Vector3<f64>>) -> Self {
        self.normal = normal;
        self
    }

    /// Attach edge endpoints and index.
    #[must_use]
    pub const fn with_edge(mut self, start: Point3<f64>, end: Point3<f64>, index: usize) -> Self {
        self.metadata.edge = Some([start, end]);
        self.metadata.edge_index = Some(index);
        self
    }

    /// Attach a triangle index.
    #[must_use]
    pub const fn with_face(mut self, face_index: usize) -> Self {
        self.metadata.face_index = Some(face_index);
        self
    }

    /// Attach the valence of a vertex target.
    #[must_use]
    pub const fn with_valence(mut self, valence: usize) -> Self {
        self.metadata.vertex_valence = Some(valence);
        self
    }

    /// Order by type priority, then confidence.
    #[must_use]
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.snap_type
            .priority()
            .cmp(&other.snap_type.priority())
            .then_with(|| self.confidence.total_cmp(&other.confidence))
    }
}

/// Pick the best candidate: highest type priority, ties broken by confidence.
///
/// A corner always beats a nearby edge point, however confident the edge
/// candidate is.
///
/// # Example
///
/// ```
/// use mesh_snap::{SnapTarget, SnapType, select_best_target};
/// use nalgebra::Point3;
///
/// let best = select_best_target([
///     SnapTarget::new(SnapType::Edge, Point3::origin(), 1, 0.99),
///     SnapTarget::new(SnapType::Vertex, Point3::origin(), 1, 0.10),
/// ])
/// .unwrap();
/// assert_eq!(best.snap_type, SnapType::Vertex);
/// ```
#[must_use]
pub fn select_best_target(candidates: impl IntoIterator<Item = SnapTarget>) -> Option<SnapTarget> {
    candidates.into_iter().max_by(SnapTarget::rank_cmp)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn target(snap_type: SnapType, confidence: f64) -> SnapTarget {
        SnapTarget::new(snap_type, Point3::origin(), 1, confidence)
    }

    #[test]
    fn priority_order() {
        let order = [
            SnapType::Vertex,
            SnapType::EdgeMidpoint,
            SnapType::Edge,
            SnapType::FaceCenter,
            SnapType::Face,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].priority() > pair[1].priority());
        }
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(target(SnapType::Face, -0.5).confidence, 0.0);
        assert_eq!(target(SnapType::Face, 2.0).confidence, 1.0);
        assert_eq!(target(SnapType::Face, f64::NAN).confidence, 0.0);
    }

    #[test]
    fn vertex_beats_confident_edge() {
        let best = select_best_target([
            target(SnapType::Edge, 0.999),
            target(SnapType::EdgeMidpoint, 0.9),
            target(SnapType::Vertex, 0.01),
        ])
        .unwrap();
        assert_eq!(best.snap_type, SnapType::Vertex);
    }

    #[test]
    fn midpoint_beats_edge() {
        let best = select_best_target([
            target(SnapType::Edge, 0.999),
            target(SnapType::EdgeMidpoint, 0.5),
            target(SnapType::Face, 0.5),
        ])
        .unwrap();
        assert_eq!(best.snap_type, SnapType::EdgeMidpoint);
    }

    #[test]
    fn confidence_breaks_ties() {
        let best = select_best_target([
            target(SnapType::Edge, 0.3),
            target(SnapType::Edge, 0.8),
            target(SnapType::Edge, 0.5),
        ])
        .unwrap();
        assert_eq!(best.confidence, 0.8);
    }

    #[test]
    fn empty_selection() {
        assert!(select_best_target(Vec::new()).is_none());
    }

    #[test]
    fn builders_fill_metadata() {
        let t = target(SnapType::Edge, 0.5)
            .with_normal(Some(Vector3::z()))
            .with_edge(Point3::origin(), Point3::new(1.0, 0.0, 0.0), 4)
            .with_face(2)
            .with_valence(3);
        assert_eq!(t.normal, Some(Vector3::z()));
        assert_eq!(t.metadata.edge_index, Some(4));
        assert_eq!(t.metadata.face_index, Some(2));
        assert_eq!(t.metadata.vertex_valence, Some(3));
    }

    #[test]
    fn display_names() {
        assert_eq!(SnapType::EdgeMidpoint.to_string(), "edge_midpoint");
        assert_eq!(SnapType::FaceCenter.to_string(), "face_center");
    }
}
