//! Snap options and magnetism tuning.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{SnapError, SnapResult};

/// Per-call snap configuration, usually driven by the toolbar.
///
/// # Example
///
/// ```
/// use mesh_snap::SnapOptions;
///
/// let options = SnapOptions::default().snap_to_faces(false).screen_snap_radius(12.0);
/// assert!(options.snap_to_edges);
/// assert!(!options.snap_to_faces);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SnapOptions {
    /// Offer mesh corners.
    pub snap_to_vertices: bool,
    /// Offer edges and edge midpoints, and enable magnetic locking.
    pub snap_to_edges: bool,
    /// Offer the hit triangle and its centroid.
    pub snap_to_faces: bool,
    /// World-space radius, used only when the pixel radius cannot be
    /// converted (no screen height or no usable hit distance).
    pub snap_radius: f64,
    /// Snap tolerance in screen pixels.
    pub screen_snap_radius: f64,
}

impl Default for SnapOptions {
    fn default() -> Self {
        Self {
            snap_to_vertices: true,
            snap_to_edges: true,
            snap_to_faces: true,
            snap_radius: 0.1,
            screen_snap_radius: 20.0,
        }
    }
}

impl SnapOptions {
    /// Enable or disable vertex snapping.
    #[must_use]
    pub const fn snap_to_vertices(mut self, enabled: bool) -> Self {
        self.snap_to_vertices = enabled;
        self
    }

    /// Enable or disable edge snapping.
    #[must_use]
    pub const fn snap_to_edges(mut self, enabled: bool) -> Self {
        self.snap_to_edges = enabled;
        self
    }

    /// Enable or disable face snapping.
    #[must_use]
    pub const fn snap_to_faces(mut self, enabled: bool) -> Self {
        self.snap_to_faces = enabled;
        self
    }

    /// Set the fallback world radius.
    #[must_use]
    pub const fn snap_radius(mut self, radius: f64) -> Self {
        self.snap_radius = radius;
        self
    }

    /// Set the pixel tolerance.
    #[must_use]
    pub const fn screen_snap_radius(mut self, pixels: f64) -> Self {
        self.screen_snap_radius = pixels;
        self
    }

    /// Returns `true` if at least one snap kind is enabled.
    #[must_use]
    pub const fn any_enabled(&self) -> bool {
        self.snap_to_vertices || self.snap_to_edges || self.snap_to_faces
    }

    /// Check the radii.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::InvalidOptions`] if either radius is negative or
    /// not finite.
    pub fn validate(&self) -> SnapResult<()> {
        if !(self.snap_radius.is_finite() && self.snap_radius >= 0.0) {
            return Err(SnapError::invalid_options(format!(
                "snap_radius must be a non-negative number, got {}",
                self.snap_radius
            )));
        }
        if !(self.screen_snap_radius.is_finite() && self.screen_snap_radius >= 0.0) {
            return Err(SnapError::invalid_options(format!(
                "screen_snap_radius must be a non-negative number, got {}",
                self.screen_snap_radius
            )));
        }
        Ok(())
    }
}

/// Multipliers governing magnetic edge locking.
///
/// Radii are multiples of the base snap radius. The defaults are the
/// process-wide tuning; custom values exist for experiments and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MagneticConfig {
    /// Edges within `base * edge_attraction_radius` can be acquired.
    pub edge_attraction_radius: f64,
    /// Escape threshold at zero strength, in multiples of the base radius.
    ///
    /// See [`MagneticConfig::escape_threshold`].
    pub edge_escape_multiplier: f64,
    /// How much accumulated lock strength widens the escape threshold.
    pub lock_strength_escape_factor: f64,
    /// Strength gained per maintained frame.
    pub lock_strength_growth: f64,
    /// Strength cap.
    pub max_lock_strength: f64,
    /// Parametric distance from an edge end that counts as the corner.
    pub corner_threshold: f64,
    /// Parametric distance from `t = 0.5` that counts as the midpoint.
    pub midpoint_threshold: f64,
    /// Minimum real edges at an endpoint for it to be a corner.
    pub min_corner_valence: usize,
    /// Per-edge confidence boost for corner targets.
    pub corner_confidence_boost: f64,
    /// Confidence of a locked midpoint target.
    pub midpoint_confidence: f64,
    /// Edges whose direction from the cursor has a cosine with the hit normal
    /// below this value are treated as hidden.
    pub visibility_cosine: f64,
}

impl Default for MagneticConfig {
    fn default() -> Self {
        Self {
            edge_attraction_radius: 3.0,
            edge_escape_multiplier: 2.5,
            lock_strength_escape_factor: 0.5,
            lock_strength_growth: 0.1,
            max_lock_strength: 1.0,
            corner_threshold: 0.08,
            midpoint_threshold: 0.08,
            min_corner_valence: 2,
            corner_confidence_boost: 0.15,
            midpoint_confidence: 0.99,
            visibility_cosine: -0.5,
        }
    }
}

impl MagneticConfig {
    /// Set the attraction radius multiplier.
    #[must_use]
    pub const fn edge_attraction_radius(mut self, multiplier: f64) -> Self {
        self.edge_attraction_radius = multiplier;
        self
    }

    /// Set the escape multiplier.
    #[must_use]
    pub const fn edge_escape_multiplier(mut self, multiplier: f64) -> Self {
        self.edge_escape_multiplier = multiplier;
        self
    }

    /// Set the corner threshold.
    #[must_use]
    pub const fn corner_threshold(mut self, threshold: f64) -> Self {
        self.corner_threshold = threshold;
        self
    }

    /// Set the minimum corner valence.
    #[must_use]
    pub const fn min_corner_valence(mut self, valence: usize) -> Self {
        self.min_corner_valence = valence;
        self
    }

    /// Escape threshold for a lock of the given strength.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_snap::MagneticConfig;
    ///
    /// let config = MagneticConfig::default();
    /// assert!((config.escape_threshold(1.0, 0.0) - 2.5).abs() < 1e-12);
    /// assert!((config.escape_threshold(1.0, 1.0) - 3.75).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn escape_threshold(&self, base_radius: f64, strength: f64) -> f64 {
        base_radius
            * self.edge_escape_multiplier
            * strength.mul_add(self.lock_strength_escape_factor, 1.0)
    }

    /// Strength after one more maintained frame.
    #[must_use]
    pub fn grow_strength(&self, strength: f64) -> f64 {
        (strength + self.lock_strength_growth).min(self.max_lock_strength)
    }

    /// Check that every multiplier is usable.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::InvalidOptions`] for negative or non-finite
    /// multipliers, or thresholds outside `[0, 0.5]`.
    pub fn validate(&self) -> SnapResult<()> {
        let multipliers = [
            ("edge_attraction_radius", self.edge_attraction_radius),
            ("edge_escape_multiplier", self.edge_escape_multiplier),
            (
                "lock_strength_escape_factor",
                self.lock_strength_escape_factor,
            ),
            ("lock_strength_growth", self.lock_strength_growth),
            ("max_lock_strength", self.max_lock_strength),
            ("corner_confidence_boost", self.corner_confidence_boost),
        ];
        for (name, value) in multipliers {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SnapError::invalid_options(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("corner_threshold", self.corner_threshold),
            ("midpoint_threshold", self.midpoint_threshold),
        ] {
            if !(0.0..=0.5).contains(&value) {
                return Err(SnapError::invalid_options(format!(
                    "{name} must be within [0, 0.5], got {value}"
                )));
            }
        }
        if !(-1.0..=1.0).contains(&self.visibility_cosine) {
            return Err(SnapError::invalid_options(format!(
                "visibility_cosine must be within [-1, 1], got {}",
                self.visibility_cosine
            )));
        }
        Ok(())
    }
}
