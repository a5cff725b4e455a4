//! Error types for snap configuration and mesh buffer validation.
//!
//! Detection itself never fails: malformed input is filtered and reported as
//! "no target". These errors only surface from the explicit validation APIs.

use thiserror::Error;

/// Result type alias for snap validation operations.
pub type SnapResult<T> = Result<T, SnapError>;

/// Errors reported by snap validation APIs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapError {
    /// Snap options contain an unusable value.
    #[error("invalid snap options: {0}")]
    InvalidOptions(String),

    /// Camera parameters cannot be used for radius conversion.
    #[error("invalid camera: {0}")]
    InvalidCamera(String),

    /// Mesh buffers are inconsistent.
    #[error("malformed mesh buffer (express id {express_id}): {details}")]
    MalformedBuffer {
        /// Element the mesh belongs to.
        express_id: u32,
        /// What is wrong with the buffer.
        details: String,
    },
}

impl SnapError {
    /// Create an invalid options error.
    #[must_use]
    pub fn invalid_options(details: impl Into<String>) -> Self {
        Self::InvalidOptions(details.into())
    }

    /// Create an invalid camera error.
    #[must_use]
    pub fn invalid_camera(details: impl Into<String>) -> Self {
        Self::InvalidCamera(details.into())
    }

    /// Create a malformed buffer error.
    #[must_use]
    pub fn malformed_buffer(express_id: u32, details: impl Into<String>) -> Self {
        Self::MalformedBuffer {
            express_id,
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SnapError::invalid_options("negative radius");
        assert!(format!("{err}").contains("negative radius"));

        let err = SnapError::invalid_camera("fov out of range");
        assert!(format!("{err}").contains("fov out of range"));

        let err = SnapError::malformed_buffer(42, "index 9 out of range");
        let msg = format!("{err}");
        assert!(msg.contains("42"));
        assert!(msg.contains("index 9"));
    }
}
