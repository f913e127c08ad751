//! Clusterer errors
//!
//! Everything here is a configuration error: the frame cannot be rendered
//! correctly and the caller has to stop. Per-cluster bucket overflow is not an
//! error and never shows up in this enum.

use thiserror::Error;

use crate::config::ConfigError;

/// Cluster grid axis, used in error reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Screen tiles along X
    X,
    /// Screen tiles along Y
    Y,
    /// Depth slices
    Z,
}

/// Clustered binning errors
#[derive(Error, Debug)]
pub enum ClustererError {
    /// Near plane is not in front of the far plane
    #[error("Invalid depth range: near ({near}) must be less than far ({far})")]
    InvalidDepthRange {
        /// Near plane distance
        near: f32,
        /// Far plane distance
        far: f32,
    },

    /// A grid axis has no clusters
    #[error("Cluster count along {axis:?} must be at least 1")]
    ZeroClusterCount {
        /// The empty axis
        axis: Axis,
    },

    /// Grid exceeds the configured cluster cap
    #[error("Cluster grid has {total} clusters, configured maximum is {max}")]
    TooManyClusters {
        /// Requested cluster count
        total: u64,
        /// Configured cap
        max: u32,
    },

    /// Buckets cannot hold a single index
    #[error("Per-cluster bucket capacity must be at least 1")]
    ZeroBucketCapacity,

    /// The packed index list does not fit the index buffer
    #[error("Packed index list needs {required} entries, index buffer holds {capacity}")]
    IndexBufferOverflow {
        /// Indices produced by binning
        required: usize,
        /// Configured buffer capacity
        capacity: usize,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result alias for clusterer operations
pub type ClustererResult<T> = Result<T, ClustererError>;
