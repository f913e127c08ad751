//! # Clusterer Configuration
//!
//! Engine-level settings for the clustered binning subsystem. These values are
//! fixed for the lifetime of a grid: changing any of them means building a new
//! [`ClusterGridDescriptor`](crate::cluster::ClusterGridDescriptor).
//!
//! Loaded once at startup from TOML or RON through the [`Config`] trait.

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};

/// Number of clusters along X used by [`ClustererConfig::default`]
pub const DEFAULT_CLUSTER_COUNT_X: u32 = 16;
/// Number of clusters along Y used by [`ClustererConfig::default`]
pub const DEFAULT_CLUSTER_COUNT_Y: u32 = 9;
/// Number of clusters along Z used by [`ClustererConfig::default`]
pub const DEFAULT_CLUSTER_COUNT_Z: u32 = 24;

/// # Clusterer Configuration
///
/// Grid dimensions and buffer bounds for clustered shading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClustererConfig {
    /// Screen tiles along X
    pub cluster_count_x: u32,
    /// Screen tiles along Y
    pub cluster_count_y: u32,
    /// Depth slices along Z
    pub cluster_count_z: u32,
    /// Upper bound for `x * y * z`
    pub max_total_clusters: u32,
    /// Bucket capacity of a single (cluster, object type) pair
    pub max_indices_per_cluster_per_type: u32,
    /// Capacity of the flat index buffer
    pub max_total_indices: u32,
    /// Binning workers; `None` uses the size of the rayon pool
    pub worker_count: Option<usize>,
    /// View distance where volumetric effects end
    pub light_volume_distance: f32,
}

impl ClustererConfig {
    /// Create a configuration with the given grid dimensions and default bounds
    pub fn new(count_x: u32, count_y: u32, count_z: u32) -> Self {
        Self {
            cluster_count_x: count_x,
            cluster_count_y: count_y,
            cluster_count_z: count_z,
            ..Self::default()
        }
    }

    /// Set the per-cluster per-type bucket capacity
    pub fn with_max_indices_per_cluster_per_type(mut self, max: u32) -> Self {
        self.max_indices_per_cluster_per_type = max;
        self
    }

    /// Set the capacity of the flat index buffer
    pub fn with_max_total_indices(mut self, max: u32) -> Self {
        self.max_total_indices = max;
        self
    }

    /// Set the upper bound for the total cluster count
    pub fn with_max_total_clusters(mut self, max: u32) -> Self {
        self.max_total_clusters = max;
        self
    }

    /// Pin the number of binning workers
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = Some(workers);
        self
    }

    /// Set the volumetric effect distance
    pub fn with_light_volume_distance(mut self, distance: f32) -> Self {
        self.light_volume_distance = distance;
        self
    }

    /// Total number of clusters in the grid
    pub fn total_clusters(&self) -> u64 {
        u64::from(self.cluster_count_x)
            * u64::from(self.cluster_count_y)
            * u64::from(self.cluster_count_z)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("cluster_count_x", self.cluster_count_x),
            ("cluster_count_y", self.cluster_count_y),
            ("cluster_count_z", self.cluster_count_z),
        ];
        for (field, count) in counts {
            if count == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "cluster count must be at least 1".to_string(),
                });
            }
        }

        if self.total_clusters() > u64::from(self.max_total_clusters) {
            return Err(ConfigError::InvalidValue {
                field: "max_total_clusters",
                reason: format!(
                    "grid {}x{}x{} has {} clusters, limit is {}",
                    self.cluster_count_x,
                    self.cluster_count_y,
                    self.cluster_count_z,
                    self.total_clusters(),
                    self.max_total_clusters
                ),
            });
        }

        if self.max_indices_per_cluster_per_type == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_indices_per_cluster_per_type",
                reason: "bucket capacity must be at least 1".to_string(),
            });
        }

        if self.max_total_indices == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_total_indices",
                reason: "index buffer capacity must be at least 1".to_string(),
            });
        }

        if self.worker_count == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "worker_count",
                reason: "at least one worker is required".to_string(),
            });
        }

        if !(self.light_volume_distance > 0.0 && self.light_volume_distance.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "light_volume_distance",
                reason: format!("must be a positive distance, got {}", self.light_volume_distance),
            });
        }

        Ok(())
    }
}

impl Default for ClustererConfig {
    fn default() -> Self {
        Self {
            cluster_count_x: DEFAULT_CLUSTER_COUNT_X,
            cluster_count_y: DEFAULT_CLUSTER_COUNT_Y,
            cluster_count_z: DEFAULT_CLUSTER_COUNT_Z,
            max_total_clusters: 16 * 1024,
            max_indices_per_cluster_per_type: 64,
            max_total_indices: 512 * 1024,
            worker_count: None,
            light_volume_distance: 60.0,
        }
    }
}

impl Config for ClustererConfig {}
