//! Per-frame clustering pipeline
//!
//! [`ClusteredShading`] owns every piece of per-frame state and runs the
//! stages in order: re-solve the grid for the camera, collect visible objects,
//! bin, pack and fill the uniforms.

use super::bin::{BinningStats, ClustererBin};
use super::collector::{CollectedObjects, TypedObjectCollector, VisibleObjectSource};
use super::error::ClustererResult;
use super::grid::ClusterGridDescriptor;
use super::packer::{IndexPacker, PackedClusters};
use super::uniforms::ClusteringUniforms;
use crate::core::config::{ClustererConfig, Config};
use crate::render::primitives::ClusterCamera;

/// Everything the shading passes consume for one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameOutput<'a> {
    /// Grid the frame was binned with
    pub grid: &'a ClusterGridDescriptor,
    /// Uniform block
    pub uniforms: &'a ClusteringUniforms,
    /// Cluster records and flat index list
    pub packed: &'a PackedClusters,
    /// Collected objects and their shading records
    pub objects: &'a CollectedObjects,
    /// Binning counters
    pub stats: BinningStats,
}

/// Clustered shading state for one view
#[derive(Debug)]
pub struct ClusteredShading {
    config: ClustererConfig,
    grid: ClusterGridDescriptor,
    collector: TypedObjectCollector,
    bin: ClustererBin,
    packer: IndexPacker,
    packed: PackedClusters,
    uniforms: ClusteringUniforms,
}

impl ClusteredShading {
    /// Set up clustering for `config`, starting from `camera`
    pub fn new(config: ClustererConfig, camera: &ClusterCamera) -> ClustererResult<Self> {
        let grid = ClusterGridDescriptor::new(&config, camera)?;
        let uniforms = ClusteringUniforms::new(&grid, camera, config.light_volume_distance);

        Ok(Self {
            bin: ClustererBin::new(&config),
            packer: IndexPacker::new(&config),
            collector: TypedObjectCollector::new(),
            packed: PackedClusters::new(),
            grid,
            uniforms,
            config,
        })
    }

    /// Set up clustering from a `.toml` or `.ron` configuration file
    pub fn from_config_file(path: &str, camera: &ClusterCamera) -> ClustererResult<Self> {
        let config = ClustererConfig::load_from_file(path)?;
        log::info!("Loaded clusterer configuration from {}", path);
        Self::new(config, camera)
    }

    /// Run every stage for this frame
    ///
    /// On error the previous frame's packed output is left in place and must
    /// not be used for this frame.
    pub fn prepare_frame<S>(&mut self, camera: &ClusterCamera, source: &S) -> ClustererResult<FrameOutput<'_>>
    where
        S: VisibleObjectSource + ?Sized,
    {
        self.grid.update(camera)?;

        self.collector.begin_frame();
        source.collect(camera, &mut self.collector);
        let objects = self.collector.finish();

        let stats = self.bin.bin(&self.grid, camera, objects);
        self.packer.pack(self.bin.buckets(), &mut self.packed)?;
        self.uniforms = ClusteringUniforms::new(&self.grid, camera, self.config.light_volume_distance);

        Ok(FrameOutput {
            grid: &self.grid,
            uniforms: &self.uniforms,
            packed: &self.packed,
            objects: self.collector.collected(),
            stats,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &ClustererConfig {
        &self.config
    }

    /// Current grid
    pub fn grid(&self) -> &ClusterGridDescriptor {
        &self.grid
    }

    /// Packed output of the last successful frame
    pub fn packed(&self) -> &PackedClusters {
        &self.packed
    }
}
