//! # Clustered Binning
//!
//! Splits the view volume into a grid of screen tiles times non-linear depth
//! slices and assigns lights, probes, decals and fog volumes to the clusters
//! they overlap.
//!
//! ## Frame flow
//!
//! ```text
//! ClusterCamera ──► ClusterGridDescriptor (magic values)
//!                          │
//! VisibleObjectSource ──► TypedObjectCollector ──► ClustererBin ──► IndexPacker
//!                                                                     │
//!                                        ClusteringUniforms + PackedClusters
//! ```
//!
//! [`ClusteredShading`] drives the whole sequence; the stages are public for
//! renderers that schedule them separately.

pub mod bin;
pub mod collector;
pub mod error;
pub mod grid;
pub mod magic;
pub mod objects;
pub mod packer;
pub mod pipeline;
pub mod shader_mirror;
pub mod uniforms;
pub mod volume;

#[cfg(test)]
mod tests;

pub use bin::{cluster_range, BinningStats, ClusterBuckets, ClusterRange, ClustererBin, ScratchArena};
pub use collector::{BinnableObject, CollectedObjects, ShadingArrays, TypedObjectCollector, VisibleObjectSource};
pub use error::{Axis, ClustererError, ClustererResult};
pub use grid::ClusterGridDescriptor;
pub use magic::MagicValues;
pub use objects::{
    Decal, FogDensityVolume, FogShape, GlobalIlluminationProbe, ObjectKind, PointLight, ReflectionProbe,
    SpotLight, TypedObject, TYPED_OBJECT_COUNT,
};
pub use packer::{IndexPacker, ObjectRange, PackedClusterRecord, PackedClusters};
pub use pipeline::{ClusteredShading, FrameOutput};
pub use uniforms::ClusteringUniforms;
pub use volume::{Aabb, BoundingVolume, Obb, Sphere};
