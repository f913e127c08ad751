//! # Clustered Shading
//!
//! CPU side of clustered forward shading: splits the camera's view volume into
//! a grid of screen tiles and non-linear depth slices, bins point lights, spot
//! lights, reflection probes, global illumination probes, decals and fog
//! volumes into the clusters they overlap, and packs the result into buffers a
//! shader can index directly.
//!
//! ## Features
//!
//! - **Analytic depth slicing**: Two constant vectors map view depth to a
//!   slice and back, on the CPU and in GLSL alike
//! - **Bounded binning**: Work per object is proportional to the clusters it
//!   touches
//! - **Deterministic output**: Identical packing regardless of worker count
//! - **Upload-ready buffers**: `bytemuck` views of every GPU record
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clustered_shading::prelude::*;
//!
//! fn main() -> Result<(), ClustererError> {
//!     clustered_shading::foundation::logging::init();
//!
//!     let camera = ClusterCamera::perspective(
//!         Vec3::new(0.0, 2.0, 10.0),
//!         Vec3::zeros(),
//!         Vec3::new(0.0, 1.0, 0.0),
//!         60.0,
//!         16.0 / 9.0,
//!         0.1,
//!         100.0,
//!     );
//!     let mut shading = ClusteredShading::new(ClustererConfig::default(), &camera)?;
//!
//!     let lights: Vec<TypedObject> = vec![
//!         PointLight::new(Vec3::new(0.0, 1.0, 0.0), 4.0, Vec3::new(1.0, 0.9, 0.7)).into(),
//!     ];
//!     let frame = shading.prepare_frame(&camera, &lights)?;
//!     println!("{} indices packed", frame.packed.indices().len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod foundation;
pub mod config;
pub mod render;
pub mod cluster;

/// Common imports for users of the crate
pub mod prelude {
    pub use crate::{
        cluster::{
            Aabb, BoundingVolume, ClusterGridDescriptor, ClusteredShading, ClustererError,
            ClusteringUniforms, Decal, FogDensityVolume, FrameOutput, GlobalIlluminationProbe,
            MagicValues, ObjectKind, PackedClusters, PointLight, ReflectionProbe, Sphere, SpotLight,
            TypedObject, TypedObjectCollector, VisibleObjectSource,
        },
        core::config::{ClustererConfig, Config},
        foundation::math::{Mat4, Mat4Ext, Vec2, Vec3, Vec4},
        render::ClusterCamera,
    };
}
