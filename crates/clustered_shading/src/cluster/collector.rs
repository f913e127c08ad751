//! Per-frame typed object collection
//!
//! The visibility system pushes every object that survived frustum culling into
//! a [`TypedObjectCollector`]. Each push returns the object's stable index: its
//! position among the objects of the same kind this frame, which is also its
//! index in the matching shading array and the value binned into clusters.

use std::ops::Range;

use super::objects::{
    GpuDecal, GpuFogDensityVolume, GpuGlobalIlluminationProbe, GpuPointLight, GpuReflectionProbe,
    GpuSpotLight, ObjectKind, TypedObject, TYPED_OBJECT_COUNT,
};
use super::volume::BoundingVolume;
use crate::render::primitives::ClusterCamera;

/// The minimal record binning needs for one object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinnableObject {
    /// Object kind
    pub kind: ObjectKind,
    /// Index among the objects of the same kind
    pub stable_index: u32,
    /// World-space bounding volume
    pub volume: BoundingVolume,
}

/// Shading records of one frame, one array per kind, indexed by stable index
#[derive(Debug, Clone, Default)]
pub struct ShadingArrays {
    /// Point lights
    pub point_lights: Vec<GpuPointLight>,
    /// Spot lights
    pub spot_lights: Vec<GpuSpotLight>,
    /// Reflection probes
    pub reflection_probes: Vec<GpuReflectionProbe>,
    /// Global illumination probes
    pub global_illumination_probes: Vec<GpuGlobalIlluminationProbe>,
    /// Decals
    pub decals: Vec<GpuDecal>,
    /// Fog density volumes
    pub fog_density_volumes: Vec<GpuFogDensityVolume>,
}

impl ShadingArrays {
    fn clear(&mut self) {
        self.point_lights.clear();
        self.spot_lights.clear();
        self.reflection_probes.clear();
        self.global_illumination_probes.clear();
        self.decals.clear();
        self.fog_density_volumes.clear();
    }

    /// Append the shading record of `object`
    fn push(&mut self, object: &TypedObject) {
        match object {
            TypedObject::PointLight(o) => self.point_lights.push(o.to_gpu()),
            TypedObject::SpotLight(o) => self.spot_lights.push(o.to_gpu()),
            TypedObject::ReflectionProbe(o) => self.reflection_probes.push(o.to_gpu()),
            TypedObject::GlobalIlluminationProbe(o) => {
                self.global_illumination_probes.push(o.to_gpu());
            }
            TypedObject::Decal(o) => self.decals.push(o.to_gpu()),
            TypedObject::FogDensityVolume(o) => self.fog_density_volumes.push(o.to_gpu()),
        }
    }

    /// Raw bytes of the array for `kind`
    pub fn bytes(&self, kind: ObjectKind) -> &[u8] {
        match kind {
            ObjectKind::PointLight => bytemuck::cast_slice(&self.point_lights),
            ObjectKind::SpotLight => bytemuck::cast_slice(&self.spot_lights),
            ObjectKind::ReflectionProbe => bytemuck::cast_slice(&self.reflection_probes),
            ObjectKind::GlobalIlluminationProbe => {
                bytemuck::cast_slice(&self.global_illumination_probes)
            }
            ObjectKind::Decal => bytemuck::cast_slice(&self.decals),
            ObjectKind::FogDensityVolume => bytemuck::cast_slice(&self.fog_density_volumes),
        }
    }
}

/// Output of one frame's collection
#[derive(Debug, Clone, Default)]
pub struct CollectedObjects {
    objects: Vec<BinnableObject>,
    ranges: [Range<usize>; TYPED_OBJECT_COUNT],
    shading: ShadingArrays,
}

impl CollectedObjects {
    /// Every binnable object, grouped by kind in packing order, then in
    /// insertion order
    pub fn objects(&self) -> &[BinnableObject] {
        &self.objects
    }

    /// The binnable objects of one kind
    pub fn of_kind(&self, kind: ObjectKind) -> &[BinnableObject] {
        &self.objects[self.ranges[kind.index()].clone()]
    }

    /// Number of objects of one kind
    pub fn count(&self, kind: ObjectKind) -> usize {
        self.ranges[kind.index()].len()
    }

    /// Total number of objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing was collected
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Shading records
    pub fn shading(&self) -> &ShadingArrays {
        &self.shading
    }
}

/// Gathers one frame's visible objects
///
/// Storage is kept between frames; [`TypedObjectCollector::begin_frame`]
/// only clears it.
#[derive(Debug, Default)]
pub struct TypedObjectCollector {
    pending: [Vec<BinnableObject>; TYPED_OBJECT_COUNT],
    collected: CollectedObjects,
}

impl TypedObjectCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous frame's objects
    pub fn begin_frame(&mut self) {
        self.pending.iter_mut().for_each(Vec::clear);
        self.collected.objects.clear();
        self.collected.shading.clear();
        self.collected.ranges = Default::default();
    }

    /// Add a visible object, returning its stable index
    ///
    /// The object must already be resolved to world space and culled against
    /// the camera frustum.
    pub fn push(&mut self, object: impl Into<TypedObject>) -> u32 {
        let object = object.into();
        let kind = object.kind();
        let volume = object.bounding_volume();
        debug_assert!(volume.is_finite(), "non-finite bounding volume for {}: {:?}", kind.name(), volume);

        let pending = &mut self.pending[kind.index()];
        let stable_index = pending.len() as u32;
        pending.push(BinnableObject { kind, stable_index, volume });
        self.collected.shading.push(&object);
        stable_index
    }

    /// Number of objects of `kind` pushed this frame
    pub fn count(&self, kind: ObjectKind) -> usize {
        self.pending[kind.index()].len()
    }

    /// Lay out this frame's objects for binning
    pub fn finish(&mut self) -> &CollectedObjects {
        let collected = &mut self.collected;
        collected.objects.clear();
        for kind in ObjectKind::ALL {
            let start = collected.objects.len();
            collected.objects.extend_from_slice(&self.pending[kind.index()]);
            collected.ranges[kind.index()] = start..collected.objects.len();
        }

        log::trace!(
            "Collected {} objects ({} point lights, {} spot lights)",
            collected.objects.len(),
            collected.count(ObjectKind::PointLight),
            collected.count(ObjectKind::SpotLight)
        );
        &self.collected
    }

    /// Result of the last [`TypedObjectCollector::finish`]
    pub fn collected(&self) -> &CollectedObjects {
        &self.collected
    }
}

/// The seam to the scene's visibility system
///
/// Implementors push every object visible from `camera`, in visibility-test
/// order.
pub trait VisibleObjectSource {
    /// Push this frame's visible objects
    fn collect(&self, camera: &ClusterCamera, collector: &mut TypedObjectCollector);
}

/// A pre-culled list of objects
impl VisibleObjectSource for [TypedObject] {
    fn collect(&self, _camera: &ClusterCamera, collector: &mut TypedObjectCollector) {
        for object in self {
            collector.push(object.clone());
        }
    }
}

impl VisibleObjectSource for Vec<TypedObject> {
    fn collect(&self, camera: &ClusterCamera, collector: &mut TypedObjectCollector) {
        self.as_slice().collect(camera, collector);
    }
}
