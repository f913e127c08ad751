//! Typed objects
//!
//! The six kinds of objects that get binned into clusters, in the CPU form the
//! scene hands over and the std140 form the shading passes read.
//!
//! Every kind resolves to a world-space [`BoundingVolume`] before binning, so
//! the binner only ever sees spheres and boxes.

use bytemuck::{Pod, Zeroable};

use super::volume::{Aabb, BoundingVolume, Obb, Sphere};
use crate::foundation::math::{Mat3, Mat4, Vec3};

/// Number of object kinds
pub const TYPED_OBJECT_COUNT: usize = 6;

/// Shadow map id written for spot lights that do not cast shadows
pub const NO_SHADOW_MAP: f32 = -1.0;

/// Object kind, in packing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ObjectKind {
    /// Omnidirectional light
    PointLight = 0,
    /// Cone light
    SpotLight = 1,
    /// Cube map reflection probe
    ReflectionProbe = 2,
    /// Irradiance volume
    GlobalIlluminationProbe = 3,
    /// Projected decal
    Decal = 4,
    /// Participating media volume
    FogDensityVolume = 5,
}

impl ObjectKind {
    /// Number of kinds
    pub const COUNT: usize = TYPED_OBJECT_COUNT;

    /// All kinds in packing order
    pub const ALL: [ObjectKind; TYPED_OBJECT_COUNT] = [
        ObjectKind::PointLight,
        ObjectKind::SpotLight,
        ObjectKind::ReflectionProbe,
        ObjectKind::GlobalIlluminationProbe,
        ObjectKind::Decal,
        ObjectKind::FogDensityVolume,
    ];

    /// Position in packing order
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::PointLight => "point light",
            Self::SpotLight => "spot light",
            Self::ReflectionProbe => "reflection probe",
            Self::GlobalIlluminationProbe => "global illumination probe",
            Self::Decal => "decal",
            Self::FogDensityVolume => "fog density volume",
        }
    }
}

/// Point light
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    /// World position
    pub position: Vec3,
    /// Influence radius
    pub radius: f32,
    /// Linear diffuse color
    pub diffuse_color: Vec3,
    /// UV scale of the shadow atlas tiles, 0 when not shadowed
    pub shadow_atlas_tile_scale: f32,
    /// UV offsets of the six cube faces in the shadow atlas, two per entry
    pub shadow_atlas_tile_offsets: [[f32; 4]; 3],
}

impl PointLight {
    /// Unshadowed point light
    pub fn new(position: Vec3, radius: f32, diffuse_color: Vec3) -> Self {
        Self {
            position,
            radius,
            diffuse_color,
            shadow_atlas_tile_scale: 0.0,
            shadow_atlas_tile_offsets: [[0.0; 4]; 3],
        }
    }

    /// Shading record
    pub fn to_gpu(&self) -> GpuPointLight {
        GpuPointLight {
            position: self.position.into(),
            square_radius_over_one: 1.0 / (self.radius * self.radius),
            diffuse_color: self.diffuse_color.into(),
            shadow_atlas_tile_scale: self.shadow_atlas_tile_scale,
            padding: [0.0; 3],
            radius: self.radius,
            shadow_atlas_tile_offsets: self.shadow_atlas_tile_offsets,
        }
    }
}

/// Spot light
#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    /// World position of the cone apex
    pub position: Vec3,
    /// Unit direction of the cone axis
    pub direction: Vec3,
    /// Maximum lit distance
    pub range: f32,
    /// Outer cone half angle in radians
    pub outer_angle: f32,
    /// Inner cone half angle in radians
    pub inner_angle: f32,
    /// Linear diffuse color
    pub diffuse_color: Vec3,
    /// Shadow map slot
    pub shadow_map: Option<u32>,
    /// World to shadow texture transform
    pub texture_projection: Mat4,
}

impl SpotLight {
    /// Unshadowed spot light
    pub fn new(
        position: Vec3,
        direction: Vec3,
        range: f32,
        outer_angle: f32,
        inner_angle: f32,
        diffuse_color: Vec3,
    ) -> Self {
        Self {
            position,
            direction: direction.normalize(),
            range,
            outer_angle,
            inner_angle,
            diffuse_color,
            shadow_map: None,
            texture_projection: Mat4::identity(),
        }
    }

    /// Shading record
    pub fn to_gpu(&self) -> GpuSpotLight {
        GpuSpotLight {
            position: self.position.into(),
            square_radius_over_one: 1.0 / (self.range * self.range),
            diffuse_color: self.diffuse_color.into(),
            shadowmap_id: self.shadow_map.map_or(NO_SHADOW_MAP, |id| id as f32),
            direction: self.direction.into(),
            radius: self.range,
            outer_cos: self.outer_angle.cos(),
            inner_cos: self.inner_angle.cos(),
            padding: [0.0; 2],
            texture_projection: self.texture_projection.into(),
        }
    }
}

/// Reflection probe
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionProbe {
    /// Capture position
    pub position: Vec3,
    /// Influence box
    pub aabb: Aabb,
    /// Slice in the cube map array
    pub cubemap_index: u32,
}

impl ReflectionProbe {
    /// Probe capturing at `position` with the given influence box
    pub fn new(position: Vec3, aabb: Aabb, cubemap_index: u32) -> Self {
        Self { position, aabb, cubemap_index }
    }

    /// Shading record
    pub fn to_gpu(&self) -> GpuReflectionProbe {
        GpuReflectionProbe {
            position: self.position.into(),
            cubemap_index: self.cubemap_index as f32,
            aabb_min: self.aabb.min.into(),
            padding0: 0.0,
            aabb_max: self.aabb.max.into(),
            padding1: 0.0,
        }
    }
}

/// Global illumination probe
///
/// An irradiance volume of `cell_size` sized cells stored in one 3D texture,
/// six texels wide per cell for the ambient cube directions.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalIlluminationProbe {
    /// Covered box
    pub aabb: Aabb,
    /// Edge length of one cell
    pub cell_size: f32,
    /// Distance from the box faces over which the probe fades out
    pub fade_distance: f32,
    /// Volume texture slot
    pub texture_index: u32,
}

impl GlobalIlluminationProbe {
    /// Probe covering `aabb`
    pub fn new(aabb: Aabb, cell_size: f32, fade_distance: f32, texture_index: u32) -> Self {
        Self { aabb, cell_size, fade_distance, texture_index }
    }

    /// Cells along each axis
    pub fn cell_counts(&self) -> [u32; 3] {
        let extent = self.aabb.max - self.aabb.min;
        extent.map(|e| ((e / self.cell_size).ceil() as u32).max(1)).into()
    }

    /// Shading record
    pub fn to_gpu(&self) -> GpuGlobalIlluminationProbe {
        let texture_width = self.cell_counts()[0] * 6;
        GpuGlobalIlluminationProbe {
            aabb_min: self.aabb.min.into(),
            texture_index: self.texture_index,
            aabb_max: self.aabb.max.into(),
            half_texel_size_u: 0.5 / texture_width as f32,
            fade_distance: self.fade_distance,
            padding: [0.0; 3],
        }
    }
}

/// Projected decal
#[derive(Debug, Clone, PartialEq)]
pub struct Decal {
    /// World to decal space, mapping the decal box onto `[-1, 1]³`
    pub projection: Mat4,
    /// Decal space back to world
    pub inv_projection: Mat4,
    /// Diffuse atlas rectangle
    pub diffuse_uv: [f32; 4],
    /// Normal/roughness atlas rectangle
    pub normal_roughness_uv: [f32; 4],
    /// Diffuse and normal/roughness blend factors
    pub blend_factors: [f32; 2],
}

impl Decal {
    /// Decal over the box at `center` with the given half size and orientation
    pub fn new(center: Vec3, half_extents: Vec3, rotation: Mat3) -> Self {
        let mut inv_projection = Mat4::identity();
        inv_projection
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(rotation * Mat3::from_diagonal(&half_extents)));
        inv_projection.fixed_view_mut::<3, 1>(0, 3).copy_from(&center);

        let inv_scale = half_extents.map(|h| if h > 0.0 { 1.0 / h } else { 0.0 });
        let mut projection = Mat4::identity();
        projection
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(Mat3::from_diagonal(&inv_scale) * rotation.transpose()));
        let translation = -(projection.fixed_view::<3, 3>(0, 0) * center);
        projection.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);

        Self::with_projections(projection, inv_projection)
    }

    /// Decal defined by its projection transform
    ///
    /// `None` if the transform is singular.
    pub fn from_projection(projection: Mat4) -> Option<Self> {
        let inv_projection = projection.try_inverse()?;
        Some(Self::with_projections(projection, inv_projection))
    }

    fn with_projections(projection: Mat4, inv_projection: Mat4) -> Self {
        Self {
            projection,
            inv_projection,
            diffuse_uv: [0.0, 0.0, 1.0, 1.0],
            normal_roughness_uv: [0.0, 0.0, 1.0, 1.0],
            blend_factors: [1.0, 1.0],
        }
    }

    /// Oriented box the decal projects onto
    pub fn obb(&self) -> Obb {
        Obb::from_inverse_projection(&self.inv_projection)
    }

    /// Shading record
    ///
    /// The texture matrix maps world positions to `[0, 1]³` decal texture space.
    pub fn to_gpu(&self) -> GpuDecal {
        let bias = Mat4::new_translation(&Vec3::repeat(0.5)) * Mat4::new_scaling(0.5);
        GpuDecal {
            diffuse_uv: self.diffuse_uv,
            normal_roughness_uv: self.normal_roughness_uv,
            texture_projection: (bias * self.projection).into(),
            blend_factors: [self.blend_factors[0], self.blend_factors[1], 0.0, 0.0],
        }
    }
}

/// Shape of a fog density volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FogShape {
    /// Axis-aligned box
    Box(Aabb),
    /// Sphere
    Sphere(Sphere),
}

/// Fog density volume
#[derive(Debug, Clone, PartialEq)]
pub struct FogDensityVolume {
    /// Extent
    pub shape: FogShape,
    /// Density added inside the volume
    pub density: f32,
}

impl FogDensityVolume {
    /// Box shaped volume
    pub fn boxed(aabb: Aabb, density: f32) -> Self {
        Self { shape: FogShape::Box(aabb), density }
    }

    /// Sphere shaped volume
    pub fn sphere(sphere: Sphere, density: f32) -> Self {
        Self { shape: FogShape::Sphere(sphere), density }
    }

    /// Shading record
    pub fn to_gpu(&self) -> GpuFogDensityVolume {
        let (is_box, a, b) = match self.shape {
            FogShape::Box(aabb) => (1, aabb.min, aabb.max),
            FogShape::Sphere(s) => (0, s.center, Vec3::repeat(s.radius * s.radius)),
        };
        GpuFogDensityVolume {
            aabb_min_or_sphere_center: a.into(),
            is_box,
            aabb_max_or_sphere_radius_squared: b.into(),
            density: self.density,
        }
    }
}

/// Any binnable object
#[derive(Debug, Clone, PartialEq)]
pub enum TypedObject {
    /// Point light
    PointLight(PointLight),
    /// Spot light
    SpotLight(SpotLight),
    /// Reflection probe
    ReflectionProbe(ReflectionProbe),
    /// Global illumination probe
    GlobalIlluminationProbe(GlobalIlluminationProbe),
    /// Decal
    Decal(Decal),
    /// Fog density volume
    FogDensityVolume(FogDensityVolume),
}

impl TypedObject {
    /// Kind of the object
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::PointLight(_) => ObjectKind::PointLight,
            Self::SpotLight(_) => ObjectKind::SpotLight,
            Self::ReflectionProbe(_) => ObjectKind::ReflectionProbe,
            Self::GlobalIlluminationProbe(_) => ObjectKind::GlobalIlluminationProbe,
            Self::Decal(_) => ObjectKind::Decal,
            Self::FogDensityVolume(_) => ObjectKind::FogDensityVolume,
        }
    }

    /// World-space volume used for binning
    pub fn bounding_volume(&self) -> BoundingVolume {
        match self {
            Self::PointLight(light) => BoundingVolume::Sphere(Sphere::new(light.position, light.radius)),
            Self::SpotLight(light) => BoundingVolume::Sphere(Sphere::enclosing_cone(
                light.position,
                light.direction,
                light.range,
                light.outer_angle,
            )),
            Self::ReflectionProbe(probe) => BoundingVolume::Aabb(probe.aabb),
            Self::GlobalIlluminationProbe(probe) => BoundingVolume::Aabb(probe.aabb),
            Self::Decal(decal) => BoundingVolume::Aabb(decal.obb().aabb()),
            Self::FogDensityVolume(volume) => match volume.shape {
                FogShape::Box(aabb) => BoundingVolume::Aabb(aabb),
                FogShape::Sphere(sphere) => BoundingVolume::Sphere(sphere),
            },
        }
    }
}

impl From<PointLight> for TypedObject {
    fn from(light: PointLight) -> Self {
        Self::PointLight(light)
    }
}

impl From<SpotLight> for TypedObject {
    fn from(light: SpotLight) -> Self {
        Self::SpotLight(light)
    }
}

impl From<ReflectionProbe> for TypedObject {
    fn from(probe: ReflectionProbe) -> Self {
        Self::ReflectionProbe(probe)
    }
}

impl From<GlobalIlluminationProbe> for TypedObject {
    fn from(probe: GlobalIlluminationProbe) -> Self {
        Self::GlobalIlluminationProbe(probe)
    }
}

impl From<Decal> for TypedObject {
    fn from(decal: Decal) -> Self {
        Self::Decal(decal)
    }
}

impl From<FogDensityVolume> for TypedObject {
    fn from(volume: FogDensityVolume) -> Self {
        Self::FogDensityVolume(volume)
    }
}

// ================================================================================================
// GPU RECORDS (std140)
// ================================================================================================

/// Point light data for the GPU storage buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct GpuPointLight {
    /// World position
    pub position: [f32; 3],
    /// `1 / radius²`
    pub square_radius_over_one: f32,
    /// Linear diffuse color
    pub diffuse_color: [f32; 3],
    /// UV scale of all shadow atlas tiles
    pub shadow_atlas_tile_scale: f32,
    /// Padding for std140 alignment
    pub padding: [f32; 3],
    /// Influence radius
    pub radius: f32,
    /// Cube face tile offsets, two faces per `vec4`
    pub shadow_atlas_tile_offsets: [[f32; 4]; 3],
}

/// Spot light data for the GPU storage buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct GpuSpotLight {
    /// World position
    pub position: [f32; 3],
    /// `1 / range²`
    pub square_radius_over_one: f32,
    /// Linear diffuse color
    pub diffuse_color: [f32; 3],
    /// Shadow map slot, [`NO_SHADOW_MAP`] when unshadowed
    pub shadowmap_id: f32,
    /// Cone axis
    pub direction: [f32; 3],
    /// Maximum lit distance
    pub radius: f32,
    /// Cosine of the outer half angle
    pub outer_cos: f32,
    /// Cosine of the inner half angle
    pub inner_cos: f32,
    /// Padding for std140 alignment
    pub padding: [f32; 2],
    /// World to shadow texture transform, column-major
    pub texture_projection: [[f32; 4]; 4],
}

/// Reflection probe data for the GPU storage buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct GpuReflectionProbe {
    /// Capture position
    pub position: [f32; 3],
    /// Cube map array slice
    pub cubemap_index: f32,
    /// Influence box minimum
    pub aabb_min: [f32; 3],
    /// Padding
    pub padding0: f32,
    /// Influence box maximum
    pub aabb_max: [f32; 3],
    /// Padding
    pub padding1: f32,
}

/// Global illumination probe data for the GPU storage buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct GpuGlobalIlluminationProbe {
    /// Covered box minimum
    pub aabb_min: [f32; 3],
    /// Volume texture slot
    pub texture_index: u32,
    /// Covered box maximum
    pub aabb_max: [f32; 3],
    /// Half a texel along U of the probe texture
    pub half_texel_size_u: f32,
    /// Fade distance from the box faces
    pub fade_distance: f32,
    /// Padding
    pub padding: [f32; 3],
}

/// Decal data for the GPU storage buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct GpuDecal {
    /// Diffuse atlas rectangle
    pub diffuse_uv: [f32; 4],
    /// Normal/roughness atlas rectangle
    pub normal_roughness_uv: [f32; 4],
    /// World to decal texture transform, column-major
    pub texture_projection: [[f32; 4]; 4],
    /// `x`: diffuse blend, `y`: normal/roughness blend
    pub blend_factors: [f32; 4],
}

/// Fog density volume data for the GPU storage buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct GpuFogDensityVolume {
    /// Box minimum, or sphere center
    pub aabb_min_or_sphere_center: [f32; 3],
    /// 1 for boxes, 0 for spheres
    pub is_box: u32,
    /// Box maximum, or squared sphere radius in every component
    pub aabb_max_or_sphere_radius_squared: [f32; 3],
    /// Density
    pub density: f32,
}

const VEC4: usize = 16;
const MAT4: usize = 64;

const _: () = assert!(std::mem::size_of::<GpuPointLight>() == 6 * VEC4);
const _: () = assert!(std::mem::size_of::<GpuSpotLight>() == 4 * VEC4 + MAT4);
const _: () = assert!(std::mem::size_of::<GpuReflectionProbe>() == 3 * VEC4);
const _: () = assert!(std::mem::size_of::<GpuGlobalIlluminationProbe>() == 3 * VEC4);
const _: () = assert!(std::mem::size_of::<GpuDecal>() == 3 * VEC4 + MAT4);
const _: () = assert!(std::mem::size_of::<GpuFogDensityVolume>() == 2 * VEC4);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    #[test]
    fn test_kind_order_matches_packing_order() {
        for (i, kind) in ObjectKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        assert_eq!(ObjectKind::ALL.len(), ObjectKind::COUNT);
    }

    #[test]
    fn test_point_light_volume_and_record() {
        let light = PointLight::new(Vec3::new(1.0, 2.0, 3.0), 2.0, Vec3::new(1.0, 0.5, 0.25));
        let object = TypedObject::from(light.clone());

        assert_eq!(object.kind(), ObjectKind::PointLight);
        assert_eq!(
            object.bounding_volume(),
            BoundingVolume::Sphere(Sphere::new(Vec3::new(1.0, 2.0, 3.0), 2.0))
        );

        let gpu = light.to_gpu();
        assert_eq!(gpu.square_radius_over_one, 0.25);
        assert_eq!(gpu.radius, 2.0);
    }

    #[test]
    fn test_spot_light_volume_contains_cone() {
        let light = SpotLight::new(
            Vec3::zeros(),
            Vec3::new(0.0, 0.0, -2.0),
            8.0,
            30.0_f32.to_radians(),
            20.0_f32.to_radians(),
            Vec3::repeat(1.0),
        );
        let BoundingVolume::Sphere(sphere) = TypedObject::from(light.clone()).bounding_volume() else {
            panic!("spot lights bin as spheres");
        };

        assert!(sphere.center.norm() <= sphere.radius + 1e-4);
        let tip = light.direction * 8.0;
        assert!((tip - sphere.center).norm() <= sphere.radius + 1e-4);
        assert_eq!(light.to_gpu().shadowmap_id, NO_SHADOW_MAP);
    }

    #[test]
    fn test_decal_round_trip_through_projection() {
        let rotation = Rotation3::from_axis_angle(&Vec3::y_axis(), 90.0_f32.to_radians()).into_inner();
        let decal = Decal::new(Vec3::new(0.0, 1.0, -5.0), Vec3::new(2.0, 1.0, 0.5), rotation);

        let product = decal.projection * decal.inv_projection;
        for (a, b) in product.iter().zip(Mat4::identity().iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-5);
        }

        let BoundingVolume::Aabb(aabb) = TypedObject::from(decal.clone()).bounding_volume() else {
            panic!("decals bin as boxes");
        };
        // Local X maps onto world -Z after the rotation
        assert_relative_eq!(aabb.min, Vec3::new(-0.5, 0.0, -7.0), epsilon = 1e-5);
        assert_relative_eq!(aabb.max, Vec3::new(0.5, 2.0, -3.0), epsilon = 1e-5);

        let from_projection = Decal::from_projection(decal.projection).expect("invertible");
        assert_relative_eq!(from_projection.obb().aabb().max, aabb.max, epsilon = 1e-4);
    }

    #[test]
    fn test_singular_decal_projection_rejected() {
        assert!(Decal::from_projection(Mat4::zeros()).is_none());
    }

    #[test]
    fn test_fog_volume_tags_shape() {
        let boxed = FogDensityVolume::boxed(Aabb::new(Vec3::zeros(), Vec3::repeat(1.0)), 0.5);
        let sphere = FogDensityVolume::sphere(Sphere::new(Vec3::zeros(), 3.0), 0.5);

        assert_eq!(boxed.to_gpu().is_box, 1);
        assert_eq!(sphere.to_gpu().is_box, 0);
        assert_eq!(sphere.to_gpu().aabb_max_or_sphere_radius_squared, [9.0; 3]);
        assert!(matches!(
            TypedObject::from(sphere).bounding_volume(),
            BoundingVolume::Sphere(_)
        ));
    }

    #[test]
    fn test_gi_probe_texel_size() {
        let probe = GlobalIlluminationProbe::new(
            Aabb::new(Vec3::zeros(), Vec3::new(4.0, 2.0, 2.0)),
            1.0,
            0.5,
            2,
        );
        assert_eq!(probe.cell_counts(), [4, 2, 2]);
        assert_eq!(probe.to_gpu().half_texel_size_u, 0.5 / 24.0);
    }
}
