//! End-to-end binning tests
//!
//! Drive collector, bin and packer together on small scenes whose expected
//! cluster coverage can be worked out by hand.

use crate::cluster::{
    cluster_range, BoundingVolume, ClusterGridDescriptor, ClusterRange, ClusteredShading, ClustererBin,
    IndexPacker, ObjectKind, PackedClusters, PointLight, Sphere, TypedObject, TypedObjectCollector,
};
use crate::core::config::ClustererConfig;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::primitives::ClusterCamera;

/// Camera at the origin looking down -Z with near=0.1 far=100
///
/// The frustum is shifted so the forward axis projects to uv 0.375 on both
/// axes, the middle of tile 3 on an 8 tile axis.
fn offset_camera() -> ClusterCamera {
    let (near, far) = (0.1, 100.0);
    ClusterCamera::from_matrices(
        Mat4::identity(),
        Mat4::frustum(-0.25, 5.0 / 12.0, -0.25, 5.0 / 12.0, near, far),
        near,
        far,
    )
}

/// Camera with a 90 degree frustum, near=1 far=17; slices of a 4 slice grid
/// start at depth 1, 2, 5 and 10
fn exact_camera() -> ClusterCamera {
    ClusterCamera::from_matrices(
        Mat4::identity(),
        Mat4::frustum(-1.0, 1.0, -1.0, 1.0, 1.0, 17.0),
        1.0,
        17.0,
    )
}

fn run(config: &ClustererConfig, camera: &ClusterCamera, objects: &[TypedObject]) -> (ClusterGridDescriptor, PackedClusters) {
    let grid = ClusterGridDescriptor::new(config, camera).expect("valid grid");
    let mut collector = TypedObjectCollector::new();
    collector.begin_frame();
    for object in objects {
        collector.push(object.clone());
    }

    let mut bin = ClustererBin::new(config);
    bin.bin(&grid, camera, collector.finish());

    let mut packed = PackedClusters::new();
    IndexPacker::new(config)
        .pack(bin.buckets(), &mut packed)
        .expect("indices fit");
    (grid, packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_light_on_forward_axis() {
        crate::foundation::logging::init_for_tests();
        let camera = offset_camera();
        let config = ClustererConfig::new(8, 8, 4);
        let light = PointLight::new(Vec3::new(0.0, 0.0, -5.0), 2.0, Vec3::repeat(1.0));

        let (grid, packed) = run(&config, &camera, &[light.clone().into()]);

        // The sphere spans depth 3 to 7
        let first_z = grid.cluster_k_float_for_depth(3.0) as u32;
        let last_z = grid.cluster_k_float_for_depth(7.0) as u32;
        assert_eq!((first_z, last_z), (0, 1));

        let expected_range = ClusterRange { x: (2, 3), y: (2, 3), z: (first_z, last_z) };
        let volume = BoundingVolume::Sphere(Sphere::new(light.position, light.radius));
        assert_eq!(cluster_range(&grid, &camera, &volume), Some(expected_range));

        let mut covered = 0;
        for cluster in 0..grid.cluster_count() {
            let (x, y, z) = grid.cluster_coordinates(cluster);
            let expected = expected_range.contains(x, y, z);
            let lights = packed.indices_for(cluster, ObjectKind::PointLight);

            if expected {
                assert_eq!(lights, &[0], "cluster ({}, {}, {}) misses the light", x, y, z);
                covered += 1;
            } else {
                assert!(lights.is_empty(), "cluster ({}, {}, {}) should be empty", x, y, z);
            }
        }
        assert_eq!(covered, 8);
        assert_eq!(packed.indices().len(), 8);
    }

    #[test]
    fn test_point_light_through_pipeline() {
        let camera = offset_camera();
        let mut shading = ClusteredShading::new(ClustererConfig::new(8, 8, 4), &camera).expect("valid config");
        let objects: Vec<TypedObject> =
            vec![PointLight::new(Vec3::new(0.0, 0.0, -5.0), 2.0, Vec3::repeat(1.0)).into()];

        let frame = shading.prepare_frame(&camera, &objects).expect("frame fits");

        assert_eq!(frame.stats.insertions, 8);
        assert_eq!(frame.stats.cluster_visits, 8);
        let cluster = frame.grid.linear_index(3, 2, 1);
        assert_eq!(frame.packed.indices_for(cluster, ObjectKind::PointLight), &[0]);
    }

    #[test]
    fn test_tangent_sphere_included_in_boundary_slice() {
        let camera = exact_camera();
        let config = ClustererConfig::new(8, 8, 4);
        // Nearest point sits exactly on the near plane of slice 2 (depth 5)
        let light = PointLight::new(Vec3::new(2.625, 2.625, -7.0), 2.0, Vec3::repeat(1.0));

        let (grid, packed) = run(&config, &camera, &[light.into()]);

        let slice_1 = grid.linear_index(5, 5, 1);
        let slice_2 = grid.linear_index(5, 5, 2);
        assert_eq!(packed.indices_for(slice_1, ObjectKind::PointLight), &[0]);
        assert_eq!(packed.indices_for(slice_2, ObjectKind::PointLight), &[0]);
        let slice_0 = grid.linear_index(5, 5, 0);
        assert!(packed.indices_for(slice_0, ObjectKind::PointLight).is_empty());
    }

    #[test]
    fn test_small_light_touches_only_its_clusters() {
        let camera = exact_camera();
        let config = ClustererConfig::new(8, 8, 4);
        let grid = ClusterGridDescriptor::new(&config, &camera).expect("valid grid");

        let inside = PointLight::new(Vec3::new(2.625, 2.625, -7.0), 0.01, Vec3::repeat(1.0));
        // On the boundary between tiles 3 and 4 along X
        let on_edge = PointLight::new(Vec3::new(0.0, 2.625, -7.0), 0.01, Vec3::repeat(1.0));

        for (light, expected) in [(inside, 1), (on_edge, 2)] {
            let mut collector = TypedObjectCollector::new();
            collector.begin_frame();
            collector.push(light);
            let mut bin = ClustererBin::new(&config);
            let stats = bin.bin(&grid, &camera, collector.finish());

            assert_eq!(stats.cluster_visits, expected);
            assert_eq!(stats.insertions, expected);
            assert_eq!(bin.buckets().total_len(), expected);
        }
    }

    #[test]
    fn test_kinds_are_binned_separately() {
        let camera = exact_camera();
        let config = ClustererConfig::new(8, 8, 4);
        let center = Vec3::new(2.625, 2.625, -7.0);
        let objects: Vec<TypedObject> = vec![
            crate::cluster::FogDensityVolume::sphere(crate::cluster::Sphere::new(center, 0.01), 1.0).into(),
            PointLight::new(center, 0.01, Vec3::repeat(1.0)).into(),
            PointLight::new(center, 0.01, Vec3::repeat(1.0)).into(),
        ];

        let (grid, packed) = run(&config, &camera, &objects);
        let cluster = grid.linear_index(5, 5, 2);

        assert_eq!(packed.indices_for(cluster, ObjectKind::PointLight), &[0, 1]);
        assert_eq!(packed.indices_for(cluster, ObjectKind::FogDensityVolume), &[0]);
        assert!(packed.indices_for(cluster, ObjectKind::Decal).is_empty());
    }
}
