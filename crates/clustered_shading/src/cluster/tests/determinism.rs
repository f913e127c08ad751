//! Worker-count independence and packing invariants
//!
//! Binning splits objects across workers; the packed output must not depend on
//! how many there are, including which objects a full bucket keeps.

use crate::cluster::{
    Aabb, ClusterGridDescriptor, ClustererBin, Decal, FogDensityVolume, IndexPacker, ObjectKind,
    PackedClusters, PointLight, ReflectionProbe, SpotLight, Sphere, TypedObject, TypedObjectCollector,
};
use crate::core::config::ClustererConfig;
use crate::foundation::math::{Mat3, Vec3};
use crate::render::primitives::ClusterCamera;

const WORKER_COUNTS: [usize; 5] = [1, 2, 3, 4, 8];

fn camera() -> ClusterCamera {
    ClusterCamera::perspective(
        Vec3::new(0.0, 2.0, 10.0),
        Vec3::new(0.0, 0.0, -10.0),
        Vec3::new(0.0, 1.0, 0.0),
        70.0,
        16.0 / 9.0,
        0.1,
        60.0,
    )
}

/// A busy scene of every kind, laid out on a deterministic pattern
fn scene() -> Vec<TypedObject> {
    let mut objects = Vec::new();
    for i in 0..120 {
        let t = i as f32;
        let position = Vec3::new((t * 0.37).sin() * 12.0, (t * 0.11).cos() * 3.0, -(t * 0.41) % 40.0);
        let object: TypedObject = match i % 6 {
            0 => PointLight::new(position, 1.0 + (t * 0.7).sin().abs() * 3.0, Vec3::repeat(1.0)).into(),
            1 => SpotLight::new(
                position,
                Vec3::new(0.2, -1.0, -0.3),
                6.0,
                35.0_f32.to_radians(),
                25.0_f32.to_radians(),
                Vec3::repeat(1.0),
            )
            .into(),
            2 => ReflectionProbe::new(
                position,
                Aabb::from_center_extents(position, Vec3::new(3.0, 2.0, 3.0)),
                i,
            )
            .into(),
            3 => crate::cluster::GlobalIlluminationProbe::new(
                Aabb::from_center_extents(position, Vec3::repeat(4.0)),
                1.0,
                0.5,
                i,
            )
            .into(),
            4 => Decal::new(position, Vec3::new(1.0, 1.0, 0.25), Mat3::identity()).into(),
            _ => FogDensityVolume::sphere(Sphere::new(position, 2.5), 0.1).into(),
        };
        objects.push(object);
    }
    objects
}

fn pack_with_workers(config: &ClustererConfig, objects: &[TypedObject]) -> (ClusterGridDescriptor, PackedClusters) {
    let camera = camera();
    let grid = ClusterGridDescriptor::new(config, &camera).expect("valid grid");
    let mut collector = TypedObjectCollector::new();
    collector.begin_frame();
    for object in objects {
        collector.push(object.clone());
    }

    let mut bin = ClustererBin::new(config);
    bin.bin(&grid, &camera, collector.finish());

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
    fn test_output_independent_of_worker_count() {
        let objects = scene();
        let base = ClustererConfig::new(16, 9, 24).with_max_indices_per_cluster_per_type(3);
        let (_, reference) = pack_with_workers(&base.clone().with_worker_count(1), &objects);
        assert!(!reference.indices().is_empty());

        for workers in WORKER_COUNTS {
            let (_, packed) = pack_with_workers(&base.clone().with_worker_count(workers), &objects);
            assert_eq!(packed.records(), reference.records(), "records differ with {} workers", workers);
            assert_eq!(packed.indices(), reference.indices(), "indices differ with {} workers", workers);
        }
    }

    #[test]
    fn test_full_bucket_keeps_first_objects() {
        // Nine lights in the same single cluster, bucket capacity four
        let camera = camera();
        let target = Vec3::new(0.0, 1.0, -5.0);
        let objects: Vec<TypedObject> = (0..9)
            .map(|_| PointLight::new(target, 0.01, Vec3::repeat(1.0)).into())
            .collect();

        for workers in WORKER_COUNTS {
            let config = ClustererConfig::new(16, 9, 24)
                .with_max_indices_per_cluster_per_type(4)
                .with_worker_count(workers);
            let grid = ClusterGridDescriptor::new(&config, &camera).expect("valid grid");

            let mut collector = TypedObjectCollector::new();
            collector.begin_frame();
            for object in &objects {
                collector.push(object.clone());
            }
            let mut bin = ClustererBin::new(&config);
            let stats = bin.bin(&grid, &camera, collector.finish());
            let mut packed = PackedClusters::new();
            IndexPacker::new(&config)
                .pack(bin.buckets(), &mut packed)
                .expect("indices fit");

            let occupied: Vec<u32> = (0..grid.cluster_count())
                .filter(|&c| packed.range(c, ObjectKind::PointLight).count > 0)
                .collect();
            assert!(!occupied.is_empty());
            for cluster in occupied {
                assert_eq!(
                    packed.indices_for(cluster, ObjectKind::PointLight),
                    &[0, 1, 2, 3],
                    "wrong survivors with {} workers",
                    workers
                );
            }
            assert_eq!(stats.dropped, 5 * (stats.cluster_visits / 9));
        }
    }

    #[test]
    fn test_packing_invariants_on_busy_scene() {
        let config = ClustererConfig::new(16, 9, 24).with_worker_count(4);
        let (grid, packed) = pack_with_workers(&config, &scene());

        assert_eq!(packed.records().len(), grid.cluster_count() as usize);

        let mut expected_offset = 0;
        for record in packed.records() {
            for range in record.ranges {
                assert_eq!(range.offset, expected_offset);
                assert!(range.end() as usize <= packed.indices().len());
                expected_offset = range.end();
            }
        }
        assert_eq!(expected_offset as usize, packed.indices().len());

        // Buckets are duplicate free
        for cluster in 0..grid.cluster_count() {
            for kind in ObjectKind::ALL {
                let mut indices = packed.indices_for(cluster, kind).to_vec();
                let len = indices.len();
                indices.sort_unstable();
                indices.dedup();
                assert_eq!(indices.len(), len);
            }
        }
    }
}
