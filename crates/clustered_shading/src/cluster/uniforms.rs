//! Per-frame clustering uniforms
//!
//! Everything the shading side needs to locate a fragment's cluster and
//! reproject last frame's results, laid out std140.

use bytemuck::{Pod, Zeroable};

use super::grid::ClusterGridDescriptor;
use super::magic::MagicValues;
use crate::foundation::math::Mat4;
use crate::render::primitives::ClusterCamera;

/// Uniform block shared by every clustered shading pass
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ClusteringUniforms {
    /// This frame's magic values
    pub magic: MagicValues,
    /// Last frame's magic values
    pub prev_magic: MagicValues,
    /// `[count_x, count_y, count_z, count_x * count_y * count_z]`
    pub cluster_count: [u32; 4],
    /// World-space camera position
    pub camera_position: [f32; 3],
    /// Near plane distance
    pub near: f32,
    /// Far plane distance
    pub far: f32,
    /// Last Z slice volumetric passes read
    pub light_volume_last_cluster: u32,
    /// Padding for std140 alignment
    pub padding: [u32; 2],
    /// World to clip, column-major
    pub view_projection: [[f32; 4]; 4],
    /// Last frame's world to clip
    pub prev_view_projection: [[f32; 4]; 4],
    /// Maps this frame's clip space onto last frame's
    pub prev_view_proj_mul_inv_view_proj: [[f32; 4]; 4],
}

const _: () = assert!(std::mem::size_of::<ClusteringUniforms>() == 7 * 16 + 3 * 64);

impl ClusteringUniforms {
    /// Fill the block for this frame
    ///
    /// `light_volume_distance` is the view distance where volumetric effects
    /// stop.
    pub fn new(grid: &ClusterGridDescriptor, camera: &ClusterCamera, light_volume_distance: f32) -> Self {
        let view_projection = camera.view_projection();
        let reprojection = match view_projection.try_inverse() {
            Some(inverse) => camera.prev_view_projection * inverse,
            None => {
                log::warn!("View-projection is singular, reprojection disabled this frame");
                Mat4::identity()
            }
        };

        Self {
            magic: *grid.magic(),
            prev_magic: *grid.prev_magic(),
            cluster_count: [grid.count_x(), grid.count_y(), grid.count_z(), grid.cluster_count()],
            camera_position: camera.position().into(),
            near: grid.near(),
            far: grid.far(),
            light_volume_last_cluster: grid.last_cluster_for_distance(light_volume_distance),
            padding: [0; 2],
            view_projection: view_projection.into(),
            prev_view_projection: camera.prev_view_projection.into(),
            prev_view_proj_mul_inv_view_proj: reprojection.into(),
        }
    }

    /// Raw bytes for upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ClustererConfig;
    use crate::foundation::math::{Mat4Ext, Vec3};
    use approx::assert_relative_eq;

    fn camera() -> ClusterCamera {
        ClusterCamera::perspective(
            Vec3::new(0.0, 1.0, 5.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            60.0,
            1.5,
            1.0,
            17.0,
        )
    }

    #[test]
    fn test_uniforms_carry_grid_state() {
        let camera = camera();
        let grid = ClusterGridDescriptor::new(&ClustererConfig::new(8, 6, 4), &camera).expect("valid grid");
        let uniforms = ClusteringUniforms::new(&grid, &camera, 9.0);

        assert_eq!(uniforms.cluster_count, [8, 6, 4, 192]);
        assert_eq!(uniforms.magic, *grid.magic());
        assert_eq!(uniforms.near, 1.0);
        assert_eq!(uniforms.far, 17.0);
        // Depth 9 lies in slice 2 ([5, 10))
        assert_eq!(uniforms.light_volume_last_cluster, 2);
        assert_relative_eq!(uniforms.camera_position[2], 5.0, epsilon = 1e-5);
        assert_eq!(uniforms.as_bytes().len(), 304);
    }

    #[test]
    fn test_reprojection_is_identity_for_static_camera() {
        let camera = camera();
        let grid = ClusterGridDescriptor::new(&ClustererConfig::new(8, 6, 4), &camera).expect("valid grid");
        let uniforms = ClusteringUniforms::new(&grid, &camera, 9.0);

        let reprojection = Mat4::from(uniforms.prev_view_proj_mul_inv_view_proj);
        for (a, b) in reprojection.iter().zip(Mat4::identity().iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_reprojection_maps_current_clip_to_previous() {
        let mut camera = camera();
        let previous = camera.view_projection();
        let view = Mat4::look_at(
            Vec3::new(1.0, 1.0, 5.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        camera.advance(view, camera.projection, 1.0, 17.0);

        let grid = ClusterGridDescriptor::new(&ClustererConfig::new(8, 6, 4), &camera).expect("valid grid");
        let uniforms = ClusteringUniforms::new(&grid, &camera, 9.0);
        let reprojection = Mat4::from(uniforms.prev_view_proj_mul_inv_view_proj);

        let world = crate::foundation::math::Vec4::new(0.5, 1.5, -3.0, 1.0);
        let expected = previous * world;
        let actual = reprojection * (camera.view_projection() * world);
        assert_relative_eq!(actual, expected, epsilon = 1e-3);
    }
}
