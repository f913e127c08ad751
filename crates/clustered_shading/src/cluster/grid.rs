//! Cluster grid descriptor
//!
//! The single authority for cluster index arithmetic. The free functions at the
//! top of this module are the formulas the shading code evaluates per
//! fragment; [`ClusterGridDescriptor`] binds them to a grid's dimensions and the
//! current frame's magic values and adds the depth/uv range helpers binning
//! needs.
//!
//! All formulas are written out component by component in the same order as
//! the shader source in [`super::shader_mirror`] so both sides round the same
//! way.

use super::error::{Axis, ClustererError, ClustererResult};
use super::magic::MagicValues;
use crate::core::config::ClustererConfig;
use crate::foundation::math::{Vec2, Vec3};
use crate::render::primitives::ClusterCamera;

/// Continuous Z cluster coordinate of a world position
///
/// NaN when the position is in front of the near plane; callers clamp to the
/// view frustum first.
#[inline]
pub fn cluster_k_float(magic: &MagicValues, world_pos: &Vec3) -> f32 {
    let v = &magic.val0;
    let dot = v[0] * world_pos.x + v[1] * world_pos.y + v[2] * world_pos.z;
    (dot - v[3]).sqrt()
}

/// Z cluster index of a world position, not clamped to the grid
#[inline]
pub fn cluster_k(magic: &MagicValues, world_pos: &Vec3) -> u32 {
    cluster_k_float(magic, world_pos) as u32
}

/// Linear cluster index from a screen uv and a world position
#[inline]
pub fn cluster_index(
    magic: &MagicValues,
    uv: &Vec2,
    world_pos: &Vec3,
    count_x: u32,
    count_y: u32,
) -> u32 {
    let x = (uv.x * count_x as f32) as u32;
    let y = (uv.y * count_y as f32) as u32;
    let k = cluster_k(magic, world_pos);
    k * (count_x * count_y) + y * count_x + x
}

/// View depth of the near plane of a continuous Z slice
#[inline]
pub fn cluster_near_f(magic: &MagicValues, kf: f32) -> f32 {
    magic.val1[0] * kf * kf + magic.val1[1]
}

/// View depth of the near plane of Z slice `k`
#[inline]
pub fn cluster_near(magic: &MagicValues, k: u32) -> f32 {
    cluster_near_f(magic, k as f32)
}

/// Coordinates into a volume texture enclosing the clusterer
#[inline]
pub fn volume_texture_uvs(magic: &MagicValues, uv: &Vec2, world_pos: &Vec3, count_z: u32) -> Vec3 {
    let k = cluster_k_float(magic, world_pos);
    Vec3::new(uv.x, uv.y, k / count_z as f32)
}

/// Map a normalized device coordinate to screen uv
#[inline]
pub fn uv_from_ndc(ndc: f32) -> f32 {
    ndc * 0.5 + 0.5
}

/// Inclusive, clamped tile span of `[start, end]` on an axis with `count` tiles.
///
/// A coordinate exactly on a tile boundary belongs to the tiles on both sides.
fn inclusive_span(start: f32, end: f32, count: u32) -> (u32, u32) {
    let last_tile = (count - 1) as f32;
    let first = (start.ceil() - 1.0).clamp(0.0, last_tile) as u32;
    let last = end.floor().clamp(0.0, last_tile) as u32;
    (first, last.max(first))
}

/// Grid dimensions plus the current and previous frame's magic values
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterGridDescriptor {
    count_x: u32,
    count_y: u32,
    count_z: u32,
    magic: MagicValues,
    prev_magic: MagicValues,
    near: f32,
    far: f32,
}

impl ClusterGridDescriptor {
    /// Build a grid for `config`, solved for `camera`
    ///
    /// Previous-frame values start out equal to the current ones.
    pub fn new(config: &ClustererConfig, camera: &ClusterCamera) -> ClustererResult<Self> {
        Self::check_counts(config)?;
        config.validate()?;

        let magic = MagicValues::solve_for_view(
            &camera.view,
            camera.near,
            camera.far,
            config.cluster_count_z,
        )?;

        log::info!(
            "Cluster grid {}x{}x{} ({} clusters), near={} far={}",
            config.cluster_count_x,
            config.cluster_count_y,
            config.cluster_count_z,
            config.total_clusters(),
            camera.near,
            camera.far
        );

        Ok(Self {
            count_x: config.cluster_count_x,
            count_y: config.cluster_count_y,
            count_z: config.cluster_count_z,
            magic,
            prev_magic: magic,
            near: camera.near,
            far: camera.far,
        })
    }

    fn check_counts(config: &ClustererConfig) -> ClustererResult<()> {
        let counts = [
            (Axis::X, config.cluster_count_x),
            (Axis::Y, config.cluster_count_y),
            (Axis::Z, config.cluster_count_z),
        ];
        if let Some((axis, _)) = counts.into_iter().find(|(_, count)| *count == 0) {
            return Err(ClustererError::ZeroClusterCount { axis });
        }
        if config.total_clusters() > u64::from(config.max_total_clusters) {
            return Err(ClustererError::TooManyClusters {
                total: config.total_clusters(),
                max: config.max_total_clusters,
            });
        }
        if config.max_indices_per_cluster_per_type == 0 {
            return Err(ClustererError::ZeroBucketCapacity);
        }
        Ok(())
    }

    /// Re-solve for this frame's camera, keeping last frame's values
    pub fn update(&mut self, camera: &ClusterCamera) -> ClustererResult<()> {
        let next = MagicValues::solve_for_view(&camera.view, camera.near, camera.far, self.count_z)?;

        if camera.near != self.near || camera.far != self.far {
            log::debug!(
                "Cluster depth range changed: [{}, {}] -> [{}, {}]",
                self.near,
                self.far,
                camera.near,
                camera.far
            );
        }

        self.prev_magic = self.magic;
        self.magic = next;
        self.near = camera.near;
        self.far = camera.far;
        Ok(())
    }

    /// Tiles along X
    pub fn count_x(&self) -> u32 {
        self.count_x
    }

    /// Tiles along Y
    pub fn count_y(&self) -> u32 {
        self.count_y
    }

    /// Depth slices
    pub fn count_z(&self) -> u32 {
        self.count_z
    }

    /// Total number of clusters
    pub fn cluster_count(&self) -> u32 {
        self.count_x * self.count_y * self.count_z
    }

    /// Current frame's magic values
    pub fn magic(&self) -> &MagicValues {
        &self.magic
    }

    /// Previous frame's magic values
    pub fn prev_magic(&self) -> &MagicValues {
        &self.prev_magic
    }

    /// Near plane distance of the current frame
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far plane distance of the current frame
    pub fn far(&self) -> f32 {
        self.far
    }

    /// Linear index of cluster `(x, y, z)`
    #[inline]
    pub fn linear_index(&self, x: u32, y: u32, z: u32) -> u32 {
        z * (self.count_x * self.count_y) + y * self.count_x + x
    }

    /// Inverse of [`ClusterGridDescriptor::linear_index`]
    pub fn cluster_coordinates(&self, index: u32) -> (u32, u32, u32) {
        let slice = self.count_x * self.count_y;
        let z = index / slice;
        let rest = index % slice;
        (rest % self.count_x, rest / self.count_x, z)
    }

    /// Continuous Z coordinate of a world position
    pub fn cluster_k_float(&self, world_pos: &Vec3) -> f32 {
        cluster_k_float(&self.magic, world_pos)
    }

    /// Z slice of a world position, clamped to the grid
    pub fn cluster_k(&self, world_pos: &Vec3) -> u32 {
        cluster_k(&self.magic, world_pos).min(self.count_z - 1)
    }

    /// Linear cluster index of a fragment
    pub fn cluster_index(&self, uv: &Vec2, world_pos: &Vec3) -> u32 {
        cluster_index(&self.magic, uv, world_pos, self.count_x, self.count_y)
    }

    /// View depth of the near plane of slice `k`
    pub fn cluster_near(&self, k: u32) -> f32 {
        cluster_near(&self.magic, k)
    }

    /// Continuous Z coordinate for a view depth
    ///
    /// Depths in front of the near plane map to 0.
    pub fn cluster_k_float_for_depth(&self, depth: f32) -> f32 {
        let [scale, near, ..] = self.magic.val1;
        ((depth - near) / scale).max(0.0).sqrt()
    }

    /// Inclusive Z slice range covered by the view-depth interval
    /// `[near_depth, far_depth]`
    ///
    /// `None` when the interval lies entirely outside `[near, far]`.
    pub fn z_range_for_depth(&self, near_depth: f32, far_depth: f32) -> Option<(u32, u32)> {
        debug_assert!(!near_depth.is_nan() && !far_depth.is_nan(), "NaN depth range");
        if far_depth < self.near || near_depth > self.far {
            return None;
        }
        Some(inclusive_span(
            self.cluster_k_float_for_depth(near_depth),
            self.cluster_k_float_for_depth(far_depth),
            self.count_z,
        ))
    }

    /// Inclusive tile range along X covered by `[u_min, u_max]`
    pub fn x_range_for_uv(&self, u_min: f32, u_max: f32) -> Option<(u32, u32)> {
        Self::tile_range(u_min, u_max, self.count_x)
    }

    /// Inclusive tile range along Y covered by `[v_min, v_max]`
    pub fn y_range_for_uv(&self, v_min: f32, v_max: f32) -> Option<(u32, u32)> {
        Self::tile_range(v_min, v_max, self.count_y)
    }

    fn tile_range(min: f32, max: f32, count: u32) -> Option<(u32, u32)> {
        debug_assert!(!min.is_nan() && !max.is_nan(), "NaN uv range");
        if max < 0.0 || min > 1.0 {
            return None;
        }
        let scale = count as f32;
        Some(inclusive_span(min * scale, max * scale, count))
    }

    /// Last Z slice whose near plane lies before `distance`
    pub fn last_cluster_for_distance(&self, distance: f32) -> u32 {
        (self.cluster_k_float_for_depth(distance).floor() as u32).min(self.count_z - 1)
    }

    /// Volume texture coordinates of a fragment
    pub fn volume_texture_uvs(&self, uv: &Vec2, world_pos: &Vec3) -> Vec3 {
        volume_texture_uvs(&self.magic, uv, world_pos, self.count_z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4;

    /// 8x8x4 grid with near=1 far=17, giving slice boundaries at depth
    /// 1, 2, 5, 10 and 17
    fn exact_grid() -> ClusterGridDescriptor {
        let camera = ClusterCamera::from_matrices(Mat4::identity(), Mat4::identity(), 1.0, 17.0);
        ClusterGridDescriptor::new(&ClustererConfig::new(8, 8, 4), &camera).expect("valid grid")
    }

    #[test]
    fn test_slice_boundaries() {
        let grid = exact_grid();
        let boundaries: Vec<f32> = (0..=4).map(|k| grid.cluster_near(k)).collect();
        assert_eq!(boundaries, vec![1.0, 2.0, 5.0, 10.0, 17.0]);
    }

    #[test]
    fn test_slice_of_world_position() {
        let grid = exact_grid();
        let slices: Vec<u32> = [1.5, 3.0, 7.0, 12.0, 100.0]
            .iter()
            .map(|&depth| grid.cluster_k(&Vec3::new(0.0, 0.0, -depth)))
            .collect();
        // Beyond the far plane clamps to the last slice
        assert_eq!(slices, vec![0, 1, 2, 3, 3]);
    }

    #[test]
    fn test_linear_index_round_trip() {
        let grid = exact_grid();
        for index in 0..grid.cluster_count() {
            let (x, y, z) = grid.cluster_coordinates(index);
            assert_eq!(grid.linear_index(x, y, z), index);
        }
        assert_eq!(grid.linear_index(3, 2, 1), 64 + 16 + 3);
    }

    #[test]
    fn test_cluster_index_combines_tile_and_slice() {
        let grid = exact_grid();
        // depth 6 is inside slice 2 ([5, 10))
        let index = grid.cluster_index(&Vec2::new(0.40, 0.80), &Vec3::new(0.0, 0.0, -6.0));
        assert_eq!(index, grid.linear_index(3, 6, 2));
    }

    #[test]
    fn test_z_range_touching_boundary_is_inclusive() {
        let grid = exact_grid();

        // Ends exactly on the slice 2 near plane
        assert_eq!(grid.z_range_for_depth(3.0, 5.0), Some((1, 2)));
        // Starts exactly on the slice 2 near plane
        assert_eq!(grid.z_range_for_depth(5.0, 7.0), Some((1, 2)));
        // Strictly inside slice 2
        assert_eq!(grid.z_range_for_depth(6.0, 7.0), Some((2, 2)));
    }

    #[test]
    fn test_z_range_clamped_to_grid() {
        let grid = exact_grid();
        assert_eq!(grid.z_range_for_depth(-4.0, 40.0), Some((0, 3)));
        assert_eq!(grid.z_range_for_depth(-4.0, 0.5), None);
        assert_eq!(grid.z_range_for_depth(18.0, 20.0), None);
    }

    #[test]
    fn test_tile_range() {
        let grid = exact_grid();
        assert_eq!(grid.x_range_for_uv(0.30, 0.45), Some((2, 3)));
        // 0.25 and 0.5 are tile boundaries
        assert_eq!(grid.x_range_for_uv(0.25, 0.5), Some((1, 4)));
        assert_eq!(grid.y_range_for_uv(-0.5, 1.5), Some((0, 7)));
        assert_eq!(grid.y_range_for_uv(1.1, 1.5), None);
        assert_eq!(grid.y_range_for_uv(-0.5, -0.1), None);
    }

    #[test]
    fn test_last_cluster_for_distance() {
        let grid = exact_grid();
        assert_eq!(grid.last_cluster_for_distance(1.5), 0);
        assert_eq!(grid.last_cluster_for_distance(9.0), 2);
        assert_eq!(grid.last_cluster_for_distance(1000.0), 3);
    }

    #[test]
    fn test_update_keeps_previous_values() {
        let mut grid = exact_grid();
        let first = *grid.magic();

        let camera = ClusterCamera::from_matrices(Mat4::identity(), Mat4::identity(), 1.0, 33.0);
        grid.update(&camera).expect("valid camera");

        assert_eq!(*grid.prev_magic(), first);
        assert_eq!(grid.cluster_near(4), 33.0);
        assert_eq!(grid.far(), 33.0);
    }

    #[test]
    fn test_invalid_configurations() {
        let camera = ClusterCamera::from_matrices(Mat4::identity(), Mat4::identity(), 1.0, 17.0);

        assert!(matches!(
            ClusterGridDescriptor::new(&ClustererConfig::new(8, 8, 0), &camera),
            Err(ClustererError::ZeroClusterCount { axis: Axis::Z })
        ));
        assert!(matches!(
            ClusterGridDescriptor::new(
                &ClustererConfig::new(8, 8, 4).with_max_total_clusters(16),
                &camera
            ),
            Err(ClustererError::TooManyClusters { total: 256, max: 16 })
        ));

        let inverted = ClusterCamera::from_matrices(Mat4::identity(), Mat4::identity(), 17.0, 1.0);
        assert!(matches!(
            ClusterGridDescriptor::new(&ClustererConfig::new(8, 8, 4), &inverted),
            Err(ClustererError::InvalidDepthRange { .. })
        ));
    }
}
