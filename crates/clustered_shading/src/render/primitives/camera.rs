//! # Cluster Camera
//!
//! The per-frame camera state the clusterer needs: view and projection
//! matrices, the clip planes and last frame's view-projection for temporal
//! reprojection.
//!
//! ## Design Principles
//! - **Plain data**: No renderer handles, the camera is copied into each frame
//! - **Rigid views**: The view matrix is assumed to be rotation + translation,
//!   which keeps view depth a single dot product
//! - **Explicit history**: Previous-frame state is carried here instead of
//!   being looked up from global state

use crate::foundation::math::{Mat4, Mat4Ext, Vec3, utils};

/// Camera parameters consumed by the clustering pipeline
///
/// # Coordinate System
/// Right-handed view space, camera looking down -Z. View depth of a point is
/// therefore `-z` of its view-space position, and `near`/`far` are positive
/// distances along the view direction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterCamera {
    /// World to view transform
    pub view: Mat4,

    /// View to clip transform
    pub projection: Mat4,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,

    /// View-projection of the previous frame
    pub prev_view_projection: Mat4,
}

impl ClusterCamera {
    /// Create a perspective camera looking from `eye` towards `target`
    ///
    /// # Arguments
    /// * `eye` - Camera position in world space
    /// * `target` - Point the camera looks at
    /// * `up` - Up vector, typically +Y
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Viewport width / height
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// # Example
    /// ```rust
    /// use clustered_shading::foundation::math::Vec3;
    /// use clustered_shading::render::primitives::ClusterCamera;
    ///
    /// let camera = ClusterCamera::perspective(
    ///     Vec3::new(0.0, 2.0, 5.0),
    ///     Vec3::zeros(),
    ///     Vec3::new(0.0, 1.0, 0.0),
    ///     75.0,
    ///     16.0 / 9.0,
    ///     0.1,
    ///     100.0,
    /// );
    /// assert!(camera.view_depth(&Vec3::zeros()) > 0.0);
    /// ```
    pub fn perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let view = Mat4::look_at(eye, target, up);
        let projection = Mat4::perspective(utils::deg_to_rad(fov_degrees), aspect, near, far);
        Self::from_matrices(view, projection, near, far)
    }

    /// Create a camera from explicit matrices
    ///
    /// The previous view-projection starts out equal to the current one.
    pub fn from_matrices(view: Mat4, projection: Mat4, near: f32, far: f32) -> Self {
        Self {
            view,
            projection,
            near,
            far,
            prev_view_projection: projection * view,
        }
    }

    /// Combined world to clip transform
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        let v = &self.view;
        // -R^T * t for a rigid view matrix
        Vec3::new(
            -(v.m11 * v.m14 + v.m21 * v.m24 + v.m31 * v.m34),
            -(v.m12 * v.m14 + v.m22 * v.m24 + v.m32 * v.m34),
            -(v.m13 * v.m14 + v.m23 * v.m24 + v.m33 * v.m34),
        )
    }

    /// Distance of a world-space point along the view direction
    pub fn view_depth(&self, world_pos: &Vec3) -> f32 {
        let v = &self.view;
        -(v.m31 * world_pos.x + v.m32 * world_pos.y + v.m33 * world_pos.z + v.m34)
    }

    /// Move to the next frame's matrices, keeping the current view-projection
    /// as the previous one
    pub fn advance(&mut self, view: Mat4, projection: Mat4, near: f32, far: f32) {
        self.prev_view_projection = self.view_projection();
        self.view = view;
        self.projection = projection;
        self.near = near;
        self.far = far;
        log::trace!("Cluster camera advanced, near={} far={}", near, far);
    }
}
