//! Math utilities and types
//!
//! Provides the fundamental math types used by the clustering code and the
//! projection helpers that build camera matrices.
//!
//! # Conventions
//!
//! - Right-handed view space, camera looking down -Z
//! - OpenGL-style clip space (NDC X/Y/Z in `[-1, 1]`)
//! - View depth of a point is `-z` of its view-space position

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 4
    pub const QUARTER_PI: f32 = PI * 0.25;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Component-wise minimum of two vectors
    pub fn min_vec(a: &Vec3, b: &Vec3) -> Vec3 {
        Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z))
    }

    /// Component-wise maximum of two vectors
    pub fn max_vec(a: &Vec3, b: &Vec3) -> Vec3 {
        Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z))
    }

    /// Transform a point by an affine matrix (no perspective divide)
    pub fn transform_affine(m: &Mat4, p: &Vec3) -> Vec3 {
        Vec3::new(
            m.m11 * p.x + m.m12 * p.y + m.m13 * p.z + m.m14,
            m.m21 * p.x + m.m22 * p.y + m.m23 * p.z + m.m24,
            m.m31 * p.x + m.m32 * p.y + m.m33 * p.z + m.m34,
        )
    }

    /// The eight corners of the box spanned by `min` and `max`
    pub fn box_corners(min: &Vec3, max: &Vec3) -> [Vec3; 8] {
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }
}

/// Extension trait for Mat4 with projection and view constructors
pub trait Mat4Ext {
    /// Create a symmetric perspective projection matrix
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create an off-centre perspective projection matrix
    ///
    /// `left`, `right`, `bottom` and `top` are the extents of the near plane
    /// rectangle in view space, same layout as `glFrustum`.
    fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Create a look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        let width = right - left;
        let height = top - bottom;
        let depth = far - near;

        // P = [2n/(r-l)  0         (r+l)/(r-l)   0          ]
        //     [0         2n/(t-b)  (t+b)/(t-b)   0          ]
        //     [0         0         -(f+n)/(f-n)  -2fn/(f-n) ]
        //     [0         0         -1            0          ]
        Mat4::new(
            2.0 * near / width, 0.0, (right + left) / width, 0.0,
            0.0, 2.0 * near / height, (top + bottom) / height, 0.0,
            0.0, 0.0, -(far + near) / depth, -2.0 * far * near / depth,
            0.0, 0.0, -1.0, 0.0,
        )
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }
}
