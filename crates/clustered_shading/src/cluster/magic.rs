//! Depth-to-cluster magic values
//!
//! Given a distance `d` from the camera's near plane, the continuous Z cluster
//! coordinate is
//!
//! ```text
//! k = sqrt(d / (f - n) * Cz²)
//! ```
//!
//! where `n`/`f` are the clip planes and `Cz` the number of depth slices. For a
//! world position `W` the distance to the near plane is `d = dot(Pn, W) - Po`
//! (`Pn` the plane normal, `Po` its offset), so
//!
//! ```text
//! k = sqrt(dot(Pn * Cz² / (f - n), W) - Po * Cz² / (f - n))
//!   = sqrt(dot(val0.xyz, W) - val0.w)
//! ```
//!
//! The inverse maps a slice index back to its near-plane view depth:
//!
//! ```text
//! depth(k) = (f - n) / Cz² * k² + n = val1.x * k² + val1.y
//! ```
//!
//! Slices grow quadratically with distance, so clusters near the camera are
//! thin and far ones are deep.

use bytemuck::{Pod, Zeroable};

use super::error::{ClustererError, ClustererResult};
use crate::foundation::math::{Mat4, Vec3};

/// The two constant vectors of the depth-to-cluster formula
///
/// Uploaded verbatim in the per-frame uniforms, so the layout is two `vec4`s.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct MagicValues {
    /// `xyz`: scaled near-plane normal, `w`: scaled near-plane offset
    pub val0: [f32; 4],
    /// `x`: `(f - n) / Cz²`, `y`: near plane distance
    pub val1: [f32; 4],
}

impl MagicValues {
    /// Solve for view-space magic values
    ///
    /// The camera sits at the origin looking down -Z, so the near plane has
    /// normal `(0, 0, -1)` and offset `near`.
    ///
    /// # Panics
    /// If `near >= far`, either plane is not finite or `count_z == 0`. These are
    /// engine configuration invariants; use [`MagicValues::try_solve`] to get an
    /// error instead.
    pub fn solve(near: f32, far: f32, count_z: u32) -> Self {
        assert!(
            near.is_finite() && far.is_finite() && near < far,
            "magic values need near < far (near={}, far={})",
            near,
            far
        );
        assert!(count_z > 0, "magic values need at least one depth slice");
        Self::from_near_plane(Vec3::new(0.0, 0.0, -1.0), near, near, far, count_z)
    }

    /// Checked version of [`MagicValues::solve`]
    pub fn try_solve(near: f32, far: f32, count_z: u32) -> ClustererResult<Self> {
        Self::check(near, far, count_z)?;
        Ok(Self::from_near_plane(Vec3::new(0.0, 0.0, -1.0), near, near, far, count_z))
    }

    /// Solve for world-space magic values of a camera with the given rigid
    /// view matrix
    pub fn solve_for_view(view: &Mat4, near: f32, far: f32, count_z: u32) -> ClustererResult<Self> {
        Self::check(near, far, count_z)?;

        // depth = -(row2 . W + m34), so the near plane is
        // dot(-row2, W) - (m34 + near) = 0
        let normal = Vec3::new(-view.m31, -view.m32, -view.m33);
        let offset = view.m34 + near;
        Ok(Self::from_near_plane(normal, offset, near, far, count_z))
    }

    fn check(near: f32, far: f32, count_z: u32) -> ClustererResult<()> {
        if !(near.is_finite() && far.is_finite() && near < far) {
            return Err(ClustererError::InvalidDepthRange { near, far });
        }
        if count_z == 0 {
            return Err(ClustererError::ZeroClusterCount {
                axis: super::error::Axis::Z,
            });
        }
        Ok(())
    }

    fn from_near_plane(normal: Vec3, offset: f32, near: f32, far: f32, count_z: u32) -> Self {
        let cz = count_z as f32;
        let cz2 = cz * cz;
        let scale = cz2 / (far - near);

        Self {
            val0: [normal.x * scale, normal.y * scale, normal.z * scale, offset * scale],
            val1: [(far - near) / cz2, near, 0.0, 0.0],
        }
    }

    /// Near plane distance these values were solved for
    pub fn near(&self) -> f32 {
        self.val1[1]
    }

    /// Far plane distance reached at `k == count_z`
    pub fn far_for(&self, count_z: u32) -> f32 {
        let k = count_z as f32;
        self.val1[0] * k * k + self.val1[1]
    }
}
