//! World-space bounding volumes
//!
//! Every typed object resolves to one of these before binning. Binning only
//! distinguishes spheres and boxes; oriented boxes are reduced to their
//! enclosing AABB first.

use crate::foundation::math::{Mat3, Mat4, Vec3, utils};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from its corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from a center and half extents
    pub fn from_center_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest AABB enclosing all `points`
    pub fn enclosing(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        Some(rest.iter().fold(Self::new(*first, *first), |aabb, p| Self {
            min: utils::min_vec(&aabb.min, p),
            max: utils::max_vec(&aabb.max, p),
        }))
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        utils::box_corners(&self.min, &self.max)
    }
}

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Center in world space
    pub center: Vec3,
    /// Radius
    pub radius: f32,
}

impl Sphere {
    /// Create a sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere enclosing a cone with apex `apex`, unit axis `direction`,
    /// slant length `range` and half angle `half_angle`
    ///
    /// Wide cones are bounded by the sphere through the cap rim, narrow ones by
    /// the sphere through apex and rim.
    pub fn enclosing_cone(apex: Vec3, direction: Vec3, range: f32, half_angle: f32) -> Self {
        let (sin, cos) = half_angle.sin_cos();
        if half_angle > crate::foundation::math::constants::QUARTER_PI {
            Self::new(apex + direction * (cos * range), sin * range)
        } else {
            let radius = range / (2.0 * cos);
            Self::new(apex + direction * radius, radius)
        }
    }
}

/// Oriented bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    /// Center in world space
    pub center: Vec3,
    /// Half size along each local axis
    pub half_extents: Vec3,
    /// Columns are the local axes in world space
    pub rotation: Mat3,
}

impl Obb {
    /// OBB covered by a projection transform
    ///
    /// `inv_projection` maps the `[-1, 1]³` cube back to world space, as the
    /// inverse of a decal's orthographic projection does.
    pub fn from_inverse_projection(inv_projection: &Mat4) -> Self {
        let center = utils::transform_affine(inv_projection, &Vec3::zeros());
        let axis = |column: usize| {
            Vec3::new(
                inv_projection[(0, column)],
                inv_projection[(1, column)],
                inv_projection[(2, column)],
            )
        };
        let (x, y, z) = (axis(0), axis(1), axis(2));
        let half_extents = Vec3::new(x.norm(), y.norm(), z.norm());

        let normalize = |v: Vec3, len: f32| if len > 0.0 { v / len } else { v };
        let rotation = Mat3::from_columns(&[
            normalize(x, half_extents.x),
            normalize(y, half_extents.y),
            normalize(z, half_extents.z),
        ]);

        Self { center, half_extents, rotation }
    }

    /// Enclosing axis-aligned box
    pub fn aabb(&self) -> Aabb {
        let abs = self.rotation.abs();
        let extent = abs * self.half_extents;
        Aabb::from_center_extents(self.center, extent)
    }
}

/// A resolved world-space bounding volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundingVolume {
    /// Sphere
    Sphere(Sphere),
    /// Axis-aligned box
    Aabb(Aabb),
}

impl BoundingVolume {
    /// Whether every component is finite
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Sphere(s) => {
                s.center.iter().all(|c| c.is_finite()) && s.radius.is_finite() && s.radius >= 0.0
            }
            Self::Aabb(b) => {
                b.min.iter().chain(b.max.iter()).all(|c| c.is_finite())
                    && b.min.x <= b.max.x
                    && b.min.y <= b.max.y
                    && b.min.z <= b.max.z
            }
        }
    }

    /// Box around the volume in the space `transform` maps into
    ///
    /// `transform` must be affine. Spheres stay exact under rigid transforms.
    pub fn transformed_aabb(&self, transform: &Mat4) -> Aabb {
        match self {
            Self::Sphere(s) => {
                let center = utils::transform_affine(transform, &s.center);
                let r = Vec3::repeat(s.radius);
                Aabb::from_center_extents(center, r)
            }
            Self::Aabb(b) => {
                let corners = b.corners().map(|c| utils::transform_affine(transform, &c));
                Aabb::enclosing(&corners).unwrap_or(*b)
            }
        }
    }
}
