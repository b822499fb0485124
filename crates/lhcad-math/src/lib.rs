#![warn(missing_docs)]

//! Math types for lhcad sensor placement.
//!
//! Thin wrappers around nalgebra providing the rigid [`Pose`] used for
//! link placements, local coordinate systems and corrections, plus the
//! point/vector aliases and tolerance constants shared by the other crates.
//!
//! Lengths are conventionally millimeters.

use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, Unit, UnitQuaternion, Vector3};
use thiserror::Error;

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// Errors raised while constructing a [`Pose`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    /// A translation, axis or angle component is NaN or infinite.
    #[error("non-finite {0} component")]
    NonFinite(&'static str),

    /// A non-zero rotation angle was given with a zero-length axis.
    #[error("rotation axis has zero length for a non-zero angle")]
    ZeroAxis,

    /// Frame axes are zero or parallel.
    #[error("degenerate frame: {0}")]
    DegenerateFrame(&'static str),
}

/// A rigid transform: rotation followed by translation.
///
/// `a.compose(&b)` is `a ∘ b`: `b` is applied first, then `a`. This matches
/// how a link placement combines with a placement expressed inside the linked
/// model: `global = link.compose(&local)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    iso: Isometry3<f64>,
}

impl Pose {
    /// Identity pose.
    pub fn identity() -> Self {
        Self {
            iso: Isometry3::identity(),
        }
    }

    /// Build a pose from a translation and a unit quaternion.
    pub fn new(translation: Vec3, rotation: UnitQuaternion<f64>) -> Result<Self, PoseError> {
        if !translation.iter().all(|c| c.is_finite()) {
            return Err(PoseError::NonFinite("translation"));
        }
        if !rotation.coords.iter().all(|c| c.is_finite()) {
            return Err(PoseError::NonFinite("rotation"));
        }
        Ok(Self {
            iso: Isometry3::from_parts(Translation3::from(translation), rotation),
        })
    }

    /// Pure translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Result<Self, PoseError> {
        Self::new(Vec3::new(dx, dy, dz), UnitQuaternion::identity())
    }

    /// Build a pose from a translation and a rotation of `angle` radians
    /// about `axis`.
    ///
    /// The axis does not need to be normalized. A zero angle yields the
    /// identity rotation whatever the axis; a zero axis with a non-zero
    /// angle is rejected.
    pub fn from_axis_angle(translation: Vec3, axis: Vec3, angle: f64) -> Result<Self, PoseError> {
        if !axis.iter().all(|c| c.is_finite()) {
            return Err(PoseError::NonFinite("axis"));
        }
        if !angle.is_finite() {
            return Err(PoseError::NonFinite("angle"));
        }
        if angle == 0.0 {
            return Self::new(translation, UnitQuaternion::identity());
        }
        let axis = Unit::try_new(axis, f64::EPSILON).ok_or(PoseError::ZeroAxis)?;
        Self::new(translation, UnitQuaternion::from_axis_angle(&axis, angle))
    }

    /// Same as [`Pose::from_axis_angle`] with the angle in degrees.
    pub fn from_axis_angle_degrees(
        translation: Vec3,
        axis: Vec3,
        angle_degrees: f64,
    ) -> Result<Self, PoseError> {
        Self::from_axis_angle(translation, axis, angle_degrees.to_radians())
    }

    /// Build a frame at `origin` whose local Z axis points along `z` and
    /// whose local X axis points along the component of `x_hint` orthogonal
    /// to `z`. Local Y completes the right-handed basis.
    pub fn from_origin_and_axes(origin: Point3, z: Vec3, x_hint: Vec3) -> Result<Self, PoseError> {
        if !origin.coords.iter().all(|c| c.is_finite()) {
            return Err(PoseError::NonFinite("translation"));
        }
        if !z.iter().chain(x_hint.iter()).all(|c| c.is_finite()) {
            return Err(PoseError::NonFinite("axis"));
        }
        let z_dir = Unit::try_new(z, Tolerance::DEFAULT.linear)
            .ok_or(PoseError::DegenerateFrame("zero-length Z axis"))?;
        let x_ortho = x_hint - z_dir.as_ref() * x_hint.dot(z_dir.as_ref());
        let x_dir = Unit::try_new(x_ortho, Tolerance::DEFAULT.linear)
            .ok_or(PoseError::DegenerateFrame("X direction parallel to Z axis"))?;
        let y_dir = z_dir.cross(x_dir.as_ref());

        let basis = Matrix3::from_columns(&[x_dir.into_inner(), y_dir, z_dir.into_inner()]);
        let rotation =
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis));
        Self::new(origin.coords, rotation)
    }

    /// Translation component.
    pub fn translation_vec(&self) -> Vec3 {
        self.iso.translation.vector
    }

    /// Translation component as a point (the frame origin).
    pub fn origin(&self) -> Point3 {
        Point3::from(self.iso.translation.vector)
    }

    /// Rotation as a 3x3 matrix; columns are the local X, Y, Z axes.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.iso.rotation.to_rotation_matrix().into_inner()
    }

    /// Rotation as `(unit axis, angle in radians)` with the angle in `[0, π]`.
    ///
    /// The identity rotation reports the +Z axis and a zero angle.
    pub fn axis_angle(&self) -> (Vec3, f64) {
        match self.iso.rotation.axis_angle() {
            Some((axis, angle)) => (axis.into_inner(), angle),
            None => (Vec3::z(), 0.0),
        }
    }

    /// Compose: `self ∘ inner` (`inner` applied first).
    pub fn compose(&self, inner: &Pose) -> Pose {
        Pose {
            iso: self.iso * inner.iso,
        }
    }

    /// Inverse pose. Always exists for a rigid transform.
    pub fn inverse(&self) -> Pose {
        Pose {
            iso: self.iso.inverse(),
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        self.iso.transform_point(p)
    }

    /// Rotate a direction vector (translation is ignored).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        self.iso.transform_vector(v)
    }

    /// The local X axis expressed in the parent frame.
    pub fn axis_x(&self) -> Vec3 {
        self.apply_vec(&Vec3::x())
    }

    /// The local Z axis expressed in the parent frame.
    pub fn axis_z(&self) -> Vec3 {
        self.apply_vec(&Vec3::z())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in mm.
    pub linear: f64,
    /// Tolerance on rotation matrix entries (roughly radians for small
    /// differences).
    pub angular: f64,
}

impl Tolerance {
    /// Default tolerances (1e-6 mm linear, 1e-9 angular).
    pub const DEFAULT: Self = Self {
        linear: 1e-6,
        angular: 1e-9,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if two poses coincide: origins within `linear`, rotation
    /// matrix entries within `angular`.
    pub fn poses_equal(&self, a: &Pose, b: &Pose) -> bool {
        let dt = (a.translation_vec() - b.translation_vec()).norm();
        let dr = (a.rotation_matrix() - b.rotation_matrix()).amax();
        dt < self.linear && dr < self.angular
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}
