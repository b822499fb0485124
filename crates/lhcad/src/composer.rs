//! Placement composition.
//!
//! Converts between stored [`Placement`]s and [`Pose`]s and combines a link's
//! placement with a frame defined inside the linked model:
//! `global = link_placement ∘ local_frame_placement`.

use lhcad_ir::{Placement, Vec3 as IrVec3};
use lhcad_math::{Point3, Pose, PoseError, Vec3};

/// `outer ∘ inner`: apply `inner` first, then `outer`.
pub fn compose(outer: &Pose, inner: &Pose) -> Pose {
    outer.compose(inner)
}

/// Inverse of a pose.
pub fn invert(pose: &Pose) -> Pose {
    pose.inverse()
}

/// Global pose of a frame defined inside a linked model.
pub fn global_frame_pose(link_placement: &Pose, local_frame: &Pose) -> Pose {
    compose(link_placement, local_frame)
}

/// Convert a stored placement to a pose, rejecting non-finite values.
pub fn pose_from_placement(placement: &Placement) -> Result<Pose, PoseError> {
    Pose::from_axis_angle_degrees(
        vec_from_ir(&placement.base),
        vec_from_ir(&placement.axis),
        placement.angle,
    )
}

/// Convert a pose to its stored axis/angle form.
pub fn placement_from_pose(pose: &Pose) -> Placement {
    let (axis, angle) = pose.axis_angle();
    Placement {
        base: vec_to_ir(&pose.translation_vec()),
        axis: vec_to_ir(&axis),
        angle: angle.to_degrees(),
    }
}

pub(crate) fn vec_from_ir(v: &IrVec3) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub(crate) fn vec_to_ir(v: &Vec3) -> IrVec3 {
    IrVec3::new(v.x, v.y, v.z)
}

pub(crate) fn point_from_ir(v: &IrVec3) -> Point3 {
    Point3::new(v.x, v.y, v.z)
}

pub(crate) fn point_to_ir(p: &Point3) -> IrVec3 {
    IrVec3::new(p.x, p.y, p.z)
}
