//! Surface frames.
//!
//! A sensor is seated on the tracker by projecting its base frame origin onto
//! the nearest face of the tracker body and building a local coordinate
//! system there: origin on the surface, Z along the face normal, X along a
//! session-wide auxiliary direction.
//!
//! The nearest-point query itself belongs to a geometry kernel and sits
//! behind [`SurfaceQuery`]. [`PlanarSurfaceQuery`] answers it for the planar
//! faces the document model stores.

use lhcad_ir::{Face, Shape};
use lhcad_math::{Point3, Pose, Tolerance, Vec3};

use crate::composer::{point_from_ir, vec_from_ir};
use crate::error::{PlacementError, Result};

/// Closest point on a surface and the face normal there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Closest point on the face.
    pub point: Point3,
    /// Outward unit normal of the face at `point`.
    pub normal: Vec3,
    /// Distance from the probe point.
    pub distance: f64,
}

/// Nearest point / normal queries against solid geometry.
pub trait SurfaceQuery {
    /// Closest point on a single face, or `None` if the face cannot be
    /// evaluated.
    fn nearest_on_face(&self, face: &Face, point: &Point3) -> Option<SurfaceHit>;

    /// Closest point over all faces of all valid solids of `shape`.
    ///
    /// Ties keep the first face encountered, walking solids and faces in
    /// stored order. Returns `None` when no valid face exists.
    fn find_nearest_point_and_normal(&self, shape: &Shape, point: &Point3) -> Option<SurfaceHit> {
        let mut best: Option<SurfaceHit> = None;
        for solid in shape.solids.iter().filter(|s| s.valid) {
            for face in &solid.faces {
                let Some(hit) = self.nearest_on_face(face, point) else {
                    continue;
                };
                if best.map_or(true, |b| hit.distance < b.distance) {
                    best = Some(hit);
                }
            }
        }
        best
    }
}

/// [`SurfaceQuery`] for bounded planar faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarSurfaceQuery;

impl SurfaceQuery for PlanarSurfaceQuery {
    fn nearest_on_face(&self, face: &Face, point: &Point3) -> Option<SurfaceHit> {
        match face {
            Face::Rectangle {
                center,
                normal,
                u_dir,
                half_u,
                half_v,
            } => {
                let tol = Tolerance::DEFAULT.linear;
                let n = vec_from_ir(normal).try_normalize(tol)?;
                let u_raw = vec_from_ir(u_dir);
                let u = (u_raw - n * u_raw.dot(&n)).try_normalize(tol)?;
                let v = n.cross(&u);
                let c = point_from_ir(center);

                let d = point - c;
                let a = d.dot(&u).clamp(-half_u.abs(), half_u.abs());
                let b = d.dot(&v).clamp(-half_v.abs(), half_v.abs());
                let closest = c + u * a + v * b;
                Some(SurfaceHit {
                    point: closest,
                    normal: n,
                    distance: (point - closest).norm(),
                })
            }
        }
    }
}

/// Run the nearest query, failing with [`PlacementError::NoSurfaceFound`]
/// when `shape` has no valid face.
pub fn nearest_surface(
    query: &impl SurfaceQuery,
    shape: &Shape,
    point: &Point3,
    shape_label: &str,
    operation: &'static str,
) -> Result<SurfaceHit> {
    query
        .find_nearest_point_and_normal(shape, point)
        .ok_or_else(|| PlacementError::NoSurfaceFound {
            label: shape_label.to_string(),
            operation,
        })
}

/// Sensor X direction for a session: `initial` rotated by the mainboard
/// link's orientation. Computed once and shared by every sensor.
pub fn aux_direction(mainboard_placement: &Pose, initial: &Vec3) -> Vec3 {
    mainboard_placement.apply_vec(initial)
}

/// A local coordinate system defined by three anchor points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Point the frame was built for.
    pub probe_point: Point3,
    /// Frame origin, on the surface.
    pub surface_point: Point3,
    /// `surface_point + normal`; the local Z axis points here.
    pub normal_point: Point3,
    /// `surface_point + aux_direction`; the local X axis leans toward here.
    pub aux_point: Point3,
    /// Resulting frame placement.
    pub pose: Pose,
}

impl Frame {
    /// Distance the probe point was moved to reach the surface.
    pub fn projection_distance(&self) -> f64 {
        (self.surface_point - self.probe_point).norm()
    }
}

/// Build the frame anchored at `nearest_point`.
///
/// Local Z is aligned with `normal`; local X is `aux_direction` with its
/// normal component removed. A zero normal or an auxiliary direction
/// parallel to the normal is an [`PlacementError::InvalidPose`].
pub fn build_frame(
    probe_point: &Point3,
    nearest_point: &Point3,
    normal: &Vec3,
    aux_direction: &Vec3,
) -> Result<Frame> {
    let normal_point = nearest_point + normal;
    let aux_point = nearest_point + aux_direction;
    let pose = Pose::from_origin_and_axes(
        *nearest_point,
        normal_point - nearest_point,
        aux_point - nearest_point,
    )?;
    Ok(Frame {
        probe_point: *probe_point,
        surface_point: *nearest_point,
        normal_point,
        aux_point,
        pose,
    })
}
