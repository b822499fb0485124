//! Document-level workflows.
//!
//! Each workflow resolves every object it needs and computes every new
//! placement before it writes anything, so a failure leaves the document
//! untouched.
//!
//! Typical session:
//!
//! 1. [`place_and_cut_sensors`] seats each sensor on the nearest tracker
//!    face and records the recesses cut by the stamp.
//! 2. The user nudges sensors by hand; [`recut_sensors`] rebuilds the cut.
//! 3. [`save_corrections`] stores the nudges; after the tracker shape changes,
//!    placing again and calling [`load_corrections`] reapplies them.
//! 4. [`save_export`] writes the lighthouse JSON.

use std::path::Path;

use lhcad_ir::{Document, DocumentObject, ObjectKind, Placement};
use lhcad_math::{Point3, Pose};
use tracing::{debug, info, warn};

use crate::composer::{placement_from_pose, point_to_ir};
use crate::config::PlacementConfig;
use crate::correction::{apply_correction, compute_correction, read_corrections_for, write_corrections};
use crate::error::{PlacementError, Result};
use crate::export::{format_export, write_export, ExportDocument, ImuRecord, SensorRecord};
use crate::frame::{aux_direction, build_frame, nearest_surface, Frame, SurfaceQuery};
use crate::lookup::{self, sensor_frame_name};

/// Which stamp shape cuts the sensor recesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StampVariant {
    /// The detailed mounting stamp.
    #[default]
    Full,
    /// A simple aperture shape, for simulation models.
    Simplified,
}

impl StampVariant {
    fn stamp_label<'c>(&self, config: &'c PlacementConfig) -> &'c str {
        match self {
            StampVariant::Full => &config.stamp_label,
            StampVariant::Simplified => &config.stamp_simplified_label,
        }
    }

    /// Internal name of the cut object this variant produces.
    pub fn cut_name(&self) -> &'static str {
        match self {
            StampVariant::Full => "cut_obj",
            StampVariant::Simplified => "cut_obj_sim",
        }
    }

    fn cut_label(&self) -> &'static str {
        match self {
            StampVariant::Full => "Tracker edited",
            StampVariant::Simplified => "Tracker edited (simple)",
        }
    }
}

/// A cut to be recorded: tracker body minus stamp at each placement.
struct PlannedCut {
    base: String,
    tool: String,
    tool_placements: Vec<Placement>,
}

impl PlannedCut {
    /// Resolve tracker body and stamp, and place the stamp's base frame on
    /// each of `frames`.
    fn plan(
        doc: &Document,
        config: &PlacementConfig,
        variant: StampVariant,
        frames: &[Pose],
        operation: &'static str,
    ) -> Result<Self> {
        let (tracker, _) = lookup::require_body(doc, &config.tracker_base_label, operation)?;
        let stamp = lookup::require_link(doc, variant.stamp_label(config), operation)?;
        let stamp_base_inv = stamp.local_frame(&config.base_frame, operation)?.inverse();
        Ok(Self {
            base: tracker.name.clone(),
            tool: stamp.model_name.to_string(),
            tool_placements: frames
                .iter()
                .map(|f| placement_from_pose(&f.compose(&stamp_base_inv)))
                .collect(),
        })
    }

    fn write(self, doc: &mut Document, variant: StampVariant) {
        if let Some(tracker) = doc.get_mut(&self.base) {
            tracker.view.visible = false;
        }
        let cut = doc.insert(
            DocumentObject::new(
                variant.cut_name(),
                ObjectKind::Cut {
                    base: self.base,
                    tool: self.tool,
                    tool_placements: self.tool_placements,
                },
            )
            .with_label(variant.cut_label()),
        );
        cut.view.transparency = 50;
    }
}

fn set_link_placement(doc: &mut Document, name: &str, pose: &Pose) {
    if let Some(DocumentObject {
        kind: ObjectKind::Link { placement, .. },
        ..
    }) = doc.get_mut(name)
    {
        *placement = placement_from_pose(pose);
    }
}

fn point_object(name: String, p: &Point3) -> DocumentObject {
    DocumentObject::new(
        name,
        ObjectKind::Point {
            placement: Placement::at(point_to_ir(p)),
        },
    )
}

/// Write the datum points `p_surf{idx}`, `p_norm{idx}`, `p_aux{idx}` and the
/// frame `s_lcs{idx}` attached to them.
fn write_sensor_frame(doc: &mut Document, idx: usize, points: [Point3; 3], pose: &Pose) {
    let support = vec![
        format!("p_surf{idx}"),
        format!("p_norm{idx}"),
        format!("p_aux{idx}"),
    ];
    for (name, point) in support.iter().zip(&points) {
        doc.insert(point_object(name.clone(), point));
    }
    doc.insert(DocumentObject::new(
        sensor_frame_name(idx),
        ObjectKind::CoordinateSystem {
            placement: placement_from_pose(pose),
            support,
            map_mode: "OZX".to_string(),
        },
    ));
}

/// Seat every sensor on the nearest face of the tracker body and cut the
/// stamp recesses there.
///
/// For sensor `i` this writes datum points `p_surf{i}`, `p_norm{i}`,
/// `p_aux{i}`, the frame `s_lcs{i}` attached to them, and moves the sensor
/// link so its base frame coincides with `s_lcs{i}`. Returns the frames in
/// sensor order.
pub fn place_and_cut_sensors(
    doc: &mut Document,
    query: &impl SurfaceQuery,
    config: &PlacementConfig,
    variant: StampVariant,
) -> Result<Vec<Frame>> {
    const OP: &str = "place_and_cut_sensors";

    let (_, tracker_shape) = lookup::require_body(doc, &config.tracker_base_label, OP)?;
    let mainboard = lookup::require_link(doc, &config.mainboard_label, OP)?;
    let aux = aux_direction(&mainboard.placement, &config.initial_direction());

    let mut planned = Vec::new();
    for (idx, sensor) in lookup::sensors(doc, config, OP)?.iter().enumerate() {
        let base_local = sensor.local_frame(&config.base_frame, OP)?;
        let base_global = sensor.placement.compose(&base_local);
        let probe = base_global.origin();
        let hit = nearest_surface(query, tracker_shape, &probe, &config.tracker_base_label, OP)?;
        let frame = build_frame(&probe, &hit.point, &hit.normal, &aux).map_err(|e| match e {
            PlacementError::InvalidPose(source) => PlacementError::SensorFrame {
                sensor: sensor.object.label.clone(),
                operation: OP,
                source,
            },
            other => other,
        })?;
        debug!(
            sensor = %sensor.object.label,
            index = idx,
            distance = hit.distance,
            "projected sensor onto tracker surface"
        );
        let link = frame.pose.compose(&base_local.inverse());
        planned.push((sensor.object.name.clone(), frame, link));
    }

    let frame_poses: Vec<Pose> = planned.iter().map(|(_, f, _)| f.pose).collect();
    let cut = PlannedCut::plan(doc, config, variant, &frame_poses, OP)?;

    let mut frames = Vec::with_capacity(planned.len());
    for (idx, (sensor_name, frame, link)) in planned.into_iter().enumerate() {
        write_sensor_frame(
            doc,
            idx,
            [frame.surface_point, frame.normal_point, frame.aux_point],
            &frame.pose,
        );
        set_link_placement(doc, &sensor_name, &link);
        frames.push(frame);
    }
    cut.write(doc, variant);

    info!(sensors = frames.len(), cut = variant.cut_name(), "sensors placed");
    Ok(frames)
}

/// After sensors were moved by hand, move each frame `s_lcs{i}` onto its
/// sensor's current base frame and rebuild the cut.
///
/// The support points of each frame move with it (origin, origin + Z,
/// origin + X), so re-deriving the frame from its points gives the same pose.
pub fn recut_sensors(doc: &mut Document, config: &PlacementConfig, variant: StampVariant) -> Result<()> {
    const OP: &str = "recut_sensors";

    let mut poses = Vec::new();
    for (idx, sensor) in lookup::sensors(doc, config, OP)?.iter().enumerate() {
        lookup::require_frame(doc, &sensor_frame_name(idx), OP)?;
        poses.push(sensor.global_frame(&config.base_frame, OP)?);
    }
    let cut = PlannedCut::plan(doc, config, variant, &poses, OP)?;

    for (idx, pose) in poses.iter().enumerate() {
        let origin = pose.origin();
        let points = [origin, origin + pose.axis_z(), origin + pose.axis_x()];
        write_sensor_frame(doc, idx, points, pose);
    }
    cut.write(doc, variant);

    info!(sensors = poses.len(), cut = variant.cut_name(), "sensor recesses recut");
    Ok(())
}

/// Store each sensor's offset from its frame in the correction spreadsheet,
/// creating the spreadsheet if needed. Returns the corrections.
pub fn save_corrections(doc: &mut Document, config: &PlacementConfig) -> Result<Vec<Pose>> {
    const OP: &str = "save_corrections";

    let mut corrections = Vec::new();
    for (idx, sensor) in lookup::sensors(doc, config, OP)?.iter().enumerate() {
        let frame = lookup::require_frame(doc, &sensor_frame_name(idx), OP)?;
        let base_global = sensor.global_frame(&config.base_frame, OP)?;
        let correction = compute_correction(&frame, &base_global);
        debug!(sensor = %sensor.object.label, index = idx, ?correction, "sensor correction");
        corrections.push(correction);
    }

    if let Some(existing) = doc.get(&config.spreadsheet_name) {
        if !matches!(existing.kind, ObjectKind::Spreadsheet { .. }) {
            return Err(PlacementError::WrongObjectKind {
                label: existing.label.clone(),
                expected: "Spreadsheet",
                found: existing.type_name(),
                operation: OP,
            });
        }
    } else {
        doc.insert(DocumentObject::new(
            config.spreadsheet_name.as_str(),
            ObjectKind::Spreadsheet {
                cells: Default::default(),
            },
        ));
    }
    if let Some(DocumentObject {
        kind: ObjectKind::Spreadsheet { cells },
        ..
    }) = doc.get_mut(&config.spreadsheet_name)
    {
        write_corrections(cells, &corrections);
    }

    info!(sensors = corrections.len(), "corrections saved");
    Ok(corrections)
}

/// Drive every sensor to its frame plus the stored correction.
///
/// Fails with [`PlacementError::CorrectionCountMismatch`] when the
/// spreadsheet and the document disagree on the number of sensors.
pub fn load_corrections(doc: &mut Document, config: &PlacementConfig) -> Result<()> {
    const OP: &str = "load_corrections";

    let sheet = lookup::require_name(doc, &config.spreadsheet_name, OP)?;
    let ObjectKind::Spreadsheet { cells } = &sheet.kind else {
        return Err(PlacementError::WrongObjectKind {
            label: sheet.label.clone(),
            expected: "Spreadsheet",
            found: sheet.type_name(),
            operation: OP,
        });
    };
    let sensors = lookup::sensors(doc, config, OP)?;
    let corrections = read_corrections_for(cells, sensors.len(), OP)?;

    let mut moves = Vec::with_capacity(sensors.len());
    for (idx, (sensor, correction)) in sensors.iter().zip(&corrections).enumerate() {
        let frame = lookup::require_frame(doc, &sensor_frame_name(idx), OP)?;
        let base_local = sensor.local_frame(&config.base_frame, OP)?;
        moves.push((
            sensor.object.name.clone(),
            apply_correction(&frame, correction, &base_local),
        ));
    }

    for (name, link) in &moves {
        set_link_placement(doc, name, link);
    }
    info!(sensors = moves.len(), "corrections applied");
    Ok(())
}

/// Build the lighthouse export from the sensors' diode frames and the
/// mainboard's IMU frame.
pub fn extract_export(doc: &Document, config: &PlacementConfig) -> Result<ExportDocument> {
    const OP: &str = "extract_export";

    let sensors = lookup::sensors(doc, config, OP)?
        .iter()
        .map(|sensor| {
            let diode = sensor.global_frame(&config.diode_frame, OP)?;
            Ok(SensorRecord {
                label: sensor.object.label2.clone(),
                position_mm: diode.origin(),
                normal: diode.axis_z(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mainboard = lookup::require_link(doc, &config.mainboard_label, OP)?;
    let imu_pose = mainboard.global_frame(&config.imu_frame, OP)?;
    let imu = ImuRecord {
        position_mm: imu_pose.origin(),
        plus_x: imu_pose.axis_x(),
        plus_z: imu_pose.axis_z(),
    };

    if sensors.is_empty() {
        warn!(
            label = %config.sensor_label,
            "no sensors found; exporting an empty channel map"
        );
    }
    Ok(format_export(&sensors, &imu))
}

/// Extract the export and write it atomically to `path`.
pub fn save_export(
    doc: &Document,
    config: &PlacementConfig,
    path: impl AsRef<Path>,
) -> Result<ExportDocument> {
    let export = extract_export(doc, config)?;
    write_export(path.as_ref(), &export)?;
    info!(
        path = %path.as_ref().display(),
        sensors = export.lighthouse_config.channel_map.len(),
        "lighthouse config written"
    );
    Ok(export)
}
