//! Manual placement corrections.
//!
//! After automatic placement a user may nudge a sensor by hand. The residual
//! between the sensor's surface frame and its actual base frame is a
//! correction; storing it lets the nudge survive a later re-placement on a
//! changed tracker shape.
//!
//! Corrections live in a spreadsheet: header in row 1, one row per sensor
//! index from row 2, columns A–G holding `x, y, z, angle (deg), axis x, axis
//! y, axis z`.

use std::collections::BTreeMap;

use lhcad_math::{Pose, Vec3};

use crate::error::{PlacementError, Result};

/// Header row written to row 1.
pub const HEADER: [&str; 7] = ["X", "Y", "Z", "angle", "axis X", "axis Y", "axis Z"];

const COLUMNS: [char; 7] = ['A', 'B', 'C', 'D', 'E', 'F', 'G'];
const FIRST_ROW: usize = 2;

/// Residual transform from `frame_pose` to the sensor's actual base pose:
/// `inverse(frame_pose) ∘ sensor_global_pose`.
pub fn compute_correction(frame_pose: &Pose, sensor_global_pose: &Pose) -> Pose {
    frame_pose.inverse().compose(sensor_global_pose)
}

/// Link placement that puts the sensor's base frame at
/// `frame_pose ∘ correction`, given the base frame's placement inside the
/// sensor model.
pub fn apply_correction(frame_pose: &Pose, correction: &Pose, local_frame_placement: &Pose) -> Pose {
    frame_pose
        .compose(correction)
        .compose(&local_frame_placement.inverse())
}

/// Cell-addressed string storage (`A1`, `B2`, ...).
pub trait CellStore {
    /// Content of a cell, if set.
    fn get_cell(&self, address: &str) -> Option<&str>;
    /// Set a cell.
    fn set_cell(&mut self, address: &str, value: String);
    /// Clear a cell.
    fn clear_cell(&mut self, address: &str);
}

impl CellStore for BTreeMap<String, String> {
    fn get_cell(&self, address: &str) -> Option<&str> {
        self.get(address).map(String::as_str)
    }

    fn set_cell(&mut self, address: &str, value: String) {
        self.insert(address.to_string(), value);
    }

    fn clear_cell(&mut self, address: &str) {
        self.remove(address);
    }
}

fn address(column: char, row: usize) -> String {
    format!("{column}{row}")
}

/// Write the header row.
pub fn write_header(store: &mut impl CellStore) {
    for (col, title) in COLUMNS.iter().zip(HEADER) {
        store.set_cell(&address(*col, 1), title.to_string());
    }
}

/// Write one row per correction in index order, then clear any rows left
/// over from a previous, longer write.
pub fn write_corrections(store: &mut impl CellStore, corrections: &[Pose]) {
    write_header(store);
    for (idx, correction) in corrections.iter().enumerate() {
        let row = FIRST_ROW + idx;
        for (col, value) in COLUMNS.iter().zip(row_values(correction)) {
            store.set_cell(&address(*col, row), value.to_string());
        }
    }

    let mut row = FIRST_ROW + corrections.len();
    while store.get_cell(&address(COLUMNS[0], row)).is_some() {
        for col in COLUMNS {
            store.clear_cell(&address(col, row));
        }
        row += 1;
    }
}

fn row_values(correction: &Pose) -> [f64; 7] {
    let t = correction.translation_vec();
    let (axis, angle) = correction.axis_angle();
    [t.x, t.y, t.z, angle.to_degrees(), axis.x, axis.y, axis.z]
}

/// Read every stored row, stopping at the first row with an empty column A.
pub fn read_corrections(store: &impl CellStore) -> Result<Vec<Pose>> {
    let mut corrections = Vec::new();
    let mut row = FIRST_ROW;
    while store.get_cell(&address(COLUMNS[0], row)).is_some() {
        let mut values = [0.0; 7];
        for (value, col) in values.iter_mut().zip(COLUMNS) {
            *value = read_number(store, &address(col, row))?;
        }
        let [x, y, z, angle, ax, ay, az] = values;
        corrections.push(Pose::from_axis_angle_degrees(
            Vec3::new(x, y, z),
            Vec3::new(ax, ay, az),
            angle,
        )?);
        row += 1;
    }
    Ok(corrections)
}

/// Read corrections for exactly `sensor_count` sensors.
///
/// A different number of stored rows is a
/// [`PlacementError::CorrectionCountMismatch`]; rows are never dropped or
/// padded.
pub fn read_corrections_for(
    store: &impl CellStore,
    sensor_count: usize,
    operation: &'static str,
) -> Result<Vec<Pose>> {
    let corrections = read_corrections(store)?;
    if corrections.len() != sensor_count {
        return Err(PlacementError::CorrectionCountMismatch {
            stored: corrections.len(),
            sensors: sensor_count,
            operation,
        });
    }
    Ok(corrections)
}

fn read_number(store: &impl CellStore, address: &str) -> Result<f64> {
    let raw = store.get_cell(address).unwrap_or("");
    raw.trim()
        .parse::<f64>()
        .map_err(|_| PlacementError::InvalidCell {
            address: address.to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lhcad_math::Tolerance;

    fn pose(t: [f64; 3], axis: [f64; 3], deg: f64) -> Pose {
        Pose::from_axis_angle_degrees(Vec3::from(t), Vec3::from(axis), deg).unwrap()
    }

    fn samples() -> Vec<Pose> {
        vec![
            pose([0.1, -0.2, 0.05], [0.0, 0.0, 1.0], 3.5),
            Pose::identity(),
            pose([1e-7, 12.0, -3.25], [1.0, 1.0, 0.0], 179.0),
        ]
    }

    #[test]
    fn correction_roundtrip_law() {
        let frame = pose([10.0, 20.0, 30.0], [0.2, 0.9, -0.1], 64.0);
        let global = pose([10.5, 19.0, 31.0], [1.0, 0.0, 0.3], -12.0);
        let local = pose([0.0, 0.0, -1.2], [1.0, 0.0, 0.0], 180.0);

        let correction = compute_correction(&frame, &global);
        let link = apply_correction(&frame, &correction, &local);
        // the base frame of the driven link lands on the observed pose
        assert!(Tolerance::DEFAULT.poses_equal(&link.compose(&local), &global));
    }

    #[test]
    fn zero_correction_when_on_frame() {
        let frame = pose([4.0, 5.0, 6.0], [0.0, 1.0, 0.0], 33.0);
        let c = compute_correction(&frame, &frame);
        assert!(Tolerance::DEFAULT.poses_equal(&c, &Pose::identity()));
    }

    #[test]
    fn store_roundtrip() {
        let mut cells: BTreeMap<String, String> = BTreeMap::new();
        let written = samples();
        write_corrections(&mut cells, &written);

        assert_eq!(cells.get_cell("A1"), Some("X"));
        assert_eq!(cells.get_cell("G1"), Some("axis Z"));
        assert_eq!(cells.get_cell("D3"), Some("0"));

        let read = read_corrections_for(&cells, written.len(), "load").unwrap();
        assert_eq!(read.len(), written.len());
        for (a, b) in read.iter().zip(&written) {
            assert!(Tolerance::DEFAULT.poses_equal(a, b));
        }
    }

    #[test]
    fn count_mismatch_is_an_error() {
        let mut cells: BTreeMap<String, String> = BTreeMap::new();
        write_corrections(&mut cells, &samples());
        let err = read_corrections_for(&cells, 2, "load").unwrap_err();
        assert!(matches!(
            err,
            PlacementError::CorrectionCountMismatch { stored: 3, sensors: 2, operation: "load" }
        ));
        let err = read_corrections_for(&cells, 4, "load").unwrap_err();
        assert!(matches!(
            err,
            PlacementError::CorrectionCountMismatch { stored: 3, sensors: 4, .. }
        ));
        assert_eq!(err.to_string(), "load: 3 stored corrections but 4 sensors");
    }

    #[test]
    fn shorter_write_clears_stale_rows() {
        let mut cells: BTreeMap<String, String> = BTreeMap::new();
        write_corrections(&mut cells, &samples());
        write_corrections(&mut cells, &samples()[..1]);
        assert_eq!(read_corrections(&cells).unwrap().len(), 1);
        assert!(cells.get_cell("A4").is_none());
        assert!(cells.get_cell("G3").is_none());
    }

    #[test]
    fn empty_sheet_reads_nothing() {
        let cells: BTreeMap<String, String> = BTreeMap::new();
        assert!(read_corrections(&cells).unwrap().is_empty());
        assert!(read_corrections_for(&cells, 0, "load").unwrap().is_empty());
    }

    #[test]
    fn invalid_cell() {
        let mut cells: BTreeMap<String, String> = BTreeMap::new();
        write_corrections(&mut cells, &samples()[..1]);
        cells.set_cell("E2", "north".to_string());
        let err = read_corrections(&cells).unwrap_err();
        assert!(matches!(
            err,
            PlacementError::InvalidCell { ref address, ref value } if address == "E2" && value == "north"
        ));
    }

    #[test]
    fn missing_cell_in_row() {
        let mut cells: BTreeMap<String, String> = BTreeMap::new();
        write_corrections(&mut cells, &samples()[..1]);
        cells.clear_cell("C2");
        let err = read_corrections(&cells).unwrap_err();
        assert!(matches!(err, PlacementError::InvalidCell { ref address, .. } if address == "C2"));
    }
}
