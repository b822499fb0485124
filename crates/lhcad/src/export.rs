//! Lighthouse JSON export.
//!
//! Builds the controller configuration consumed by tracking firmware: the
//! sensor channel map, sensor normals and positions, and the IMU pose, merged
//! into a fixed template of device, display and distortion defaults.
//!
//! Positions are given in millimeters and written in meters. Computed values
//! are rounded to 8 decimal digits. Template constants are written as-is.

use std::io::Write;
use std::path::Path;

use lhcad_math::{Point3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const DECIMALS: f64 = 1e8;
const MM_PER_M: f64 = 1000.0;

/// One sensor as it should appear in the export.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRecord {
    /// Channel label (the sensor link's description).
    pub label: String,
    /// Photodiode center in millimeters.
    pub position_mm: Point3,
    /// Unit normal of the photodiode.
    pub normal: Vec3,
}

/// The IMU pose as it should appear in the export.
#[derive(Debug, Clone, PartialEq)]
pub struct ImuRecord {
    /// IMU origin in millimeters.
    pub position_mm: Point3,
    /// IMU +X axis.
    pub plus_x: Vec3,
    /// IMU +Z axis.
    pub plus_z: Vec3,
}

/// A channel label. Numeric labels are written as JSON numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelId {
    /// Firmware channel index.
    Index(i64),
    /// Any other label.
    Name(String),
}

impl ChannelId {
    /// Parse a sensor description into a channel id.
    pub fn from_label(label: &str) -> Self {
        match label.trim().parse::<i64>() {
            Ok(idx) => ChannelId::Index(idx),
            Err(_) => ChannelId::Name(label.to_string()),
        }
    }
}

/// The full export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Device manufacturer.
    pub manufacturer: String,
    /// Device model number.
    pub model_number: String,
    /// Device class (`controller`).
    pub device_class: String,
    /// USB vendor id.
    pub device_vid: u32,
    /// USB product id.
    pub device_pid: u32,
    /// Serial number placeholder.
    pub device_serial_number: String,
    /// Sensor layout.
    pub lighthouse_config: LighthouseConfig,
    /// IMU calibration and pose.
    pub imu: ImuConfig,
    /// Render model shown by the host.
    pub render_model: String,
    /// Head frame.
    pub head: HeadConfig,
    /// Configuration revision.
    pub revision: u32,
    /// Display EDID (empty for trackers).
    pub display_edid: [String; 2],
    /// Lens separation in meters.
    pub lens_separation: f64,
    /// Display parameters.
    pub device: DeviceConfig,
    /// Left and right eye transforms.
    pub tracking_to_eye_transform: Vec<EyeTransform>,
    /// Device type, written as `type`.
    #[serde(rename = "type")]
    pub device_type: String,
    /// Firmware options.
    pub firmware_config: FirmwareConfig,
}

/// Sensor layout, in channel order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LighthouseConfig {
    /// Channel of each sensor.
    #[serde(rename = "channelMap")]
    pub channel_map: Vec<ChannelId>,
    /// Unit normal of each sensor.
    #[serde(rename = "modelNormals")]
    pub model_normals: Vec<[f64; 3]>,
    /// Position of each sensor in meters.
    #[serde(rename = "modelPoints")]
    pub model_points: Vec<[f64; 3]>,
}

/// IMU calibration and placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImuConfig {
    /// Accelerometer bias.
    pub acc_bias: [i32; 3],
    /// Accelerometer scale.
    pub acc_scale: [i32; 3],
    /// Gyroscope bias.
    pub gyro_bias: [i32; 3],
    /// Gyroscope scale.
    pub gyro_scale: [i32; 3],
    /// IMU X axis in the tracker frame.
    pub plus_x: [f64; 3],
    /// IMU Z axis in the tracker frame.
    pub plus_z: [f64; 3],
    /// IMU position in meters.
    pub position: [f64; 3],
}

/// Head frame relative to the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadConfig {
    /// Head X axis.
    pub plus_x: [i32; 3],
    /// Head Z axis.
    pub plus_z: [i32; 3],
    /// Head origin.
    pub position: [i32; 3],
}

/// Display description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Per-eye render height.
    pub eye_target_height_in_pixels: u32,
    /// Per-eye render width.
    pub eye_target_width_in_pixels: u32,
    /// First eye rendered.
    pub first_eye: String,
    /// Last eye rendered.
    pub last_eye: String,
    /// Number of display windows.
    pub num_windows: u32,
    /// Display persistence in seconds.
    pub persistence: f64,
    /// Physical aspect ratio.
    pub physical_aspect_x_over_y: f64,
}

/// Lens distortion for one color channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    /// Distortion center X.
    pub center_x: f64,
    /// Distortion center Y.
    pub center_y: f64,
    /// Polynomial coefficients.
    pub coeffs: [f64; 8],
    /// Distortion model, written as `type`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Per-eye optics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeTransform {
    /// Green channel distortion.
    pub distortion: Distortion,
    /// Blue channel distortion.
    pub distortion_blue: Distortion,
    /// Red channel distortion.
    pub distortion_red: Distortion,
    /// Eye-to-head transform rows.
    pub extrinsics: [[f64; 4]; 3],
    /// Undistort margin.
    pub grow_for_undistort: f64,
    /// Projection intrinsics.
    pub intrinsics: [[f64; 3]; 3],
    /// Undistort radius cutoff.
    pub undistort_r2_cutoff: f64,
}

/// Firmware options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmwareConfig {
    /// Sensor envelope pin mask.
    pub sensor_env_on_pin_a: String,
}

impl Default for Distortion {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            coeffs: [0.0; 8],
            kind: "DISTORT_DPOLY3".to_string(),
        }
    }
}

impl EyeTransform {
    fn with_eye_offset(offset_x: f64) -> Self {
        Self {
            distortion: Distortion::default(),
            distortion_blue: Distortion::default(),
            distortion_red: Distortion::default(),
            extrinsics: [
                [1.0, 0.0, 0.0, offset_x],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            grow_for_undistort: 0.0,
            intrinsics: [[1.25, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]],
            undistort_r2_cutoff: 1.5,
        }
    }
}

const EYE_OFFSET: f64 = 0.03115000016987324;

impl ExportDocument {
    /// Template document with the given sensor layout and IMU block.
    fn from_parts(lighthouse_config: LighthouseConfig, imu: ImuConfig) -> Self {
        Self {
            manufacturer: String::new(),
            model_number: String::new(),
            device_class: "controller".to_string(),
            device_vid: 10462,
            device_pid: 8960,
            device_serial_number: "LHR-XXXXXXXX".to_string(),
            lighthouse_config,
            imu,
            render_model: "ref_controller".to_string(),
            head: HeadConfig {
                plus_x: [1, 0, 0],
                plus_z: [0, 0, 1],
                position: [0, 0, 0],
            },
            revision: 3,
            display_edid: [String::new(), String::new()],
            lens_separation: 0.06230000033974648,
            device: DeviceConfig {
                eye_target_height_in_pixels: 1080,
                eye_target_width_in_pixels: 960,
                first_eye: "eEYE_LEFT".to_string(),
                last_eye: "eEYE_RIGHT".to_string(),
                num_windows: 1,
                persistence: 0.01666999980807304,
                physical_aspect_x_over_y: 0.800000011920929,
            },
            tracking_to_eye_transform: vec![
                EyeTransform::with_eye_offset(EYE_OFFSET),
                EyeTransform::with_eye_offset(-EYE_OFFSET),
            ],
            device_type: "Lighthouse_HMD".to_string(),
            firmware_config: FirmwareConfig {
                sensor_env_on_pin_a: "0x7FFFE000".to_string(),
            },
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Round to 8 decimal digits.
pub fn round8(v: f64) -> f64 {
    (v * DECIMALS).round() / DECIMALS
}

fn rounded(v: &Vec3) -> [f64; 3] {
    [round8(v.x), round8(v.y), round8(v.z)]
}

fn meters(p: &Point3) -> [f64; 3] {
    rounded(&(p.coords / MM_PER_M))
}

/// Assemble the export document.
///
/// Sensor order is the input order. An empty sensor slice yields empty
/// lists; warning about it is up to the caller.
pub fn format_export(sensors: &[SensorRecord], imu: &ImuRecord) -> ExportDocument {
    let lighthouse_config = LighthouseConfig {
        channel_map: sensors
            .iter()
            .map(|s| ChannelId::from_label(&s.label))
            .collect(),
        model_normals: sensors.iter().map(|s| rounded(&s.normal)).collect(),
        model_points: sensors.iter().map(|s| meters(&s.position_mm)).collect(),
    };
    let imu = ImuConfig {
        acc_bias: [0, 0, 0],
        acc_scale: [1, 1, 1],
        gyro_bias: [0, 0, 0],
        gyro_scale: [1, 1, 1],
        plus_x: rounded(&imu.plus_x),
        plus_z: rounded(&imu.plus_z),
        position: meters(&imu.position_mm),
    };
    ExportDocument::from_parts(lighthouse_config, imu)
}

/// Write the document as UTF-8 JSON, atomically replacing `path`.
pub fn write_export(path: impl AsRef<Path>, document: &ExportDocument) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let json = document.to_json()?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn imu() -> ImuRecord {
        ImuRecord {
            position_mm: Point3::new(10.0, -5.0, 2.5),
            plus_x: Vec3::x(),
            plus_z: Vec3::z(),
        }
    }

    fn sensor(label: &str, pos: [f64; 3], normal: [f64; 3]) -> SensorRecord {
        SensorRecord {
            label: label.to_string(),
            position_mm: Point3::from(pos),
            normal: Vec3::from(normal),
        }
    }

    fn to_value(doc: &ExportDocument) -> Value {
        serde_json::from_str(&doc.to_json().unwrap()).unwrap()
    }

    #[test]
    fn positions_in_meters() {
        let doc = format_export(&[sensor("0", [1000.0, 2000.0, 3000.0], [0.0, 0.0, 1.0])], &imu());
        assert_eq!(doc.lighthouse_config.model_points, vec![[1.0, 2.0, 3.0]]);
        assert_eq!(doc.imu.position, [0.01, -0.005, 0.0025]);
    }

    #[test]
    fn values_rounded_to_eight_digits() {
        let doc = format_export(&[sensor("0", [0.0; 3], [0.123456789123, 0.0, 1.0])], &imu());
        assert_eq!(doc.lighthouse_config.model_normals[0][0], 0.12345679);
        let json = doc.to_json().unwrap();
        assert!(json.contains("0.12345679"));
        assert!(!json.contains("0.123456789"));
    }

    #[test]
    fn order_is_preserved() {
        let sensors = [
            sensor("5", [3.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
            sensor("1", [2.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            sensor("9", [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];
        let value = to_value(&format_export(&sensors, &imu()));
        let lh = &value["lighthouse_config"];
        assert_eq!(lh["channelMap"], serde_json::json!([5, 1, 9]));
        assert_eq!(
            lh["modelNormals"],
            serde_json::json!([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
        );
        assert_eq!(
            lh["modelPoints"],
            serde_json::json!([[0.003, 0.0, 0.0], [0.002, 0.0, 0.0], [0.001, 0.0, 0.0]])
        );
    }

    #[test]
    fn empty_sensor_set_still_exports() {
        let value = to_value(&format_export(&[], &imu()));
        assert_eq!(value["lighthouse_config"]["channelMap"], serde_json::json!([]));
        assert_eq!(value["lighthouse_config"]["modelNormals"], serde_json::json!([]));
        assert_eq!(value["lighthouse_config"]["modelPoints"], serde_json::json!([]));
        assert_eq!(value["imu"]["plus_x"], serde_json::json!([1.0, 0.0, 0.0]));
        assert_eq!(value["device_class"], "controller");
    }

    #[test]
    fn static_template_fields() {
        let value = to_value(&format_export(&[], &imu()));
        assert_eq!(value["device_vid"], 10462);
        assert_eq!(value["device_pid"], 8960);
        assert_eq!(value["type"], "Lighthouse_HMD");
        assert_eq!(value["revision"], 3);
        assert_eq!(value["imu"]["acc_scale"], serde_json::json!([1, 1, 1]));
        assert_eq!(value["firmware_config"]["sensor_env_on_pin_a"], "0x7FFFE000");

        let eyes = value["tracking_to_eye_transform"].as_array().unwrap();
        assert_eq!(eyes.len(), 2);
        for eye in eyes {
            for key in ["distortion", "distortion_blue", "distortion_red"] {
                assert_eq!(eye[key]["type"], "DISTORT_DPOLY3");
                assert_eq!(eye[key]["coeffs"].as_array().unwrap().len(), 8);
            }
        }
        assert_eq!(eyes[0]["extrinsics"][0][3], EYE_OFFSET);
        assert_eq!(eyes[1]["extrinsics"][0][3], -EYE_OFFSET);
    }

    #[test]
    fn non_numeric_channel_labels_are_strings() {
        let doc = format_export(&[sensor("tip", [0.0; 3], [0.0, 0.0, 1.0])], &imu());
        let value = to_value(&doc);
        assert_eq!(value["lighthouse_config"]["channelMap"], serde_json::json!(["tip"]));
    }

    #[test]
    fn written_file_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.json");
        let doc = format_export(&[sensor("2", [10.0, 20.0, 30.0], [0.0, 0.0, 1.0])], &imu());

        write_export(&path, &doc).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let restored: ExportDocument = serde_json::from_str(&content).unwrap();
        assert_eq!(restored, doc);

        // overwrite in place
        let empty = format_export(&[], &imu());
        write_export(&path, &empty).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let restored: ExportDocument = serde_json::from_str(&content).unwrap();
        assert!(restored.lighthouse_config.channel_map.is_empty());
    }
}
