//! Labels and constants the workflows use to find objects.
//!
//! Defaults match the conventional tracker assembly layout. Overrides can be
//! loaded from TOML; missing keys keep their defaults.
//!
//! ```toml
//! sensor_label = "pd"
//! initial_direction = [0.0, 1.0, 0.0]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use lhcad_math::Vec3;

/// Object labels and placement constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Substring identifying sensor links (`sensor`, `sensor001`, `LH-sensor`, ...).
    pub sensor_label: String,
    /// Label of the stamp link used for full cuts.
    pub stamp_label: String,
    /// Label of the simplified stamp link.
    pub stamp_simplified_label: String,
    /// Label of the tracker body sensors are placed on.
    pub tracker_base_label: String,
    /// Label of the mainboard link.
    pub mainboard_label: String,
    /// Frame in sensor and stamp models that sits on the tracker surface.
    pub base_frame: String,
    /// Frame in the sensor model at the photodiode center.
    pub diode_frame: String,
    /// Frame in the mainboard model at the IMU.
    pub imu_frame: String,
    /// Internal name of the correction spreadsheet.
    pub spreadsheet_name: String,
    /// Sensor X direction before the mainboard rotation is applied.
    pub initial_direction: [f64; 3],
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            sensor_label: "sensor".to_string(),
            stamp_label: "stamp".to_string(),
            stamp_simplified_label: "stamp-simplified".to_string(),
            tracker_base_label: "tracker-base".to_string(),
            mainboard_label: "tracker-mainboard".to_string(),
            base_frame: "LCS-Base".to_string(),
            diode_frame: "LCS-Diode".to_string(),
            imu_frame: "LCS-IMU".to_string(),
            spreadsheet_name: "SensorSpreadsheet".to_string(),
            initial_direction: [-1.0, 0.0, 0.0],
        }
    }
}

impl PlacementConfig {
    /// Parse a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// [`Self::initial_direction`] as a vector.
    pub fn initial_direction(&self) -> Vec3 {
        Vec3::from(self.initial_direction)
    }
}
