//! Sensor placement and lighthouse export for tracker CAD models.
//!
//! Seats photodiode sensor links on the nearest face of a tracker body,
//! records the recesses a stamp cuts there, keeps manual corrections in a
//! spreadsheet so they survive a re-placement, and writes the sensor layout
//! as lighthouse JSON.
//!
//! # Example
//!
//! ```ignore
//! use lhcad::{place_and_cut_sensors, save_export, PlacementConfig, PlanarSurfaceQuery, StampVariant};
//!
//! let mut doc = lhcad_ir::Document::from_json(&json_str)?;
//! let config = PlacementConfig::default();
//!
//! place_and_cut_sensors(&mut doc, &PlanarSurfaceQuery, &config, StampVariant::Full)?;
//! save_export(&doc, &config, "tracker.json")?;
//! ```

pub mod composer;
pub mod config;
pub mod correction;
pub mod error;
pub mod export;
pub mod frame;
pub mod labels;
pub mod lookup;
pub mod workflow;

pub use config::PlacementConfig;
pub use error::{PlacementError, Result};
pub use export::{ExportDocument, ImuRecord, SensorRecord};
pub use frame::{Frame, PlanarSurfaceQuery, SurfaceHit, SurfaceQuery};
pub use labels::annotate_sensor_labels;
pub use lhcad_math::{Pose, Tolerance};
pub use workflow::{
    extract_export, load_corrections, place_and_cut_sensors, recut_sensors, save_corrections,
    save_export, StampVariant,
};
