//! Error types for sensor placement and export.

use lhcad_math::PoseError;
use thiserror::Error;

/// Errors that can occur while placing, correcting or exporting sensors.
///
/// Every workflow checks all of its inputs before touching the document, so
/// any of these leaves the document as it was.
#[derive(Error, Debug)]
pub enum PlacementError {
    /// A required labelled object (or linked model frame) is absent.
    #[error("{operation}: '{label}' not found")]
    MissingObject {
        /// Label or name that was looked up.
        label: String,
        /// Operation that was aborted.
        operation: &'static str,
    },

    /// An object exists but has the wrong type.
    #[error("{operation}: '{label}' is a {found}, expected a {expected}")]
    WrongObjectKind {
        /// Label of the offending object.
        label: String,
        /// Expected object type.
        expected: &'static str,
        /// Actual object type.
        found: &'static str,
        /// Operation that was aborted.
        operation: &'static str,
    },

    /// The shape has no valid face to project onto.
    #[error("{operation}: no valid surface found on '{label}'")]
    NoSurfaceFound {
        /// Label of the shape that was searched.
        label: String,
        /// Operation that was aborted.
        operation: &'static str,
    },

    /// A pose had non-finite components or a degenerate rotation.
    #[error("invalid pose: {0}")]
    InvalidPose(#[from] PoseError),

    /// No frame can be built where a sensor was projected.
    #[error("{operation}: cannot build a frame for '{sensor}': {source}")]
    SensorFrame {
        /// Label of the sensor.
        sensor: String,
        /// Operation that was aborted.
        operation: &'static str,
        /// Why the frame is degenerate.
        source: PoseError,
    },

    /// Stored corrections do not match the current sensors one-to-one.
    #[error("{operation}: {stored} stored corrections but {sensors} sensors")]
    CorrectionCountMismatch {
        /// Rows found in the spreadsheet.
        stored: usize,
        /// Sensors found in the document.
        sensors: usize,
        /// Operation that was aborted.
        operation: &'static str,
    },

    /// A spreadsheet cell does not hold a number.
    #[error("cell {address}: cannot parse '{value}' as a number")]
    InvalidCell {
        /// Cell address (e.g. `D3`).
        address: String,
        /// Raw cell content.
        value: String,
    },

    /// IO error while writing the export file or reading config.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed configuration file.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl PlacementError {
    pub(crate) fn missing(label: impl Into<String>, operation: &'static str) -> Self {
        Self::MissingObject {
            label: label.into(),
            operation,
        }
    }
}

/// Result type for placement operations.
pub type Result<T> = std::result::Result<T, PlacementError>;
