//! Document lookups.
//!
//! Pure functions from a document and a label or name to the object, or an
//! error naming what is missing and which operation needed it.

use lhcad_ir::{Document, DocumentObject, LinkedModel, ObjectKind, Shape};
use lhcad_math::Pose;

use crate::composer::{global_frame_pose, pose_from_placement};
use crate::config::PlacementConfig;
use crate::error::{PlacementError, Result};

/// A resolved link object together with its model and placement.
#[derive(Debug, Clone)]
pub struct LinkRef<'a> {
    /// The link object.
    pub object: &'a DocumentObject,
    /// Name of the linked model.
    pub model_name: &'a str,
    /// The linked model.
    pub model: &'a LinkedModel,
    /// Placement of the link in the document.
    pub placement: Pose,
}

impl<'a> LinkRef<'a> {
    /// Placement of a frame of the linked model, in model coordinates.
    pub fn local_frame(&self, frame: &str, operation: &'static str) -> Result<Pose> {
        let placement = self.model.frames.get(frame).ok_or_else(|| {
            PlacementError::missing(format!("{}/{}", self.object.label, frame), operation)
        })?;
        Ok(pose_from_placement(placement)?)
    }

    /// Placement of a frame of the linked model, in document coordinates.
    pub fn global_frame(&self, frame: &str, operation: &'static str) -> Result<Pose> {
        let local = self.local_frame(frame, operation)?;
        Ok(global_frame_pose(&self.placement, &local))
    }
}

/// First object labelled `label`.
pub fn require_label<'a>(
    doc: &'a Document,
    label: &str,
    operation: &'static str,
) -> Result<&'a DocumentObject> {
    doc.find_by_label(label)
        .ok_or_else(|| PlacementError::missing(label, operation))
}

/// Object with internal name `name`.
pub fn require_name<'a>(
    doc: &'a Document,
    name: &str,
    operation: &'static str,
) -> Result<&'a DocumentObject> {
    doc.get(name)
        .ok_or_else(|| PlacementError::missing(name, operation))
}

/// Shape of the body labelled `label`.
pub fn require_body<'a>(
    doc: &'a Document,
    label: &str,
    operation: &'static str,
) -> Result<(&'a DocumentObject, &'a Shape)> {
    let object = require_label(doc, label, operation)?;
    match &object.kind {
        ObjectKind::Body { shape } => Ok((object, shape)),
        _ => Err(wrong_kind(object, "Body", operation)),
    }
}

/// Link labelled `label`, resolved against its model.
pub fn require_link<'a>(
    doc: &'a Document,
    label: &str,
    operation: &'static str,
) -> Result<LinkRef<'a>> {
    let object = require_label(doc, label, operation)?;
    link_ref(doc, object, operation)
}

/// Resolve a link object against its model.
pub fn link_ref<'a>(
    doc: &'a Document,
    object: &'a DocumentObject,
    operation: &'static str,
) -> Result<LinkRef<'a>> {
    let ObjectKind::Link { model, placement } = &object.kind else {
        return Err(wrong_kind(object, "Link", operation));
    };
    let linked = doc
        .model(model)
        .ok_or_else(|| PlacementError::missing(model.as_str(), operation))?;
    Ok(LinkRef {
        object,
        model_name: model,
        model: linked,
        placement: pose_from_placement(placement)?,
    })
}

/// Placement of the coordinate system named `name`.
pub fn require_frame(doc: &Document, name: &str, operation: &'static str) -> Result<Pose> {
    let object = require_name(doc, name, operation)?;
    match &object.kind {
        ObjectKind::CoordinateSystem { placement, .. } => Ok(pose_from_placement(placement)?),
        _ => Err(wrong_kind(object, "CoordinateSystem", operation)),
    }
}

/// All sensor links in discovery (creation) order.
///
/// Every object whose label contains the sensor label must be a link.
pub fn sensors<'a>(
    doc: &'a Document,
    config: &PlacementConfig,
    operation: &'static str,
) -> Result<Vec<LinkRef<'a>>> {
    doc.find_by_label_containing(&config.sensor_label)
        .into_iter()
        .map(|object| link_ref(doc, object, operation))
        .collect()
}

/// Name of the frame object built for sensor `index`.
pub fn sensor_frame_name(index: usize) -> String {
    format!("s_lcs{index}")
}

fn wrong_kind(object: &DocumentObject, expected: &'static str, operation: &'static str) -> PlacementError {
    PlacementError::WrongObjectKind {
        label: object.label.clone(),
        expected,
        found: object.type_name(),
        operation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lhcad_ir::{Placement, Vec3};

    fn doc_with_sensor() -> Document {
        let mut doc = Document::new();
        let mut model = LinkedModel::default();
        model
            .frames
            .insert("LCS-Base".to_string(), Placement::at(Vec3::new(0.0, 0.0, 2.0)));
        doc.models.insert("sensor-model".to_string(), model);
        doc.insert(DocumentObject::new(
            "sensor",
            ObjectKind::Link {
                model: "sensor-model".to_string(),
                placement: Placement::at(Vec3::new(10.0, 0.0, 0.0)),
            },
        ));
        doc
    }

    #[test]
    fn resolves_link_frames() {
        let doc = doc_with_sensor();
        let link = require_link(&doc, "sensor", "test").unwrap();
        let global = link.global_frame("LCS-Base", "test").unwrap();
        assert_eq!(global.translation_vec(), lhcad_math::Vec3::new(10.0, 0.0, 2.0));
    }

    #[test]
    fn missing_frame_names_link_and_frame() {
        let doc = doc_with_sensor();
        let link = require_link(&doc, "sensor", "export").unwrap();
        let err = link.global_frame("LCS-Diode", "export").unwrap_err();
        assert_eq!(err.to_string(), "export: 'sensor/LCS-Diode' not found");
    }

    #[test]
    fn missing_object() {
        let doc = Document::new();
        let err = require_body(&doc, "tracker-base", "place").unwrap_err();
        assert!(matches!(
            err,
            PlacementError::MissingObject { ref label, operation: "place" } if label == "tracker-base"
        ));
    }

    #[test]
    fn wrong_kind_reported() {
        let doc = doc_with_sensor();
        let err = require_body(&doc, "sensor", "place").unwrap_err();
        assert!(matches!(
            err,
            PlacementError::WrongObjectKind { expected: "Body", found: "Link", .. }
        ));
    }

    #[test]
    fn sensors_match_label_anywhere() {
        let mut doc = doc_with_sensor();
        doc.insert(
            DocumentObject::new(
                "Link",
                ObjectKind::Link {
                    model: "sensor-model".to_string(),
                    placement: Placement::default(),
                },
            )
            .with_label("LH-sensor"),
        );
        let found = sensors(&doc, &PlacementConfig::default(), "test").unwrap();
        let labels: Vec<_> = found.iter().map(|s| s.object.label.as_str()).collect();
        assert_eq!(labels, ["sensor", "LH-sensor"]);
    }

    #[test]
    fn missing_model() {
        let mut doc = doc_with_sensor();
        doc.models.clear();
        let err = sensors(&doc, &PlacementConfig::default(), "export").unwrap_err();
        assert!(matches!(err, PlacementError::MissingObject { ref label, .. } if label == "sensor-model"));
    }
}
