//! Document model for lhcad tracker assemblies.
//!
//! This crate defines the serializable object graph the placement and export
//! operations work on: a tracker base shape, sensor and mainboard links,
//! stamp links, helper points, local coordinate systems, a correction
//! spreadsheet, cut features and annotations.
//!
//! The model is purely declarative. Cut features only record which tool is
//! subtracted where; evaluating them into solids is left to a geometry
//! kernel.
//!
//! Objects are stored in creation order. Every label-based discovery walks
//! that order, so the ordinal index of a sensor is stable for a given
//! document and survives a JSON round-trip.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 3D vector with f64 components (conventionally millimeters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Create a new Vec3.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// Rigid placement as stored in the document.
///
/// Rotation is `angle` degrees about `axis`, applied before the `base`
/// translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Translation.
    pub base: Vec3,
    /// Rotation axis (need not be normalized; ignored when `angle` is zero).
    pub axis: Vec3,
    /// Rotation angle in degrees.
    pub angle: f64,
}

impl Placement {
    /// Placement with only a translation.
    pub fn at(base: Vec3) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            base: Vec3::zero(),
            axis: Vec3::new(0.0, 0.0, 1.0),
            angle: 0.0,
        }
    }
}

/// A bounded face of a solid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Face {
    /// Planar rectangle centered at `center`.
    Rectangle {
        /// Center of the rectangle.
        center: Vec3,
        /// Outward normal.
        normal: Vec3,
        /// In-plane direction of the first edge pair.
        u_dir: Vec3,
        /// Half-extent along `u_dir`.
        half_u: f64,
        /// Half-extent along `normal × u_dir`.
        half_v: f64,
    },
}

/// A closed solid bounded by faces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solid {
    /// Bounding faces.
    pub faces: Vec<Face>,
    /// Whether the solid passed the host's validity check.
    #[serde(default = "default_true")]
    pub valid: bool,
}

fn default_true() -> bool {
    true
}

/// A shape made of zero or more solids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Solids of the shape.
    pub solids: Vec<Solid>,
}

/// A separately-modelled part referenced by link objects.
///
/// Carries the local coordinate systems defined inside the part, keyed by
/// label (`LCS-Base`, `LCS-Diode`, `LCS-IMU`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkedModel {
    /// Local coordinate systems of the model, keyed by label.
    pub frames: BTreeMap<String, Placement>,
    /// Geometry of the model, used as cutting tool for stamps.
    #[serde(default)]
    pub shape: Shape,
}

/// Type-specific payload of a document object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectKind {
    /// A body with its own geometry.
    Body {
        /// Geometry of the body.
        shape: Shape,
    },
    /// A reference to a [`LinkedModel`] with its own placement.
    Link {
        /// Key into [`Document::models`].
        model: String,
        /// Placement of the linked model in this document.
        placement: Placement,
    },
    /// A datum point.
    Point {
        /// Position of the point.
        placement: Placement,
    },
    /// A local coordinate system attached to three datum points.
    CoordinateSystem {
        /// Resolved placement.
        placement: Placement,
        /// Names of the datum points it is attached to.
        support: Vec<String>,
        /// Attachment mode (e.g. `OZX`).
        map_mode: String,
    },
    /// A cell-addressed spreadsheet.
    Spreadsheet {
        /// Cell contents keyed by address (`A1`, `B2`, ...).
        cells: BTreeMap<String, String>,
    },
    /// `base` minus `tool` placed at each entry of `tool_placements`.
    Cut {
        /// Name of the body being cut.
        base: String,
        /// Linked model whose shape is the cutting tool.
        tool: String,
        /// Tool placements, one per cut.
        tool_placements: Vec<Placement>,
    },
    /// A text label shown in the 3D view.
    Annotation {
        /// Displayed text.
        text: String,
        /// Anchor position.
        base_position: Vec3,
        /// Background color as `[r, g, b]` in 0.0..1.0.
        background_color: [f64; 3],
    },
    /// A group of other objects.
    Group {
        /// Names of member objects.
        members: Vec<String>,
    },
}

/// Display state of an object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Whether the object is shown.
    pub visible: bool,
    /// Transparency in percent (0 = opaque).
    pub transparency: u8,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            visible: true,
            transparency: 0,
        }
    }
}

/// An object in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentObject {
    /// Unique internal name.
    pub name: String,
    /// User-visible label (not necessarily unique).
    pub label: String,
    /// Free-form description; sensors store their channel index here.
    #[serde(default)]
    pub label2: String,
    /// Display state.
    #[serde(default)]
    pub view: ViewState,
    /// Type-specific payload.
    pub kind: ObjectKind,
}

impl DocumentObject {
    /// Create an object whose label equals its name.
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            label2: String::new(),
            view: ViewState::default(),
            kind,
        }
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the description.
    pub fn with_label2(mut self, label2: impl Into<String>) -> Self {
        self.label2 = label2.into();
        self
    }

    /// Short type name of the payload, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ObjectKind::Body { .. } => "Body",
            ObjectKind::Link { .. } => "Link",
            ObjectKind::Point { .. } => "Point",
            ObjectKind::CoordinateSystem { .. } => "CoordinateSystem",
            ObjectKind::Spreadsheet { .. } => "Spreadsheet",
            ObjectKind::Cut { .. } => "Cut",
            ObjectKind::Annotation { .. } => "Annotation",
            ObjectKind::Group { .. } => "Group",
        }
    }
}

/// An lhcad document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Format version string (e.g. "0.1").
    pub version: String,
    /// Objects in creation order.
    pub objects: Vec<DocumentObject>,
    /// Linked models, keyed by name.
    pub models: BTreeMap<String, LinkedModel>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            objects: Vec::new(),
            models: BTreeMap::new(),
        }
    }
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Append an object, replacing any existing object with the same name
    /// in place (keeping its position in the creation order).
    pub fn insert(&mut self, object: DocumentObject) -> &mut DocumentObject {
        let idx = match self.objects.iter().position(|o| o.name == object.name) {
            Some(idx) => {
                self.objects[idx] = object;
                idx
            }
            None => {
                self.objects.push(object);
                self.objects.len() - 1
            }
        };
        &mut self.objects[idx]
    }

    /// Object by internal name.
    pub fn get(&self, name: &str) -> Option<&DocumentObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Mutable object by internal name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut DocumentObject> {
        self.objects.iter_mut().find(|o| o.name == name)
    }

    /// First object (in creation order) whose label is exactly `label`.
    pub fn find_by_label(&self, label: &str) -> Option<&DocumentObject> {
        self.objects.iter().find(|o| o.label == label)
    }

    /// All objects whose label contains `pattern`, in creation order.
    pub fn find_by_label_containing(&self, pattern: &str) -> Vec<&DocumentObject> {
        self.objects
            .iter()
            .filter(|o| o.label.contains(pattern))
            .collect()
    }

    /// Linked model by name.
    pub fn model(&self, name: &str) -> Option<&LinkedModel> {
        self.models.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(name: &str, channel: &str) -> DocumentObject {
        DocumentObject::new(
            name,
            ObjectKind::Link {
                model: "sensor-model".to_string(),
                placement: Placement::at(Vec3::new(1.0, 2.0, 3.0)),
            },
        )
        .with_label2(channel)
    }

    #[test]
    fn roundtrip_document() {
        let mut doc = Document::new();

        let mut model = LinkedModel::default();
        model.frames.insert(
            "LCS-Base".to_string(),
            Placement {
                base: Vec3::new(0.0, 0.0, -1.5),
                axis: Vec3::new(1.0, 0.0, 0.0),
                angle: 180.0,
            },
        );
        doc.models.insert("sensor-model".to_string(), model);

        doc.insert(DocumentObject::new(
            "tracker-base",
            ObjectKind::Body {
                shape: Shape {
                    solids: vec![Solid {
                        faces: vec![Face::Rectangle {
                            center: Vec3::zero(),
                            normal: Vec3::new(0.0, 0.0, 1.0),
                            u_dir: Vec3::new(1.0, 0.0, 0.0),
                            half_u: 10.0,
                            half_v: 5.0,
                        }],
                        valid: true,
                    }],
                },
            },
        ));
        doc.insert(sensor("sensor", "3"));
        doc.insert(sensor("sensor001", "7"));

        let json = doc.to_json().expect("serialize");
        let restored = Document::from_json(&json).expect("deserialize");

        assert_eq!(doc, restored);
        assert_eq!(restored.objects.len(), 3);
        assert_eq!(restored.models.len(), 1);
    }

    #[test]
    fn discovery_follows_creation_order() {
        let mut doc = Document::new();
        doc.insert(sensor("sensor002", "a"));
        doc.insert(DocumentObject::new("stamp", ObjectKind::Group { members: vec![] }));
        doc.insert(sensor("sensor", "b"));
        doc.insert(sensor("sensor001", "c"));

        let names: Vec<_> = doc
            .find_by_label_containing("sensor")
            .into_iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, ["sensor002", "sensor", "sensor001"]);

        // order survives serialization
        let restored = Document::from_json(&doc.to_json().unwrap()).unwrap();
        let again: Vec<_> = restored
            .find_by_label_containing("sensor")
            .into_iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, again);
    }

    #[test]
    fn discovery_matches_anywhere_in_label() {
        let mut doc = Document::new();
        doc.insert(sensor("sensor", "0"));
        doc.insert(sensor("Link", "1").with_label("LH-sensor"));
        doc.insert(sensor("Link001", "2").with_label("tracker sensor 3"));
        doc.insert(sensor("Link002", "3").with_label("Sensor"));

        let labels: Vec<_> = doc
            .find_by_label_containing("sensor")
            .into_iter()
            .map(|o| o.label.as_str())
            .collect();
        assert_eq!(labels, ["sensor", "LH-sensor", "tracker sensor 3"]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut doc = Document::new();
        doc.insert(sensor("sensor", "1"));
        doc.insert(sensor("sensor001", "2"));
        doc.insert(sensor("sensor", "9"));

        assert_eq!(doc.objects.len(), 2);
        assert_eq!(doc.objects[0].name, "sensor");
        assert_eq!(doc.objects[0].label2, "9");
    }

    #[test]
    fn lookup_by_label() {
        let mut doc = Document::new();
        doc.insert(
            DocumentObject::new("Body", ObjectKind::Body { shape: Shape::default() })
                .with_label("tracker-base"),
        );
        assert_eq!(doc.find_by_label("tracker-base").unwrap().name, "Body");
        assert!(doc.find_by_label("Body").is_none());
        assert!(doc.get("Body").is_some());
    }

    #[test]
    fn serde_tagged_kind() {
        let obj = DocumentObject::new(
            "SensorSpreadsheet",
            ObjectKind::Spreadsheet {
                cells: BTreeMap::new(),
            },
        );
        let json = serde_json::to_string(&obj).unwrap();
        assert!(json.contains(r#""type":"Spreadsheet""#));

        let restored: DocumentObject = serde_json::from_str(&json).unwrap();
        assert_eq!(obj, restored);
        assert_eq!(restored.type_name(), "Spreadsheet");
    }

    #[test]
    fn empty_document() {
        let doc = Document::new();
        assert_eq!(doc.version, "0.1");
        assert!(doc.objects.is_empty());
        assert!(doc.models.is_empty());
    }
}
