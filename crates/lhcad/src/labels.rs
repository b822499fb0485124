//! Channel labels in the 3D view.

use lhcad_ir::{Document, DocumentObject, ObjectKind};

use crate::config::PlacementConfig;
use crate::error::Result;
use crate::lookup;

const OPERATION: &str = "annotate_sensor_labels";
const GROUP_NAME: &str = "LGroup";
const GROUP_LABEL: &str = "Label Group";
const BACKGROUND: [f64; 3] = [1.0, 0.0, 0.0];

/// Create or update a `ch<channel>` annotation at each sensor's link origin
/// and collect them in one group. Returns the number of annotations.
pub fn annotate_sensor_labels(doc: &mut Document, config: &PlacementConfig) -> Result<usize> {
    let annotations: Vec<DocumentObject> = lookup::sensors(doc, config, OPERATION)?
        .iter()
        .enumerate()
        .map(|(idx, sensor)| {
            let origin = sensor.placement.translation_vec();
            DocumentObject::new(
                format!("chlabel{idx}"),
                ObjectKind::Annotation {
                    text: format!("ch{}", sensor.object.label2),
                    base_position: crate::composer::vec_to_ir(&origin),
                    background_color: BACKGROUND,
                },
            )
        })
        .collect();

    let names: Vec<String> = annotations.iter().map(|a| a.name.clone()).collect();
    for annotation in annotations {
        doc.insert(annotation);
    }

    let mut members = match doc.get(GROUP_NAME).map(|g| &g.kind) {
        Some(ObjectKind::Group { members }) => members.clone(),
        _ => Vec::new(),
    };
    for name in &names {
        if !members.contains(name) {
            members.push(name.clone());
        }
    }
    doc.insert(DocumentObject::new(GROUP_NAME, ObjectKind::Group { members }).with_label(GROUP_LABEL));

    tracing::debug!(count = names.len(), "sensor labels updated");
    Ok(names.len())
}
