//! Presentation-ready views of plants and beds

use serde::Serialize;

use crate::model::{BedRecord, Coordinate, ImageRecord, PlantRecord};
use crate::model::records::field_label;

/// Properties shown in a list row, in display order
pub const ROW_LABEL_FIELDS: [&str; 5] = [
    "cultivar_name",
    "vernacular_name",
    "infraspecific_epithet",
    "species",
    "genus",
];

/// Placeholder for an empty property on the detail screen
pub const NO_INFORMATION: &str = "No information.";

/// Header text for a section whose bed is unknown
pub const UNKNOWN_BED_NAME: &str = "null";

/// List row text: one `Label: value` line per non-empty naming property
pub fn row_label(plant: &PlantRecord) -> String {
    let mut label = String::new();
    for key in ROW_LABEL_FIELDS {
        let value = plant.property(key);
        if !value.is_empty() {
            label.push_str(&field_label(key));
            label.push_str(": ");
            label.push_str(value);
            label.push('\n');
        }
    }
    label
}

/// Everything the detail screen shows for one plant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantDetails {
    pub recnum: String,
    pub fields: Vec<(String, String)>,
    pub image_urls: Vec<String>,
    pub location: Option<PlantLocation>,
}

/// Where a plant's accession originates, for the detail map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantLocation {
    pub coordinate: Coordinate,
    pub title: String,
}

impl PlantDetails {
    pub fn new<'a>(
        plant: &PlantRecord,
        images: impl Iterator<Item = &'a ImageRecord>,
        images_url: &str,
    ) -> Self {
        let fields = plant
            .labelled_values()
            .into_iter()
            .map(|(label, value)| {
                if value.is_empty() {
                    (label, NO_INFORMATION.to_string())
                } else {
                    (label, value)
                }
            })
            .collect();

        let base = images_url.trim_end_matches('/');
        let image_urls = images
            .map(|image| format!("{}/{}", base, image.img_file_name))
            .collect();

        let location = plant.coordinate().map(|coordinate| {
            let sgu = plant.property("sgu");
            let title = if sgu.is_empty() { plant.property("country") } else { sgu };
            PlantLocation {
                coordinate,
                title: title.to_string(),
            }
        });

        Self {
            recnum: plant.recnum.clone(),
            fields,
            image_urls,
            location,
        }
    }
}

/// Map annotation for a bed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BedPin {
    pub bed_id: String,
    pub name: String,
    pub coordinate: Coordinate,
}

impl BedPin {
    pub fn from_bed(bed: &BedRecord) -> Option<Self> {
        Some(Self {
            bed_id: bed.bed_id.clone(),
            name: bed.name.clone(),
            coordinate: bed.coordinate()?,
        })
    }
}
