//! Loaded garden data plus the derived section view

use std::sync::Arc;

use crate::model::{BedRecord, Coordinate, ImageRecord, PlantRecord};

use super::proximity::order_by_proximity;
use super::sections::{build_sections, SectionView};

/// Plants, beds and images for the session, with sections derived from them
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    plants: Vec<Arc<PlantRecord>>,
    beds: Vec<BedRecord>,
    images: Vec<ImageRecord>,
    sections: Vec<SectionView>,
}

impl Catalog {
    /// Take ownership of freshly loaded collections and build sections.
    pub fn build(plants: Vec<PlantRecord>, beds: Vec<BedRecord>, images: Vec<ImageRecord>) -> Self {
        let plants: Vec<Arc<PlantRecord>> = plants.into_iter().map(Arc::new).collect();
        let sections = build_sections(&plants, &beds);
        Self {
            plants,
            beds,
            images,
            sections,
        }
    }

    pub fn plants(&self) -> &[Arc<PlantRecord>] {
        &self.plants
    }

    pub fn beds(&self) -> &[BedRecord] {
        &self.beds
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn sections(&self) -> &[SectionView] {
        &self.sections
    }

    pub fn plant(&self, recnum: &str) -> Option<&Arc<PlantRecord>> {
        self.plants.iter().find(|p| p.recnum == recnum)
    }

    pub fn bed(&self, bed_id: &str) -> Option<&BedRecord> {
        self.beds.iter().find(|b| b.bed_id == bed_id)
    }

    pub fn images_for<'a>(&'a self, recnum: &'a str) -> impl Iterator<Item = &'a ImageRecord> + 'a {
        self.images.iter().filter(move |i| i.recnum == recnum)
    }

    /// Images arrive after sections on cached runs; they never affect them.
    pub fn set_images(&mut self, images: Vec<ImageRecord>) {
        self.images = images;
    }

    /// Replace plants and beds, rebuilding sections wholesale
    pub fn replace(&mut self, plants: Vec<PlantRecord>, beds: Vec<BedRecord>) {
        let images = std::mem::take(&mut self.images);
        *self = Self::build(plants, beds, images);
    }

    pub fn order_sections(&mut self, user: Coordinate) {
        order_by_proximity(&mut self.sections, &self.beds, user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_lookup() {
        let catalog = Catalog::build(
            vec![PlantRecord::new("P1", "B1", "C")],
            vec![BedRecord::new("B1", "Rose", 0.0, 0.0)],
            vec![
                ImageRecord { recnum: "P1".into(), img_file_name: "a.jpg".into() },
                ImageRecord { recnum: "P2".into(), img_file_name: "b.jpg".into() },
                ImageRecord { recnum: "P1".into(), img_file_name: "c.jpg".into() },
            ],
        );

        assert_eq!(catalog.sections().len(), 1);
        assert_eq!(catalog.bed("B1").map(|b| b.name.as_str()), Some("Rose"));
        assert!(catalog.bed("B2").is_none());
        assert!(catalog.plant("P1").is_some());

        let files: Vec<&str> = catalog.images_for("P1").map(|i| i.img_file_name.as_str()).collect();
        assert_eq!(files, vec!["a.jpg", "c.jpg"]);
    }

    #[test]
    fn test_replace_rebuilds_sections_and_keeps_images() {
        let mut catalog = Catalog::build(
            vec![PlantRecord::new("P1", "B1", "C")],
            vec![BedRecord::new("B1", "Rose", 0.0, 0.0)],
            vec![ImageRecord { recnum: "P2".into(), img_file_name: "b.jpg".into() }],
        );

        catalog.replace(
            vec![PlantRecord::new("P2", "B2", "C")],
            vec![BedRecord::new("B2", "Heather", 1.0, 1.0)],
        );

        assert_eq!(catalog.sections().len(), 1);
        assert_eq!(catalog.sections()[0].bed_id, "B2");
        assert_eq!(catalog.images_for("P2").count(), 1);
    }
}
