//! Section building: plants grouped by the bed they grow in

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::model::{BedRecord, PlantRecord};

/// One bed's worth of plants, as listed to the visitor
#[derive(Debug, Clone, PartialEq)]
pub struct SectionView {
    pub bed_id: String,
    pub plants: Vec<Arc<PlantRecord>>,
}

impl SectionView {
    pub fn new(bed_id: impl Into<String>) -> Self {
        Self {
            bed_id: bed_id.into(),
            plants: Vec::new(),
        }
    }

    pub fn recnums(&self) -> Vec<&str> {
        self.plants.iter().map(|p| p.recnum.as_str()).collect()
    }
}

/// Group current plants into one section per bed.
///
/// A plant listed under several beds appears in each of their sections.
/// Bed identifiers that match no known bed are skipped. Sections that end up
/// empty are dropped, so every returned section has at least one plant.
pub fn build_sections(plants: &[Arc<PlantRecord>], beds: &[BedRecord]) -> Vec<SectionView> {
    let mut sections: Vec<SectionView> = beds.iter().map(|b| SectionView::new(&b.bed_id)).collect();

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(beds.len());
    for (i, bed) in beds.iter().enumerate() {
        index.entry(bed.bed_id.as_str()).or_insert(i);
    }

    let mut skipped = 0usize;
    for plant in plants.iter().filter(|p| p.is_current()) {
        for bed_id in plant.bed_ids() {
            match index.get(bed_id) {
                Some(&i) => sections[i].plants.push(Arc::clone(plant)),
                None => {
                    skipped += 1;
                    debug!(recnum = %plant.recnum, bed_id, "Plant references unknown bed, skipping");
                }
            }
        }
    }

    sections.retain(|s| !s.plants.is_empty());

    debug!(
        sections = sections.len(),
        plants = plants.len(),
        skipped,
        "Built sections"
    );
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plants(records: Vec<PlantRecord>) -> Vec<Arc<PlantRecord>> {
        records.into_iter().map(Arc::new).collect()
    }

    #[test]
    fn test_single_plant_single_bed() {
        let beds = vec![BedRecord::new("B1", "Rose", 0.0, 0.0)];
        let plants = plants(vec![PlantRecord::new("P1", "B1", "C")]);

        let sections = build_sections(&plants, &beds);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].bed_id, "B1");
        assert_eq!(sections[0].recnums(), vec!["P1"]);
    }

    #[test]
    fn test_plant_in_several_beds_appears_in_each() {
        let beds = vec![
            BedRecord::new("B1", "Rose", 0.0, 0.0),
            BedRecord::new("B2", "Heather", 1.0, 1.0),
            BedRecord::new("B3", "Pond", 2.0, 2.0),
        ];
        let plants = plants(vec![
            PlantRecord::new("P1", "B1 B2", "C"),
            PlantRecord::new("P2", "\tB2\n", "C"),
        ]);

        let sections = build_sections(&plants, &beds);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].recnums(), vec!["P1"]);
        assert_eq!(sections[1].recnums(), vec!["P1", "P2"]);
    }

    #[test]
    fn test_non_current_plants_are_excluded() {
        let beds = vec![BedRecord::new("B1", "Rose", 0.0, 0.0)];
        let plants = plants(vec![
            PlantRecord::new("P1", "B1", "D"),
            PlantRecord::new("P2", "B1", "c"),
            PlantRecord::new("P3", "B1", ""),
        ]);

        assert!(build_sections(&plants, &beds).is_empty());
    }

    #[test]
    fn test_unknown_beds_are_skipped() {
        let beds = vec![BedRecord::new("B1", "Rose", 0.0, 0.0)];
        let plants = plants(vec![
            PlantRecord::new("P1", "B9", "C"),
            PlantRecord::new("P2", "B9 B1", "C"),
            PlantRecord::new("P3", "", "C"),
        ]);

        let sections = build_sections(&plants, &beds);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].recnums(), vec!["P2"]);
    }

    #[test]
    fn test_section_order_follows_bed_order() {
        let beds = vec![
            BedRecord::new("B2", "Heather", 1.0, 1.0),
            BedRecord::new("B1", "Rose", 0.0, 0.0),
        ];
        let plants = plants(vec![
            PlantRecord::new("P1", "B1", "C"),
            PlantRecord::new("P2", "B2", "C"),
        ]);

        let sections = build_sections(&plants, &beds);
        let order: Vec<&str> = sections.iter().map(|s| s.bed_id.as_str()).collect();
        assert_eq!(order, vec!["B2", "B1"]);
    }

    #[test]
    fn test_every_section_non_empty_and_membership_exact() {
        let beds: Vec<BedRecord> = (0..6)
            .map(|i| BedRecord::new(format!("B{}", i), format!("Bed {}", i), i as f64, 0.0))
            .collect();
        let plants = plants(
            (0..40)
                .map(|i| {
                    let status = if i % 3 == 0 { "H" } else { "C" };
                    PlantRecord::new(format!("P{}", i), format!("B{} B{} X{}", i % 4, (i + 1) % 9, i), status)
                })
                .collect(),
        );

        let sections = build_sections(&plants, &beds);
        assert!(sections.iter().all(|s| !s.plants.is_empty()));

        for plant in plants.iter() {
            for section in &sections {
                let listed = section.plants.iter().any(|p| p.recnum == plant.recnum);
                let expected = plant.is_current() && plant.bed_ids().any(|b| b == section.bed_id);
                assert_eq!(listed, expected, "{} in {}", plant.recnum, section.bed_id);
            }
        }
    }
}
