//! Proximity ordering of sections

use std::collections::HashMap;

use crate::model::{BedRecord, Coordinate};

use super::sections::SectionView;

/// Sort sections nearest-first from `user`.
///
/// Stable: sections at equal distance keep their relative order, so
/// re-running with the same position is a no-op. Sections whose bed has no
/// usable coordinate go last. Membership is never touched.
pub fn order_by_proximity(sections: &mut [SectionView], beds: &[BedRecord], user: Coordinate) {
    let mut positions: HashMap<&str, Coordinate> = HashMap::with_capacity(beds.len());
    for bed in beds {
        if let Some(coordinate) = bed.coordinate() {
            positions.entry(bed.bed_id.as_str()).or_insert(coordinate);
        }
    }

    let distance = |section: &SectionView| {
        positions
            .get(section.bed_id.as_str())
            .map(|c| user.planar_distance(c))
            .unwrap_or(f64::INFINITY)
    };

    sections.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
}
