//! Garden data model
//!
//! Records as served by the garden data service and kept in the local cache:
//! - Plants (accessions) with their botanical properties and bed placement
//! - Beds with a display name and a map coordinate
//! - Images linking a plant to an image file

pub mod coordinate;
pub mod records;

pub use coordinate::Coordinate;
pub use records::{BedRecord, Collection, ImageRecord, PlantRecord, CURRENT_STATUS};
