//! In-process gateway serving fixed payloads
//!
//! Stands in for the garden data service when the guide runs offline or
//! under test. Tracks how often each collection was requested.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;

use super::{DataGateway, GatewayError};
use crate::model::{BedRecord, Collection, ImageRecord, PlantRecord};

#[derive(Default)]
pub struct StaticGateway {
    payloads: HashMap<Collection, Result<Vec<u8>, GatewayError>>,
    thumbnails: HashMap<String, Vec<u8>>,
    calls: Mutex<HashMap<Collection, usize>>,
}

impl StaticGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plants(self, plants: &[PlantRecord]) -> Self {
        self.with_records(Collection::Plants, plants)
    }

    pub fn with_beds(self, beds: &[BedRecord]) -> Self {
        self.with_records(Collection::Beds, beds)
    }

    pub fn with_images(self, images: &[ImageRecord]) -> Self {
        self.with_records(Collection::Images, images)
    }

    /// Serve an arbitrary (possibly malformed) payload
    pub fn with_payload(mut self, collection: Collection, payload: impl Into<Vec<u8>>) -> Self {
        self.payloads.insert(collection, Ok(payload.into()));
        self
    }

    /// Make a collection fail with a network error
    pub fn failing(mut self, collection: Collection) -> Self {
        self.payloads.insert(
            collection,
            Err(GatewayError::Network(format!("{} unreachable", collection))),
        );
        self
    }

    pub fn with_thumbnail(mut self, file_name: impl Into<String>, data: Vec<u8>) -> Self {
        self.thumbnails.insert(file_name.into(), data);
        self
    }

    /// Number of `fetch` calls made for a collection
    pub fn calls(&self, collection: Collection) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(&collection).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn with_records<T: Serialize>(mut self, collection: Collection, records: &[T]) -> Self {
        let payload = serde_json::to_vec(records).map_err(|e| GatewayError::Decode(e.to_string()));
        self.payloads.insert(collection, payload);
        self
    }
}

#[async_trait::async_trait]
impl DataGateway for StaticGateway {
    async fn fetch(&self, collection: Collection) -> Result<Vec<u8>, GatewayError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(collection).or_insert(0) += 1;
        }

        match self.payloads.get(&collection) {
            Some(payload) => payload.clone(),
            None => Err(GatewayError::Unavailable(collection.to_string())),
        }
    }

    async fn fetch_thumbnail(&self, file_name: &str) -> Result<Vec<u8>, GatewayError> {
        self.thumbnails
            .get(file_name)
            .cloned()
            .ok_or_else(|| GatewayError::Status(404))
    }
}
