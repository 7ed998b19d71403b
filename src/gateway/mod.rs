//! Remote data gateway
//!
//! Fetches the plant, bed and image collections from the garden data service:
//! 1. Request `<data_url>?class=<collection>`
//! 2. Accept a bare JSON array or an object wrapping it under the collection name
//! 3. Decode into typed records
//!
//! Failures are reported as `GatewayError` and never panic on malformed
//! payloads. Callers treat an error as "no data for this call".

pub mod http;
pub mod memory;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::model::{BedRecord, Collection, ImageRecord, PlantRecord};

pub use http::HttpGateway;
pub use memory::StaticGateway;

/// Transport for the garden data service
#[async_trait::async_trait]
pub trait DataGateway: Send + Sync {
    /// Raw payload of one collection
    async fn fetch(&self, collection: Collection) -> Result<Vec<u8>, GatewayError>;

    /// Thumbnail bytes for an image file
    async fn fetch_thumbnail(&self, file_name: &str) -> Result<Vec<u8>, GatewayError>;

    async fn plants(&self) -> Result<Vec<PlantRecord>, GatewayError> {
        let payload = self.fetch(Collection::Plants).await?;
        decode_collection(Collection::Plants, &payload)
    }

    async fn beds(&self) -> Result<Vec<BedRecord>, GatewayError> {
        let payload = self.fetch(Collection::Beds).await?;
        decode_collection(Collection::Beds, &payload)
    }

    async fn images(&self) -> Result<Vec<ImageRecord>, GatewayError> {
        let payload = self.fetch(Collection::Images).await?;
        decode_collection(Collection::Images, &payload)
    }
}

/// Decode a collection payload into records.
pub fn decode_collection<T: DeserializeOwned>(
    collection: Collection,
    payload: &[u8],
) -> Result<Vec<T>, GatewayError> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| GatewayError::Decode(format!("{}: {}", collection, e)))?;

    let items = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => map.remove(collection.as_str()).ok_or_else(|| {
            GatewayError::Decode(format!("{}: missing \"{}\" key", collection, collection))
        })?,
        other => {
            return Err(GatewayError::Decode(format!(
                "{}: expected array or object, got {}",
                collection,
                json_kind(&other)
            )))
        }
    };

    let records: Vec<T> = serde_json::from_value(items)
        .map_err(|e| GatewayError::Decode(format!("{}: {}", collection, e)))?;

    debug!(%collection, count = records.len(), "Decoded collection");
    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Gateway errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Payload too large: {0} bytes")]
    TooLarge(usize),

    #[error("Collection unavailable: {0}")]
    Unavailable(String),
}
