//! HTTP transport for the garden data service

use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, info};

use super::{DataGateway, GatewayError};
use crate::config::ServiceConfig;
use crate::model::Collection;

/// Fetches collections and thumbnails over HTTP.
///
/// Each request is a single attempt bounded by the configured timeout.
pub struct HttpGateway {
    client: reqwest::Client,
    data_url: String,
    thumbnails_url: String,
    timeout: Duration,
    max_thumbnail_bytes: usize,
}

impl HttpGateway {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            data_url: config.data_url.clone(),
            thumbnails_url: config.thumbnails_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_thumbnail_bytes: config.max_thumbnail_bytes,
        }
    }

    fn thumbnail_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.thumbnails_url, file_name)
    }
}

#[async_trait::async_trait]
impl DataGateway for HttpGateway {
    async fn fetch(&self, collection: Collection) -> Result<Vec<u8>, GatewayError> {
        info!(%collection, url = %self.data_url, "Fetching collection");

        let response = self
            .client
            .get(&self.data_url)
            .query(&[("class", collection.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status().as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        debug!(%collection, bytes = body.len(), "Collection received");
        Ok(body.to_vec())
    }

    async fn fetch_thumbnail(&self, file_name: &str) -> Result<Vec<u8>, GatewayError> {
        let url = self.thumbnail_url(file_name);
        debug!(%url, "Fetching thumbnail");

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status().as_u16()));
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_thumbnail_bytes {
                return Err(GatewayError::TooLarge(len as usize));
            }
        }

        let mut data = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| GatewayError::Network(e.to_string()))?;
            data.extend_from_slice(&chunk);
            if data.len() > self.max_thumbnail_bytes {
                return Err(GatewayError::TooLarge(data.len()));
            }
        }

        Ok(data)
    }
}
