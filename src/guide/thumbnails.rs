//! Row thumbnail cache
//!
//! Fetches are fire-and-forget tasks keyed by record number. A row that is
//! reused before its fetch lands may request again; whichever fetch finishes
//! last wins.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

use super::GuideEvent;
use crate::gateway::DataGateway;

/// Result of asking for a row's thumbnail
#[derive(Debug)]
pub enum ThumbnailRequest {
    /// Bytes already cached
    Cached(Arc<Vec<u8>>),
    /// Fetch started; `GuideEvent::ThumbnailReady` follows on success
    Pending(JoinHandle<()>),
    /// The plant has no image
    NoImage,
}

#[derive(Clone)]
pub struct ThumbnailCache {
    gateway: Arc<dyn DataGateway>,
    entries: Arc<RwLock<HashMap<String, Arc<Vec<u8>>>>>,
    events: broadcast::Sender<GuideEvent>,
}

impl ThumbnailCache {
    pub fn new(gateway: Arc<dyn DataGateway>, events: broadcast::Sender<GuideEvent>) -> Self {
        Self {
            gateway,
            entries: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    pub async fn get(&self, recnum: &str) -> Option<Arc<Vec<u8>>> {
        self.entries.read().await.get(recnum).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Cached bytes, or start a background fetch of `file_name`.
    pub async fn request(&self, recnum: &str, file_name: &str) -> ThumbnailRequest {
        if let Some(data) = self.get(recnum).await {
            return ThumbnailRequest::Cached(data);
        }

        let gateway = Arc::clone(&self.gateway);
        let entries = Arc::clone(&self.entries);
        let events = self.events.clone();
        let recnum = recnum.to_string();
        let file_name = file_name.to_string();

        let handle = tokio::spawn(async move {
            match gateway.fetch_thumbnail(&file_name).await {
                Ok(data) => {
                    entries.write().await.insert(recnum.clone(), Arc::new(data));
                    let _ = events.send(GuideEvent::ThumbnailReady { recnum });
                }
                Err(e) => {
                    debug!(%recnum, %file_name, error = %e, "Thumbnail fetch failed");
                }
            }
        });

        ThumbnailRequest::Pending(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::StaticGateway;

    #[tokio::test]
    async fn test_fetch_then_cached() {
        let gateway = Arc::new(StaticGateway::new().with_thumbnail("p1.jpg", vec![1, 2, 3]));
        let (tx, mut rx) = broadcast::channel(8);
        let cache = ThumbnailCache::new(gateway, tx);

        match cache.request("P1", "p1.jpg").await {
            ThumbnailRequest::Pending(handle) => handle.await.unwrap(),
            other => panic!("expected pending fetch, got {:?}", other),
        }
        assert_eq!(
            rx.recv().await.unwrap(),
            GuideEvent::ThumbnailReady { recnum: "P1".into() }
        );

        match cache.request("P1", "p1.jpg").await {
            ThumbnailRequest::Cached(data) => assert_eq!(*data, vec![1, 2, 3]),
            other => panic!("expected cached thumbnail, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_redundant_requests_tolerated() {
        let gateway = Arc::new(StaticGateway::new().with_thumbnail("p1.jpg", vec![9]));
        let (tx, _rx) = broadcast::channel(8);
        let cache = ThumbnailCache::new(gateway, tx);

        let first = cache.request("P1", "p1.jpg").await;
        let second = cache.request("P1", "p1.jpg").await;
        for request in [first, second] {
            if let ThumbnailRequest::Pending(handle) = request {
                handle.await.unwrap();
            }
        }

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("P1").await.as_deref(), Some(&vec![9]));
    }

    #[tokio::test]
    async fn test_failed_fetch_caches_nothing() {
        let gateway = Arc::new(StaticGateway::new());
        let (tx, _rx) = broadcast::channel(8);
        let cache = ThumbnailCache::new(gateway, tx);

        if let ThumbnailRequest::Pending(handle) = cache.request("P1", "missing.jpg").await {
            handle.await.unwrap();
        }
        assert!(cache.get("P1").await.is_none());
    }
}
