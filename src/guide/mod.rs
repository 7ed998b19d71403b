//! Visitor guide state
//!
//! The `Guide` is the single serialization point for the guide's data:
//! - Startup reconciliation between service and cache (bootstrap.rs)
//! - Per-bed sections of current plants (sections.rs)
//! - Nearest-first ordering from live location updates (proximity.rs)
//! - Write-through favorites (favorites.rs)
//! - Row thumbnails (thumbnails.rs)
//!
//! Every mutation goes through `&mut self` and is followed by a
//! `GuideEvent` so a renderer can refresh.

pub mod bootstrap;
pub mod catalog;
pub mod details;
pub mod favorites;
pub mod proximity;
pub mod sections;
pub mod thumbnails;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::gateway::DataGateway;
use crate::model::{Coordinate, ImageRecord, PlantRecord};
use crate::store::{CacheStore, StoreError};

pub use bootstrap::{BootstrapError, BootstrapPath, BootstrapReport, BootstrapState, Reconciler, Stage};
pub use catalog::Catalog;
pub use details::{row_label, BedPin, PlantDetails};
pub use favorites::FavoritesLedger;
pub use sections::SectionView;
pub use thumbnails::{ThumbnailCache, ThumbnailRequest};

use bootstrap::PendingImages;
use details::UNKNOWN_BED_NAME;

const EVENT_CAPACITY: usize = 256;

/// Refresh signals for the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GuideEvent {
    /// Sections are available for the first time
    Ready { sections: usize },
    /// Section membership was rebuilt
    SectionsRebuilt { sections: usize },
    /// Section order changed after a location update
    SectionsReordered,
    /// Image metadata arrived
    ImagesLoaded { count: usize },
    /// A favorite mutation finished; `persisted` is false when the store
    /// rejected it and nothing changed
    FavoritesChanged {
        recnum: String,
        favorite: bool,
        persisted: bool,
    },
    /// Thumbnail bytes for a row are cached
    ThumbnailReady { recnum: String },
}

/// Readiness of the guide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GuideStatus {
    NotReady,
    Ready,
}

pub struct Guide {
    gateway: Arc<dyn DataGateway>,
    store: Box<dyn CacheStore>,
    catalog: Catalog,
    favorites: FavoritesLedger,
    thumbnails: ThumbnailCache,
    status: GuideStatus,
    bootstrapped: bool,
    pending_images: Option<PendingImages>,
    last_location: Option<Coordinate>,
    images_url: String,
    events: broadcast::Sender<GuideEvent>,
}

impl Guide {
    pub fn new(gateway: Arc<dyn DataGateway>, store: Box<dyn CacheStore>, images_url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            thumbnails: ThumbnailCache::new(Arc::clone(&gateway), events.clone()),
            gateway,
            store,
            catalog: Catalog::default(),
            favorites: FavoritesLedger::new(),
            status: GuideStatus::NotReady,
            bootstrapped: false,
            pending_images: None,
            last_location: None,
            images_url: images_url.into(),
            events,
        }
    }

    /// Subscribe to refresh signals
    pub fn subscribe(&self) -> broadcast::Receiver<GuideEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: GuideEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn status(&self) -> GuideStatus {
        self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == GuideStatus::Ready
    }

    /// Populate the guide from the service or the cache. Runs once per
    /// guide; later calls are rejected.
    pub async fn bootstrap(&mut self) -> Result<BootstrapReport, BootstrapError> {
        if self.bootstrapped {
            return Err(BootstrapError::AlreadyRan);
        }
        self.bootstrapped = true;

        let state = BootstrapState::read(&*self.store);
        let reconciled = Reconciler::new(Arc::clone(&self.gateway), &mut *self.store)
            .run(state)
            .await;

        self.favorites = FavoritesLedger::from_persisted(reconciled.favorites);
        self.pending_images = reconciled.pending_images;

        match reconciled.catalog {
            Some(catalog) => {
                let images = catalog.images().len();
                self.catalog = catalog;
                if let Some(location) = self.last_location {
                    self.catalog.order_sections(location);
                }
                self.status = GuideStatus::Ready;

                let sections = self.catalog.sections().len();
                info!(sections, path = ?reconciled.report.path, "Guide ready");
                self.emit(GuideEvent::SectionsRebuilt { sections });
                self.emit(GuideEvent::Ready { sections });
                if images > 0 {
                    self.emit(GuideEvent::ImagesLoaded { count: images });
                }
            }
            None => {
                warn!(failed = reconciled.report.failed.len(), "Guide data unavailable");
            }
        }

        Ok(reconciled.report)
    }

    /// Apply a background image fetch if it has finished; never waits.
    pub async fn poll_pending_images(&mut self) -> bool {
        match &self.pending_images {
            Some(handle) if handle.is_finished() => self.finish_pending_images().await,
            _ => false,
        }
    }

    /// Wait for the background image fetch and apply it.
    ///
    /// Returns `true` when images were applied.
    pub async fn finish_pending_images(&mut self) -> bool {
        let Some(handle) = self.pending_images.take() else {
            return false;
        };

        match handle.await {
            Ok(Ok(images)) => {
                self.apply_images(images);
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Image data unavailable");
                false
            }
            Err(e) => {
                warn!(error = %e, "Image fetch task failed");
                false
            }
        }
    }

    fn apply_images(&mut self, images: Vec<ImageRecord>) {
        let count = images.len();
        self.catalog.set_images(images);
        debug!(count, "Images loaded");
        self.emit(GuideEvent::ImagesLoaded { count });
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn sections(&self) -> &[SectionView] {
        self.catalog.sections()
    }

    /// Section header text
    pub fn bed_name(&self, bed_id: &str) -> &str {
        self.catalog
            .bed(bed_id)
            .map(|b| b.name.as_str())
            .unwrap_or(UNKNOWN_BED_NAME)
    }

    pub fn plant(&self, recnum: &str) -> Option<&Arc<PlantRecord>> {
        self.catalog.plant(recnum)
    }

    pub fn images_for<'a>(&'a self, recnum: &'a str) -> impl Iterator<Item = &'a ImageRecord> + 'a {
        self.catalog.images_for(recnum)
    }

    pub fn plant_details(&self, recnum: &str) -> Option<PlantDetails> {
        let plant = self.catalog.plant(recnum)?;
        Some(PlantDetails::new(plant, self.catalog.images_for(recnum), &self.images_url))
    }

    /// Map pins for the beds of the displayed sections
    pub fn bed_pins(&self) -> Vec<BedPin> {
        self.sections()
            .iter()
            .filter_map(|section| {
                let pin = self.catalog.bed(&section.bed_id).and_then(BedPin::from_bed);
                if pin.is_none() {
                    debug!(bed_id = %section.bed_id, "No position for bed, no pin");
                }
                pin
            })
            .collect()
    }

    /// Re-sort sections nearest-first from a new user position.
    pub fn update_location(&mut self, location: Coordinate) {
        self.last_location = Some(location);
        self.catalog.order_sections(location);
        self.emit(GuideEvent::SectionsReordered);
    }

    pub fn last_location(&self) -> Option<Coordinate> {
        self.last_location
    }

    pub fn favorites(&self) -> &FavoritesLedger {
        &self.favorites
    }

    pub fn is_favorite(&self, recnum: &str) -> bool {
        self.favorites.is_favorite(recnum)
    }

    pub fn add_favorite(&mut self, recnum: &str) -> Result<(), StoreError> {
        let result = self.favorites.add(&mut *self.store, recnum);
        self.emit(GuideEvent::FavoritesChanged {
            recnum: recnum.to_string(),
            favorite: self.favorites.is_favorite(recnum),
            persisted: result.is_ok(),
        });
        result
    }

    pub fn remove_favorite(&mut self, recnum: &str) -> Result<(), StoreError> {
        let result = self.favorites.remove(&mut *self.store, recnum);
        self.emit(GuideEvent::FavoritesChanged {
            recnum: recnum.to_string(),
            favorite: self.favorites.is_favorite(recnum),
            persisted: result.is_ok(),
        });
        result
    }

    /// Star button: remove when favorited, add otherwise
    pub fn toggle_favorite(&mut self, recnum: &str) -> Result<bool, StoreError> {
        if self.is_favorite(recnum) {
            self.remove_favorite(recnum)?;
        } else {
            self.add_favorite(recnum)?;
        }
        Ok(self.is_favorite(recnum))
    }

    /// Thumbnail for a row, fetching it in the background when not cached
    pub async fn thumbnail(&self, recnum: &str) -> ThumbnailRequest {
        let file_name = match self.catalog.images_for(recnum).next() {
            Some(image) => image.img_file_name.clone(),
            None => return ThumbnailRequest::NoImage,
        };
        self.thumbnails.request(recnum, &file_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::StaticGateway;
    use crate::model::BedRecord;
    use crate::store::MemoryStore;

    fn guide(store: MemoryStore) -> Guide {
        let gateway = StaticGateway::new()
            .with_plants(&[
                PlantRecord::new("P1", "B1", "C").with_property("genus", "Rosa"),
                PlantRecord::new("P2", "B2 B1", "C"),
                PlantRecord::new("P3", "B2", "H"),
            ])
            .with_beds(&[
                BedRecord::new("B1", "Rose", 0.0, 2.0),
                BedRecord::new("B2", "Heather", 0.0, 1.0),
            ])
            .with_images(&[ImageRecord {
                recnum: "P1".into(),
                img_file_name: "p1.jpg".into(),
            }])
            .with_thumbnail("p1.jpg", vec![0xff]);
        Guide::new(Arc::new(gateway), Box::new(store), "https://example.org/img")
    }

    #[tokio::test]
    async fn test_bootstrap_once() {
        let mut guide = guide(MemoryStore::new());
        let mut events = guide.subscribe();

        assert_eq!(guide.status(), GuideStatus::NotReady);
        let report = guide.bootstrap().await.unwrap();
        assert_eq!(report.path, BootstrapPath::FirstRun);
        assert!(guide.is_ready());
        assert_eq!(events.recv().await.unwrap(), GuideEvent::SectionsRebuilt { sections: 2 });
        assert_eq!(events.recv().await.unwrap(), GuideEvent::Ready { sections: 2 });

        assert!(matches!(guide.bootstrap().await, Err(BootstrapError::AlreadyRan)));
    }

    #[tokio::test]
    async fn test_location_reorders_sections() {
        let mut guide = guide(MemoryStore::new());
        guide.bootstrap().await.unwrap();

        let order = |g: &Guide| g.sections().iter().map(|s| s.bed_id.clone()).collect::<Vec<_>>();
        assert_eq!(order(&guide), vec!["B1", "B2"]);

        guide.update_location(Coordinate::new(0.0, 0.0));
        assert_eq!(order(&guide), vec!["B2", "B1"]);
        assert_eq!(guide.sections()[1].recnums(), vec!["P1", "P2"]);
    }

    #[tokio::test]
    async fn test_location_before_ready_applies_on_bootstrap() {
        let mut guide = guide(MemoryStore::new());
        guide.update_location(Coordinate::new(0.0, 0.9));
        guide.bootstrap().await.unwrap();
        assert_eq!(guide.sections()[0].bed_id, "B2");
    }

    #[tokio::test]
    async fn test_favorite_events_fire_on_failure_too() {
        let store = MemoryStore::new();
        let mut guide = guide(store.clone());
        guide.bootstrap().await.unwrap();
        let mut events = guide.subscribe();

        assert!(guide.toggle_favorite("P1").unwrap());
        assert_eq!(
            events.recv().await.unwrap(),
            GuideEvent::FavoritesChanged { recnum: "P1".into(), favorite: true, persisted: true }
        );

        store.set_fail_writes(true);
        assert!(guide.remove_favorite("P1").is_err());
        assert!(guide.is_favorite("P1"));
        assert_eq!(
            events.recv().await.unwrap(),
            GuideEvent::FavoritesChanged { recnum: "P1".into(), favorite: true, persisted: false }
        );
    }

    #[tokio::test]
    async fn test_read_model_helpers() {
        let mut guide = guide(MemoryStore::new());
        guide.bootstrap().await.unwrap();

        assert_eq!(guide.bed_name("B1"), "Rose");
        assert_eq!(guide.bed_name("B404"), "null");
        assert_eq!(guide.bed_pins().len(), 2);

        let details = guide.plant_details("P1").unwrap();
        assert_eq!(details.image_urls, vec!["https://example.org/img/p1.jpg"]);
        assert!(guide.plant_details("nope").is_none());

        assert!(matches!(guide.thumbnail("P2").await, ThumbnailRequest::NoImage));
        if let ThumbnailRequest::Pending(handle) = guide.thumbnail("P1").await {
            handle.await.unwrap();
        }
        assert!(matches!(guide.thumbnail("P1").await, ThumbnailRequest::Cached(_)));
    }
}
