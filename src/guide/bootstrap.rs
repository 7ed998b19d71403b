//! Startup reconciliation
//!
//! Decides where the session's data comes from and sequences the pipeline:
//!
//! First run (cache never populated):
//! 1. Fetch plants and beds from the service (concurrently, both required)
//! 2. Fetch images (cosmetic, failure tolerated)
//! 3. Build sections
//! 4. Persist plants, then beds
//! 5. Mark the first run complete
//!
//! Later runs:
//! 1. Load plants, beds and favorites from the cache
//! 2. Build sections
//! 3. Fetch images in the background, so a missing network never holds
//!    sections back
//!
//! Network calls are single attempts bounded by the gateway's timeout. A
//! failed step leaves the state that depends on it unset.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::catalog::Catalog;
use crate::gateway::{DataGateway, GatewayError};
use crate::model::ImageRecord;
use crate::store::{CacheStore, SettingsExt, SETTING_LAUNCHED_BEFORE};

/// Persisted startup flags, read once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapState {
    pub launched_before: bool,
}

impl BootstrapState {
    /// An unreadable flag is treated as a first run; saves replace the whole
    /// collection, so repeating the first run is harmless.
    pub fn read(store: &dyn CacheStore) -> Self {
        let launched_before = match store.get_flag(SETTING_LAUNCHED_BEFORE) {
            Ok(flag) => flag,
            Err(e) => {
                warn!(error = %e, "Could not read first-run flag, assuming first run");
                false
            }
        };
        Self { launched_before }
    }
}

/// Which source fed the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BootstrapPath {
    FirstRun,
    Cached,
}

/// Pipeline steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    FetchPlants,
    FetchBeds,
    FetchImages,
    LoadPlants,
    LoadBeds,
    LoadFavorites,
    BuildSections,
    PersistPlants,
    PersistBeds,
    MarkLaunched,
}

/// What the pipeline managed to do
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub path: BootstrapPath,
    pub completed: Vec<Stage>,
    pub failed: Vec<(Stage, String)>,
}

impl BootstrapReport {
    fn new(path: BootstrapPath) -> Self {
        Self {
            path,
            completed: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn done(&mut self, stage: Stage) {
        self.completed.push(stage);
    }

    fn fail(&mut self, stage: Stage, error: impl std::fmt::Display) {
        warn!(?stage, error = %error, "Bootstrap step failed");
        self.failed.push((stage, error.to_string()));
    }

    pub fn completed(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Background image fetch started on cached runs
pub type PendingImages = JoinHandle<Result<Vec<ImageRecord>, GatewayError>>;

/// Everything the pipeline produced
pub struct Reconciled {
    pub report: BootstrapReport,
    /// `None` when plants or beds could not be obtained
    pub catalog: Option<Catalog>,
    pub favorites: Vec<String>,
    pub pending_images: Option<PendingImages>,
}

impl Reconciled {
    fn unset(report: BootstrapReport) -> Self {
        Self {
            report,
            catalog: None,
            favorites: Vec::new(),
            pending_images: None,
        }
    }
}

/// Runs the startup pipeline against an injected gateway and store
pub struct Reconciler<'a> {
    gateway: Arc<dyn DataGateway>,
    store: &'a mut dyn CacheStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(gateway: Arc<dyn DataGateway>, store: &'a mut dyn CacheStore) -> Self {
        Self { gateway, store }
    }

    pub async fn run(self, state: BootstrapState) -> Reconciled {
        if state.launched_before {
            info!("Loading garden data from cache");
            self.cached_run()
        } else {
            info!("First run, fetching garden data from service");
            self.first_run().await
        }
    }

    async fn first_run(self) -> Reconciled {
        let mut report = BootstrapReport::new(BootstrapPath::FirstRun);

        let (plants, beds) = tokio::join!(self.gateway.plants(), self.gateway.beds());

        let plants = match plants {
            Ok(plants) => {
                report.done(Stage::FetchPlants);
                Some(plants)
            }
            Err(e) => {
                report.fail(Stage::FetchPlants, e);
                None
            }
        };
        let beds = match beds {
            Ok(beds) => {
                report.done(Stage::FetchBeds);
                Some(beds)
            }
            Err(e) => {
                report.fail(Stage::FetchBeds, e);
                None
            }
        };

        let (plants, beds) = match (plants, beds) {
            (Some(plants), Some(beds)) => (plants, beds),
            _ => return Reconciled::unset(report),
        };

        let images = match self.gateway.images().await {
            Ok(images) => {
                report.done(Stage::FetchImages);
                images
            }
            Err(e) => {
                report.fail(Stage::FetchImages, e);
                Vec::new()
            }
        };

        let catalog = Catalog::build(plants, beds, images);
        report.done(Stage::BuildSections);

        Self::persist(&mut *self.store, &catalog, &mut report);

        // Favorites may exist from an earlier first run that did not finish
        let favorites = match self.store.load_favorites() {
            Ok(favorites) => favorites,
            Err(e) => {
                report.fail(Stage::LoadFavorites, e);
                Vec::new()
            }
        };

        Reconciled {
            report,
            catalog: Some(catalog),
            favorites,
            pending_images: None,
        }
    }

    /// Persist plants, then beds, then the flag; stop at the first failure
    /// so the next start repeats the first run.
    fn persist(store: &mut dyn CacheStore, catalog: &Catalog, report: &mut BootstrapReport) {
        let plants: Vec<_> = catalog.plants().iter().map(|p| p.as_ref().clone()).collect();
        if let Err(e) = store.save_plants(&plants) {
            report.fail(Stage::PersistPlants, e);
            return;
        }
        report.done(Stage::PersistPlants);

        if let Err(e) = store.save_beds(catalog.beds()) {
            report.fail(Stage::PersistBeds, e);
            return;
        }
        report.done(Stage::PersistBeds);

        match store.set_flag(SETTING_LAUNCHED_BEFORE, true) {
            Ok(()) => report.done(Stage::MarkLaunched),
            Err(e) => report.fail(Stage::MarkLaunched, e),
        }
    }

    fn cached_run(self) -> Reconciled {
        let mut report = BootstrapReport::new(BootstrapPath::Cached);

        let plants = match self.store.load_plants() {
            Ok(plants) => {
                report.done(Stage::LoadPlants);
                plants
            }
            Err(e) => {
                report.fail(Stage::LoadPlants, e);
                Vec::new()
            }
        };
        let beds = match self.store.load_beds() {
            Ok(beds) => {
                report.done(Stage::LoadBeds);
                beds
            }
            Err(e) => {
                report.fail(Stage::LoadBeds, e);
                Vec::new()
            }
        };
        let favorites = match self.store.load_favorites() {
            Ok(favorites) => {
                report.done(Stage::LoadFavorites);
                favorites
            }
            Err(e) => {
                report.fail(Stage::LoadFavorites, e);
                Vec::new()
            }
        };

        let catalog = Catalog::build(plants, beds, Vec::new());
        report.done(Stage::BuildSections);

        let gateway = Arc::clone(&self.gateway);
        let pending_images = tokio::spawn(async move { gateway.images().await });

        Reconciled {
            report,
            catalog: Some(catalog),
            favorites,
            pending_images: Some(pending_images),
        }
    }
}

/// Bootstrap errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum BootstrapError {
    #[error("Bootstrap already ran in this process")]
    AlreadyRan,
}
