//! garden-guide: data core for a botanical garden visitor guide
//!
//! - Remote garden data service client (gateway)
//! - SQLite cache of plants, beds, favorites and settings (store)
//! - Startup reconciliation and the bed-section read model (guide)
//! - Pattern memory game with persisted high scores (game)

pub mod cli;
pub mod config;
pub mod game;
pub mod gateway;
pub mod guide;
pub mod model;
pub mod store;

pub use config::Config;
pub use guide::{Guide, GuideEvent};
