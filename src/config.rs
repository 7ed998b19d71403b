//! Guide configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub game: GameConfig,
}

/// Garden data service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Data endpoint, queried with `?class=<collection>`
    #[serde(default = "default_data_url")]
    pub data_url: String,

    /// Base URL of full-size plant images
    #[serde(default = "default_images_url")]
    pub images_url: String,

    /// Base URL of list thumbnails
    #[serde(default = "default_thumbnails_url")]
    pub thumbnails_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Largest thumbnail accepted, in bytes
    #[serde(default = "default_max_thumbnail_bytes")]
    pub max_thumbnail_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the cache database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Pattern game tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Pattern length at the start of a game and after a mistake
    #[serde(default = "default_starting_length")]
    pub starting_length: usize,

    /// Extra symbols added after each completed pattern
    #[serde(default = "default_growth")]
    pub growth: usize,

    /// Number of high scores kept
    #[serde(default = "default_max_high_scores")]
    pub max_high_scores: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_url: default_data_url(),
            images_url: default_images_url(),
            thumbnails_url: default_thumbnails_url(),
            timeout_secs: default_timeout(),
            max_thumbnail_bytes: default_max_thumbnail_bytes(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_length: default_starting_length(),
            growth: default_growth(),
            max_high_scores: default_max_high_scores(),
        }
    }
}

// Defaults
fn default_data_url() -> String {
    "https://cgi.csc.liv.ac.uk/~phil/Teaching/COMP228/ness/data.php".to_string()
}
fn default_images_url() -> String {
    "https://cgi.csc.liv.ac.uk/~phil/Teaching/COMP228/ness_images".to_string()
}
fn default_thumbnails_url() -> String {
    "https://cgi.csc.liv.ac.uk/~phil/Teaching/COMP228/ness_thumbnails".to_string()
}
fn default_timeout() -> u64 { 30 }
fn default_max_thumbnail_bytes() -> usize { 2 * 1024 * 1024 } // 2MB
fn default_data_dir() -> PathBuf { PathBuf::from("./garden-data") }
fn default_starting_length() -> usize { 10 }
fn default_growth() -> usize { 5 }
fn default_max_high_scores() -> usize { 20 }

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            storage: StorageConfig::default(),
            game: GameConfig::default(),
        }
    }
}

impl Config {
    /// Load a TOML config file, falling back to defaults when it is missing.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            info!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Path of the cache database
    pub fn database_path(&self) -> PathBuf {
        self.storage.data_dir.join("garden-guide.db")
    }
}
