//! Configuration file support for keepsake.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `KEEPSAKE_`, e.g., `KEEPSAKE_DATABASE_URL`)
//! 3. Config file (~/.config/keepsake/config.toml or ./keepsake.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/keepsake/keepsake.db` on Linux
//! (using the XDG state directory) if not explicitly configured. Downloaded media
//! defaults to `~/.local/share/keepsake/media`.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/keepsake/keepsake.db"  # optional, this is the default
//!
//! [media]
//! root = "/srv/archive/media"
//! download = true
//!
//! [sync]
//! batch_size = 200
//! per_page = 100
//! page_delay_ms = 1000
//! max_pages = 100
//! max_depth = 3
//! requests_per_second = 1
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use keepsake::sync::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES, DEFAULT_PAGE_DELAY,
    DEFAULT_PER_PAGE, DEFAULT_REQUEST_TIMEOUT, EngineConfig,
};
use serde::Deserialize;

const APP_NAME: &str = "keepsake";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Media download configuration.
    pub media: MediaConfig,
    /// Engine tuning.
    pub sync: SyncConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    /// Defaults to `sqlite://~/.local/state/keepsake/keepsake.db` if not specified.
    pub url: Option<String>,
}

/// Media download configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory downloaded media and avatars are written under.
    pub root: Option<PathBuf>,
    /// Set to false to store media rows without downloading files.
    pub download: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: None,
            download: true,
        }
    }
}

/// Engine tuning, mapped onto [`EngineConfig`].
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub batch_size: u32,
    pub per_page: u32,
    pub page_delay_ms: u64,
    pub max_pages: u32,
    pub max_depth: usize,
    pub requests_per_second: u32,
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            per_page: DEFAULT_PER_PAGE,
            page_delay_ms: u64::try_from(DEFAULT_PAGE_DELAY.as_millis()).unwrap_or(1000),
            max_pages: DEFAULT_MAX_PAGES,
            max_depth: DEFAULT_MAX_DEPTH,
            requests_per_second: 1,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl SyncConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            batch_size: self.batch_size.max(1),
            per_page: self.per_page.max(1),
            page_delay: Duration::from_millis(self.page_delay_ms),
            max_pages: self.max_pages.max(1),
            max_depth: self.max_depth,
            requests_per_second: self.requests_per_second.max(1),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/keepsake/config.toml)
    /// 3. Local config file (./keepsake.toml)
    /// 4. Environment variables with KEEPSAKE_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
            let xdg_config = proj_dirs.config_dir().join("config.toml");
            if xdg_config.exists() {
                tracing::debug!("Loading config from {:?}", xdg_config);
                builder = builder.add_source(
                    File::from(xdg_config)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        let local_config = PathBuf::from("keepsake.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./keepsake.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // KEEPSAKE_DATABASE__URL -> database.url, KEEPSAKE_SYNC__MAX_PAGES -> sync.max_pages
        builder = builder.add_source(
            Environment::with_prefix("KEEPSAKE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("keepsake.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Media root, or `None` when downloads are disabled.
    pub fn media_root(&self) -> Option<PathBuf> {
        if !self.media.download {
            return None;
        }
        self.media.root.clone().or_else(|| {
            ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("media"))
        })
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/keepsake` or `~/.local/state/keepsake`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
