//! # Application Configuration
//!
//! Read once at startup, read-only afterwards.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`STOREFRONT_DB_PATH`, `STOREFRONT_SHOP_NAME`)
//! 2. Config file (`STOREFRONT_CONFIG`, else `storefront.toml` in the
//!    platform config directory)
//! 3. Defaults (this file)
//!
//! ## Example `storefront.toml`
//! ```toml
//! [database]
//! path = "/var/lib/storefront/storefront.db"
//! max_connections = 5
//! busy_timeout_secs = 5
//!
//! [shop]
//! name = "Corner Shop"
//! currency_symbol = "$"
//!
//! [cart]
//! max_lines = 100
//! max_line_quantity = 999
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use storefront_core::{MAX_CART_LINES, MAX_LINE_QUANTITY};
use storefront_db::{CartLimits, DbConfig};
use thiserror::Error;
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "STOREFRONT_CONFIG";
pub const DB_PATH_ENV: &str = "STOREFRONT_DB_PATH";
pub const SHOP_NAME_ENV: &str = "STOREFRONT_SHOP_NAME";

const CONFIG_FILE: &str = "storefront.toml";
const DB_FILE: &str = "storefront.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub shop: ShopSection,
    pub cart: CartSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SQLite file. Default: `storefront.db` in the platform data directory.
    pub path: PathBuf,
    pub max_connections: u32,
    /// How long a checkout waits for another writer before giving up.
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: default_database_path(),
            max_connections: 5,
            busy_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopSection {
    pub name: String,
    pub currency_symbol: String,
}

impl Default for ShopSection {
    fn default() -> Self {
        ShopSection {
            name: "Storefront".to_string(),
            currency_symbol: "$".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSection {
    pub max_lines: usize,
    pub max_line_quantity: i64,
}

impl Default for CartSection {
    fn default() -> Self {
        CartSection {
            max_lines: MAX_CART_LINES,
            max_line_quantity: MAX_LINE_QUANTITY,
        }
    }
}

impl AppConfig {
    /// Loads the config file (if any) and applies environment overrides.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!(?path, "No config file, using defaults");
                AppConfig::default()
            }
            None => AppConfig::default(),
        };

        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!(?path, "Config file loaded");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            self.database.path = PathBuf::from(path);
        }

        if let Ok(name) = std::env::var(SHOP_NAME_ENV) {
            self.shop.name = name;
        }
    }

    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_secs(self.database.busy_timeout_secs))
    }

    pub fn cart_limits(&self) -> CartLimits {
        CartLimits {
            max_lines: self.cart.max_lines,
            max_line_quantity: self.cart.max_line_quantity,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "storefront", "storefront")
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Platform data directory, or the working directory when there is none.
///
/// - **macOS**: `~/Library/Application Support/com.storefront.storefront/storefront.db`
/// - **Windows**: `%APPDATA%\storefront\storefront\data\storefront.db`
/// - **Linux**: `~/.local/share/storefront/storefront.db`
fn default_database_path() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().join(DB_FILE),
        None => PathBuf::from(DB_FILE),
    }
}
