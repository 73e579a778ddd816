//! # Storefront Application Library
//!
//! The layer a presentation shell links against.
//!
//! ## Module Organization
//! ```text
//! storefront/
//! ├── lib.rs          ◄─── You are here (logging, startup)
//! ├── config.rs       ◄─── storefront.toml + environment overrides
//! ├── state.rs        ◄─── AppState (database + config)
//! ├── error.rs        ◄─── API error type for commands
//! └── commands/
//!     ├── mod.rs      ◄─── Session guards
//!     ├── auth.rs     ◄─── Register, login, logout
//!     ├── catalog.rs  ◄─── Browse, search, admin catalog edits
//!     ├── cart.rs     ◄─── Cart manipulation
//!     └── orders.rs   ◄─── Checkout, history, order admin
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. init_tracing()       RUST_LOG or "info,storefront=debug,sqlx=warn"  │
//! │  2. AppConfig::load()    file + STOREFRONT_* overrides                  │
//! │  3. bootstrap(config)    create data dir, open pool, run migrations     │
//! │  4. commands::*(&state, &session, ...)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod state;

use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use storefront_db::{Database, DbError};

pub use config::{AppConfig, ConfigError};
pub use error::{ApiError, ErrorCode};
pub use state::AppState;

/// Default log filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,storefront=debug,sqlx=warn";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DbError),
}

/// Installs the global tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=storefront_db=trace` - Trace the database crate only
/// - Default: [`DEFAULT_LOG_FILTER`]
///
/// Calling it again once a subscriber is installed does nothing.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Opens the database described by `config` and runs pending migrations.
pub async fn bootstrap(config: AppConfig) -> Result<AppState, DbError> {
    let path = &config.database.path;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| {
            DbError::ConnectionFailed(format!("Could not create {}: {}", dir.display(), e))
        })?;
    }

    info!(db_path = ?path, shop = %config.shop.name, "Opening storefront database");
    let db = Database::new(config.to_db_config()).await?;

    Ok(AppState::new(db, config))
}

/// Logging, config and database in one call.
pub async fn start() -> Result<AppState, StartupError> {
    init_tracing();
    info!("Starting storefront");

    let config = AppConfig::load()?;
    Ok(bootstrap(config).await?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use storefront_core::{NewCategory, NewProduct, Role, Session};
    use storefront_db::{Database, DbConfig};

    use crate::{AppConfig, AppState};

    pub async fn state() -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AppState::new(db, AppConfig::default())
    }

    pub async fn session(state: &AppState, email: &str, role: Role) -> Session {
        let auth = state.db.auth();
        auth.create_account(email, "secret1", "Test User", role).await.unwrap();
        auth.login(email, "secret1").await.unwrap()
    }

    /// Adds a product (and its category on first use) without going through commands.
    pub async fn product(state: &AppState, name: &str, price_cents: i64, stock_quantity: i64) -> i64 {
        let catalog = state.db.catalog();
        let category_id = match catalog.list_categories().await.unwrap().first() {
            Some(category) => category.id,
            None => {
                catalog
                    .create_category(&NewCategory {
                        name: "General".to_string(),
                        description: None,
                    })
                    .await
                    .unwrap()
                    .id
            }
        };

        catalog
            .create_product(&NewProduct {
                category_id,
                name: name.to_string(),
                description: None,
                price_cents,
                stock_quantity,
                image_url: None,
            })
            .await
            .unwrap()
            .id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap_creates_database() {
        let dir = std::env::temp_dir().join(format!("storefront-boot-{}", std::process::id()));
        let mut config = AppConfig::default();
        config.database.path = dir.join("nested").join("shop.db");

        let state = bootstrap(config).await.unwrap();
        assert!(state.db.health_check().await);
        assert!(dir.join("nested").join("shop.db").exists());

        state.db.close().await;
        let _ = std::fs::remove_dir_all(dir);
    }
}
