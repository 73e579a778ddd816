//! # storefront-db: Persistence and Services for the Storefront
//!
//! SQLite storage via sqlx, the inventory/cart/order stores, and the
//! services that compose them, checkout first among them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Data Flow                             │
//! │                                                                         │
//! │  App command (place_order)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  storefront-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌───────────────┐   │   │
//! │  │   │   Services    │──►│  Repositories │   │  Migrations   │   │   │
//! │  │   │ CheckoutSvc   │   │ ProductRepo   │   │  (embedded)   │   │   │
//! │  │   │ CartSvc ...   │   │ OrderRepo ... │   │ 001_init.sql  │   │   │
//! │  │   └──────┬────────┘   └──────┬────────┘   └───────────────┘   │   │
//! │  │          │ UnitOfWork        │ &mut SqliteConnection           │   │
//! │  │          ▼                   ▼                                 │   │
//! │  │   ┌─────────────────────────────────────┐                      │   │
//! │  │   │     Database (pool.rs, SqlitePool)  │                      │   │
//! │  │   └─────────────────────────────────────┘                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (storefront.db)                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`unit_of_work`] - Transaction scope with rollback on drop
//! - [`repository`] - The stores
//! - [`service`] - Checkout, cart, catalog, orders, auth
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("storefront.db")).await?;
//!
//! db.carts().add(user_id, product_id, 2).await?;
//! let placed = db.checkout().place_order(user_id, "1 Main St").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

pub use repository::{
    CartRepository, CategoryRepository, OrderRepository, ProductRepository, UserRepository,
};
pub use service::{
    AuthService, CartLimits, CartService, CartSummary, CatalogService, CheckoutError,
    CheckoutPhase, CheckoutResult, CheckoutService, OrderService, PlacedOrder,
};
