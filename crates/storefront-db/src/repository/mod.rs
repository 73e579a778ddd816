//! # Repository Module
//!
//! The stores: SQL for one table family each, nothing else.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Service (checkout, cart, catalog, ...)                                │
//! │       │                                                                 │
//! │       │  ProductRepository::decrement_stock(conn, id, qty, now)        │
//! │       ▼                                                                 │
//! │  Repository (stateless)                                                │
//! │  ├── takes &mut SqliteConnection                                       │
//! │  │     pooled connection  ──► runs on its own                          │
//! │  │     uow.conn()         ──► runs inside the unit of work             │
//! │  └── returns DbResult<T>                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Catalog reads/writes and the inventory store
//! - [`CategoryRepository`] - Product categories
//! - [`UserRepository`] - Accounts
//! - [`CartRepository`] - The cart store
//! - [`OrderRepository`] - The order store

pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use cart::CartRepository;
pub use category::CategoryRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
pub use user::UserRepository;
