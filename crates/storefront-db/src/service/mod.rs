//! # Service Module
//!
//! Business operations composed from the repositories. Services own a
//! [`Database`](crate::Database) handle and decide where each call's
//! connection or unit of work comes from.
//!
//! - [`CheckoutService`] - Cart to order, all or nothing
//! - [`CartService`] - Cart edits with soft stock checks
//! - [`CatalogService`] - Product and category browsing and admin edits
//! - [`OrderService`] - Order history, status changes, cancellation
//! - [`AuthService`] - Registration and login

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod order;

pub use auth::{hash_password, verify_password, AuthService};
pub use cart::{CartLimits, CartService, CartSummary};
pub use catalog::CatalogService;
pub use checkout::{CheckoutError, CheckoutPhase, CheckoutResult, CheckoutService, PlacedOrder};
pub use order::OrderService;
