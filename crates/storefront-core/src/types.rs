//! # Domain Types
//!
//! Core domain types used throughout the storefront.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │◄──│    Product      │◄──│    CartLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  user_id        │       │
//! │  │  name (unique)  │   │  price_cents    │   │  product_id     │       │
//! │  └─────────────────┘   │  stock_quantity │   │  quantity       │       │
//! │                        └────────┬────────┘   └─────────────────┘       │
//! │                                 │ snapshot                              │
//! │  ┌─────────────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │      User       │◄──│   OrderHeader   │◄──│   OrderLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  email (unique) │   │  status         │   │  product_name   │       │
//! │  │  role           │   │  total_cents    │   │  unit_price     │       │
//! │  └─────────────────┘   └─────────────────┘   │  subtotal       │       │
//! │                                               └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every persisted entity has an `i64` id assigned by SQLite
//! (`INTEGER PRIMARY KEY AUTOINCREMENT`). Sessions are the exception: they
//! never touch the database and are identified by a UUID v4.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Category
// =============================================================================

/// A product category. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// Input for creating or updating a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Database-assigned identifier.
    pub id: i64,

    /// Category this product is listed under.
    pub category_id: i64,

    /// Display name shown in the catalog and frozen onto order lines.
    pub name: String,

    pub description: Option<String>,

    /// Unit price in cents (smallest currency unit). Never negative.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock_quantity: i64,

    pub image_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if current stock covers the requested quantity.
    #[inline]
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }

    /// Checks if the product is out of stock.
    #[inline]
    pub fn is_out_of_stock(&self) -> bool {
        self.stock_quantity <= 0
    }
}

/// Input for creating or updating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub image_url: Option<String>,
}

// =============================================================================
// User & Role
// =============================================================================

/// Account role. Stored and serialized in upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Customer,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Customer => f.write_str("CUSTOMER"),
            Role::Admin => f.write_str("ADMIN"),
        }
    }
}

/// A registered account.
///
/// The password hash never leaves the process through serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,

    /// Unique, compared case-insensitively.
    pub email: String,

    /// PHC-format argon2 hash.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// =============================================================================
// Session
// =============================================================================

/// An authenticated session.
///
/// ## Lifecycle
/// ```text
/// login(email, password) ──► Session ──► passed to every command
///                                              │
///                                   dropped ◄──┘  (logout)
/// ```
///
/// There is no process-wide "current user"; whoever holds the session acts
/// as that user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub user_id: i64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub started_at: DateTime<Utc>,
}

impl Session {
    /// Starts a new session for an authenticated user.
    pub fn start(user: &User, now: DateTime<Utc>) -> Self {
        Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            started_at: now,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One line of a user's cart. At most one line exists per (user, product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    /// Always positive; a line dropping to zero is deleted.
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

/// A cart line joined with its product's live name, price and stock.
///
/// Used for display only; checkout re-reads products itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CartLineDetail {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub image_url: Option<String>,
    pub unit_price_cents: i64,
    pub stock_quantity: i64,
    pub quantity: i64,
}

impl CartLineDetail {
    /// Line total at the live price.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle of an order.
///
/// ```text
/// Pending ──► Processing ──► Shipped ──► Delivered
///    │            │
///    └────────────┴──► Cancelled
/// ```
///
/// Checkout only ever produces `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }

    /// Delivered and cancelled orders never change again.
    pub fn is_final(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order
// =============================================================================

/// The header row of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OrderHeader {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    /// Σ line subtotals, in cents.
    pub total_cents: i64,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
}

impl OrderHeader {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Input for inserting an order header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderHeader {
    pub user_id: i64,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
}

/// A line item of an order.
/// Uses snapshot pattern to freeze product data at time of purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    /// Product name at time of purchase (frozen).
    pub product_name: String,
    /// Product image at time of purchase (frozen).
    pub image_url: Option<String>,
    pub quantity: i64,
    /// Unit price in cents at time of purchase (frozen).
    pub unit_price_cents: i64,
    /// unit_price_cents × quantity.
    pub subtotal_cents: i64,
}

impl OrderLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// Input for inserting an order line. The subtotal is derived, never supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product_id: i64,
    pub product_name: String,
    pub image_url: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl NewOrderLine {
    /// Saturates on overflow, which the `order_lines` CHECK then rejects.
    #[inline]
    pub fn subtotal_cents(&self) -> i64 {
        self.unit_price_cents.saturating_mul(self.quantity)
    }
}

/// An order header together with its lines, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(flatten)]
    pub header: OrderHeader,
    pub lines: Vec<OrderLine>,
}

impl Order {
    #[inline]
    pub fn id(&self) -> i64 {
        self.header.id
    }

    /// Σ line subtotals. Equal to `header.total()` for every stored order.
    pub fn lines_total(&self) -> Money {
        self.lines.iter().map(OrderLine::subtotal).sum()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn user(role: Role) -> User {
        User {
            id: 3,
            email: "ann@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            full_name: "Ann Smith".to_string(),
            role,
            created_at: ts(),
        }
    }

    #[test]
    fn test_status_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));

        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_status_default_and_display() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(OrderStatus::Cancelled.to_string(), "Cancelled");
        assert!(OrderStatus::Delivered.is_final());
        assert!(!OrderStatus::Shipped.is_final());
    }

    #[test]
    fn test_role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let role: Role = serde_json::from_str("\"CUSTOMER\"").unwrap();
        assert_eq!(role, Role::Customer);
    }

    #[test]
    fn test_user_hash_not_serialized() {
        let json = serde_json::to_value(user(Role::Customer)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["fullName"], "Ann Smith");
    }

    #[test]
    fn test_session_start() {
        let admin = Session::start(&user(Role::Admin), ts());
        assert_eq!(admin.user_id, 3);
        assert!(admin.is_admin());
        assert_eq!(admin.started_at, ts());

        let other = Session::start(&user(Role::Customer), ts());
        assert!(!other.is_admin());
        assert_ne!(admin.id, other.id);
    }

    #[test]
    fn test_order_lines_total() {
        let line = |id, qty, price| OrderLine {
            id,
            order_id: 1,
            product_id: id,
            product_name: format!("Item {}", id),
            image_url: None,
            quantity: qty,
            unit_price_cents: price,
            subtotal_cents: qty * price,
        };
        let order = Order {
            header: OrderHeader {
                id: 1,
                user_id: 3,
                status: OrderStatus::Pending,
                total_cents: 4250,
                shipping_address: "1 Main St".to_string(),
                created_at: ts(),
            },
            lines: vec![line(1, 3, 1000), line(2, 1, 1250)],
        };
        assert_eq!(order.lines_total(), order.header.total());
        assert_eq!(order.item_count(), 4);

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["totalCents"], 4250);
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["lines"][0]["subtotalCents"], 3000);
    }

    #[test]
    fn test_product_can_fulfil() {
        let product = Product {
            id: 1,
            category_id: 1,
            name: "Desk Lamp".to_string(),
            description: None,
            price_cents: 1000,
            stock_quantity: 2,
            image_url: None,
            created_at: ts(),
            updated_at: ts(),
        };
        assert!(product.can_fulfil(2));
        assert!(!product.can_fulfil(3));
        assert!(!product.is_out_of_stock());
        assert_eq!(product.price(), Money::from_cents(1000));
    }
}
