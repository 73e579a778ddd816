//! # Cart Service
//!
//! Business rules on top of the cart store.
//!
//! ## Add to Cart
//! ```text
//! add(user, product, qty)
//!   │
//!   ├── qty ≤ 0 or > max_line_quantity ─────────► Validation
//!   ├── product missing ────────────────────────► ProductNotFound
//!   ├── new line and cart already at max_lines ─► CartTooLarge
//!   ├── existing + qty > max_line_quantity ─────► QuantityTooLarge
//!   ├── existing + qty > stock ─────────────────► InsufficientStock
//!   └── upsert (merge) ─────────────────────────► CartLine
//! ```
//!
//! Stock is only a soft check here. Checkout re-validates every line.

use serde::Serialize;
use storefront_core::validation::validate_quantity;
use storefront_core::{
    CartLine, CartLineDetail, CoreError, Money, Product, MAX_CART_LINES, MAX_LINE_QUANTITY,
};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::{CartRepository, ProductRepository};

/// Per-cart limits, normally taken from the `[cart]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLimits {
    pub max_lines: usize,
    pub max_line_quantity: i64,
}

impl Default for CartLimits {
    fn default() -> Self {
        CartLimits {
            max_lines: MAX_CART_LINES,
            max_line_quantity: MAX_LINE_QUANTITY,
        }
    }
}

/// Everything a cart view needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub lines: Vec<CartLineDetail>,
    /// Σ quantities.
    pub item_count: i64,
    /// Σ live price × quantity, in cents.
    pub total_cents: i64,
}

impl CartSummary {
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CartService {
    db: Database,
    limits: CartLimits,
}

impl CartService {
    pub fn new(db: Database) -> Self {
        CartService {
            db,
            limits: CartLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: CartLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> CartLimits {
        self.limits
    }

    /// The cart with live prices and totals.
    pub async fn get_cart(&self, user_id: i64) -> DbResult<CartSummary> {
        let mut conn = self.db.acquire().await?;
        let lines = CartRepository::list_details(&mut conn, user_id).await?;

        let item_count = lines.iter().map(|l| l.quantity).sum();
        let total_cents = lines.iter().map(CartLineDetail::subtotal).sum::<Money>().cents();

        Ok(CartSummary {
            lines,
            item_count,
            total_cents,
        })
    }

    /// Raw cart lines, in the order they were added.
    pub async fn lines(&self, user_id: i64) -> DbResult<Vec<CartLine>> {
        let mut conn = self.db.acquire().await?;
        CartRepository::list_lines(&mut conn, user_id).await
    }

    /// Adds a product, merging with an existing line for the same product.
    pub async fn add(&self, user_id: i64, product_id: i64, quantity: i64) -> DbResult<CartLine> {
        validate_quantity(quantity, self.limits.max_line_quantity)?;

        let mut conn = self.db.acquire().await?;
        let product = Self::require_product(&mut conn, product_id).await?;

        let existing = CartRepository::find_line(&mut conn, user_id, product_id).await?;
        let merged = match &existing {
            Some(line) => line.quantity + quantity,
            None => {
                let lines = CartRepository::count_lines(&mut conn, user_id).await?;
                if lines as usize >= self.limits.max_lines {
                    return Err(CoreError::CartTooLarge {
                        max: self.limits.max_lines,
                    }
                    .into());
                }
                quantity
            }
        };

        self.check_line(&product, merged)?;

        let line =
            CartRepository::upsert_line(&mut conn, user_id, product_id, quantity, self.db.clock().now())
                .await?;

        info!(user_id, product_id, quantity = line.quantity, "Added to cart");
        Ok(line)
    }

    /// Sets the quantity of one of the user's lines. Zero or less removes it.
    ///
    /// ## Returns
    /// * `Ok(Some(line))` - the updated line
    /// * `Ok(None)` - the line was removed
    pub async fn update_line(
        &self,
        user_id: i64,
        line_id: i64,
        quantity: i64,
    ) -> DbResult<Option<CartLine>> {
        let mut conn = self.db.acquire().await?;
        let line = Self::owned_line(&mut conn, user_id, line_id).await?;

        if quantity > 0 {
            let product = Self::require_product(&mut conn, line.product_id).await?;
            validate_quantity(quantity, self.limits.max_line_quantity)?;
            self.check_line(&product, quantity)?;
        }

        debug!(user_id, line_id, quantity, "Updating cart line");
        CartRepository::update_quantity(&mut conn, line_id, quantity).await
    }

    /// Removes one of the user's lines.
    pub async fn remove_line(&self, user_id: i64, line_id: i64) -> DbResult<()> {
        let mut conn = self.db.acquire().await?;
        Self::owned_line(&mut conn, user_id, line_id).await?;
        CartRepository::remove_line(&mut conn, line_id).await
    }

    /// Empties the cart.
    ///
    /// ## Returns
    /// Number of lines removed.
    pub async fn clear(&self, user_id: i64) -> DbResult<u64> {
        let mut conn = self.db.acquire().await?;
        CartRepository::clear(&mut conn, user_id).await
    }

    /// Σ quantities.
    pub async fn item_count(&self, user_id: i64) -> DbResult<i64> {
        let mut conn = self.db.acquire().await?;
        CartRepository::sum_quantities(&mut conn, user_id).await
    }

    /// Total at live prices.
    pub async fn total(&self, user_id: i64) -> DbResult<Money> {
        let mut conn = self.db.acquire().await?;
        Ok(Money::from_cents(CartRepository::total_cents(&mut conn, user_id).await?))
    }

    fn check_line(&self, product: &Product, quantity: i64) -> DbResult<()> {
        if quantity > self.limits.max_line_quantity {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: self.limits.max_line_quantity,
            }
            .into());
        }

        if !product.can_fulfil(quantity) {
            return Err(CoreError::InsufficientStock {
                product_id: product.id,
                name: product.name.clone(),
                available: product.stock_quantity,
                requested: quantity,
            }
            .into());
        }

        Ok(())
    }

    async fn require_product(conn: &mut sqlx::SqliteConnection, product_id: i64) -> DbResult<Product> {
        ProductRepository::get_by_id(conn, product_id)
            .await?
            .ok_or(DbError::Domain(CoreError::ProductNotFound(product_id)))
    }

    /// Lines belonging to somebody else are reported as missing.
    async fn owned_line(conn: &mut sqlx::SqliteConnection, user_id: i64, line_id: i64) -> DbResult<CartLine> {
        match CartRepository::get_line(conn, line_id).await? {
            Some(line) if line.user_id == user_id => Ok(line),
            _ => Err(DbError::not_found("Cart line", line_id)),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
