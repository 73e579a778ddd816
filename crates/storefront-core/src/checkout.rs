//! # Checkout Planning
//!
//! The pure half of order placement: turns a cart and freshly read products
//! into the exact lines and total that will be written.
//!
//! ## Where This Fits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order(user_id, address)                    (storefront-db)       │
//! │                                                                         │
//! │  Validating (read-only)                                                 │
//! │    1. load cart lines ──────────┐                                       │
//! │    2. re-fetch products ────────┼──► CheckoutPlan::prepare ◄ THIS FILE │
//! │    3. price × qty, Σ total ─────┘          │                            │
//! │                                            ▼                            │
//! │  Committing (one transaction)         PlannedLine × N                   │
//! │    4. insert header   ◄── plan.header(..)                               │
//! │    5. decrement stock ◄── line.quantity                                 │
//! │    6. insert lines    ◄── plan.order_lines()                            │
//! │    7. clear cart                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Prices are locked at the moment the plan is prepared. The header total and
//! every line subtotal come from the same numbers, so they always agree.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CartLine, NewOrderHeader, NewOrderLine, OrderStatus, Product};

/// Name reported for a product that vanished between add-to-cart and checkout.
pub const UNAVAILABLE_PRODUCT_NAME: &str = "Unavailable product";

// =============================================================================
// Planned Line
// =============================================================================

/// One cart line, validated against stock and priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: i64,
    pub product_name: String,
    pub image_url: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
}

impl PlannedLine {
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// Snapshot for the order-lines batch.
    pub fn to_order_line(&self) -> NewOrderLine {
        NewOrderLine {
            product_id: self.product_id,
            product_name: self.product_name.clone(),
            image_url: self.image_url.clone(),
            quantity: self.quantity,
            unit_price_cents: self.unit_price.cents(),
        }
    }
}

// =============================================================================
// Checkout Plan
// =============================================================================

/// Validated lines plus the order total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub lines: Vec<PlannedLine>,
    pub total: Money,
}

impl CheckoutPlan {
    /// Validates a cart against the current products.
    ///
    /// ## Arguments
    /// * `cart` - the user's cart lines, in display order
    /// * `products` - products keyed by id, as read right now
    ///
    /// ## Errors
    /// - `EmptyCart` when `cart` has no lines
    /// - `InsufficientStock` for the first line whose quantity exceeds stock.
    ///   A product missing from `products` is reported with 0 available.
    /// - `AmountOverflow` when a subtotal or the running total overflows.
    pub fn prepare(cart: &[CartLine], products: &HashMap<i64, Product>) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let mut lines = Vec::with_capacity(cart.len());
        let mut total = Money::zero();
        for cart_line in cart {
            let product = match products.get(&cart_line.product_id) {
                Some(product) => product,
                None => {
                    return Err(CoreError::InsufficientStock {
                        product_id: cart_line.product_id,
                        name: UNAVAILABLE_PRODUCT_NAME.to_string(),
                        available: 0,
                        requested: cart_line.quantity,
                    })
                }
            };

            if !product.can_fulfil(cart_line.quantity) {
                return Err(CoreError::InsufficientStock {
                    product_id: product.id,
                    name: product.name.clone(),
                    available: product.stock_quantity,
                    requested: cart_line.quantity,
                });
            }

            let overflow = CoreError::AmountOverflow {
                product_id: product.id,
            };
            let subtotal = product
                .price()
                .checked_multiply_quantity(cart_line.quantity)
                .ok_or_else(|| overflow.clone())?;
            total = total.checked_add(subtotal).ok_or(overflow)?;

            lines.push(PlannedLine {
                product_id: product.id,
                product_name: product.name.clone(),
                image_url: product.image_url.clone(),
                quantity: cart_line.quantity,
                unit_price: product.price(),
            });
        }

        Ok(CheckoutPlan { lines, total })
    }

    /// Header for the order this plan produces. Checkout orders start `Pending`.
    pub fn header(&self, user_id: i64, shipping_address: &str, now: DateTime<Utc>) -> NewOrderHeader {
        NewOrderHeader {
            user_id,
            status: OrderStatus::Pending,
            total_cents: self.total.cents(),
            shipping_address: shipping_address.to_string(),
            created_at: now,
        }
    }

    pub fn order_lines(&self) -> Vec<NewOrderLine> {
        self.lines.iter().map(PlannedLine::to_order_line).collect()
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

    fn product(id: i64, price_cents: i64, stock: i64) -> Product {
        Product {
            id,
            category_id: 1,
            name: format!("Product {}", id),
            description: None,
            price_cents,
            stock_quantity: stock,
            image_url: Some(format!("/img/{}.png", id)),
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn cart_line(id: i64, product_id: i64, quantity: i64) -> CartLine {
        CartLine {
            id,
            user_id: 9,
            product_id,
            quantity,
            added_at: ts(),
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<i64, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn test_prepare_prices_every_line() {
        let products = catalog(vec![product(1, 1000, 5), product(2, 250, 10)]);
        let cart = vec![cart_line(1, 1, 3), cart_line(2, 2, 4)];

        let plan = CheckoutPlan::prepare(&cart, &products).unwrap();
        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].subtotal().cents(), 3000);
        assert_eq!(plan.lines[1].subtotal().cents(), 1000);
        assert_eq!(plan.total.cents(), 4000);

        let order_lines = plan.order_lines();
        assert_eq!(order_lines[0].product_name, "Product 1");
        assert_eq!(order_lines[0].image_url.as_deref(), Some("/img/1.png"));
        assert_eq!(order_lines[0].subtotal_cents(), 3000);

        let header = plan.header(9, "1 Main St", ts());
        assert_eq!(header.status, OrderStatus::Pending);
        assert_eq!(header.total_cents, 4000);
        assert_eq!(header.created_at, ts());
    }

    #[test]
    fn test_prepare_exact_stock_is_enough() {
        let products = catalog(vec![product(1, 1000, 3)]);
        let plan = CheckoutPlan::prepare(&[cart_line(1, 1, 3)], &products).unwrap();
        assert_eq!(plan.total.cents(), 3000);
    }

    #[test]
    fn test_prepare_empty_cart() {
        let products = catalog(vec![product(1, 1000, 5)]);
        assert_eq!(CheckoutPlan::prepare(&[], &products), Err(CoreError::EmptyCart));
    }

    #[test]
    fn test_prepare_insufficient_stock() {
        let products = catalog(vec![product(1, 1000, 2)]);
        let err = CheckoutPlan::prepare(&[cart_line(1, 1, 3)], &products).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                product_id: 1,
                name: "Product 1".to_string(),
                available: 2,
                requested: 3,
            }
        );
    }

    #[test]
    fn test_prepare_vanished_product_reports_zero_available() {
        let products = catalog(vec![product(1, 1000, 5)]);
        let cart = vec![cart_line(1, 1, 1), cart_line(2, 42, 2)];

        match CheckoutPlan::prepare(&cart, &products) {
            Err(CoreError::InsufficientStock {
                product_id,
                available,
                requested,
                ..
            }) => {
                assert_eq!(product_id, 42);
                assert_eq!(available, 0);
                assert_eq!(requested, 2);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
    }

    #[test]
    fn test_prepare_rejects_amounts_that_overflow() {
        let products = catalog(vec![product(1, i64::MAX / 2, 10)]);
        assert_eq!(
            CheckoutPlan::prepare(&[cart_line(1, 1, 3)], &products),
            Err(CoreError::AmountOverflow { product_id: 1 })
        );

        // Each subtotal fits, their sum does not.
        let products = catalog(vec![product(1, i64::MAX / 2, 10), product(2, i64::MAX / 2, 10)]);
        let cart = vec![cart_line(1, 1, 1), cart_line(2, 2, 2)];
        assert_eq!(
            CheckoutPlan::prepare(&cart, &products),
            Err(CoreError::AmountOverflow { product_id: 2 })
        );
    }

    #[test]
    fn test_free_items_total_zero() {
        let products = catalog(vec![product(1, 0, 5)]);
        let plan = CheckoutPlan::prepare(&[cart_line(1, 1, 2)], &products).unwrap();
        assert!(plan.total.is_zero());
    }
}
