//! # Checkout Orchestrator
//!
//! Turns a user's cart into a persisted order. Every call ends in exactly
//! one of two observable states: fully committed or fully unchanged.
//!
//! ## Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order(user_id, shipping_address)                                 │
//! │                                                                         │
//! │  Input checks           address non-empty ─────────────► Validation     │
//! │                         user exists ───────────────────► UnknownUser    │
//! │                                                                         │
//! │  VALIDATING (pooled connection, read-only)                             │
//! │   1. load cart lines ──────────── empty ───────────────► EmptyCart      │
//! │   2. re-fetch each product ────── stock < qty ─────────► InsufficientStock
//! │   3. total = Σ price × qty (prices locked) ── overflow ─► AmountOverflow │
//! │                                                                         │
//! │  COMMITTING (one UnitOfWork)                                           │
//! │   4. insert header (Pending) ──── fails ───────────────► OrderHeaderPersistFailed
//! │   5. decrement stock per line ─── refused ─────────────► StockUpdateFailed
//! │   6. insert lines as one batch ── any row fails ───────► OrderItemPersistFailed
//! │   7. clear cart                                                         │
//! │   8. commit ───────────────────── begin/clear/commit fail ► TransactionAborted
//! │                                                                         │
//! │  Any error in 4–8 drops the UnitOfWork ──► ROLLBACK ──► error returned  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! The first statement of the unit of work is the header INSERT, so the
//! transaction takes SQLite's write lock before anything else and a competing
//! checkout waits on the busy timeout. Step 5 re-checks stock with the
//! conditional decrement, so two checkouts can never sell more than is on
//! hand: the loser gets `StockUpdateFailed` and rolls back.

use std::collections::HashMap;
use std::fmt;

use storefront_core::validation::validate_shipping_address;
use storefront_core::{CheckoutPlan, CoreError, Money, OrderStatus, ValidationError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::{CartRepository, OrderRepository, ProductRepository, UserRepository};

// =============================================================================
// Errors
// =============================================================================

/// Why an order could not be placed.
///
/// Every variant is recoverable. Variants raised before step 4 had no side
/// effects; the rest were rolled back before being returned.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Unknown user: {0}")]
    UnknownUser(i64),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Insufficient stock for {name} (#{product_id}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        name: String,
        available: i64,
        requested: i64,
    },

    /// The order total would not fit in cents. Raised before any write.
    #[error("Order amount too large at product #{product_id}")]
    AmountOverflow { product_id: i64 },

    /// The conditional decrement refused: stock changed after validation.
    #[error("Stock update refused for product #{product_id} (requested {requested})")]
    StockUpdateFailed { product_id: i64, requested: i64 },

    #[error("Could not store the lines of order {order_id}: {source}")]
    OrderItemPersistFailed {
        order_id: i64,
        #[source]
        source: DbError,
    },

    #[error("Could not store the order header: {0}")]
    OrderHeaderPersistFailed(#[source] DbError),

    /// Storage failure outside a specific step (begin, cart clear, commit, reads).
    #[error("Checkout aborted: {0}")]
    TransactionAborted(#[source] DbError),
}

impl From<CoreError> for CheckoutError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyCart => CheckoutError::EmptyCart,
            CoreError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            } => CheckoutError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            },
            CoreError::Validation(err) => CheckoutError::Validation(err),
            CoreError::AmountOverflow { product_id } => CheckoutError::AmountOverflow { product_id },
            other => CheckoutError::TransactionAborted(DbError::Domain(other)),
        }
    }
}

impl CheckoutError {
    /// Whether the database was touched before the failure (and rolled back).
    pub fn was_rolled_back(&self) -> bool {
        matches!(
            self,
            CheckoutError::StockUpdateFailed { .. }
                | CheckoutError::OrderItemPersistFailed { .. }
                | CheckoutError::OrderHeaderPersistFailed(_)
                | CheckoutError::TransactionAborted(_)
        )
    }
}

/// Result type for checkout.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Phase
// =============================================================================

/// Where a `place_order` call is. Logged, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutPhase {
    Validating,
    Committing,
    Committed,
    RolledBack,
}

impl fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutPhase::Validating => "validating",
            CheckoutPhase::Committing => "committing",
            CheckoutPhase::Committed => "committed",
            CheckoutPhase::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Placed Order
// =============================================================================

/// What a successful checkout committed, taken from the validated plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: i64,
    pub status: OrderStatus,
    pub item_count: i64,
    pub total: Money,
}

impl PlacedOrder {
    fn new(order_id: i64, plan: &CheckoutPlan) -> Self {
        PlacedOrder {
            order_id,
            status: OrderStatus::Pending,
            item_count: plan.lines.iter().map(|line| line.quantity).sum(),
            total: plan.total,
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// The checkout orchestrator.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
}

impl CheckoutService {
    pub fn new(db: Database) -> Self {
        CheckoutService { db }
    }

    /// Places an order for everything in the user's cart.
    ///
    /// ## Arguments
    /// * `user_id` - the ordering user
    /// * `shipping_address` - free text, trimmed before it is stored
    ///
    /// ## Returns
    /// The committed order's id, status, item count and total. The order is
    /// `Pending`, its total equals the sum of its line subtotals, stock has
    /// dropped by each line's quantity and the cart is empty.
    pub async fn place_order(&self, user_id: i64, shipping_address: &str) -> CheckoutResult<PlacedOrder> {
        let address = validate_shipping_address(shipping_address)?;

        debug!(user_id, phase = %CheckoutPhase::Validating, "Checkout started");
        let plan = self.validate(user_id).await?;

        debug!(
            user_id,
            phase = %CheckoutPhase::Committing,
            lines = plan.lines.len(),
            total_cents = plan.total.cents(),
            "Cart validated"
        );

        match self.commit(user_id, address, &plan).await {
            Ok(order_id) => {
                info!(
                    order_id,
                    user_id,
                    lines = plan.lines.len(),
                    total_cents = plan.total.cents(),
                    phase = %CheckoutPhase::Committed,
                    "Order placed"
                );
                Ok(PlacedOrder::new(order_id, &plan))
            }
            Err(err) => {
                warn!(user_id, error = %err, phase = %CheckoutPhase::RolledBack, "Checkout rolled back");
                Err(err)
            }
        }
    }

    /// Steps 1–3 plus the user check. Read-only.
    async fn validate(&self, user_id: i64) -> CheckoutResult<CheckoutPlan> {
        let mut conn = self.db.acquire().await.map_err(CheckoutError::TransactionAborted)?;

        if !UserRepository::exists(&mut conn, user_id)
            .await
            .map_err(CheckoutError::TransactionAborted)?
        {
            return Err(CheckoutError::UnknownUser(user_id));
        }

        let cart = CartRepository::list_lines(&mut conn, user_id)
            .await
            .map_err(CheckoutError::TransactionAborted)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut products = HashMap::with_capacity(cart.len());
        for line in &cart {
            let product = ProductRepository::get_by_id(&mut conn, line.product_id)
                .await
                .map_err(CheckoutError::TransactionAborted)?;
            if let Some(product) = product {
                products.insert(product.id, product);
            }
        }

        let plan = CheckoutPlan::prepare(&cart, &products);
        if let Err(CoreError::InsufficientStock { product_id, available, requested, .. }) = &plan {
            warn!(user_id, product_id, available, requested, "Checkout refused: insufficient stock");
        }
        Ok(plan?)
    }

    /// Steps 4–8 in one unit of work.
    async fn commit(&self, user_id: i64, address: &str, plan: &CheckoutPlan) -> CheckoutResult<i64> {
        let now = self.db.clock().now();
        let mut uow = self
            .db
            .begin("checkout")
            .await
            .map_err(CheckoutError::TransactionAborted)?;

        // 4. Header first: this write takes the lock.
        let order_id = OrderRepository::create_header(uow.conn(), &plan.header(user_id, address, now))
            .await
            .map_err(CheckoutError::OrderHeaderPersistFailed)?;

        // 5. Re-check and take stock.
        for line in &plan.lines {
            let taken = ProductRepository::decrement_stock(uow.conn(), line.product_id, line.quantity, now)
                .await
                .map_err(|err| match err {
                    DbError::NotFound { .. } => CheckoutError::StockUpdateFailed {
                        product_id: line.product_id,
                        requested: line.quantity,
                    },
                    other => CheckoutError::TransactionAborted(other),
                })?;

            if !taken {
                warn!(
                    order_id,
                    product_id = line.product_id,
                    requested = line.quantity,
                    "Stock changed since validation"
                );
                return Err(CheckoutError::StockUpdateFailed {
                    product_id: line.product_id,
                    requested: line.quantity,
                });
            }
        }

        // 6. Lines as one batch.
        OrderRepository::create_lines(uow.conn(), order_id, &plan.order_lines())
            .await
            .map_err(|source| CheckoutError::OrderItemPersistFailed { order_id, source })?;

        // 7. Empty the cart.
        CartRepository::clear(uow.conn(), user_id)
            .await
            .map_err(CheckoutError::TransactionAborted)?;

        // 8.
        uow.commit().await.map_err(CheckoutError::TransactionAborted)?;
        Ok(order_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
