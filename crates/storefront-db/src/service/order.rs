//! # Order Service
//!
//! Order history for customers and order management for admins.
//!
//! ## Status Lifecycle
//! ```text
//! Pending ──► Processing ──► Shipped ──► Delivered
//!    │             │
//!    └─────────────┴──► Cancelled (stock restored)
//! ```
//!
//! Cancelling puts every line's quantity back on the shelf in the same unit
//! of work that flips the status.

use storefront_core::{CoreError, Order, OrderHeader, OrderStatus};
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::{OrderRepository, ProductRepository};

#[derive(Debug, Clone)]
pub struct OrderService {
    db: Database,
}

impl OrderService {
    pub fn new(db: Database) -> Self {
        OrderService { db }
    }

    /// An order with its lines.
    pub async fn order_details(&self, order_id: i64) -> DbResult<Order> {
        let mut conn = self.db.acquire().await?;
        OrderRepository::get_by_id(&mut conn, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))
    }

    /// A customer's orders, newest first.
    pub async fn user_orders(&self, user_id: i64) -> DbResult<Vec<Order>> {
        let mut conn = self.db.acquire().await?;
        OrderRepository::list_by_user(&mut conn, user_id).await
    }

    /// Every order, newest first.
    pub async fn all_orders(&self) -> DbResult<Vec<Order>> {
        let mut conn = self.db.acquire().await?;
        OrderRepository::list_all(&mut conn).await
    }

    /// Moves an order along its lifecycle.
    ///
    /// ## Errors
    /// * `NotFound` - no such order
    /// * `InvalidStatusTransition` - the lifecycle does not allow the move
    pub async fn update_status(&self, order_id: i64, to: OrderStatus) -> DbResult<OrderHeader> {
        if to == OrderStatus::Cancelled {
            return self.cancel(order_id).await;
        }

        let mut conn = self.db.acquire().await?;
        let header = Self::require_header(&mut conn, order_id).await?;
        Self::check_transition(&header, to)?;

        if !OrderRepository::update_status(&mut conn, order_id, header.status, to).await? {
            return Err(Self::lost_race(&mut conn, order_id, to).await);
        }

        info!(order_id, from = %header.status, to = %to, "Order status changed");
        Ok(OrderHeader { status: to, ..header })
    }

    /// Cancels a pending or processing order and restores its stock.
    pub async fn cancel(&self, order_id: i64) -> DbResult<OrderHeader> {
        let order = self.order_details(order_id).await?;
        self.cancel_from(order).await
    }

    /// Lets a customer cancel one of their own pending orders.
    ///
    /// Orders of other users are reported as missing.
    pub async fn cancel_by_customer(&self, user_id: i64, order_id: i64) -> DbResult<OrderHeader> {
        let order = match self.order_details(order_id).await {
            Ok(order) if order.header.user_id == user_id => order,
            Ok(_) | Err(DbError::NotFound { .. }) => return Err(DbError::not_found("Order", order_id)),
            Err(err) => return Err(err),
        };

        if order.header.status != OrderStatus::Pending {
            return Err(CoreError::InvalidStatusTransition {
                order_id,
                from: order.header.status,
                to: OrderStatus::Cancelled,
            }
            .into());
        }

        self.cancel_from(order).await
    }

    /// Cancels `order` only while it still has the status it was read with.
    async fn cancel_from(&self, order: Order) -> DbResult<OrderHeader> {
        let to = OrderStatus::Cancelled;
        let Order { header, lines } = order;
        let order_id = header.id;
        Self::check_transition(&header, to)?;

        let now = self.db.clock().now();
        let mut uow = self.db.begin("cancel_order").await?;

        // The status write takes the lock. If anyone moved the order since
        // it was read, 0 rows match and nothing is restored.
        if !OrderRepository::update_status(uow.conn(), order_id, header.status, to).await? {
            let err = Self::lost_race(uow.conn(), order_id, to).await;
            uow.rollback().await?;
            return Err(err);
        }

        for line in &lines {
            match ProductRepository::restore_stock(uow.conn(), line.product_id, line.quantity, now).await {
                Ok(()) => {}
                Err(DbError::NotFound { .. }) => {
                    warn!(
                        order_id,
                        product_id = line.product_id,
                        "Product no longer exists, stock not restored"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        uow.commit().await?;

        info!(order_id, from = %header.status, lines = lines.len(), "Order cancelled");
        Ok(OrderHeader { status: to, ..header })
    }

    async fn require_header(conn: &mut sqlx::SqliteConnection, order_id: i64) -> DbResult<OrderHeader> {
        OrderRepository::get_header(conn, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))
    }

    fn check_transition(header: &OrderHeader, to: OrderStatus) -> DbResult<()> {
        if header.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(CoreError::InvalidStatusTransition {
                order_id: header.id,
                from: header.status,
                to,
            }
            .into())
        }
    }

    /// The status changed between read and write. Reports from the current one.
    async fn lost_race(conn: &mut sqlx::SqliteConnection, order_id: i64, to: OrderStatus) -> DbError {
        match OrderRepository::get_header(conn, order_id).await {
            Ok(Some(current)) => CoreError::InvalidStatusTransition {
                order_id,
                from: current.status,
                to,
            }
            .into(),
            Ok(None) => DbError::not_found("Order", order_id),
            Err(err) => err,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use crate::repository::{CartRepository, CategoryRepository, UserRepository};
    use chrono::Utc;
    use storefront_core::{NewCategory, NewProduct, Role};

    struct Fixture {
        db: Database,
        ann: i64,
        bob: i64,
        lamp: i64,
        chair: i64,
    }

    async fn setup() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let now = Utc::now();

        let ann = UserRepository::insert(&mut conn, "ann@example.com", "h", "Ann", Role::Customer, now)
            .await
            .unwrap()
            .id;
        let bob = UserRepository::insert(&mut conn, "bob@example.com", "h", "Bob", Role::Customer, now)
            .await
            .unwrap()
            .id;
        let category = CategoryRepository::insert(
            &mut conn,
            &NewCategory {
                name: "Home".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

        let product = |name: &str, price_cents: i64| NewProduct {
            category_id: category.id,
            name: name.to_string(),
            description: None,
            price_cents,
            stock_quantity: 10,
            image_url: None,
        };
        let lamp = ProductRepository::insert(&mut conn, &product("Lamp", 1000), now)
            .await
            .unwrap()
            .id;
        let chair = ProductRepository::insert(&mut conn, &product("Chair", 5000), now)
            .await
            .unwrap()
            .id;
        drop(conn);

        Fixture { db, ann, bob, lamp, chair }
    }

    async fn place(f: &Fixture, user_id: i64, lines: &[(i64, i64)]) -> i64 {
        let mut conn = f.db.acquire().await.unwrap();
        for &(product_id, quantity) in lines {
            CartRepository::upsert_line(&mut conn, user_id, product_id, quantity, Utc::now())
                .await
                .unwrap();
        }
        drop(conn);
        f.db.checkout().place_order(user_id, "1 Main St").await.unwrap().order_id
    }

    async fn stock(f: &Fixture, product_id: i64) -> i64 {
        let mut conn = f.db.acquire().await.unwrap();
        ProductRepository::get_stock(&mut conn, product_id).await.unwrap()
    }

    #[tokio::test]
    async fn test_history_views() {
        let f = setup().await;
        let first = place(&f, f.ann, &[(f.lamp, 1)]).await;
        let second = place(&f, f.ann, &[(f.chair, 2)]).await;
        place(&f, f.bob, &[(f.lamp, 1)]).await;

        let orders = f.db.orders();
        let ids: Vec<_> = orders.user_orders(f.ann).await.unwrap().iter().map(Order::id).collect();
        assert_eq!(ids, vec![second, first]);
        assert_eq!(orders.all_orders().await.unwrap().len(), 3);

        let details = orders.order_details(second).await.unwrap();
        assert_eq!(details.header.total_cents, 10_000);
        assert_eq!(details.item_count(), 2);
        assert!(matches!(orders.order_details(999).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let f = setup().await;
        let id = place(&f, f.ann, &[(f.lamp, 1)]).await;
        let orders = f.db.orders();

        assert!(matches!(
            orders.update_status(id, OrderStatus::Delivered).await,
            Err(DbError::Domain(CoreError::InvalidStatusTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered,
                ..
            }))
        ));

        for next in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
            assert_eq!(orders.update_status(id, next).await.unwrap().status, next);
        }
        assert!(orders.update_status(id, OrderStatus::Cancelled).await.is_err());
        assert_eq!(orders.order_details(id).await.unwrap().header.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let f = setup().await;
        let id = place(&f, f.ann, &[(f.lamp, 3), (f.chair, 1)]).await;
        assert_eq!(stock(&f, f.lamp).await, 7);

        let orders = f.db.orders();
        orders.update_status(id, OrderStatus::Processing).await.unwrap();
        let header = orders.update_status(id, OrderStatus::Cancelled).await.unwrap();
        assert_eq!(header.status, OrderStatus::Cancelled);
        assert_eq!(stock(&f, f.lamp).await, 10);
        assert_eq!(stock(&f, f.chair).await, 10);

        // A second cancel changes nothing
        assert!(orders.cancel(id).await.is_err());
        assert_eq!(stock(&f, f.lamp).await, 10);
    }

    #[tokio::test]
    async fn test_cancel_skips_deleted_products() {
        let f = setup().await;
        let id = place(&f, f.ann, &[(f.lamp, 2), (f.chair, 1)]).await;

        let mut conn = f.db.acquire().await.unwrap();
        ProductRepository::delete(&mut conn, f.chair).await.unwrap();
        drop(conn);

        f.db.orders().cancel(id).await.unwrap();
        assert_eq!(stock(&f, f.lamp).await, 10);
        let order = f.db.orders().order_details(id).await.unwrap();
        assert_eq!(order.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_by_customer() {
        let f = setup().await;
        let id = place(&f, f.ann, &[(f.lamp, 1)]).await;
        let orders = f.db.orders();

        assert!(matches!(
            orders.cancel_by_customer(f.bob, id).await,
            Err(DbError::NotFound { .. })
        ));

        orders.update_status(id, OrderStatus::Processing).await.unwrap();
        assert!(matches!(
            orders.cancel_by_customer(f.ann, id).await,
            Err(DbError::Domain(CoreError::InvalidStatusTransition { .. }))
        ));

        let pending = place(&f, f.ann, &[(f.lamp, 1)]).await;
        let header = orders.cancel_by_customer(f.ann, pending).await.unwrap();
        assert_eq!(header.status, OrderStatus::Cancelled);
        assert_eq!(stock(&f, f.lamp).await, 9);
    }

    #[tokio::test]
    async fn test_cancel_is_pinned_to_the_status_it_read() {
        let f = setup().await;
        let id = place(&f, f.ann, &[(f.lamp, 2)]).await;
        let orders = f.db.orders();

        // The customer's read sees Pending, then an admin starts processing.
        let seen = orders.order_details(id).await.unwrap();
        assert_eq!(seen.header.status, OrderStatus::Pending);
        orders.update_status(id, OrderStatus::Processing).await.unwrap();

        assert!(matches!(
            orders.cancel_from(seen).await,
            Err(DbError::Domain(CoreError::InvalidStatusTransition {
                from: OrderStatus::Processing,
                to: OrderStatus::Cancelled,
                ..
            }))
        ));
        assert_eq!(orders.order_details(id).await.unwrap().header.status, OrderStatus::Processing);
        assert_eq!(stock(&f, f.lamp).await, 8);
    }
}
