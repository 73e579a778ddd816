//! # Order Repository (Order Store)
//!
//! Database operations for orders and order lines.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE HEADER                                                      │
//! │     └── create_header() → order id { status: Pending }                 │
//! │                                                                         │
//! │  2. CREATE LINES (one batch, all or nothing)                           │
//! │     └── create_lines(order id, [line, line, ...])                      │
//! │                                                                         │
//! │  3. STATUS CHANGES (admin, or customer cancel)                         │
//! │     └── update_status(id, from, to)                                    │
//! │                                                                         │
//! │  Header fields other than status and every line are immutable.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Connection, SqliteConnection};
use tracing::debug;

use crate::error::DbResult;
use storefront_core::{NewOrderHeader, NewOrderLine, Order, OrderHeader, OrderLine, OrderStatus};

#[derive(Debug, Clone, Copy)]
pub struct OrderRepository;

impl OrderRepository {
    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts an order header.
    ///
    /// ## Returns
    /// The new order id.
    pub async fn create_header(conn: &mut SqliteConnection, header: &NewOrderHeader) -> DbResult<i64> {
        debug!(
            user_id = header.user_id,
            total_cents = header.total_cents,
            "Inserting order header"
        );

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (user_id, status, total_cents, shipping_address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(header.user_id)
        .bind(header.status)
        .bind(header.total_cents)
        .bind(&header.shipping_address)
        .bind(header.created_at)
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    /// Inserts every line of an order as one batch.
    ///
    /// The inserts run inside a nested transaction (a SAVEPOINT when the
    /// connection is already in a unit of work), so either every line is
    /// stored or none is, with or without an enclosing transaction.
    pub async fn create_lines(
        conn: &mut SqliteConnection,
        order_id: i64,
        lines: &[NewOrderLine],
    ) -> DbResult<()> {
        debug!(order_id, count = lines.len(), "Inserting order lines");

        let mut batch = conn.begin().await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (
                    order_id, product_id, product_name, image_url,
                    quantity, unit_price_cents, subtotal_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(&line.image_url)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.subtotal_cents())
            .execute(&mut *batch)
            .await?;
        }

        batch.commit().await?;
        Ok(())
    }

    /// Moves an order from `from` to `to`.
    ///
    /// The update is conditional on the current status, so a concurrent
    /// change makes it a no-op.
    ///
    /// ## Returns
    /// `true` if the row was updated.
    pub async fn update_status(
        conn: &mut SqliteConnection,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> DbResult<bool> {
        debug!(order_id, from = %from, to = %to, "Updating order status");

        let result = sqlx::query("UPDATE orders SET status = ?3 WHERE id = ?1 AND status = ?2")
            .bind(order_id)
            .bind(from)
            .bind(to)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_header(conn: &mut SqliteConnection, order_id: i64) -> DbResult<Option<OrderHeader>> {
        let header = sqlx::query_as::<_, OrderHeader>(
            r#"
            SELECT id, user_id, status, total_cents, shipping_address, created_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(order_id)
        .fetch_optional(conn)
        .await?;

        Ok(header)
    }

    /// Lines of an order in insertion order.
    pub async fn get_lines(conn: &mut SqliteConnection, order_id: i64) -> DbResult<Vec<OrderLine>> {
        let lines = sqlx::query_as::<_, OrderLine>(
            r#"
            SELECT id, order_id, product_id, product_name, image_url,
                   quantity, unit_price_cents, subtotal_cents
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(conn)
        .await?;

        Ok(lines)
    }

    /// An order with its lines.
    pub async fn get_by_id(conn: &mut SqliteConnection, order_id: i64) -> DbResult<Option<Order>> {
        let header = match Self::get_header(&mut *conn, order_id).await? {
            Some(header) => header,
            None => return Ok(None),
        };
        let lines = Self::get_lines(conn, order_id).await?;

        Ok(Some(Order { header, lines }))
    }

    /// A user's orders, newest first.
    pub async fn list_by_user(conn: &mut SqliteConnection, user_id: i64) -> DbResult<Vec<Order>> {
        let headers = sqlx::query_as::<_, OrderHeader>(
            r#"
            SELECT id, user_id, status, total_cents, shipping_address, created_at
            FROM orders
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        Self::with_lines(conn, headers).await
    }

    /// Every order, newest first.
    pub async fn list_all(conn: &mut SqliteConnection) -> DbResult<Vec<Order>> {
        let headers = sqlx::query_as::<_, OrderHeader>(
            r#"
            SELECT id, user_id, status, total_cents, shipping_address, created_at
            FROM orders
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Self::with_lines(conn, headers).await
    }

    pub async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(conn)
            .await?;

        Ok(count)
    }

    async fn with_lines(conn: &mut SqliteConnection, headers: Vec<OrderHeader>) -> DbResult<Vec<Order>> {
        let mut orders = Vec::with_capacity(headers.len());
        for header in headers {
            let lines = Self::get_lines(&mut *conn, header.id).await?;
            orders.push(Order { header, lines });
        }
        Ok(orders)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
