//! # Cart Repository (Cart Store)
//!
//! Per-user cart lines.
//!
//! ## Merge on Add
//! ```text
//! upsert_line(user 3, product 7, qty 2)   → line { product 7, qty 2 }
//! upsert_line(user 3, product 7, qty 1)   → line { product 7, qty 3 }  (same id)
//! ```
//! The `UNIQUE (user_id, product_id)` constraint plus `ON CONFLICT .. DO
//! UPDATE` keeps at most one line per product, even under concurrent adds.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::{CartLine, CartLineDetail};

#[derive(Debug, Clone, Copy)]
pub struct CartRepository;

impl CartRepository {
    // =========================================================================
    // Reads
    // =========================================================================

    /// The user's cart lines in the order they were added.
    pub async fn list_lines(conn: &mut SqliteConnection, user_id: i64) -> DbResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT id, user_id, product_id, quantity, added_at
            FROM cart_lines
            WHERE user_id = ?1
            ORDER BY added_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(lines)
    }

    /// Cart lines joined with the live product name, price and stock.
    pub async fn list_details(
        conn: &mut SqliteConnection,
        user_id: i64,
    ) -> DbResult<Vec<CartLineDetail>> {
        let lines = sqlx::query_as::<_, CartLineDetail>(
            r#"
            SELECT c.id,
                   c.product_id,
                   p.name AS product_name,
                   p.image_url,
                   p.price_cents AS unit_price_cents,
                   p.stock_quantity,
                   c.quantity
            FROM cart_lines c
            INNER JOIN products p ON p.id = c.product_id
            WHERE c.user_id = ?1
            ORDER BY c.added_at, c.id
            "#,
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(lines)
    }

    pub async fn get_line(conn: &mut SqliteConnection, line_id: i64) -> DbResult<Option<CartLine>> {
        let line = sqlx::query_as::<_, CartLine>(
            "SELECT id, user_id, product_id, quantity, added_at FROM cart_lines WHERE id = ?1",
        )
        .bind(line_id)
        .fetch_optional(conn)
        .await?;

        Ok(line)
    }

    /// The line holding `product_id` in the user's cart, if any.
    pub async fn find_line(
        conn: &mut SqliteConnection,
        user_id: i64,
        product_id: i64,
    ) -> DbResult<Option<CartLine>> {
        let line = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT id, user_id, product_id, quantity, added_at
            FROM cart_lines
            WHERE user_id = ?1 AND product_id = ?2
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(conn)
        .await?;

        Ok(line)
    }

    /// Number of distinct lines.
    pub async fn count_lines(conn: &mut SqliteConnection, user_id: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_lines WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(conn)
            .await?;

        Ok(count)
    }

    /// Σ quantities over the user's lines (0 for an empty cart).
    pub async fn sum_quantities(conn: &mut SqliteConnection, user_id: i64) -> DbResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM cart_lines WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_one(conn)
        .await?;

        Ok(sum)
    }

    /// Σ (live price × quantity) in cents. For display; checkout prices
    /// its own snapshot.
    pub async fn total_cents(conn: &mut SqliteConnection, user_id: i64) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(p.price_cents * c.quantity), 0)
            FROM cart_lines c
            INNER JOIN products p ON p.id = c.product_id
            WHERE c.user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_one(conn)
        .await?;

        Ok(total)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Adds `quantity` of a product, merging into an existing line.
    ///
    /// ## Returns
    /// The line after the merge.
    pub async fn upsert_line(
        conn: &mut SqliteConnection,
        user_id: i64,
        product_id: i64,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<CartLine> {
        debug!(user_id, product_id, quantity, "Upserting cart line");

        let line = sqlx::query_as::<_, CartLine>(
            r#"
            INSERT INTO cart_lines (user_id, product_id, quantity, added_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_lines.quantity + excluded.quantity
            RETURNING id, user_id, product_id, quantity, added_at
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(line)
    }

    /// Sets a line's quantity. A quantity of zero or less removes the line.
    ///
    /// ## Returns
    /// * `Ok(Some(line))` - updated line
    /// * `Ok(None)` - line removed
    pub async fn update_quantity(
        conn: &mut SqliteConnection,
        line_id: i64,
        quantity: i64,
    ) -> DbResult<Option<CartLine>> {
        if quantity <= 0 {
            Self::remove_line(conn, line_id).await?;
            return Ok(None);
        }

        debug!(line_id, quantity, "Updating cart line quantity");

        let line = sqlx::query_as::<_, CartLine>(
            r#"
            UPDATE cart_lines SET quantity = ?2
            WHERE id = ?1
            RETURNING id, user_id, product_id, quantity, added_at
            "#,
        )
        .bind(line_id)
        .bind(quantity)
        .fetch_optional(conn)
        .await?;

        match line {
            Some(line) => Ok(Some(line)),
            None => Err(DbError::not_found("Cart line", line_id)),
        }
    }

    pub async fn remove_line(conn: &mut SqliteConnection, line_id: i64) -> DbResult<()> {
        debug!(line_id, "Removing cart line");

        let result = sqlx::query("DELETE FROM cart_lines WHERE id = ?1")
            .bind(line_id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart line", line_id));
        }

        Ok(())
    }

    /// Empties the user's cart.
    ///
    /// ## Returns
    /// Number of lines removed.
    pub async fn clear(conn: &mut SqliteConnection, user_id: i64) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = ?1")
            .bind(user_id)
            .execute(conn)
            .await?;

        debug!(user_id, removed = result.rows_affected(), "Cart cleared");
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::{CategoryRepository, ProductRepository, UserRepository};
    use storefront_core::{NewCategory, NewProduct, Role};

    async fn setup() -> (Database, i64, i64, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let now = Utc::now();

        let user = UserRepository::insert(&mut conn, "ann@example.com", "h", "Ann", Role::Customer, now)
            .await
            .unwrap();
        let category = CategoryRepository::insert(
            &mut conn,
            &NewCategory {
                name: "Lighting".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
        let mut ids = Vec::new();
        for (name, price) in [("Desk Lamp", 1000), ("Bulb", 250)] {
            let product = ProductRepository::insert(
                &mut conn,
                &NewProduct {
                    category_id: category.id,
                    name: name.to_string(),
                    description: None,
                    price_cents: price,
                    stock_quantity: 10,
                    image_url: None,
                },
                now,
            )
            .await
            .unwrap();
            ids.push(product.id);
        }
        drop(conn);
        (db, user.id, ids[0], ids[1])
    }

    #[tokio::test]
    async fn test_upsert_merges_same_product() {
        let (db, user_id, lamp, _) = setup().await;
        let mut conn = db.acquire().await.unwrap();
        let now = Utc::now();

        let first = CartRepository::upsert_line(&mut conn, user_id, lamp, 2, now).await.unwrap();
        let merged = CartRepository::upsert_line(&mut conn, user_id, lamp, 1, now).await.unwrap();

        assert_eq!(first.id, merged.id);
        assert_eq!(merged.quantity, 3);
        assert_eq!(CartRepository::count_lines(&mut conn, user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sums_and_totals() {
        let (db, user_id, lamp, bulb) = setup().await;
        let mut conn = db.acquire().await.unwrap();
        let now = Utc::now();

        assert_eq!(CartRepository::sum_quantities(&mut conn, user_id).await.unwrap(), 0);
        assert_eq!(CartRepository::total_cents(&mut conn, user_id).await.unwrap(), 0);

        CartRepository::upsert_line(&mut conn, user_id, lamp, 3, now).await.unwrap();
        CartRepository::upsert_line(&mut conn, user_id, bulb, 2, now).await.unwrap();

        assert_eq!(CartRepository::sum_quantities(&mut conn, user_id).await.unwrap(), 5);
        assert_eq!(CartRepository::total_cents(&mut conn, user_id).await.unwrap(), 3500);

        let details = CartRepository::list_details(&mut conn, user_id).await.unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].product_name, "Desk Lamp");
        assert_eq!(details[0].subtotal().cents(), 3000);
    }

    #[tokio::test]
    async fn test_update_to_zero_removes() {
        let (db, user_id, lamp, bulb) = setup().await;
        let mut conn = db.acquire().await.unwrap();
        let now = Utc::now();

        let line = CartRepository::upsert_line(&mut conn, user_id, lamp, 3, now).await.unwrap();
        CartRepository::upsert_line(&mut conn, user_id, bulb, 1, now).await.unwrap();

        let updated = CartRepository::update_quantity(&mut conn, line.id, 5).await.unwrap();
        assert_eq!(updated.map(|l| l.quantity), Some(5));

        assert!(CartRepository::update_quantity(&mut conn, line.id, 0).await.unwrap().is_none());
        assert!(CartRepository::get_line(&mut conn, line.id).await.unwrap().is_none());
        assert!(matches!(
            CartRepository::remove_line(&mut conn, line.id).await,
            Err(DbError::NotFound { .. })
        ));

        assert_eq!(CartRepository::clear(&mut conn, user_id).await.unwrap(), 1);
        assert!(CartRepository::list_lines(&mut conn, user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected_by_schema() {
        let (db, user_id, lamp, _) = setup().await;
        let mut conn = db.acquire().await.unwrap();

        let err = CartRepository::upsert_line(&mut conn, user_id, lamp, 0, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }
}
