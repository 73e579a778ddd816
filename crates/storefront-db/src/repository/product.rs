//! # Product Repository (Inventory Store)
//!
//! Database operations for products and their stock levels.
//!
//! ## Key Operations
//! - Catalog reads and keyword search
//! - Admin CRUD
//! - Inventory: `get_stock`, `decrement_stock`, `restore_stock`
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two checkouts race for the last 2 lamps                               │
//! │                                                                         │
//! │  Checkout A: UPDATE .. SET stock = stock - 2 WHERE id = 7 AND stock >= 2│
//! │              → 1 row  (stock 2 → 0)                 ✓ order placed      │
//! │                                                                         │
//! │  Checkout B: UPDATE .. SET stock = stock - 1 WHERE id = 7 AND stock >= 1│
//! │              → 0 rows (stock is 0)                  ✗ refused, rollback │
//! │                                                                         │
//! │  The check and the write are one statement, so no interleaving can     │
//! │  push stock below zero.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function takes `&mut SqliteConnection`, so the same store call runs
//! on a pooled connection or inside a [`UnitOfWork`](crate::UnitOfWork).

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::{NewProduct, Product};

/// Escapes `%`, `_` and `\` so user input matches literally inside LIKE.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let mut conn = db.acquire().await?;
/// let stock = ProductRepository::get_stock(&mut conn, 7).await?;
/// let ok = ProductRepository::decrement_stock(&mut conn, 7, 2, now).await?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ProductRepository;

impl ProductRepository {
    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, category_id, name, description, price_cents,
                   stock_quantity, image_url, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(product)
    }

    /// Lists every product, sorted by name.
    pub async fn list_all(conn: &mut SqliteConnection) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, category_id, name, description, price_cents,
                   stock_quantity, image_url, created_at, updated_at
            FROM products
            ORDER BY name, id
            "#,
        )
        .fetch_all(conn)
        .await?;

        Ok(products)
    }

    /// Lists the products of one category, sorted by name.
    pub async fn list_by_category(
        conn: &mut SqliteConnection,
        category_id: i64,
    ) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, category_id, name, description, price_cents,
                   stock_quantity, image_url, created_at, updated_at
            FROM products
            WHERE category_id = ?1
            ORDER BY name, id
            "#,
        )
        .bind(category_id)
        .fetch_all(conn)
        .await?;

        Ok(products)
    }

    /// Keyword search over name and description.
    ///
    /// Case-insensitive substring match, sorted by name. No ranking. An empty
    /// query lists everything.
    pub async fn search(conn: &mut SqliteConnection, query: &str) -> DbResult<Vec<Product>> {
        let query = query.trim();
        debug!(query = %query, "Searching products");

        if query.is_empty() {
            return Self::list_all(conn).await;
        }

        let pattern = like_pattern(query);
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, category_id, name, description, price_cents,
                   stock_quantity, image_url, created_at, updated_at
            FROM products
            WHERE name LIKE ?1 ESCAPE '\'
               OR COALESCE(description, '') LIKE ?1 ESCAPE '\'
            ORDER BY name, id
            "#,
        )
        .bind(&pattern)
        .fetch_all(conn)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Counts products (for diagnostics and the seed binary).
    pub async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(conn)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Admin writes
    // =========================================================================

    /// Inserts a product and returns the stored row.
    pub async fn insert(
        conn: &mut SqliteConnection,
        product: &NewProduct,
        now: DateTime<Utc>,
    ) -> DbResult<Product> {
        debug!(name = %product.name, category_id = product.category_id, "Inserting product");

        let stored = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                category_id, name, description, price_cents,
                stock_quantity, image_url, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            RETURNING id, category_id, name, description, price_cents,
                      stock_quantity, image_url, created_at, updated_at
            "#,
        )
        .bind(product.category_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock_quantity)
        .bind(&product.image_url)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(stored)
    }

    /// Replaces every editable field of a product.
    pub async fn update(
        conn: &mut SqliteConnection,
        id: i64,
        product: &NewProduct,
        now: DateTime<Utc>,
    ) -> DbResult<Product> {
        debug!(id, "Updating product");

        let stored = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                category_id = ?2,
                name = ?3,
                description = ?4,
                price_cents = ?5,
                stock_quantity = ?6,
                image_url = ?7,
                updated_at = ?8
            WHERE id = ?1
            RETURNING id, category_id, name, description, price_cents,
                      stock_quantity, image_url, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(product.category_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock_quantity)
        .bind(&product.image_url)
        .bind(now)
        .fetch_optional(conn)
        .await?;

        stored.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product. Cart lines referencing it go with it; order lines
    /// keep their snapshot.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
        debug!(id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Returns the current stock of a product.
    ///
    /// ## Errors
    /// `NotFound` if the product does not exist.
    pub async fn get_stock(conn: &mut SqliteConnection, id: i64) -> DbResult<i64> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(conn)
                .await?;

        stock.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Atomically removes `amount` units if at least that many are in stock.
    ///
    /// ## Returns
    /// * `Ok(true)` - stock decremented
    /// * `Ok(false)` - refused, stock is lower than `amount` (nothing changed)
    ///
    /// ## Errors
    /// `NotFound` if the product does not exist.
    pub async fn decrement_stock(
        conn: &mut SqliteConnection,
        id: i64,
        amount: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id, amount, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - ?2,
                updated_at = ?3
            WHERE id = ?1 AND stock_quantity >= ?2
            "#,
        )
        .bind(id)
        .bind(amount)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Zero rows: either refused or the product is gone.
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        match exists {
            Some(_) => Ok(false),
            None => Err(DbError::not_found("Product", id)),
        }
    }

    /// Adds `amount` units back. Inverse of [`Self::decrement_stock`].
    ///
    /// ## Errors
    /// `NotFound` if the product does not exist.
    pub async fn restore_stock(
        conn: &mut SqliteConnection,
        id: i64,
        amount: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id, amount, "Restoring stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(amount)
        .bind(now)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
