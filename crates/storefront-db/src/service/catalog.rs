//! # Catalog Service
//!
//! Product and category reads for shoppers, and the admin writes behind them.
//! Input is validated and trimmed here; uniqueness and referential rules are
//! left to the schema and surfaced as `DbError`s.

use storefront_core::validation::{
    validate_category_name, validate_description, validate_image_url, validate_price_cents,
    validate_product_name, validate_search_query, validate_stock_quantity,
};
use storefront_core::{Category, NewCategory, NewProduct, Product};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::{CategoryRepository, ProductRepository};

/// Trims optional text, turning blank into `None`.
fn normalize_optional(text: &Option<String>) -> Option<String> {
    text.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn normalize_product(product: &NewProduct) -> DbResult<NewProduct> {
    let name = validate_product_name(&product.name)?;
    validate_price_cents(product.price_cents)?;
    validate_stock_quantity(product.stock_quantity)?;
    validate_description(product.description.as_deref())?;
    validate_image_url(product.image_url.as_deref())?;

    Ok(NewProduct {
        category_id: product.category_id,
        name: name.to_string(),
        description: normalize_optional(&product.description),
        price_cents: product.price_cents,
        stock_quantity: product.stock_quantity,
        image_url: normalize_optional(&product.image_url),
    })
}

fn normalize_category(category: &NewCategory) -> DbResult<NewCategory> {
    let name = validate_category_name(&category.name)?;
    validate_description(category.description.as_deref())?;

    Ok(NewCategory {
        name: name.to_string(),
        description: normalize_optional(&category.description),
    })
}

#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        CatalogService { db }
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn list_products(&self) -> DbResult<Vec<Product>> {
        let mut conn = self.db.acquire().await?;
        ProductRepository::list_all(&mut conn).await
    }

    /// Keyword search over name and description. Blank lists everything.
    pub async fn search_products(&self, query: &str) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;
        let mut conn = self.db.acquire().await?;
        ProductRepository::search(&mut conn, &query).await
    }

    /// ## Errors
    /// `NotFound` when the category does not exist.
    pub async fn products_in_category(&self, category_id: i64) -> DbResult<Vec<Product>> {
        let mut conn = self.db.acquire().await?;
        if CategoryRepository::get_by_id(&mut conn, category_id).await?.is_none() {
            return Err(DbError::not_found("Category", category_id));
        }
        ProductRepository::list_by_category(&mut conn, category_id).await
    }

    pub async fn get_product(&self, id: i64) -> DbResult<Product> {
        let mut conn = self.db.acquire().await?;
        ProductRepository::get_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    pub async fn create_product(&self, product: &NewProduct) -> DbResult<Product> {
        let product = normalize_product(product)?;
        let mut conn = self.db.acquire().await?;
        Self::require_category(&mut conn, product.category_id).await?;

        let stored = ProductRepository::insert(&mut conn, &product, self.db.clock().now()).await?;
        info!(id = stored.id, name = %stored.name, "Product created");
        Ok(stored)
    }

    pub async fn update_product(&self, id: i64, product: &NewProduct) -> DbResult<Product> {
        let product = normalize_product(product)?;
        let mut conn = self.db.acquire().await?;
        Self::require_category(&mut conn, product.category_id).await?;

        let stored = ProductRepository::update(&mut conn, id, &product, self.db.clock().now()).await?;
        info!(id, "Product updated");
        Ok(stored)
    }

    pub async fn delete_product(&self, id: i64) -> DbResult<()> {
        let mut conn = self.db.acquire().await?;
        ProductRepository::delete(&mut conn, id).await?;
        info!(id, "Product deleted");
        Ok(())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let mut conn = self.db.acquire().await?;
        CategoryRepository::list_all(&mut conn).await
    }

    pub async fn get_category(&self, id: i64) -> DbResult<Category> {
        let mut conn = self.db.acquire().await?;
        CategoryRepository::get_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    pub async fn create_category(&self, category: &NewCategory) -> DbResult<Category> {
        let category = normalize_category(category)?;
        let mut conn = self.db.acquire().await?;
        let stored = CategoryRepository::insert(&mut conn, &category).await?;
        info!(id = stored.id, name = %stored.name, "Category created");
        Ok(stored)
    }

    pub async fn update_category(&self, id: i64, category: &NewCategory) -> DbResult<Category> {
        let category = normalize_category(category)?;
        let mut conn = self.db.acquire().await?;
        CategoryRepository::update(&mut conn, id, &category).await
    }

    /// ## Errors
    /// `ForeignKeyViolation` while products are still listed under it.
    pub async fn delete_category(&self, id: i64) -> DbResult<()> {
        let mut conn = self.db.acquire().await?;
        CategoryRepository::delete(&mut conn, id)
            .await
            .map_err(|err| match err {
                DbError::ForeignKeyViolation { .. } => DbError::ForeignKeyViolation {
                    message: format!("category {} still has products", id),
                },
                other => other,
            })?;
        info!(id, "Category deleted");
        Ok(())
    }

    async fn require_category(conn: &mut sqlx::SqliteConnection, id: i64) -> DbResult<()> {
        match CategoryRepository::get_by_id(conn, id).await? {
            Some(_) => Ok(()),
            None => Err(DbError::not_found("Category", id)),
        }
    }
}
