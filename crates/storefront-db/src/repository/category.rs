//! # Category Repository
//!
//! Categories group products. Names are unique (case-insensitive) and a
//! category cannot be deleted while products still reference it.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::{Category, NewCategory};

#[derive(Debug, Clone, Copy)]
pub struct CategoryRepository;

impl CategoryRepository {
    pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(category)
    }

    /// All categories sorted by name.
    pub async fn list_all(conn: &mut SqliteConnection) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories ORDER BY name",
        )
        .fetch_all(conn)
        .await?;

        Ok(categories)
    }

    /// Inserts a category.
    ///
    /// ## Errors
    /// `UniqueViolation` on the name when it is already taken.
    pub async fn insert(conn: &mut SqliteConnection, category: &NewCategory) -> DbResult<Category> {
        debug!(name = %category.name, "Inserting category");

        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description)
            VALUES (?1, ?2)
            RETURNING id, name, description
            "#,
        )
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("category name", &category.name),
            other => other,
        })
    }

    pub async fn update(
        conn: &mut SqliteConnection,
        id: i64,
        category: &NewCategory,
    ) -> DbResult<Category> {
        debug!(id, name = %category.name, "Updating category");

        let stored = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET name = ?2, description = ?3
            WHERE id = ?1
            RETURNING id, name, description
            "#,
        )
        .bind(id)
        .bind(&category.name)
        .bind(&category.description)
        .fetch_optional(conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("category name", &category.name),
            other => other,
        })?;

        stored.ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Deletes a category.
    ///
    /// ## Errors
    /// `ForeignKeyViolation` while products are still listed under it.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
        debug!(id, "Deleting category");

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::ProductRepository;
    use chrono::Utc;
    use storefront_core::NewProduct;

    fn named(name: &str) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_names_are_unique_ignoring_case() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        CategoryRepository::insert(&mut conn, &named("Books")).await.unwrap();
        let err = CategoryRepository::insert(&mut conn, &named("books")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "books"));
    }

    #[tokio::test]
    async fn test_list_sorted_and_update() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let toys = CategoryRepository::insert(&mut conn, &named("Toys")).await.unwrap();
        CategoryRepository::insert(&mut conn, &named("Audio")).await.unwrap();

        let names: Vec<_> = CategoryRepository::list_all(&mut conn)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Audio", "Toys"]);

        let renamed = CategoryRepository::update(&mut conn, toys.id, &named("Games"))
            .await
            .unwrap();
        assert_eq!(renamed.name, "Games");
        assert!(matches!(
            CategoryRepository::update(&mut conn, 999, &named("X")).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_refused_while_in_use() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let category = CategoryRepository::insert(&mut conn, &named("Lighting")).await.unwrap();
        let product = ProductRepository::insert(
            &mut conn,
            &NewProduct {
                category_id: category.id,
                name: "Desk Lamp".to_string(),
                description: None,
                price_cents: 1000,
                stock_quantity: 1,
                image_url: None,
            },
            Utc::now(),
        )
        .await
        .unwrap();

        assert!(matches!(
            CategoryRepository::delete(&mut conn, category.id).await,
            Err(DbError::ForeignKeyViolation { .. })
        ));

        ProductRepository::delete(&mut conn, product.id).await.unwrap();
        CategoryRepository::delete(&mut conn, category.id).await.unwrap();
        assert!(CategoryRepository::get_by_id(&mut conn, category.id).await.unwrap().is_none());
    }
}
