// tests/common/mod.rs
#![allow(dead_code)]

use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use storefront_core::{NewCategory, NewProduct, Role};
use storefront_db::{CartRepository, CategoryRepository, Database, DbConfig, ProductRepository, UserRepository};
use uuid::Uuid;

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A file-backed database in the temp dir, for tests that need several
/// connections at once.
pub struct TempDb {
    pub db: Database,
    path: PathBuf,
}

impl TempDb {
    pub async fn new() -> Self {
        let path = std::env::temp_dir().join(format!("storefront-test-{}.db", Uuid::new_v4()));
        let config = DbConfig::new(&path)
            .max_connections(8)
            .busy_timeout(Duration::from_secs(10));
        let db = Database::new(config).await.unwrap();
        TempDb { db, path }
    }

    pub async fn close(self) {
        self.db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

pub async fn user(db: &Database, email: &str) -> i64 {
    let mut conn = db.acquire().await.unwrap();
    UserRepository::insert(&mut conn, email, "not-a-hash", "Test User", Role::Customer, Utc::now())
        .await
        .unwrap()
        .id
}

pub async fn product(db: &Database, name: &str, price_cents: i64, stock_quantity: i64) -> i64 {
    let mut conn = db.acquire().await.unwrap();
    let category = match CategoryRepository::list_all(&mut conn).await.unwrap().first() {
        Some(category) => category.id,
        None => {
            CategoryRepository::insert(
                &mut conn,
                &NewCategory {
                    name: "General".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap()
            .id
        }
    };

    ProductRepository::insert(
        &mut conn,
        &NewProduct {
            category_id: category,
            name: name.to_string(),
            description: None,
            price_cents,
            stock_quantity,
            image_url: None,
        },
        Utc::now(),
    )
    .await
    .unwrap()
    .id
}

/// Puts a line in the cart without the cart service's stock check.
pub async fn put_in_cart(db: &Database, user_id: i64, product_id: i64, quantity: i64) {
    let mut conn = db.acquire().await.unwrap();
    CartRepository::upsert_line(&mut conn, user_id, product_id, quantity, Utc::now())
        .await
        .unwrap();
}

pub async fn stock(db: &Database, product_id: i64) -> i64 {
    let mut conn = db.acquire().await.unwrap();
    ProductRepository::get_stock(&mut conn, product_id).await.unwrap()
}

pub async fn cart_size(db: &Database, user_id: i64) -> usize {
    let mut conn = db.acquire().await.unwrap();
    CartRepository::list_lines(&mut conn, user_id).await.unwrap().len()
}

pub async fn order_count(db: &Database) -> i64 {
    let mut conn = db.acquire().await.unwrap();
    storefront_db::OrderRepository::count(&mut conn).await.unwrap()
}

/// Runs raw SQL, e.g. to install a trigger that makes a later step fail.
pub async fn execute(db: &Database, sql: &str) {
    let mut conn = db.acquire().await.unwrap();
    sqlx::query(sql).execute(&mut *conn).await.unwrap();
}
