//! # Unit of Work
//!
//! A scoped database transaction.
//!
//! ```text
//! let mut uow = db.begin("checkout").await?;
//!      │
//!      ├── OrderRepository::create_header(uow.conn(), ..)?
//!      ├── ProductRepository::decrement_stock(uow.conn(), ..)?
//!      ├── ...
//!      ▼
//! uow.commit().await?          ← only path that persists anything
//!
//! Early return / `?` / panic / future dropped
//!      └──► UnitOfWork dropped ──► ROLLBACK
//! ```
//!
//! `commit` consumes the unit of work, so nothing can run against it after
//! it has been committed.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// An open transaction that rolls back unless [`UnitOfWork::commit`] runs.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    guard: RollbackGuard,
}

/// Logs when a unit of work ends without a commit. The rollback itself is
/// issued by `sqlx::Transaction`'s own drop.
struct RollbackGuard {
    label: &'static str,
    armed: bool,
}

impl Drop for RollbackGuard {
    fn drop(&mut self) {
        if self.armed {
            warn!(unit = self.label, "Unit of work dropped without commit; rolling back");
        }
    }
}

impl UnitOfWork {
    /// Starts a deferred transaction on a pooled connection.
    ///
    /// The write lock is taken by the first write statement, so callers that
    /// need to wait for competing writers should write first.
    pub async fn begin(pool: &SqlitePool, label: &'static str) -> DbResult<Self> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(unit = label, "Unit of work started");

        Ok(UnitOfWork {
            tx,
            guard: RollbackGuard { label, armed: true },
        })
    }

    /// The transaction's connection, for store calls.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    /// Commits every statement run through [`UnitOfWork::conn`].
    ///
    /// On failure the transaction is rolled back and the error returned.
    pub async fn commit(self) -> DbResult<()> {
        let UnitOfWork { tx, mut guard } = self;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        guard.armed = false;
        debug!(unit = guard.label, "Unit of work committed");
        Ok(())
    }

    /// Rolls back explicitly instead of waiting for drop.
    pub async fn rollback(self) -> DbResult<()> {
        let UnitOfWork { tx, mut guard } = self;
        guard.armed = false;

        tx.rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(unit = guard.label, "Unit of work rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn count_categories(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn insert_category(conn: &mut SqliteConnection, name: &str) {
        sqlx::query("INSERT INTO categories (name) VALUES (?1)")
            .bind(name)
            .execute(conn)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin("test").await.unwrap();
        insert_category(uow.conn(), "Books").await;
        uow.commit().await.unwrap();

        assert_eq!(count_categories(&db).await, 1);
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        {
            let mut uow = db.begin("test").await.unwrap();
            insert_category(uow.conn(), "Books").await;
        }

        assert_eq!(count_categories(&db).await, 0);
    }

    #[tokio::test]
    async fn test_explicit_rollback() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin("test").await.unwrap();
        insert_category(uow.conn(), "Books").await;
        uow.rollback().await.unwrap();

        assert_eq!(count_categories(&db).await, 0);
    }
}
