//! # User Repository
//!
//! Account rows. E-mail addresses are unique and compared case-insensitively
//! (the column is `COLLATE NOCASE`).

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::{Role, User};

#[derive(Debug, Clone, Copy)]
pub struct UserRepository;

impl UserRepository {
    pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, role, created_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(user)
    }

    pub async fn get_by_email(conn: &mut SqliteConnection, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, role, created_at
            FROM users
            WHERE email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(conn)
        .await?;

        Ok(user)
    }

    pub async fn exists(conn: &mut SqliteConnection, id: i64) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(found.is_some())
    }

    /// Inserts an account. `password_hash` must already be hashed.
    ///
    /// ## Errors
    /// `UniqueViolation` when the e-mail is already registered.
    pub async fn insert(
        conn: &mut SqliteConnection,
        email: &str,
        password_hash: &str,
        full_name: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> DbResult<User> {
        debug!(email = %email, role = %role, "Inserting user");

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, full_name, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, email, password_hash, full_name, role, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(role)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("email", email),
            other => other,
        })
    }
}
