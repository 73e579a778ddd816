//! # Auth Service
//!
//! Account registration and password login. Passwords are stored as
//! argon2 PHC strings; a successful login yields an in-memory [`Session`].

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use storefront_core::validation::{validate_email, validate_full_name, validate_password};
use storefront_core::{Role, Session, User};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::UserRepository;

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Checks a password against a stored hash. A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[derive(Debug, Clone)]
pub struct AuthService {
    db: Database,
}

impl AuthService {
    pub fn new(db: Database) -> Self {
        AuthService { db }
    }

    /// Registers a customer account.
    ///
    /// ## Errors
    /// * `Validation` - malformed e-mail, short password, blank name
    /// * `UniqueViolation` - the e-mail is taken (case-insensitive)
    pub async fn register(&self, email: &str, password: &str, full_name: &str) -> DbResult<User> {
        self.create_account(email, password, full_name, Role::Customer).await
    }

    /// Creates an account with any role. Used by seeding and admin tooling.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Role,
    ) -> DbResult<User> {
        let email = validate_email(email)?.to_lowercase();
        validate_password(password)?;
        let full_name = validate_full_name(full_name)?;

        let mut conn = self.db.acquire().await?;
        if UserRepository::get_by_email(&mut conn, &email).await?.is_some() {
            return Err(DbError::duplicate("email", email));
        }

        let hash = hash_password(password)?;
        let user =
            UserRepository::insert(&mut conn, &email, &hash, full_name, role, self.db.clock().now()).await?;

        info!(user_id = user.id, email = %user.email, role = %user.role, "Account created");
        Ok(user)
    }

    /// Verifies credentials and starts a session.
    ///
    /// ## Errors
    /// `InvalidCredentials` for an unknown e-mail or a wrong password.
    pub async fn login(&self, email: &str, password: &str) -> DbResult<Session> {
        let email = email.trim();
        debug!(email = %email, "Login attempt");

        let user = {
            let mut conn = self.db.acquire().await?;
            UserRepository::get_by_email(&mut conn, email).await?
        };

        let user = match user {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => {
                warn!(email = %email, "Login rejected");
                return Err(DbError::InvalidCredentials);
            }
        };

        let session = Session::start(&user, self.db.clock().now());
        info!(user_id = user.id, session = %session.id, "Logged in");
        Ok(session)
    }

    pub async fn get_user(&self, user_id: i64) -> DbResult<User> {
        let mut conn = self.db.acquire().await?;
        UserRepository::get_by_id(&mut conn, user_id)
            .await?
            .ok_or_else(|| DbError::not_found("User", user_id))
    }
}
