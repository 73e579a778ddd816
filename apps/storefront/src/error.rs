//! # API Error Type
//!
//! Unified error type for application commands.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Command Function ── Result<T, ApiError>                               │
//! │         │                                                               │
//! │         ├── CoreError     (cart limits, stock, lifecycle) ──┐          │
//! │         ├── DbError       (not found, duplicates, storage) ─┼─► ApiError
//! │         ├── CheckoutError (place_order) ───────────────────┘          │
//! │         └── Session checks (Forbidden) ─────────────────────────────►  │
//! │                                                                         │
//! │  Presentation layer receives { "code": "EMPTY_CART", "message": ... }  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage failures are logged with their detail and reported with a
//! generic message.

use serde::Serialize;
use storefront_core::CoreError;
use storefront_db::{CheckoutError, DbError};
use tracing::error;

/// Error returned from every command.
///
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Desk Lamp (#4): available 1, requested 3"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Unique value already taken (e-mail, category name)
    Conflict,

    /// Wrong e-mail or password
    Unauthorized,

    /// Session lacks the role or ownership the command needs
    Forbidden,

    InsufficientStock,

    EmptyCart,

    /// Cart limits exceeded
    CartError,

    /// Order status change not allowed by the lifecycle
    InvalidStatus,

    /// Checkout failed after validation and was rolled back
    CheckoutFailed,

    DatabaseError,

    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::EmptyCart => ApiError::new(ErrorCode::EmptyCart, message),
            CoreError::InsufficientStock { .. } => ApiError::new(ErrorCode::InsufficientStock, message),
            CoreError::AmountOverflow { .. } => ApiError::validation(message),
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", id),
            CoreError::CartTooLarge { .. } => ApiError::new(ErrorCode::CartError, message),
            CoreError::QuantityTooLarge { .. } => ApiError::validation(message),
            CoreError::InvalidStatusTransition { .. } => ApiError::new(ErrorCode::InvalidStatus, message),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        if err.is_busy() {
            error!("Database busy: {}", err);
            return ApiError::new(ErrorCode::DatabaseError, "Database is busy, try again");
        }

        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                ApiError::new(ErrorCode::ValidationError, format!("Invalid reference: {}", message))
            }
            DbError::CheckViolation { message } => {
                error!("Check constraint failed: {}", message);
                ApiError::validation("Value out of range")
            }
            DbError::InvalidCredentials => {
                ApiError::new(ErrorCode::Unauthorized, "Invalid e-mail or password")
            }
            DbError::Domain(e) => ApiError::from(e),
            DbError::ConnectionFailed(e) => {
                error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => ApiError::new(ErrorCode::DatabaseError, "Database is busy, try again"),
            DbError::Internal(e) => {
                error!("Internal database error: {}", e);
                ApiError::internal("Internal error")
            }
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        let message = err.to_string();
        match err {
            CheckoutError::UnknownUser(id) => ApiError::not_found("User", id),
            CheckoutError::Validation(e) => ApiError::validation(e.to_string()),
            CheckoutError::EmptyCart => ApiError::new(ErrorCode::EmptyCart, message),
            CheckoutError::InsufficientStock { .. } => ApiError::new(ErrorCode::InsufficientStock, message),
            CheckoutError::AmountOverflow { .. } => ApiError::validation(message),
            CheckoutError::StockUpdateFailed { .. } => ApiError::new(
                ErrorCode::InsufficientStock,
                "Stock changed while placing the order. No changes were made; please review your cart",
            ),
            CheckoutError::OrderHeaderPersistFailed(source)
            | CheckoutError::OrderItemPersistFailed { source, .. }
            | CheckoutError::TransactionAborted(source) => {
                error!(error = %source, "{}", message);
                ApiError::new(
                    ErrorCode::CheckoutFailed,
                    "The order could not be placed and no changes were made",
                )
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::{OrderStatus, ValidationError};

    #[test]
    fn test_serializes_code_and_message() {
        let err = ApiError::from(CoreError::EmptyCart);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "EMPTY_CART");
        assert_eq!(json["message"], "Cart is empty");
    }

    #[test]
    fn test_domain_errors_keep_their_code() {
        let err = ApiError::from(DbError::Domain(CoreError::InvalidStatusTransition {
            order_id: 3,
            from: OrderStatus::Delivered,
            to: OrderStatus::Cancelled,
        }));
        assert_eq!(err.code, ErrorCode::InvalidStatus);

        let err = ApiError::from(DbError::from(ValidationError::Required {
            field: "email".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_storage_detail_is_hidden() {
        let err = ApiError::from(DbError::QueryFailed("disk I/O error at page 7".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("page 7"));

        let err = ApiError::from(CheckoutError::TransactionAborted(DbError::Internal(
            "boom".to_string(),
        )));
        assert_eq!(err.code, ErrorCode::CheckoutFailed);
        assert!(!err.message.contains("boom"));
    }

    #[test]
    fn test_locked_database_reads_as_busy() {
        let err = ApiError::from(DbError::QueryFailed("database is locked".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database is busy, try again");
    }

    #[test]
    fn test_checkout_refusals() {
        let err = ApiError::from(CheckoutError::InsufficientStock {
            product_id: 4,
            name: "Desk Lamp".to_string(),
            available: 1,
            requested: 3,
        });
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("Desk Lamp"));

        let err = ApiError::from(CheckoutError::StockUpdateFailed {
            product_id: 4,
            requested: 3,
        });
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(ApiError::from(DbError::InvalidCredentials).code, ErrorCode::Unauthorized);
    }
}
