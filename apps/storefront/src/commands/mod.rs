//! # Commands
//!
//! One async function per user action. Every command takes the shared
//! [`AppState`](crate::AppState); commands that act for a user also take the
//! caller's [`Session`].
//!
//! ## Access Rules
//! | Commands                          | Who                         |
//! |-----------------------------------|-----------------------------|
//! | auth, catalog reads               | anyone                      |
//! | cart, place_order, my_orders      | the session's own user      |
//! | order_details                     | the order's owner or admin  |
//! | catalog writes, order admin       | admin                       |

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

use storefront_core::Session;
use tracing::warn;

use crate::error::ApiError;

pub type CommandResult<T> = Result<T, ApiError>;

/// Fails with `Forbidden` unless the session belongs to an admin.
pub fn require_admin(session: &Session) -> CommandResult<()> {
    if session.is_admin() {
        Ok(())
    } else {
        warn!(user_id = session.user_id, "Admin command refused");
        Err(ApiError::forbidden("Administrator access required"))
    }
}
