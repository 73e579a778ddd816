//! # Cart Commands
//!
//! The cart lives in the database, keyed by the session's user, so it
//! survives restarts and is what checkout reads.
//!
//! ## Cart Lifecycle
//! ```text
//!  ┌──────────┐  add_to_cart   ┌──────────┐  place_order   ┌──────────┐
//!  │  Empty   │───────────────►│ In Cart  │───────────────►│  Order   │
//!  └──────────┘                └──────────┘  (orders.rs)   └──────────┘
//!       ▲                        │      ▲
//!       │   clear_cart           │      │ update_cart_line
//!       └────────────────────────┘      │ remove_cart_line
//!                                       └───────────────
//! ```

use serde::Serialize;
use storefront_core::{CartLineDetail, Money, Session};
use tracing::debug;

use super::CommandResult;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub lines: Vec<CartLineDetail>,
    pub item_count: i64,
    pub total_cents: i64,
    pub total_display: String,
}

/// The session user's cart at live prices.
pub async fn get_cart(state: &AppState, session: &Session) -> CommandResult<CartResponse> {
    let cart = state.carts().get_cart(session.user_id).await?;
    Ok(CartResponse {
        total_display: state.format_money(Money::from_cents(cart.total_cents)),
        lines: cart.lines,
        item_count: cart.item_count,
        total_cents: cart.total_cents,
    })
}

/// Adds a product, merging with an existing line for it.
pub async fn add_to_cart(
    state: &AppState,
    session: &Session,
    product_id: i64,
    quantity: i64,
) -> CommandResult<CartResponse> {
    debug!(user_id = session.user_id, product_id, quantity, "add_to_cart command");
    state.carts().add(session.user_id, product_id, quantity).await?;
    get_cart(state, session).await
}

/// Sets a line's quantity; zero or less removes the line.
pub async fn update_cart_line(
    state: &AppState,
    session: &Session,
    line_id: i64,
    quantity: i64,
) -> CommandResult<CartResponse> {
    state.carts().update_line(session.user_id, line_id, quantity).await?;
    get_cart(state, session).await
}

pub async fn remove_cart_line(state: &AppState, session: &Session, line_id: i64) -> CommandResult<CartResponse> {
    state.carts().remove_line(session.user_id, line_id).await?;
    get_cart(state, session).await
}

pub async fn clear_cart(state: &AppState, session: &Session) -> CommandResult<CartResponse> {
    state.carts().clear(session.user_id).await?;
    get_cart(state, session).await
}
