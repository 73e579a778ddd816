//! # Order Commands
//!
//! Checkout, order history, and order administration.
//!
//! ## Checkout Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order(&state, &session, "1 Main St")                            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  CheckoutService::place_order ── validate, then one unit of work       │
//! │         │                                                               │
//! │         ├── Ok(placed) ──► PlaceOrderResponse { orderId, total, ... }   │
//! │         │                                                               │
//! │         └── Err ──► ApiError { EMPTY_CART | INSUFFICIENT_STOCK |        │
//! │                                VALIDATION_ERROR | CHECKOUT_FAILED }     │
//! │                     nothing was written                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use storefront_core::{Order, OrderHeader, OrderStatus, Session};
use storefront_db::PlacedOrder;
use tracing::info;

use super::{require_admin, CommandResult};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub shipping_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub order_id: i64,
    pub status: OrderStatus,
    pub item_count: i64,
    pub total_cents: i64,
    pub total_display: String,
}

/// Turns the session user's cart into an order.
///
/// The response is built from what checkout committed, so once the order
/// exists this command reports success.
pub async fn place_order(
    state: &AppState,
    session: &Session,
    request: PlaceOrderRequest,
) -> CommandResult<PlaceOrderResponse> {
    let placed = state
        .db
        .checkout()
        .place_order(session.user_id, &request.shipping_address)
        .await?;

    info!(order_id = placed.order_id, user_id = session.user_id, "place_order command succeeded");

    Ok(PlaceOrderResponse::from_placed(state, &placed))
}

impl PlaceOrderResponse {
    fn from_placed(state: &AppState, placed: &PlacedOrder) -> Self {
        PlaceOrderResponse {
            order_id: placed.order_id,
            status: placed.status,
            item_count: placed.item_count,
            total_cents: placed.total.cents(),
            total_display: state.format_money(placed.total),
        }
    }
}

/// The session user's orders, newest first.
pub async fn my_orders(state: &AppState, session: &Session) -> CommandResult<Vec<Order>> {
    Ok(state.db.orders().user_orders(session.user_id).await?)
}

/// One order with its lines. Visible to its owner and to admins.
///
/// Another customer's order reads as missing, the same as an unknown id.
pub async fn order_details(state: &AppState, session: &Session, order_id: i64) -> CommandResult<Order> {
    let order = state.db.orders().order_details(order_id).await?;
    if order.header.user_id != session.user_id && !session.is_admin() {
        return Err(ApiError::not_found("Order", order_id));
    }
    Ok(order)
}

/// Cancels an order. Customers may cancel their own pending orders;
/// admins may cancel any pending or processing order.
pub async fn cancel_order(state: &AppState, session: &Session, order_id: i64) -> CommandResult<OrderHeader> {
    let orders = state.db.orders();
    let header = if session.is_admin() {
        orders.cancel(order_id).await?
    } else {
        orders.cancel_by_customer(session.user_id, order_id).await?
    };
    Ok(header)
}

// =============================================================================
// Admin
// =============================================================================

pub async fn all_orders(state: &AppState, session: &Session) -> CommandResult<Vec<Order>> {
    require_admin(session)?;
    Ok(state.db.orders().all_orders().await?)
}

pub async fn update_order_status(
    state: &AppState,
    session: &Session,
    order_id: i64,
    status: OrderStatus,
) -> CommandResult<OrderHeader> {
    require_admin(session)?;
    Ok(state.db.orders().update_status(order_id, status).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::{add_to_cart, get_cart};
    use crate::error::ErrorCode;
    use crate::test_support;
    use storefront_core::Role;

    fn ship_to(address: &str) -> PlaceOrderRequest {
        PlaceOrderRequest {
            shipping_address: address.to_string(),
        }
    }

    #[tokio::test]
    async fn test_place_order() {
        let state = test_support::state().await;
        let ann = test_support::session(&state, "ann@example.com", Role::Customer).await;
        let lamp = test_support::product(&state, "Desk Lamp", 1000, 5).await;

        add_to_cart(&state, &ann, lamp, 3).await.unwrap();
        let placed = place_order(&state, &ann, ship_to("1 Main St")).await.unwrap();
        assert_eq!(placed.status, OrderStatus::Pending);
        assert_eq!(placed.item_count, 3);
        assert_eq!(placed.total_cents, 3000);
        assert_eq!(placed.total_display, "$30.00");

        let stored = order_details(&state, &ann, placed.order_id).await.unwrap();
        assert_eq!(placed.total_cents, stored.header.total_cents);
        assert_eq!(placed.item_count, stored.item_count());

        let json = serde_json::to_value(&placed).unwrap();
        assert_eq!(json["orderId"], placed.order_id);
        assert_eq!(json["status"], "Pending");

        assert!(get_cart(&state, &ann).await.unwrap().lines.is_empty());
        assert_eq!(my_orders(&state, &ann).await.unwrap().len(), 1);
        assert_eq!(
            state.db.catalog().get_product(lamp).await.unwrap().stock_quantity,
            2
        );
    }

    #[tokio::test]
    async fn test_place_order_refusals() {
        let state = test_support::state().await;
        let ann = test_support::session(&state, "ann@example.com", Role::Customer).await;
        let lamp = test_support::product(&state, "Desk Lamp", 1000, 5).await;

        let err = place_order(&state, &ann, ship_to("1 Main St")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyCart);

        add_to_cart(&state, &ann, lamp, 1).await.unwrap();
        let err = place_order(&state, &ann, ship_to("  ")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(get_cart(&state, &ann).await.unwrap().item_count, 1);
    }

    #[tokio::test]
    async fn test_order_visibility_and_admin() {
        let state = test_support::state().await;
        let ann = test_support::session(&state, "ann@example.com", Role::Customer).await;
        let bob = test_support::session(&state, "bob@example.com", Role::Customer).await;
        let admin = test_support::session(&state, "root@example.com", Role::Admin).await;
        let lamp = test_support::product(&state, "Desk Lamp", 1000, 5).await;

        add_to_cart(&state, &ann, lamp, 2).await.unwrap();
        let order_id = place_order(&state, &ann, ship_to("1 Main St")).await.unwrap().order_id;

        assert_eq!(order_details(&state, &ann, order_id).await.unwrap().id(), order_id);
        assert_eq!(order_details(&state, &admin, order_id).await.unwrap().id(), order_id);

        // A foreign order and a missing one look the same.
        let foreign = order_details(&state, &bob, order_id).await.unwrap_err();
        let missing = order_details(&state, &bob, order_id + 100).await.unwrap_err();
        assert_eq!(foreign.code, ErrorCode::NotFound);
        assert_eq!(missing.code, ErrorCode::NotFound);
        assert_eq!(foreign.message, ApiError::not_found("Order", order_id).message);

        assert_eq!(all_orders(&state, &bob).await.unwrap_err().code, ErrorCode::Forbidden);
        assert_eq!(all_orders(&state, &admin).await.unwrap().len(), 1);

        let header = update_order_status(&state, &admin, order_id, OrderStatus::Processing)
            .await
            .unwrap();
        assert_eq!(header.status, OrderStatus::Processing);

        // Too late for the customer, not for the admin
        assert_eq!(
            cancel_order(&state, &ann, order_id).await.unwrap_err().code,
            ErrorCode::InvalidStatus
        );
        let header = cancel_order(&state, &admin, order_id).await.unwrap();
        assert_eq!(header.status, OrderStatus::Cancelled);
        assert_eq!(
            state.db.catalog().get_product(lamp).await.unwrap().stock_quantity,
            5
        );
    }
}
