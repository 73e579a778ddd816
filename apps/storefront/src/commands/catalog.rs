//! # Catalog Commands
//!
//! Browsing is open to everyone. Edits need an admin session.

use serde::Serialize;
use storefront_core::{Category, NewCategory, NewProduct, Product, Session};
use tracing::debug;

use super::{require_admin, CommandResult};
use crate::state::AppState;

/// A product as the catalog shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    /// Price with the shop's currency symbol.
    pub price_display: String,
    pub in_stock: bool,
}

impl ProductView {
    fn new(state: &AppState, product: Product) -> Self {
        ProductView {
            price_display: state.format_money(product.price()),
            in_stock: !product.is_out_of_stock(),
            product,
        }
    }
}

fn views(state: &AppState, products: Vec<Product>) -> Vec<ProductView> {
    products.into_iter().map(|p| ProductView::new(state, p)).collect()
}

pub async fn list_products(state: &AppState) -> CommandResult<Vec<ProductView>> {
    let products = state.db.catalog().list_products().await?;
    Ok(views(state, products))
}

/// Case-insensitive search over name and description.
pub async fn search_products(state: &AppState, query: &str) -> CommandResult<Vec<ProductView>> {
    debug!(query = %query, "search_products command");
    let products = state.db.catalog().search_products(query).await?;
    Ok(views(state, products))
}

pub async fn products_in_category(state: &AppState, category_id: i64) -> CommandResult<Vec<ProductView>> {
    let products = state.db.catalog().products_in_category(category_id).await?;
    Ok(views(state, products))
}

pub async fn get_product(state: &AppState, product_id: i64) -> CommandResult<ProductView> {
    let product = state.db.catalog().get_product(product_id).await?;
    Ok(ProductView::new(state, product))
}

pub async fn list_categories(state: &AppState) -> CommandResult<Vec<Category>> {
    Ok(state.db.catalog().list_categories().await?)
}

// =============================================================================
// Admin
// =============================================================================

pub async fn create_product(
    state: &AppState,
    session: &Session,
    product: NewProduct,
) -> CommandResult<ProductView> {
    require_admin(session)?;
    let product = state.db.catalog().create_product(&product).await?;
    Ok(ProductView::new(state, product))
}

pub async fn update_product(
    state: &AppState,
    session: &Session,
    product_id: i64,
    product: NewProduct,
) -> CommandResult<ProductView> {
    require_admin(session)?;
    let product = state.db.catalog().update_product(product_id, &product).await?;
    Ok(ProductView::new(state, product))
}

pub async fn delete_product(state: &AppState, session: &Session, product_id: i64) -> CommandResult<()> {
    require_admin(session)?;
    Ok(state.db.catalog().delete_product(product_id).await?)
}

pub async fn create_category(
    state: &AppState,
    session: &Session,
    category: NewCategory,
) -> CommandResult<Category> {
    require_admin(session)?;
    Ok(state.db.catalog().create_category(&category).await?)
}

pub async fn update_category(
    state: &AppState,
    session: &Session,
    category_id: i64,
    category: NewCategory,
) -> CommandResult<Category> {
    require_admin(session)?;
    Ok(state.db.catalog().update_category(category_id, &category).await?)
}

pub async fn delete_category(state: &AppState, session: &Session, category_id: i64) -> CommandResult<()> {
    require_admin(session)?;
    Ok(state.db.catalog().delete_category(category_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support;
    use storefront_core::Role;

    fn lamp(category_id: i64) -> NewProduct {
        NewProduct {
            category_id,
            name: "Desk Lamp".to_string(),
            description: Some("Warm light".to_string()),
            price_cents: 2499,
            stock_quantity: 0,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_admin_edits_and_public_reads() {
        let state = test_support::state().await;
        let admin = test_support::session(&state, "root@example.com", Role::Admin).await;

        let category = create_category(
            &state,
            &admin,
            NewCategory {
                name: "Lighting".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
        let view = create_product(&state, &admin, lamp(category.id)).await.unwrap();
        assert_eq!(view.price_display, "$24.99");
        assert!(!view.in_stock);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["name"], "Desk Lamp");
        assert_eq!(json["priceCents"], 2499);
        assert_eq!(json["priceDisplay"], "$24.99");

        assert_eq!(search_products(&state, "WARM").await.unwrap().len(), 1);
        assert_eq!(products_in_category(&state, category.id).await.unwrap().len(), 1);
        assert_eq!(list_categories(&state).await.unwrap().len(), 1);

        let err = delete_category(&state, &admin, category.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        delete_product(&state, &admin, view.product.id).await.unwrap();
        assert_eq!(
            get_product(&state, view.product.id).await.unwrap_err().code,
            ErrorCode::NotFound
        );
    }

    #[tokio::test]
    async fn test_customers_cannot_edit() {
        let state = test_support::state().await;
        let ann = test_support::session(&state, "ann@example.com", Role::Customer).await;
        let product_id = test_support::product(&state, "Desk Lamp", 1000, 5).await;

        let err = update_product(&state, &ann, product_id, lamp(1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        let err = delete_product(&state, &ann, product_id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        assert_eq!(list_products(&state).await.unwrap().len(), 1);
    }
}
