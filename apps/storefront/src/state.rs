//! # Application State
//!
//! Everything a command needs, created once by [`crate::bootstrap`] and
//! shared by reference. There is no "current user" here: the caller passes
//! the [`Session`](storefront_core::Session) it holds to each command.

use storefront_core::Money;
use storefront_db::{CartService, Database};

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        AppState { db, config }
    }

    /// Cart service with the configured limits.
    pub fn carts(&self) -> CartService {
        self.db.carts().with_limits(self.config.cart_limits())
    }

    /// Formats an amount with the shop's currency symbol.
    pub fn format_money(&self, amount: Money) -> String {
        amount.format_with(&self.config.shop.currency_symbol)
    }
}
