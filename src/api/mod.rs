use std::sync::Arc;

pub mod accounts;
pub mod health;
pub mod markets;
pub mod models;

use crate::service::{AccountService, PriceService};
use crate::store::Db;

/// Central application state shared by all read-only handlers.
#[derive(Clone)]
pub struct ApiState {
    pub db: Db,
    pub prices: PriceService,
    pub accounts: AccountService,
}

impl ApiState {
    pub fn new(db: Db, prices: PriceService, accounts: AccountService) -> Self {
        Self {
            db,
            prices,
            accounts,
        }
    }
}

pub fn routes() -> axum::Router<Arc<ApiState>> {
    axum::Router::new()
        .nest("/health", health::routes())
        .nest("/markets", markets::routes())
        .nest("/accounts", accounts::routes())
}
