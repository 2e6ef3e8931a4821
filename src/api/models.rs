use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub markets: usize,
    pub outputs_checkpoint: i64,
}

/// Market snapshot with rates computed from the current balances.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MarketView {
    pub asset_id: String,
    pub ctoken_asset_id: String,
    pub symbol: String,
    pub status: String,
    pub total_cash: Decimal,
    pub total_borrows: Decimal,
    pub reserves: Decimal,
    pub ctokens: Decimal,
    pub exchange_rate: Decimal,
    pub utilization_rate: Decimal,
    pub borrow_rate: Decimal,
    pub supply_rate: Decimal,
    pub borrow_index: Decimal,
    pub collateral_factor: Decimal,
    pub close_factor: Decimal,
    pub liquidation_incentive: Decimal,
    pub borrow_cap: Decimal,
    pub price: Option<Decimal>,
    pub block_number: i64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LiquidityResponse {
    pub user_id: String,
    pub liquidity: Option<Decimal>,
    /// Set when the liquidity is unknown, e.g. an unpriced debt position.
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Clone)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}
