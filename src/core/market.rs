use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Closed,
}

/// Per-asset money market. Totals are custodial balances; the rate
/// parameters are per-year and divided down to per-block on use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub asset_id: String,
    pub ctoken_asset_id: String,
    pub symbol: String,
    /// Liquid underlying held by the pool.
    pub total_cash: Decimal,
    /// Outstanding principal plus accrued interest.
    pub total_borrows: Decimal,
    /// Protocol fee share, carved out of accrued interest.
    pub reserves: Decimal,
    /// CTokens minted and outstanding.
    pub ctokens: Decimal,
    /// Cumulative interest accumulator, starts at 1 and never decreases.
    pub borrow_index: Decimal,
    pub init_exchange_rate: Decimal,
    pub reserve_factor: Decimal,
    pub collateral_factor: Decimal,
    pub close_factor: Decimal,
    pub liquidation_incentive: Decimal,
    pub base_rate: Decimal,
    pub multiplier: Decimal,
    pub jump_multiplier: Decimal,
    pub kink: Decimal,
    /// Upper bound on total_borrows; zero disables the cap.
    pub borrow_cap: Decimal,
    /// Block of the last interest accrual.
    pub block_number: i64,
    pub status: MarketStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Market {
    pub fn is_open(&self) -> bool {
        self.status == MarketStatus::Open
    }
}
