use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One provider's price submission for an asset in a price block. The
/// effective price of the block is the median over providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTicker {
    pub asset_id: String,
    pub symbol: String,
    /// Time bucket the submission belongs to.
    pub price_block: i64,
    /// Member (or oracle node) that provided the price.
    pub provider: String,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}
