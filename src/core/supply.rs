use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Collateral position, keyed by (user, ctoken asset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supply {
    pub user_id: String,
    pub ctoken_asset_id: String,
    /// CTokens pledged as collateral. Never negative.
    pub collaterals: Decimal,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Supply {
    pub fn new(user_id: &str, ctoken_asset_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            ctoken_asset_id: ctoken_asset_id.to_string(),
            collaterals: Decimal::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
