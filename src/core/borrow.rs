use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Debt position, keyed by (user, underlying asset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Borrow {
    pub user_id: String,
    pub asset_id: String,
    /// Underlying owed as of `interest_index`.
    pub principal: Decimal,
    /// Snapshot of the market borrow index at the last principal update.
    pub interest_index: Decimal,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Borrow {
    pub fn new(user_id: &str, asset_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            asset_id: asset_id.to_string(),
            principal: Decimal::ZERO,
            interest_index: Decimal::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Debt scaled forward to the given market borrow index:
    /// `principal * borrow_index / interest_index`.
    pub fn balance_at(&self, borrow_index: Decimal) -> Decimal {
        if self.principal.is_zero() || self.interest_index.is_zero() {
            return Decimal::ZERO;
        }
        self.principal * borrow_index / self.interest_index
    }
}
