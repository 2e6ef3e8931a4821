use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::core::ErrorCode;
use crate::service::{market as market_math, PriceService};
use crate::store::DbState;

/// Aggregated collateral-vs-debt valuation across a user's positions.
#[derive(Debug, Clone, Copy)]
pub struct AccountService {
    prices: PriceService,
}

impl AccountService {
    pub fn new(prices: PriceService) -> Self {
        Self { prices }
    }

    /// `Σ collaterals * exchange_rate * collateral_factor * price`
    /// `− Σ borrow_balance * price`.
    ///
    /// Collateral rows that cannot be valued (unknown market, no price) are
    /// skipped, which only understates the user's standing. A debt row that
    /// cannot be priced poisons the whole figure instead: callers gate on
    /// `PriceUnavailable` and refuse the action.
    pub fn calculate_liquidity(
        &self,
        state: &DbState,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Decimal, ErrorCode> {
        let mut supply_value = Decimal::ZERO;
        for supply in state.supplies_by_user(user_id) {
            if supply.collaterals.is_zero() {
                continue;
            }
            let Some(market) = state.find_market_by_ctoken(&supply.ctoken_asset_id) else {
                continue;
            };
            let Some(price) = self.prices.current_price(state, &market.asset_id, at) else {
                continue;
            };
            let rate = market_math::exchange_rate(&market);
            supply_value += supply.collaterals * rate * market.collateral_factor * price;
        }

        let mut borrow_value = Decimal::ZERO;
        for borrow in state.borrows_by_user(user_id) {
            if borrow.principal.is_zero() {
                continue;
            }
            let market = state
                .find_market(&borrow.asset_id)
                .ok_or(ErrorCode::PriceUnavailable)?;
            let price = self
                .prices
                .current_price(state, &market.asset_id, at)
                .ok_or(ErrorCode::PriceUnavailable)?;
            borrow_value += borrow.balance_at(market.borrow_index) * price;
        }

        Ok(supply_value - borrow_value)
    }

    /// A position may be seized only while the borrower is under water.
    pub fn seize_allowed(
        &self,
        state: &DbState,
        borrower_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, ErrorCode> {
        let liquidity = self.calculate_liquidity(state, borrower_id, at)?;
        Ok(liquidity < Decimal::ZERO)
    }
}
