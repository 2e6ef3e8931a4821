use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::core::{ActionType, ErrorCode, Output};
use crate::service::market as market_math;
use crate::store::{StoreError, StoreTx};
use crate::worker::payee::Payee;

impl Payee {
    /// User sends CTokens back; the pool pays out underlying at the current
    /// exchange rate, provided the cash is there and the account stays
    /// solvent without the redeemed collateral.
    pub(super) fn handle_redeem(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        user_id: &str,
        follow_id: Uuid,
    ) -> Result<(), StoreError> {
        let refund_src = ActionType::RefundTransfer;
        let Some(mut market) = tx.find_market_by_ctoken(&output.asset_id) else {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::MarketNotFound, "");
        };
        if !market.is_open() {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::MarketClosed, "");
        }
        market_math::accrue_interest(tx, &mut market, output.created_at)?;

        let ctokens_in = output.amount;
        let rate = market_math::exchange_rate(&market);
        if rate <= Decimal::ZERO || ctokens_in <= Decimal::ZERO {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::InvalidArgument, "");
        }
        let amount_out = (ctokens_in * rate).trunc_with_scale(8);
        if amount_out > market.total_cash {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::InsufficientCash, "");
        }

        let Some(mut supply) = tx.find_supply(user_id, &market.ctoken_asset_id) else {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::SupplyNotFound, "");
        };
        if supply.collaterals < ctokens_in {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::InvalidArgument, "");
        }

        // Redeeming burns collateral; with open debt, the remainder must
        // still cover it.
        if self.has_active_borrows(tx, user_id) {
            let liquidity = match self.account.calculate_liquidity(tx, user_id, output.created_at) {
                Ok(l) => l,
                Err(code) => {
                    return self.refund(tx, output, user_id, follow_id, refund_src, code, "");
                }
            };
            let Some(price) = self.prices.current_price(tx, &market.asset_id, output.created_at)
            else {
                return self.refund(
                    tx, output, user_id, follow_id, refund_src,
                    ErrorCode::PriceUnavailable, "",
                );
            };
            let redeemed_value = ctokens_in * rate * market.collateral_factor * price;
            if liquidity - redeemed_value < Decimal::ZERO {
                return self.refund(
                    tx, output, user_id, follow_id, refund_src,
                    ErrorCode::InsufficientLiquidity, "",
                );
            }
        }

        supply.collaterals = (supply.collaterals - ctokens_in).trunc_with_scale(16);
        tx.update_supply(&mut supply)?;

        market.ctokens = (market.ctokens - ctokens_in).trunc_with_scale(16);
        market.total_cash = (market.total_cash - amount_out).trunc_with_scale(16);
        tx.update_market(&mut market)?;

        self.transfer_out(
            tx,
            output,
            user_id,
            follow_id,
            &market.asset_id,
            amount_out,
            ActionType::RedeemTransfer,
        )?;

        info!(
            user = user_id,
            symbol = %market.symbol,
            ctokens = %ctokens_in,
            amount = %amount_out,
            "redeemed"
        );
        Ok(())
    }
}
