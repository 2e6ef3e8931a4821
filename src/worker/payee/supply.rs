use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::codec::Scanner;
use crate::core::{ActionType, ErrorCode, Output, Supply};
use crate::service::market as market_math;
use crate::store::{StoreError, StoreTx};
use crate::worker::payee::Payee;

impl Payee {
    /// User sends underlying; CTokens are minted at the current exchange
    /// rate and pledged as collateral in one step.
    pub(super) fn handle_supply(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        user_id: &str,
        follow_id: Uuid,
    ) -> Result<(), StoreError> {
        let refund_src = ActionType::RefundTransfer;
        let Some(mut market) = tx.find_market(&output.asset_id) else {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::MarketNotFound, "");
        };
        if !market.is_open() {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::MarketClosed, "");
        }
        market_math::accrue_interest(tx, &mut market, output.created_at)?;

        let rate = market_math::exchange_rate(&market);
        if rate <= Decimal::ZERO {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::InvalidArgument, "");
        }
        let ctokens = (output.amount / rate).trunc_with_scale(16);
        if ctokens <= Decimal::ZERO {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::InvalidArgument, "");
        }

        market.total_cash = (market.total_cash + output.amount).trunc_with_scale(16);
        market.ctokens = (market.ctokens + ctokens).trunc_with_scale(16);
        tx.update_market(&mut market)?;

        self.credit_collateral(tx, user_id, &market.ctoken_asset_id, ctokens)?;

        info!(
            user = user_id,
            symbol = %market.symbol,
            amount = %output.amount,
            ctokens = %ctokens,
            "supplied"
        );
        Ok(())
    }

    /// User sends already-minted CTokens to pledge them as collateral.
    pub(super) fn handle_pledge(
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

        let ctokens = output.amount.trunc_with_scale(16);
        if ctokens <= Decimal::ZERO {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::InvalidArgument, "");
        }
        self.credit_collateral(tx, user_id, &market.ctoken_asset_id, ctokens)?;

        info!(user = user_id, symbol = %market.symbol, ctokens = %ctokens, "pledged");
        Ok(())
    }

    /// Release pledged CTokens. The action rides on a dust CToken payment;
    /// the payload optionally carries the amount to release (default: all).
    /// Released collateral and the dust return in a single transfer.
    pub(super) fn handle_unpledge(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        user_id: &str,
        follow_id: Uuid,
        body: &[u8],
    ) -> Result<(), StoreError> {
        let refund_src = ActionType::RefundTransfer;
        let requested = if body.is_empty() {
            None
        } else {
            match Scanner::new(body).read_decimal() {
                Ok(d) => Some(d),
                Err(_) => {
                    return self.refund(
                        tx, output, user_id, follow_id, refund_src,
                        ErrorCode::InvalidArgument, "",
                    );
                }
            }
        };

        let Some(mut market) = tx.find_market_by_ctoken(&output.asset_id) else {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::MarketNotFound, "");
        };
        if !market.is_open() {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::MarketClosed, "");
        }
        market_math::accrue_interest(tx, &mut market, output.created_at)?;

        let Some(mut supply) = tx.find_supply(user_id, &market.ctoken_asset_id) else {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::SupplyNotFound, "");
        };
        let ctokens = requested.unwrap_or(supply.collaterals).trunc_with_scale(16);
        if ctokens <= Decimal::ZERO || ctokens > supply.collaterals {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::InvalidArgument, "");
        }

        // Releasing collateral must not leave the account under water.
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
            let rate = market_math::exchange_rate(&market);
            let released_value = ctokens * rate * market.collateral_factor * price;
            if liquidity - released_value < Decimal::ZERO {
                return self.refund(
                    tx, output, user_id, follow_id, refund_src,
                    ErrorCode::InsufficientLiquidity, "",
                );
            }
        }

        supply.collaterals = (supply.collaterals - ctokens).trunc_with_scale(16);
        tx.update_supply(&mut supply)?;

        let returned = (ctokens + output.amount).trunc_with_scale(8);
        self.transfer_out(
            tx,
            output,
            user_id,
            follow_id,
            &market.ctoken_asset_id,
            returned,
            ActionType::UnpledgeTransfer,
        )?;

        info!(user = user_id, symbol = %market.symbol, ctokens = %ctokens, "unpledged");
        Ok(())
    }

    fn credit_collateral(
        &self,
        tx: &mut StoreTx,
        user_id: &str,
        ctoken_asset_id: &str,
        ctokens: Decimal,
    ) -> Result<(), StoreError> {
        match tx.find_supply(user_id, ctoken_asset_id) {
            Some(mut supply) => {
                supply.collaterals = (supply.collaterals + ctokens).trunc_with_scale(16);
                tx.update_supply(&mut supply)
            }
            None => {
                let mut supply = Supply::new(user_id, ctoken_asset_id, tx.now());
                supply.collaterals = ctokens;
                tx.save_supply(supply);
                Ok(())
            }
        }
    }
}
