use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::codec::Scanner;
use crate::core::{ActionType, ErrorCode, Output};
use crate::service::market as market_math;
use crate::service::AllowListScope;
use crate::store::{StoreError, StoreTx};
use crate::worker::payee::Payee;

impl Payee {
    /// Body: `seized_user_address uuid || seized_asset_id uuid`. The
    /// liquidator's payment repays the borrower's debt in the payment asset
    /// and seizes the named collateral at a discount.
    pub(super) fn handle_liquidation(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        liquidator: &str,
        follow_id: Uuid,
        body: &[u8],
    ) -> Result<(), StoreError> {
        let refund_src = ActionType::RefundTransfer;
        let mut scanner = Scanner::new(body);
        let (seized_address, seized_asset_id) = match (scanner.read_uuid(), scanner.read_uuid()) {
            (Ok(addr), Ok(asset)) => (addr.to_string(), asset.to_string()),
            _ => {
                return self.refund(
                    tx, output, liquidator, follow_id, refund_src,
                    ErrorCode::InvalidArgument, "",
                );
            }
        };

        let Some(seized_user) = tx.find_user_by_address(&seized_address) else {
            return self.refund(tx, output, liquidator, follow_id, refund_src, ErrorCode::InvalidArgument, "");
        };
        // A borrower never liquidates their own position.
        if seized_user.user_id == liquidator {
            return self.refund(tx, output, liquidator, follow_id, refund_src, ErrorCode::SeizeNotAllowed, "");
        }
        if self.allowlist.is_scope_enabled(AllowListScope::Liquidation)
            && !self
                .allowlist
                .is_allowed(AllowListScope::Liquidation, &seized_user.user_id)
        {
            return self.refund(
                tx, output, liquidator, follow_id, refund_src,
                ErrorCode::OperationForbidden, "",
            );
        }

        let Some(mut supply_market) = tx.find_market(&seized_asset_id) else {
            return self.refund(tx, output, liquidator, follow_id, refund_src, ErrorCode::MarketNotFound, "");
        };
        let Some(borrow_market_probe) = tx.find_market(&output.asset_id) else {
            return self.refund(tx, output, liquidator, follow_id, refund_src, ErrorCode::MarketNotFound, "");
        };
        if !supply_market.is_open() || !borrow_market_probe.is_open() {
            return self.refund(tx, output, liquidator, follow_id, refund_src, ErrorCode::MarketClosed, "");
        }

        market_math::accrue_interest(tx, &mut supply_market, output.created_at)?;
        // Re-read: both legs may share a market, and the accrual above
        // bumped its version.
        let mut borrow_market = tx
            .find_market(&output.asset_id)
            .ok_or(StoreError::NotFound)?;
        market_math::accrue_interest(tx, &mut borrow_market, output.created_at)?;
        if supply_market.asset_id == borrow_market.asset_id {
            supply_market = borrow_market.clone();
        }

        let Some(mut supply) = tx.find_supply(&seized_user.user_id, &supply_market.ctoken_asset_id)
        else {
            return self.refund(tx, output, liquidator, follow_id, refund_src, ErrorCode::SupplyNotFound, "");
        };
        let Some(mut borrow) = tx.find_borrow(&seized_user.user_id, &borrow_market.asset_id)
        else {
            return self.refund(tx, output, liquidator, follow_id, refund_src, ErrorCode::BorrowNotFound, "");
        };

        let Some(borrow_price) =
            self.prices
                .current_price(tx, &borrow_market.asset_id, output.created_at)
        else {
            return self.refund(tx, output, liquidator, follow_id, refund_src, ErrorCode::PriceUnavailable, "");
        };
        let Some(supply_price) =
            self.prices
                .current_price(tx, &supply_market.asset_id, output.created_at)
        else {
            return self.refund(tx, output, liquidator, follow_id, refund_src, ErrorCode::PriceUnavailable, "");
        };

        // Only under-collateralized accounts may be seized.
        match self
            .account
            .seize_allowed(tx, &seized_user.user_id, output.created_at)
        {
            Ok(true) => {}
            Ok(false) => {
                return self.refund(
                    tx, output, liquidator, follow_id, refund_src,
                    ErrorCode::SeizeNotAllowed, "",
                );
            }
            Err(code) => {
                return self.refund(tx, output, liquidator, follow_id, refund_src, code, "");
            }
        }

        let exchange = market_math::exchange_rate(&supply_market);
        let borrow_balance = borrow.balance_at(borrow_market.borrow_index);
        let pay_amount = output.amount;

        // Value cap: what the close factor allows, what the payment covers
        // and what the debt is actually worth.
        let max_seize = supply.collaterals * exchange * supply_market.close_factor;
        let seize_price =
            supply_price - supply_price * supply_market.liquidation_incentive;
        let max_seize_value = max_seize * seize_price;
        let repay_value = pay_amount * borrow_price;
        let borrow_balance_value = borrow_balance * borrow_price;
        let effective_value = repay_value.min(max_seize_value).min(borrow_balance_value);

        if exchange <= Decimal::ZERO
            || seize_price <= Decimal::ZERO
            || effective_value <= Decimal::ZERO
        {
            return self.refund(tx, output, liquidator, follow_id, refund_src, ErrorCode::SeizeNotAllowed, "");
        }

        let seized_underlying = (effective_value / seize_price).trunc_with_scale(8);
        let seized_ctokens = (seized_underlying / exchange).trunc_with_scale(16);
        let really_repaid = (effective_value / borrow_price).trunc_with_scale(16);
        let refund_left = (pay_amount - really_repaid).trunc_with_scale(8);

        // Seized side: collateral leaves the borrower and the pool.
        supply.collaterals = (supply.collaterals - seized_ctokens).trunc_with_scale(16);
        tx.update_supply(&mut supply)?;

        supply_market.total_cash =
            (supply_market.total_cash - seized_underlying).trunc_with_scale(16);
        supply_market.ctokens = (supply_market.ctokens - seized_ctokens).trunc_with_scale(16);
        tx.update_market(&mut supply_market)?;

        // Repay side: debt shrinks, cash comes back. Re-read in case both
        // legs share the market the seize just updated.
        let mut borrow_market = tx
            .find_market(&output.asset_id)
            .ok_or(StoreError::NotFound)?;
        let new_balance = (borrow_balance - really_repaid).trunc_with_scale(16);
        if new_balance <= Decimal::ZERO {
            borrow.principal = Decimal::ZERO;
            borrow.interest_index = Decimal::ZERO;
        } else {
            borrow.principal = new_balance;
            borrow.interest_index = borrow_market.borrow_index;
        }
        tx.update_borrow(&mut borrow)?;

        borrow_market.total_borrows = (borrow_market.total_borrows - really_repaid)
            .max(Decimal::ZERO)
            .trunc_with_scale(16);
        borrow_market.total_cash =
            (borrow_market.total_cash + really_repaid).trunc_with_scale(16);
        tx.update_market(&mut borrow_market)?;

        // Refresh rates on both markets now that the balances moved.
        for asset_id in [&seized_asset_id, &output.asset_id] {
            if let Some(mut market) = tx.find_market(asset_id) {
                market_math::accrue_interest(tx, &mut market, output.created_at)?;
            }
        }

        self.transfer_out(
            tx,
            output,
            liquidator,
            follow_id,
            &seized_asset_id,
            seized_underlying,
            ActionType::LiquidateTransfer,
        )?;
        if refund_left > Decimal::ZERO {
            self.refund_amount(
                tx,
                output,
                liquidator,
                follow_id,
                ActionType::SeizeRefundTransfer,
                refund_left,
            );
        }

        info!(
            liquidator = liquidator,
            borrower = %seized_user.user_id,
            seized = %seized_underlying,
            repaid = %really_repaid,
            "liquidated"
        );
        Ok(())
    }
}
