use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::codec::Scanner;
use crate::core::{ActionType, Borrow, ErrorCode, Output};
use crate::service::market as market_math;
use crate::store::{StoreError, StoreTx};
use crate::worker::payee::Payee;

impl Payee {
    /// Body: `asset_id uuid || amount decimal`. The triggering payment is a
    /// fee; the borrowed asset is named in the body.
    pub(super) fn handle_borrow(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        user_id: &str,
        follow_id: Uuid,
        body: &[u8],
    ) -> Result<(), StoreError> {
        let refund_src = ActionType::RefundTransfer;
        let mut scanner = Scanner::new(body);
        let (asset_id, amount) = match (scanner.read_uuid(), scanner.read_decimal()) {
            (Ok(asset), Ok(amount)) => (asset.to_string(), amount),
            _ => {
                return self.refund(
                    tx, output, user_id, follow_id, refund_src,
                    ErrorCode::InvalidArgument, "",
                );
            }
        };

        let Some(mut market) = tx.find_market(&asset_id) else {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::MarketNotFound, "");
        };
        if !market.is_open() {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::MarketClosed, "");
        }
        market_math::accrue_interest(tx, &mut market, output.created_at)?;

        if amount <= Decimal::ZERO {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::InvalidArgument, "");
        }
        if amount > market.total_cash {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::InsufficientCash, "");
        }
        if market.borrow_cap > Decimal::ZERO
            && market.total_borrows + amount > market.borrow_cap
        {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::BorrowCapReached, "");
        }

        let liquidity = match self.account.calculate_liquidity(tx, user_id, output.created_at) {
            Ok(l) => l,
            Err(code) => return self.refund(tx, output, user_id, follow_id, refund_src, code, ""),
        };
        let Some(price) = self.prices.current_price(tx, &asset_id, output.created_at) else {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::PriceUnavailable, "");
        };
        if amount * price > liquidity {
            return self.refund(
                tx, output, user_id, follow_id, refund_src,
                ErrorCode::InsufficientLiquidity, "",
            );
        }

        match tx.find_borrow(user_id, &asset_id) {
            Some(mut borrow) => {
                let balance = borrow.balance_at(market.borrow_index);
                borrow.principal = (balance + amount).trunc_with_scale(16);
                borrow.interest_index = market.borrow_index;
                tx.update_borrow(&mut borrow)?;
            }
            None => {
                let mut borrow = Borrow::new(user_id, &asset_id, tx.now());
                borrow.principal = amount.trunc_with_scale(16);
                borrow.interest_index = market.borrow_index;
                tx.save_borrow(borrow);
            }
        }

        market.total_borrows = (market.total_borrows + amount).trunc_with_scale(16);
        market.total_cash = (market.total_cash - amount).trunc_with_scale(16);
        tx.update_market(&mut market)?;

        self.transfer_out(
            tx,
            output,
            user_id,
            follow_id,
            &asset_id,
            amount.trunc_with_scale(8),
            ActionType::BorrowTransfer,
        )?;

        info!(user = user_id, symbol = %market.symbol, amount = %amount, "borrowed");
        Ok(())
    }

    /// User sends underlying against their debt. Overpays come back on a
    /// dedicated refund source.
    pub(super) fn handle_repay(
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

        let Some(mut borrow) = tx.find_borrow(user_id, &output.asset_id) else {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::BorrowNotFound, "");
        };
        let balance = borrow.balance_at(market.borrow_index);
        if balance <= Decimal::ZERO {
            return self.refund(tx, output, user_id, follow_id, refund_src, ErrorCode::BorrowNotFound, "");
        }

        let amount = output.amount;
        let repaid;
        if amount >= balance {
            repaid = balance;
            borrow.principal = Decimal::ZERO;
            borrow.interest_index = Decimal::ZERO;

            let overpay = (amount - balance).trunc_with_scale(8);
            if overpay > Decimal::ZERO {
                self.refund_amount(
                    tx,
                    output,
                    user_id,
                    follow_id,
                    ActionType::RepayRefundTransfer,
                    overpay,
                );
            }
        } else {
            repaid = amount;
            borrow.principal = (balance - amount).trunc_with_scale(16);
            borrow.interest_index = market.borrow_index;
        }
        tx.update_borrow(&mut borrow)?;

        market.total_borrows = (market.total_borrows - repaid)
            .max(Decimal::ZERO)
            .trunc_with_scale(16);
        market.total_cash = (market.total_cash + repaid).trunc_with_scale(16);
        tx.update_market(&mut market)?;

        info!(user = user_id, symbol = %market.symbol, repaid = %repaid, "repaid");
        Ok(())
    }
}
