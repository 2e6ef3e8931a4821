//! Interest-rate math for a money market: utilization, the jump-rate model,
//! the CToken exchange rate and per-tick interest accrual.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::core::Market;
use crate::service::block;
use crate::store::{StoreError, StoreTx};

/// Fraction of pool assets currently lent out:
/// `borrows / (cash + borrows - reserves)`, zero when the pool is empty.
pub fn utilization_rate(market: &Market) -> Decimal {
    let denom = market.total_cash + market.total_borrows - market.reserves;
    if denom <= Decimal::ZERO || market.total_borrows <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    market.total_borrows / denom
}

/// CToken to underlying conversion:
/// `(cash + borrows - reserves) / ctokens`, falling back to the initial
/// rate while no CTokens are outstanding.
pub fn exchange_rate(market: &Market) -> Decimal {
    if market.ctokens <= Decimal::ZERO {
        return market.init_exchange_rate;
    }
    (market.total_cash + market.total_borrows - market.reserves) / market.ctokens
}

/// Jump-rate borrow rate, per year.
pub fn borrow_rate_per_year(market: &Market, utilization: Decimal) -> Decimal {
    if utilization <= market.kink {
        market.base_rate + utilization * market.multiplier
    } else {
        market.base_rate
            + market.kink * market.multiplier
            + (utilization - market.kink) * market.jump_multiplier
    }
}

pub fn borrow_rate_per_block(market: &Market, utilization: Decimal) -> Decimal {
    borrow_rate_per_year(market, utilization) / block::blocks_per_year()
}

/// Supply rate: the borrow rate earned on the utilized share, less the
/// protocol's reserve cut.
pub fn supply_rate_per_year(market: &Market, utilization: Decimal) -> Decimal {
    utilization * borrow_rate_per_year(market, utilization) * (Decimal::ONE - market.reserve_factor)
}

pub fn supply_rate_per_block(market: &Market, utilization: Decimal) -> Decimal {
    supply_rate_per_year(market, utilization) / block::blocks_per_year()
}

/// Roll the market forward to the block of `now`: grow total borrows and
/// reserves by simple interest and compound the borrow index. Persists the
/// market with a version check; a conflict aborts the enclosing transaction.
pub fn accrue_interest(
    tx: &mut StoreTx,
    market: &mut Market,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let current_block = block::block_of(now);
    let delta = current_block - market.block_number;
    if delta <= 0 {
        return Ok(());
    }

    let utilization = utilization_rate(market);
    // rate/yr * delta / blocks_per_yr keeps whole-year accruals exact.
    let simple_interest_factor =
        borrow_rate_per_year(market, utilization) * Decimal::from(delta) / block::blocks_per_year();
    let interest = market.total_borrows * simple_interest_factor;

    market.total_borrows = (market.total_borrows + interest).trunc_with_scale(16);
    market.reserves = (market.reserves + interest * market.reserve_factor).trunc_with_scale(16);
    market.borrow_index =
        (market.borrow_index * (Decimal::ONE + simple_interest_factor)).trunc_with_scale(16);
    market.block_number = current_block;

    tx.update_market(market)
}
