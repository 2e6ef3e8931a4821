//! Persistence layer: a single-writer, in-process transactional store.
//!
//! `Db::transaction` snapshots the state, hands a `StoreTx` to the closure
//! and installs the mutated snapshot only when the closure returns `Ok`.
//! Every update checks the record's optimistic `version` column and bumps
//! it; a mismatch yields `StoreError::Conflict`, which aborts the enclosing
//! transaction. The payee is the only writer of lending state, so conflicts
//! indicate a stale in-transaction read and are retried on the next tick.

mod borrow;
mod market;
mod price;
mod proposal;
mod supply;
mod user;
mod wallet;

use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::{Borrow, Market, Output, OutputArchive, PriceTicker, Proposal, Supply, Transfer, User};

/// Key of the payee's output cursor in the properties table.
pub const OUTPUTS_CHECKPOINT: &str = "outputs_checkpoint";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("optimistic version conflict")]
    Conflict,
    #[error("record not found")]
    NotFound,
}

/// Full relational state. Cloned per transaction; committed by swap.
#[derive(Debug, Clone, Default)]
pub struct DbState {
    pub(crate) markets: HashMap<String, Market>,
    pub(crate) supplies: HashMap<(String, String), Supply>,
    pub(crate) borrows: HashMap<(String, String), Borrow>,
    pub(crate) proposals: HashMap<String, Proposal>,
    pub(crate) users: HashMap<String, User>,
    pub(crate) tickers: HashMap<(String, i64, String), PriceTicker>,
    pub(crate) outputs: BTreeMap<i64, Output>,
    pub(crate) archives: HashMap<String, OutputArchive>,
    pub(crate) transfers: BTreeMap<String, Transfer>,
    pub(crate) properties: HashMap<String, i64>,
}

#[derive(Clone, Default)]
pub struct Db {
    state: Arc<RwLock<DbState>>,
}

impl Db {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against a mutable snapshot; commit on `Ok`, discard on `Err`.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut StoreTx) -> Result<T, StoreError>,
    {
        let mut guard = self.state.write().expect("store lock poisoned");
        let mut working = guard.clone();
        let mut tx = StoreTx {
            state: &mut working,
            now: Utc::now(),
        };
        let out = f(&mut tx)?;
        *guard = working;
        Ok(out)
    }

    /// Read-only access to a consistent view of the state.
    pub fn view<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&DbState) -> T,
    {
        let guard = self.state.read().expect("store lock poisoned");
        f(&guard)
    }

    pub fn get_property(&self, key: &str) -> i64 {
        self.view(|s| s.properties.get(key).copied().unwrap_or(0))
    }

    /// Properties bypass transactional scope; the checkpoint is persisted
    /// after the processing transaction commits.
    pub fn set_property(&self, key: &str, value: i64) {
        let mut guard = self.state.write().expect("store lock poisoned");
        guard.properties.insert(key.to_string(), value);
    }
}

/// Ambient transaction handle passed to every mutating store operation.
pub struct StoreTx<'a> {
    pub(crate) state: &'a mut DbState,
    pub(crate) now: DateTime<Utc>,
}

impl Deref for StoreTx<'_> {
    type Target = DbState;

    fn deref(&self) -> &DbState {
        self.state
    }
}

impl StoreTx<'_> {
    /// Timestamp shared by every write in this transaction.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn set_property(&mut self, key: &str, value: i64) {
        self.state.properties.insert(key.to_string(), value);
    }

    pub fn get_property(&self, key: &str) -> i64 {
        self.state.properties.get(key).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::core::{Market, MarketStatus};

    fn market(asset: &str) -> Market {
        Market {
            asset_id: asset.to_string(),
            ctoken_asset_id: format!("c-{asset}"),
            symbol: "BTC".to_string(),
            total_cash: Decimal::ZERO,
            total_borrows: Decimal::ZERO,
            reserves: Decimal::ZERO,
            ctokens: Decimal::ZERO,
            borrow_index: Decimal::ONE,
            init_exchange_rate: Decimal::ONE,
            reserve_factor: Decimal::ZERO,
            collateral_factor: Decimal::ZERO,
            close_factor: Decimal::ZERO,
            liquidation_incentive: Decimal::ZERO,
            base_rate: Decimal::ZERO,
            multiplier: Decimal::ZERO,
            jump_multiplier: Decimal::ZERO,
            kink: Decimal::ZERO,
            borrow_cap: Decimal::ZERO,
            block_number: 0,
            status: MarketStatus::Open,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let db = Db::new();
        let err = db.transaction(|tx| {
            tx.save_market(market("a"));
            Err::<(), _>(StoreError::Conflict)
        });
        assert_eq!(err, Err(StoreError::Conflict));
        assert!(db.view(|s| s.find_market("a").is_none()));
    }

    #[test]
    fn version_conflict_detected() {
        let db = Db::new();
        db.transaction(|tx| {
            tx.save_market(market("a"));
            Ok(())
        })
        .unwrap();

        let stale = db.view(|s| s.find_market("a").unwrap());

        db.transaction(|tx| {
            let mut m = stale.clone();
            tx.update_market(&mut m)
        })
        .unwrap();

        // Second writer still holds version 0.
        let err = db.transaction(|tx| {
            let mut m = stale.clone();
            tx.update_market(&mut m)
        });
        assert_eq!(err, Err(StoreError::Conflict));
    }

    #[test]
    fn properties_default_to_zero() {
        let db = Db::new();
        assert_eq!(db.get_property(OUTPUTS_CHECKPOINT), 0);
        db.set_property(OUTPUTS_CHECKPOINT, 42);
        assert_eq!(db.get_property(OUTPUTS_CHECKPOINT), 42);
    }
}
