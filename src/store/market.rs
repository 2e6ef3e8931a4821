use crate::core::Market;
use crate::store::{DbState, StoreError, StoreTx};

impl DbState {
    pub fn find_market(&self, asset_id: &str) -> Option<Market> {
        self.markets.get(asset_id).cloned()
    }

    pub fn find_market_by_ctoken(&self, ctoken_asset_id: &str) -> Option<Market> {
        self.markets
            .values()
            .find(|m| m.ctoken_asset_id == ctoken_asset_id)
            .cloned()
    }

    pub fn find_market_by_symbol(&self, symbol: &str) -> Option<Market> {
        self.markets.values().find(|m| m.symbol == symbol).cloned()
    }

    pub fn all_markets(&self) -> Vec<Market> {
        let mut markets: Vec<_> = self.markets.values().cloned().collect();
        markets.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));
        markets
    }
}

impl StoreTx<'_> {
    /// Insert or replace, resetting the timestamp trail for new rows.
    pub fn save_market(&mut self, mut market: Market) {
        market.updated_at = self.now;
        if !self.state.markets.contains_key(&market.asset_id) {
            market.created_at = self.now;
        }
        self.state.markets.insert(market.asset_id.clone(), market);
    }

    /// Optimistic update: the caller's version must match the stored row.
    pub fn update_market(&mut self, market: &mut Market) -> Result<(), StoreError> {
        let current = self
            .state
            .markets
            .get_mut(&market.asset_id)
            .ok_or(StoreError::NotFound)?;
        if current.version != market.version {
            return Err(StoreError::Conflict);
        }
        market.version += 1;
        market.updated_at = self.now;
        *current = market.clone();
        Ok(())
    }
}
