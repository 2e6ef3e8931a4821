use chrono::{DateTime, Utc};

use crate::core::PriceTicker;
use crate::store::{DbState, StoreTx};

impl DbState {
    pub fn tickers_at(&self, asset_id: &str, price_block: i64) -> Vec<PriceTicker> {
        let mut rows: Vec<_> = self
            .tickers
            .values()
            .filter(|t| t.asset_id == asset_id && t.price_block == price_block)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.provider.cmp(&b.provider));
        rows
    }

    /// Most recent price block at or before `price_block` that has at least
    /// one submission for the asset.
    pub fn latest_priced_block(&self, asset_id: &str, price_block: i64) -> Option<i64> {
        self.tickers
            .values()
            .filter(|t| t.asset_id == asset_id && t.price_block <= price_block)
            .map(|t| t.price_block)
            .max()
    }

    pub fn is_price_provided(&self, asset_id: &str, price_block: i64, provider: &str) -> bool {
        self.tickers.contains_key(&(
            asset_id.to_string(),
            price_block,
            provider.to_string(),
        ))
    }
}

impl StoreTx<'_> {
    /// One submission per (asset, block, provider); re-submissions replace.
    pub fn save_ticker(&mut self, ticker: PriceTicker) {
        let key = (
            ticker.asset_id.clone(),
            ticker.price_block,
            ticker.provider.clone(),
        );
        self.state.tickers.insert(key, ticker);
    }

    pub fn delete_tickers_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.state.tickers.len();
        self.state.tickers.retain(|_, t| t.created_at >= cutoff);
        before - self.state.tickers.len()
    }
}
