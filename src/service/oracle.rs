use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::Market;
use crate::store::DbState;

/// A price quote pulled from an external ticker feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerQuote {
    pub symbol: String,
    pub price: Decimal,
}

/// External price source the oracle worker polls. Injected so tests can
/// drive the worker without the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceOracleSource: Send + Sync {
    async fn pull_price(&self, market: &Market) -> Result<TickerQuote>;
}

/// Reads quotes from a JSON ticker endpoint.
pub struct RestTickerSource {
    client: reqwest::Client,
    endpoint: String,
}

impl RestTickerSource {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PriceOracleSource for RestTickerSource {
    async fn pull_price(&self, market: &Market) -> Result<TickerQuote> {
        let url = format!("{}/api/v1/prices/{}", self.endpoint, market.symbol);
        let quote = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .with_context(|| format!("ticker request for {}", market.symbol))?
            .json::<TickerQuote>()
            .await
            .with_context(|| format!("ticker payload for {}", market.symbol))?;
        Ok(quote)
    }
}

/// Price-block bucketing and median aggregation over provider tickers.
#[derive(Debug, Clone, Copy)]
pub struct PriceService {
    block_secs: i64,
}

impl PriceService {
    pub fn new(block_secs: i64) -> Self {
        Self {
            block_secs: block_secs.max(1),
        }
    }

    pub fn price_block(&self, t: DateTime<Utc>) -> i64 {
        t.timestamp() / self.block_secs
    }

    /// Effective price of an asset at `at`: the median of provider tickers
    /// for the newest priced block not after `at`. `None` when the asset has
    /// no usable submission.
    pub fn current_price(&self, state: &DbState, asset_id: &str, at: DateTime<Utc>) -> Option<Decimal> {
        let block = state.latest_priced_block(asset_id, self.price_block(at))?;
        let mut prices: Vec<Decimal> = state
            .tickers_at(asset_id, block)
            .iter()
            .map(|t| t.price)
            .collect();
        if prices.is_empty() {
            return None;
        }
        prices.sort();
        let n = prices.len();
        let median = if n % 2 == 1 {
            prices[n / 2]
        } else {
            (prices[n / 2 - 1] + prices[n / 2]) / Decimal::TWO
        };
        (median > Decimal::ZERO).then_some(median)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    use crate::core::PriceTicker;
    use crate::store::Db;

    fn ticker(asset: &str, block: i64, provider: &str, price: &str) -> PriceTicker {
        PriceTicker {
            asset_id: asset.to_string(),
            symbol: "BTC".to_string(),
            price_block: block,
            provider: provider.to_string(),
            price: Decimal::from_str(price).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn median_over_providers() {
        let db = Db::new();
        db.transaction(|tx| {
            tx.save_ticker(ticker("btc", 10, "a", "99"));
            tx.save_ticker(ticker("btc", 10, "b", "101"));
            tx.save_ticker(ticker("btc", 10, "c", "250"));
            Ok(())
        })
        .unwrap();

        let svc = PriceService::new(60);
        let at = Utc.timestamp_opt(10 * 60 + 30, 0).unwrap();
        let price = db.view(|s| svc.current_price(s, "btc", at));
        assert_eq!(price, Some(Decimal::from(101)));
    }

    #[test]
    fn even_provider_count_averages_middle_pair() {
        let db = Db::new();
        db.transaction(|tx| {
            tx.save_ticker(ticker("btc", 10, "a", "100"));
            tx.save_ticker(ticker("btc", 10, "b", "102"));
            Ok(())
        })
        .unwrap();

        let svc = PriceService::new(60);
        let at = Utc.timestamp_opt(10 * 60, 0).unwrap();
        assert_eq!(
            db.view(|s| svc.current_price(s, "btc", at)),
            Some(Decimal::from(101))
        );
    }

    #[test]
    fn falls_back_to_latest_earlier_block() {
        let db = Db::new();
        db.transaction(|tx| {
            tx.save_ticker(ticker("btc", 8, "a", "95"));
            Ok(())
        })
        .unwrap();

        let svc = PriceService::new(60);
        let at = Utc.timestamp_opt(10 * 60, 0).unwrap();
        assert_eq!(
            db.view(|s| svc.current_price(s, "btc", at)),
            Some(Decimal::from(95))
        );
    }

    #[test]
    fn unknown_asset_has_no_price() {
        let db = Db::new();
        let svc = PriceService::new(60);
        assert_eq!(db.view(|s| svc.current_price(s, "eth", Utc::now())), None);
    }
}
