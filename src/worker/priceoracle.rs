//! Price oracle worker: once per price block, pulls a quote for every
//! market from the external ticker feed and submits it to the multisig
//! network as a member-signed `ProposalProvidePrice`. The submission's
//! trace id is derived from (node, asset, price block), so the network
//! rejects duplicates and re-ticks are harmless.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::codec::{self, sign_member_action};
use crate::core::{ActionType, Market, System};
use crate::service::{MultisigTransfer, PriceOracleSource, PriceService, WalletClient};
use crate::store::Db;
use crate::worker::Job;

pub struct PriceOracleWorker {
    db: Db,
    system: System,
    prices: PriceService,
    source: Arc<dyn PriceOracleSource>,
    wallet: Arc<dyn WalletClient>,
    ticker_ttl: Duration,
}

impl PriceOracleWorker {
    pub fn new(
        db: Db,
        system: System,
        prices: PriceService,
        source: Arc<dyn PriceOracleSource>,
        wallet: Arc<dyn WalletClient>,
        ticker_ttl_days: i64,
    ) -> Self {
        Self {
            db,
            system,
            prices,
            source,
            wallet,
            ticker_ttl: Duration::days(ticker_ttl_days.max(1)),
        }
    }

    pub async fn run_once(&self) -> Result<()> {
        let now = Utc::now();

        // Drop stale submissions first.
        let cutoff = now - self.ticker_ttl;
        let purged = self
            .db
            .transaction(|tx| Ok(tx.delete_tickers_before(cutoff)))?;
        if purged > 0 {
            debug!(purged, "expired price tickers removed");
        }

        let markets = self.db.view(|s| s.all_markets());
        if markets.is_empty() {
            debug!("no market to price");
            return Ok(());
        }

        let price_block = self.prices.price_block(now);
        for market in markets {
            let provided = self.db.view(|s| {
                s.is_price_provided(&market.asset_id, price_block, &self.system.client_id)
            });
            if provided {
                continue;
            }

            let quote = match self.source.pull_price(&market).await {
                Ok(quote) => quote,
                Err(err) => {
                    error!(symbol = %market.symbol, error = %err, "pull price ticker failed");
                    continue;
                }
            };
            if quote.price <= Decimal::ZERO {
                error!(symbol = %market.symbol, price = %quote.price, "invalid ticker price");
                continue;
            }

            self.push_price(&market, quote.price, price_block).await?;
        }

        Ok(())
    }

    /// Submit a signed price proposal for one market and price block.
    async fn push_price(&self, market: &Market, price: Decimal, price_block: i64) -> Result<()> {
        let trace_id = Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            format!(
                "price-{}-{}-{}",
                self.system.client_id, market.asset_id, price_block
            )
            .as_bytes(),
        );

        let mut payload = Vec::new();
        codec::put_str(&mut payload, &market.symbol);
        codec::put_decimal(&mut payload, price);
        let raw = sign_member_action(
            &self.system.sign_key,
            trace_id,
            ActionType::ProposalProvidePrice,
            &payload,
        );

        self.wallet
            .submit_transfer(MultisigTransfer {
                asset_id: self.system.vote_asset_id.clone(),
                amount: self.system.vote_amount,
                trace_id: trace_id.to_string(),
                memo: codec::encode_base64(&raw),
                opponents: self.system.member_ids(),
                threshold: self.system.threshold as u8,
            })
            .await?;

        info!(
            symbol = %market.symbol,
            price = %price,
            block = price_block,
            "price proposal submitted"
        );
        Ok(())
    }
}

#[async_trait]
impl Job for PriceOracleWorker {
    fn name(&self) -> &'static str {
        "priceoracle"
    }

    async fn on_tick(&self) -> Result<()> {
        self.run_once().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use crate::config::SystemConfig;
    use crate::core::MarketStatus;
    use crate::service::oracle::{MockPriceOracleSource, TickerQuote};
    use crate::service::wallet::MockWalletClient;

    fn system() -> System {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine as _;
        System::from_config(&SystemConfig {
            client_id: "node-1".to_string(),
            members: vec![crate::config::MemberConfig {
                id: "node-1".to_string(),
                key: STANDARD.encode(b"node-one-key"),
            }],
            threshold: 1,
            secret: "test-secret".to_string(),
            sign_key: STANDARD.encode(b"node-one-key"),
            vote_asset_id: "vote-asset".to_string(),
            vote_amount: Decimal::from_str("0.00000001").unwrap(),
        })
        .unwrap()
    }

    fn market() -> Market {
        Market {
            asset_id: "btc".to_string(),
            ctoken_asset_id: "cbtc".to_string(),
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

    #[tokio::test]
    async fn submits_one_signed_proposal_per_market() {
        let db = Db::new();
        db.transaction(|tx| {
            tx.save_market(market());
            Ok(())
        })
        .unwrap();

        let mut source = MockPriceOracleSource::new();
        source.expect_pull_price().times(1).returning(|m| {
            Ok(TickerQuote {
                symbol: m.symbol.clone(),
                price: Decimal::from(65_000),
            })
        });

        let sys = system();
        let members = sys.members.clone();
        let mut wallet = MockWalletClient::new();
        wallet
            .expect_submit_transfer()
            .times(1)
            .withf(move |t| {
                let raw = codec::decode_base64(&t.memo);
                let action = codec::decode_member_action(&raw, &members).unwrap();
                action.action == ActionType::ProposalProvidePrice && t.asset_id == "vote-asset"
            })
            .returning(|_| Ok(()));

        let worker = PriceOracleWorker::new(
            db,
            sys,
            PriceService::new(60),
            Arc::new(source),
            Arc::new(wallet),
            7,
        );
        worker.run_once().await.unwrap();
    }

    #[tokio::test]
    async fn skips_markets_already_priced_this_block() {
        let db = Db::new();
        let now = Utc::now();
        let prices = PriceService::new(60);
        db.transaction(|tx| {
            tx.save_market(market());
            tx.save_ticker(crate::core::PriceTicker {
                asset_id: "btc".to_string(),
                symbol: "BTC".to_string(),
                price_block: prices.price_block(now),
                provider: "node-1".to_string(),
                price: Decimal::from(64_000),
                created_at: now,
            });
            Ok(())
        })
        .unwrap();

        let mut source = MockPriceOracleSource::new();
        source.expect_pull_price().times(0);
        let mut wallet = MockWalletClient::new();
        wallet.expect_submit_transfer().times(0);

        let worker = PriceOracleWorker::new(
            db,
            system(),
            prices,
            Arc::new(source),
            Arc::new(wallet),
            7,
        );
        worker.run_once().await.unwrap();
    }

    #[tokio::test]
    async fn rejects_non_positive_quotes() {
        let db = Db::new();
        db.transaction(|tx| {
            tx.save_market(market());
            Ok(())
        })
        .unwrap();

        let mut source = MockPriceOracleSource::new();
        source.expect_pull_price().times(1).returning(|m| {
            Ok(TickerQuote {
                symbol: m.symbol.clone(),
                price: Decimal::ZERO,
            })
        });
        let mut wallet = MockWalletClient::new();
        wallet.expect_submit_transfer().times(0);

        let worker = PriceOracleWorker::new(
            db,
            system(),
            PriceService::new(60),
            Arc::new(source),
            Arc::new(wallet),
            7,
        );
        worker.run_once().await.unwrap();
    }

    #[tokio::test]
    async fn purges_expired_tickers() {
        let db = Db::new();
        let old = Utc::now() - Duration::days(10);
        db.transaction(|tx| {
            tx.save_ticker(crate::core::PriceTicker {
                asset_id: "btc".to_string(),
                symbol: "BTC".to_string(),
                price_block: 1,
                provider: "node-1".to_string(),
                price: Decimal::from(60_000),
                created_at: old,
            });
            Ok(())
        })
        .unwrap();

        let worker = PriceOracleWorker::new(
            db.clone(),
            system(),
            PriceService::new(60),
            Arc::new(MockPriceOracleSource::new()),
            Arc::new(MockWalletClient::new()),
            7,
        );
        worker.run_once().await.unwrap();
        assert!(db.view(|s| s.tickers_at("btc", 1).is_empty()));
    }
}
