mod common;

use common::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use lendcore::codec;
use lendcore::core::{ActionType, MarketParams, MarketStatus, TransferAction};

fn update_params(name: &str, symbol: &str, collateral_factor: &str) -> MarketParams {
    MarketParams {
        asset_id: Uuid::parse_str(&asset(name)).unwrap(),
        ctoken_asset_id: Uuid::parse_str(&asset(&format!("c-{name}"))).unwrap(),
        symbol: symbol.to_string(),
        init_exchange_rate: Decimal::ONE,
        reserve_factor: d("0.1"),
        collateral_factor: d(collateral_factor),
        close_factor: d("0.5"),
        liquidation_incentive: d("0.08"),
        base_rate: Decimal::ZERO,
        multiplier: Decimal::ZERO,
        jump_multiplier: Decimal::ZERO,
        kink: d("0.8"),
        borrow_cap: Decimal::ZERO,
        status: MarketStatus::Open,
    }
}

fn encode_params(params: &MarketParams) -> Vec<u8> {
    let mut buf = Vec::new();
    params.encode(&mut buf);
    buf
}

#[test]
fn proposal_applies_only_at_threshold() {
    let h = harness(2);
    let usdc = asset("usdc");
    seed_market(&h, base_market(&h, "usdc", "USDC"));

    let trace = Uuid::new_v4();
    let params = update_params("usdc", "USDC", "0.8");

    // M1 creates the proposal: stored, factor untouched.
    process(
        &h,
        member_output(
            &h,
            "m1",
            trace,
            ActionType::ProposalUpdateMarket,
            &encode_params(&params),
        ),
    );
    let proposal = h.db.view(|s| s.find_proposal(&trace.to_string()).unwrap());
    assert_eq!(proposal.votes, vec!["m1".to_string()]);
    assert!(proposal.passed_at.is_none());
    assert_eq!(
        h.db.view(|s| s.find_market(&usdc).unwrap()).collateral_factor,
        d("0.75")
    );

    // M1 votes again: idempotent.
    process(
        &h,
        member_output(&h, "m1", trace, ActionType::ProposalVote, &[]),
    );
    let proposal = h.db.view(|s| s.find_proposal(&trace.to_string()).unwrap());
    assert_eq!(proposal.votes.len(), 1);
    assert!(proposal.passed_at.is_none());

    // M2 votes: threshold reached, passed and applied atomically.
    process(
        &h,
        member_output(&h, "m2", trace, ActionType::ProposalVote, &[]),
    );
    let proposal = h.db.view(|s| s.find_proposal(&trace.to_string()).unwrap());
    assert_eq!(proposal.votes.len(), 2);
    assert!(proposal.passed_at.is_some());
    assert_eq!(
        h.db.view(|s| s.find_market(&usdc).unwrap()).collateral_factor,
        d("0.8")
    );

    // A late vote after passing changes nothing.
    process(
        &h,
        member_output(&h, "m3", trace, ActionType::ProposalVote, &[]),
    );
    let proposal = h.db.view(|s| s.find_proposal(&trace.to_string()).unwrap());
    assert_eq!(proposal.votes.len(), 2);
}

#[test]
fn add_market_creates_a_fresh_market() {
    let h = harness(1);
    let trace = Uuid::new_v4();
    let params = update_params("eth", "ETH", "0.6");

    process(
        &h,
        member_output(
            &h,
            "m2",
            trace,
            ActionType::ProposalAddMarket,
            &encode_params(&params),
        ),
    );

    let market = h.db.view(|s| s.find_market(&asset("eth")).unwrap());
    assert_eq!(market.symbol, "ETH");
    assert_eq!(market.collateral_factor, d("0.6"));
    assert_eq!(market.total_cash, Decimal::ZERO);
    assert_eq!(market.borrow_index, Decimal::ONE);
    assert_eq!(market.status, MarketStatus::Open);
}

#[test]
fn withdraw_reserves_pays_the_opponent() {
    let h = harness(1);
    let usdc = asset("usdc");
    let mut market = base_market(&h, "usdc", "USDC");
    market.total_cash = d("100");
    market.reserves = d("10");
    market.ctokens = d("90");
    seed_market(&h, market);

    let trace = Uuid::new_v4();
    let opponent = Uuid::new_v4();
    let mut payload = Vec::new();
    codec::put_uuid(&mut payload, &Uuid::parse_str(&usdc).unwrap());
    codec::put_decimal(&mut payload, d("4"));
    codec::put_uuid(&mut payload, &opponent);

    process(
        &h,
        member_output(
            &h,
            "m1",
            trace,
            ActionType::ProposalWithdrawReserves,
            &payload,
        ),
    );

    let market = h.db.view(|s| s.find_market(&usdc).unwrap());
    assert_eq!(market.reserves, d("6"));
    assert_eq!(market.total_cash, d("96"));

    let transfers = h.db.view(|s| s.list_transfers());
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].amount, d("4"));
    assert_eq!(transfers[0].opponents, vec![opponent.to_string()]);
    assert_eq!(
        TransferAction::parse(&transfers[0].memo).unwrap().source,
        ActionType::ProposalWithdrawReserves
    );
}

#[test]
fn inject_ctokens_raises_supply() {
    let h = harness(1);
    let usdc = asset("usdc");
    let mut market = base_market(&h, "usdc", "USDC");
    market.ctokens = d("100");
    seed_market(&h, market);

    let mut payload = Vec::new();
    codec::put_uuid(&mut payload, &Uuid::parse_str(&usdc).unwrap());
    codec::put_decimal(&mut payload, d("25"));

    process(
        &h,
        member_output(
            &h,
            "m3",
            Uuid::new_v4(),
            ActionType::ProposalInjectCTokenForMint,
            &payload,
        ),
    );

    assert_eq!(h.db.view(|s| s.find_market(&usdc).unwrap()).ctokens, d("125"));
}

#[test]
fn member_price_submissions_aggregate_to_a_median() {
    let h = harness(2);
    let btc = asset("btc");
    seed_market(&h, base_market(&h, "btc", "BTC"));

    for (member, price) in [("m1", "64000"), ("m2", "65000"), ("m3", "66000")] {
        let mut payload = Vec::new();
        codec::put_str(&mut payload, "BTC");
        codec::put_decimal(&mut payload, d(price));
        process(
            &h,
            member_output(
                &h,
                member,
                Uuid::new_v4(),
                ActionType::ProposalProvidePrice,
                &payload,
            ),
        );
    }

    // No proposal rows: price submissions bypass the vote machinery.
    let block = h.prices.price_block(h.now);
    assert_eq!(h.db.view(|s| s.tickers_at(&btc, block).len()), 3);
    let price = h.db.view(|s| h.prices.current_price(s, &btc, h.now));
    assert_eq!(price, Some(d("65000")));
}

#[test]
fn malformed_member_memo_is_dropped_silently() {
    let h = harness(2);
    seed_market(&h, base_market(&h, "usdc", "USDC"));

    // Valid signature, garbage payload: archived with no effect, no refund.
    let output = member_output(
        &h,
        "m1",
        Uuid::new_v4(),
        ActionType::ProposalUpdateMarket,
        b"not-market-params",
    );
    process(&h, output.clone());

    assert!(h.db.view(|s| s.list_transfers()).is_empty());
    assert!(h.db.view(|s| s.find_archive(&output.trace_id).is_some()));
    assert_eq!(
        h.db.view(|s| s.find_market(&asset("usdc")).unwrap()).collateral_factor,
        d("0.75")
    );
}
