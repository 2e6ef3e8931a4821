//! Shared harness for end-to-end payee tests: an in-process store, a real
//! member set and helpers that forge signed/encrypted outputs the way
//! wallet clients do.
#![allow(dead_code)]

use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64_STD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use lendcore::codec::{self, seal_user_action, sign_member_action};
use lendcore::config::{MemberConfig, SystemConfig};
use lendcore::core::{ActionType, Market, MarketStatus, Output, PriceTicker, System};
use lendcore::service::{AccountService, AllowListService, PriceService};
use lendcore::store::Db;
use lendcore::worker::payee::Payee;

pub const PRICE_BLOCK_SECS: i64 = 60;

pub struct Harness {
    pub db: Db,
    pub payee: Payee,
    pub system: System,
    pub prices: PriceService,
    pub now: DateTime<Utc>,
}

pub fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn asset(name: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

pub fn member_key(id: &str) -> Vec<u8> {
    format!("{id}-secret-key").into_bytes()
}

pub fn harness(threshold: u8) -> Harness {
    let members = ["m1", "m2", "m3"]
        .iter()
        .map(|id| MemberConfig {
            id: id.to_string(),
            key: BASE64_STD.encode(member_key(id)),
        })
        .collect();
    let system = System::from_config(&SystemConfig {
        client_id: "m1".to_string(),
        members,
        threshold,
        secret: "harness-secret".to_string(),
        sign_key: BASE64_STD.encode(member_key("m1")),
        vote_asset_id: asset("vote"),
        vote_amount: d("0.00000001"),
    })
    .unwrap();

    let db = Db::new();
    let prices = PriceService::new(PRICE_BLOCK_SECS);
    let accounts = AccountService::new(prices);
    let payee = Payee::new(
        db.clone(),
        system.clone(),
        accounts,
        prices,
        AllowListService::default(),
        500,
    );

    Harness {
        db,
        payee,
        system,
        prices,
        now: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    }
}

/// A fresh market with inert rates; tests override what they exercise.
pub fn base_market(h: &Harness, name: &str, symbol: &str) -> Market {
    Market {
        asset_id: asset(name),
        ctoken_asset_id: asset(&format!("c-{name}")),
        symbol: symbol.to_string(),
        total_cash: Decimal::ZERO,
        total_borrows: Decimal::ZERO,
        reserves: Decimal::ZERO,
        ctokens: Decimal::ZERO,
        borrow_index: Decimal::ONE,
        init_exchange_rate: Decimal::ONE,
        reserve_factor: d("0.1"),
        collateral_factor: d("0.75"),
        close_factor: d("0.5"),
        liquidation_incentive: d("0.08"),
        base_rate: Decimal::ZERO,
        multiplier: Decimal::ZERO,
        jump_multiplier: Decimal::ZERO,
        kink: d("0.8"),
        borrow_cap: Decimal::ZERO,
        block_number: lendcore::service::block::block_of(h.now),
        status: MarketStatus::Open,
        version: 0,
        created_at: h.now,
        updated_at: h.now,
    }
}

pub fn seed_market(h: &Harness, market: Market) {
    h.db.transaction(|tx| {
        tx.save_market(market);
        Ok(())
    })
    .unwrap();
}

pub fn seed_price(h: &Harness, asset_id: &str, price: &str) {
    h.db.transaction(|tx| {
        tx.save_ticker(PriceTicker {
            asset_id: asset_id.to_string(),
            symbol: String::new(),
            price_block: h.prices.price_block(h.now),
            provider: "m1".to_string(),
            price: d(price),
            created_at: h.now,
        });
        Ok(())
    })
    .unwrap();
}

/// Forge an encrypted user-action output, as a wallet client would.
pub fn user_output(
    h: &Harness,
    sender: &str,
    asset_id: &str,
    amount: &str,
    action: ActionType,
    payload: &[u8],
) -> Output {
    let sealed = seal_user_action(
        &h.system.private_key,
        Uuid::nil(),
        Uuid::new_v4(),
        action,
        payload,
    )
    .unwrap();
    Output {
        id: 0,
        trace_id: Uuid::new_v4().to_string(),
        asset_id: asset_id.to_string(),
        amount: d(amount),
        sender: sender.to_string(),
        memo: codec::encode_base64(&sealed),
        created_at: h.now,
    }
}

/// Forge a member-signed proposal output.
pub fn member_output(
    h: &Harness,
    member_id: &str,
    proposal_trace: Uuid,
    action: ActionType,
    payload: &[u8],
) -> Output {
    let raw = sign_member_action(&member_key(member_id), proposal_trace, action, payload);
    Output {
        id: 0,
        trace_id: Uuid::new_v4().to_string(),
        asset_id: h.system.vote_asset_id.clone(),
        amount: d("0.00000001"),
        sender: member_id.to_string(),
        memo: codec::encode_base64(&raw),
        created_at: h.now,
    }
}

/// Push an output into the stream and drain the payee.
pub fn process(h: &Harness, output: Output) {
    h.db.push_output(output).unwrap();
    h.payee.run_once().unwrap();
}

pub fn borrow_payload(asset_id: &str, amount: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    codec::put_uuid(&mut buf, &Uuid::parse_str(asset_id).unwrap());
    codec::put_decimal(&mut buf, d(amount));
    buf
}

pub fn liquidate_payload(seized_address: &str, seized_asset: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    codec::put_uuid(&mut buf, &Uuid::parse_str(seized_address).unwrap());
    codec::put_uuid(&mut buf, &Uuid::parse_str(seized_asset).unwrap());
    buf
}

/// The single refund transfer belonging to an output, if any.
pub fn refund_of(h: &Harness, output: &Output) -> Option<lendcore::core::Transfer> {
    let trace = codec::derive_trace_id(&output.trace_id, "refund");
    h.db.view(|s| s.find_transfer(&trace))
}

pub fn refund_code(transfer: &lendcore::core::Transfer) -> u16 {
    lendcore::core::TransferAction::parse(&transfer.memo)
        .unwrap()
        .code
}
