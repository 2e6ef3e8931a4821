use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::{self, ScanError, Scanner};
use crate::core::action::ActionType;
use crate::core::market::MarketStatus;

/// Governance proposal. Terminal once `votes` reaches the member threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub trace_id: String,
    pub creator: String,
    pub action: ActionType,
    pub content: ProposalContent,
    pub votes: Vec<String>,
    pub passed_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn has_voted(&self, member_id: &str) -> bool {
        self.votes.iter().any(|v| v == member_id)
    }
}

/// Typed payloads carried inside proposals, decoded from the member memo at
/// creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposalContent {
    Market(MarketParams),
    WithdrawReserves(WithdrawReservesParams),
    InjectCToken { asset_id: Uuid, amount: Decimal },
}

/// Full market parameter set used by both AddMarket and UpdateMarket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketParams {
    pub asset_id: Uuid,
    pub ctoken_asset_id: Uuid,
    pub symbol: String,
    pub init_exchange_rate: Decimal,
    pub reserve_factor: Decimal,
    pub collateral_factor: Decimal,
    pub close_factor: Decimal,
    pub liquidation_incentive: Decimal,
    pub base_rate: Decimal,
    pub multiplier: Decimal,
    pub jump_multiplier: Decimal,
    pub kink: Decimal,
    pub borrow_cap: Decimal,
    pub status: MarketStatus,
}

impl MarketParams {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        codec::put_uuid(buf, &self.asset_id);
        codec::put_uuid(buf, &self.ctoken_asset_id);
        codec::put_str(buf, &self.symbol);
        codec::put_decimal(buf, self.init_exchange_rate);
        codec::put_decimal(buf, self.reserve_factor);
        codec::put_decimal(buf, self.collateral_factor);
        codec::put_decimal(buf, self.close_factor);
        codec::put_decimal(buf, self.liquidation_incentive);
        codec::put_decimal(buf, self.base_rate);
        codec::put_decimal(buf, self.multiplier);
        codec::put_decimal(buf, self.jump_multiplier);
        codec::put_decimal(buf, self.kink);
        codec::put_decimal(buf, self.borrow_cap);
        codec::put_u8(buf, matches!(self.status, MarketStatus::Closed) as u8);
    }

    pub fn scan(s: &mut Scanner) -> Result<Self, ScanError> {
        Ok(Self {
            asset_id: s.read_uuid()?,
            ctoken_asset_id: s.read_uuid()?,
            symbol: s.read_str()?,
            init_exchange_rate: s.read_decimal()?,
            reserve_factor: s.read_decimal()?,
            collateral_factor: s.read_decimal()?,
            close_factor: s.read_decimal()?,
            liquidation_incentive: s.read_decimal()?,
            base_rate: s.read_decimal()?,
            multiplier: s.read_decimal()?,
            jump_multiplier: s.read_decimal()?,
            kink: s.read_decimal()?,
            borrow_cap: s.read_decimal()?,
            status: if s.read_u8()? == 0 {
                MarketStatus::Open
            } else {
                MarketStatus::Closed
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReservesParams {
    pub asset_id: Uuid,
    pub amount: Decimal,
    /// Recipient of the withdrawn reserves.
    pub opponent: Uuid,
}

impl WithdrawReservesParams {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        codec::put_uuid(buf, &self.asset_id);
        codec::put_decimal(buf, self.amount);
        codec::put_uuid(buf, &self.opponent);
    }

    pub fn scan(s: &mut Scanner) -> Result<Self, ScanError> {
        Ok(Self {
            asset_id: s.read_uuid()?,
            amount: s.read_decimal()?,
            opponent: s.read_uuid()?,
        })
    }
}

impl ProposalContent {
    /// Decode the action-specific payload that follows the proposal header.
    pub fn scan(action: ActionType, s: &mut Scanner) -> Result<Self, ScanError> {
        match action {
            ActionType::ProposalAddMarket | ActionType::ProposalUpdateMarket => {
                Ok(Self::Market(MarketParams::scan(s)?))
            }
            ActionType::ProposalWithdrawReserves => {
                Ok(Self::WithdrawReserves(WithdrawReservesParams::scan(s)?))
            }
            ActionType::ProposalInjectCTokenForMint => Ok(Self::InjectCToken {
                asset_id: s.read_uuid()?,
                amount: s.read_decimal()?,
            }),
            _ => Err(ScanError::Malformed),
        }
    }
}
