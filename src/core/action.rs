use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::{self, ScanError, Scanner};
use crate::core::ErrorCode;

/// Wire identifiers for every action and outbound transfer source. The
/// numeric values are part of the memo format and must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActionType {
    Supply = 1,
    Borrow = 2,
    Redeem = 3,
    Repay = 4,
    Pledge = 6,
    Unpledge = 7,
    Liquidate = 8,
    RedeemTransfer = 9,
    UnpledgeTransfer = 10,
    BorrowTransfer = 11,
    LiquidateTransfer = 12,
    RefundTransfer = 13,
    RepayRefundTransfer = 14,
    SeizeRefundTransfer = 15,
    ProposalAddMarket = 16,
    ProposalUpdateMarket = 17,
    ProposalWithdrawReserves = 18,
    ProposalProvidePrice = 19,
    ProposalVote = 20,
    ProposalInjectCTokenForMint = 21,
}

impl ActionType {
    pub fn from_u8(v: u8) -> Option<Self> {
        let t = match v {
            1 => Self::Supply,
            2 => Self::Borrow,
            3 => Self::Redeem,
            4 => Self::Repay,
            6 => Self::Pledge,
            7 => Self::Unpledge,
            8 => Self::Liquidate,
            9 => Self::RedeemTransfer,
            10 => Self::UnpledgeTransfer,
            11 => Self::BorrowTransfer,
            12 => Self::LiquidateTransfer,
            13 => Self::RefundTransfer,
            14 => Self::RepayRefundTransfer,
            15 => Self::SeizeRefundTransfer,
            16 => Self::ProposalAddMarket,
            17 => Self::ProposalUpdateMarket,
            18 => Self::ProposalWithdrawReserves,
            19 => Self::ProposalProvidePrice,
            20 => Self::ProposalVote,
            21 => Self::ProposalInjectCTokenForMint,
            _ => return None,
        };
        Some(t)
    }

    pub fn is_proposal(self) -> bool {
        matches!(
            self,
            Self::ProposalAddMarket
                | Self::ProposalUpdateMarket
                | Self::ProposalWithdrawReserves
                | Self::ProposalProvidePrice
                | Self::ProposalVote
                | Self::ProposalInjectCTokenForMint
        )
    }
}

/// Memo attached to every outbound transfer so wallets can attribute the
/// payment to the action that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferAction {
    pub source: ActionType,
    pub follow_id: Uuid,
    pub code: u16,
    pub message: String,
}

impl TransferAction {
    pub fn new(source: ActionType, follow_id: Uuid) -> Self {
        Self {
            source,
            follow_id,
            code: 0,
            message: String::new(),
        }
    }

    pub fn with_error(source: ActionType, follow_id: Uuid, code: ErrorCode, message: &str) -> Self {
        Self {
            source,
            follow_id,
            code: code.code(),
            message: message.to_string(),
        }
    }

    /// Base64 memo string: `source u8 || follow_id uuid || code u16 || message`.
    pub fn format(&self) -> String {
        let mut buf = Vec::with_capacity(20 + self.message.len());
        codec::put_u8(&mut buf, self.source as u8);
        codec::put_uuid(&mut buf, &self.follow_id);
        codec::put_u16(&mut buf, self.code);
        codec::put_str(&mut buf, &self.message);
        codec::encode_base64(&buf)
    }

    pub fn parse(memo: &str) -> Result<Self, ScanError> {
        let raw = codec::decode_base64(memo);
        let mut s = Scanner::new(&raw);
        let source = ActionType::from_u8(s.read_u8()?).ok_or(ScanError::Malformed)?;
        let follow_id = s.read_uuid()?;
        let code = s.read_u16()?;
        let message = s.read_str()?;
        Ok(Self {
            source,
            follow_id,
            code,
            message,
        })
    }
}
