use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Business rejection codes surfaced to users in refund transfer memos.
/// The numeric codes are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ErrorCode {
    #[error("unknown action")]
    Unknown,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("market not found")]
    MarketNotFound,
    #[error("market closed")]
    MarketClosed,
    #[error("supply not found")]
    SupplyNotFound,
    #[error("borrow not found")]
    BorrowNotFound,
    #[error("seize not allowed")]
    SeizeNotAllowed,
    #[error("operation forbidden")]
    OperationForbidden,
    #[error("insufficient liquidity")]
    InsufficientLiquidity,
    #[error("insufficient cash")]
    InsufficientCash,
    #[error("borrow cap reached")]
    BorrowCapReached,
    #[error("price unavailable")]
    PriceUnavailable,
}

impl ErrorCode {
    pub fn code(self) -> u16 {
        match self {
            Self::Unknown => 1,
            Self::InvalidArgument => 2,
            Self::MarketNotFound => 3,
            Self::MarketClosed => 4,
            Self::SupplyNotFound => 5,
            Self::BorrowNotFound => 6,
            Self::SeizeNotAllowed => 7,
            Self::OperationForbidden => 8,
            Self::InsufficientLiquidity => 9,
            Self::InsufficientCash => 10,
            Self::BorrowCapReached => 11,
            Self::PriceUnavailable => 12,
        }
    }
}
