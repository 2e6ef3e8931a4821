pub mod action;
pub mod borrow;
pub mod error;
pub mod market;
pub mod output;
pub mod price;
pub mod proposal;
pub mod supply;
pub mod system;
pub mod user;

pub use action::{ActionType, TransferAction};
pub use borrow::Borrow;
pub use error::ErrorCode;
pub use market::{Market, MarketStatus};
pub use output::{Output, OutputArchive, Transfer};
pub use price::PriceTicker;
pub use proposal::{MarketParams, Proposal, ProposalContent, WithdrawReservesParams};
pub use supply::Supply;
pub use system::{Member, System};
pub use user::User;
