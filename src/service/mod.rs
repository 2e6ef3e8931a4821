pub mod account;
pub mod allowlist;
pub mod block;
pub mod market;
pub mod oracle;
pub mod wallet;

pub use account::AccountService;
pub use allowlist::{AllowListScope, AllowListService};
pub use oracle::{PriceOracleSource, PriceService, TickerQuote};
pub use wallet::{MultisigTransfer, WalletClient};
