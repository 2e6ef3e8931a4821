use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// A transfer submitted to the multisig network (as opposed to queued
/// lending-state transfers, which go through the store).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigTransfer {
    pub asset_id: String,
    pub amount: Decimal,
    pub trace_id: String,
    pub memo: String,
    pub opponents: Vec<String>,
    pub threshold: u8,
}

/// Boundary to the multisig wallet network. The network rejects duplicate
/// trace ids, which is what makes deterministic traces idempotent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletClient: Send + Sync {
    async fn submit_transfer(&self, transfer: MultisigTransfer) -> Result<()>;
}
