use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inbound multisig transfer, the only input to the state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    /// Monotonic sequence assigned by the wallet sync.
    pub id: i64,
    pub trace_id: String,
    pub asset_id: String,
    pub amount: Decimal,
    /// Sending user; empty for payments relayed without a resolved sender.
    pub sender: String,
    pub memo: String,
    pub created_at: DateTime<Utc>,
}

/// Proof that an output has been fully processed. Its existence implies all
/// state changes for the output are committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputArchive {
    pub id: i64,
    pub trace_id: String,
    pub created_at: DateTime<Utc>,
}

/// Outbound transfer queued for the wallet client to broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub trace_id: String,
    pub asset_id: String,
    pub amount: Decimal,
    pub opponents: Vec<String>,
    pub threshold: u8,
    pub memo: String,
    pub created_at: DateTime<Utc>,
}
