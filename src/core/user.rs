use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    /// Deterministic protocol-level address derived from the user id.
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            address: build_user_address(user_id),
            created_at: now,
        }
    }
}

/// Address = UUID carved out of SHA-256("lendcore:address:" || user_id).
/// Stable across restarts so liquidators can reference borrowers by address.
pub fn build_user_address(user_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"lendcore:address:");
    hasher.update(user_id.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}
