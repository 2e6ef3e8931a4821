use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STD;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use rust_decimal::Decimal;
use sha2::Sha256;

use crate::config::SystemConfig;

const KEY_DERIVE_SALT: &[u8] = b"lendcore:system-key";
const KEY_DERIVE_ROUNDS: u32 = 4096;

/// A governance member. The key authenticates the member's memos.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: String,
    pub key: Vec<u8>,
}

/// Process-wide identity: the multisig member set, the vote threshold and
/// the keys this node signs and decrypts with.
#[derive(Debug, Clone)]
pub struct System {
    pub client_id: String,
    pub members: Vec<Member>,
    pub threshold: usize,
    /// AES-256 key users encrypt their action memos against.
    pub private_key: [u8; 32],
    /// This node's member key, used to sign its own proposals.
    pub sign_key: Vec<u8>,
    pub vote_asset_id: String,
    pub vote_amount: Decimal,
}

impl System {
    pub fn from_config(cfg: &SystemConfig) -> Result<Self> {
        if cfg.secret.is_empty() {
            return Err(anyhow!("system secret is not configured"));
        }
        if cfg.members.is_empty() {
            return Err(anyhow!("system member set is empty"));
        }
        if cfg.threshold == 0 || cfg.threshold as usize > cfg.members.len() {
            return Err(anyhow!(
                "invalid threshold {} for {} members",
                cfg.threshold,
                cfg.members.len()
            ));
        }

        let mut private_key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(
            cfg.secret.as_bytes(),
            KEY_DERIVE_SALT,
            KEY_DERIVE_ROUNDS,
            &mut private_key,
        );

        let members = cfg
            .members
            .iter()
            .map(|m| {
                let key = BASE64_STD
                    .decode(&m.key)
                    .with_context(|| format!("member {} key is not base64", m.id))?;
                Ok(Member {
                    id: m.id.clone(),
                    key,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let sign_key = BASE64_STD
            .decode(&cfg.sign_key)
            .context("sign key is not base64")?;

        Ok(Self {
            client_id: cfg.client_id.clone(),
            members,
            threshold: cfg.threshold as usize,
            private_key,
            sign_key,
            vote_asset_id: cfg.vote_asset_id.clone(),
            vote_amount: cfg.vote_amount,
        })
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }
}
