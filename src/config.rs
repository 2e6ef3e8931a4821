use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub system: SystemConfig,
    pub oracle: OracleConfig,
    pub worker: WorkerConfig,
    pub allowlists: AllowListConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// This node's identity among the multisig members.
    pub client_id: String,
    pub members: Vec<MemberConfig>,
    pub threshold: u8,
    /// Secret the system AES key is derived from. Users encrypt action
    /// memos against the derived key.
    pub secret: String,
    /// This node's member signing key, base64.
    pub sign_key: String,
    /// Asset and amount used to carry governance votes on chain.
    pub vote_asset_id: String,
    pub vote_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberConfig {
    pub id: String,
    /// Member authentication key, base64.
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Base URL of the external ticker feed.
    pub endpoint: String,
    /// Width of a price block in seconds.
    pub price_block_secs: i64,
    /// Submissions older than this many days are purged.
    pub ticker_ttl_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub payee_interval_ms: u64,
    pub oracle_interval_ms: u64,
    pub error_delay_ms: u64,
    /// Maximum outputs pulled per payee tick.
    pub batch_limit: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowListConfig {
    /// When set, only these users may be liquidated.
    pub liquidation: Option<Vec<String>>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_enabled: true,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            members: Vec::new(),
            threshold: 0,
            secret: String::new(),
            sign_key: String::new(),
            vote_asset_id: String::new(),
            vote_amount: Decimal::new(1, 8),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9100".to_string(),
            price_block_secs: 60,
            ticker_ttl_days: 7,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            payee_interval_ms: 500,
            oracle_interval_ms: 1_000,
            error_delay_ms: 1_000,
            batch_limit: 500,
        }
    }
}

impl Config {
    /// Layered load: optional TOML file, then `LENDCORE_*` environment
    /// overrides (`LENDCORE_API__PORT=8080`).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("LENDCORE").separator("__"))
            .build()
            .context("assemble configuration sources")?;

        settings
            .try_deserialize::<Config>()
            .context("deserialize configuration")
    }
}
