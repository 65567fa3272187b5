//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use twinpeg_ledger::StoreSettings;
use twinpeg_types::{Amount, MultisigParams, PublicKey};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for one federation member.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for the LMDB transfer store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum size of the LMDB memory map in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// Hex public keys of every federation member, this one included.
    #[serde(default)]
    pub members: Vec<PublicKey>,

    /// Signatures required on every payout input.
    #[serde(default = "default_quorum")]
    pub quorum: usize,

    /// Hex public key of this member. Must appear in `members`.
    #[serde(default)]
    pub local_member: Option<PublicKey>,

    /// Seconds between federation cycles.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Maximum payout-chain blocks processed per synchronization step.
    #[serde(default = "default_sync_batch_size")]
    pub sync_batch_size: usize,

    /// Maximum matured source-chain blocks pulled per cycle.
    #[serde(default = "default_matured_batch_size")]
    pub matured_batch_size: usize,

    /// Length of one boss-table slot in seconds.
    #[serde(default = "default_boss_slot_secs")]
    pub boss_slot_secs: u64,

    /// Fixed fee deducted from every payout, in base units.
    #[serde(default)]
    pub payout_fee: Amount,

    /// Smallest source-chain payment recognized as a deposit.
    #[serde(default = "default_min_deposit")]
    pub min_deposit: Amount,

    /// Blocks a payout must be buried under before it is complete.
    #[serde(default = "default_finality_depth")]
    pub finality_depth: u64,

    /// Source-chain height the first matured batch must start at.
    #[serde(default = "default_first_mature_height")]
    pub first_mature_height: u64,

    /// Confirmations a source-chain block needs before its deposits are
    /// served as matured.
    #[serde(default = "default_min_deposit_confirmations")]
    pub min_deposit_confirmations: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./twinpeg_data")
}

fn default_lmdb_map_size() -> usize {
    1 << 30
}

fn default_quorum() -> usize {
    1
}

fn default_sync_interval_secs() -> u64 {
    30
}

fn default_sync_batch_size() -> usize {
    100
}

fn default_matured_batch_size() -> usize {
    100
}

fn default_boss_slot_secs() -> u64 {
    60
}

fn default_min_deposit() -> Amount {
    Amount::new(1)
}

fn default_finality_depth() -> u64 {
    12
}

fn default_first_mature_height() -> u64 {
    1
}

fn default_min_deposit_confirmations() -> u64 {
    10
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// The federation described by `members` and `quorum`, checked to
    /// contain the local member.
    pub fn multisig_params(&self) -> Result<MultisigParams, NodeError> {
        let params = MultisigParams::new(self.members.clone(), self.quorum)
            .map_err(|e| NodeError::Config(e.to_string()))?;
        let local = self.local_member_key()?;
        if !params.is_member(&local) {
            return Err(NodeError::Config(format!(
                "local member {} is not in the member list",
                local
            )));
        }
        Ok(params)
    }

    pub fn local_member_key(&self) -> Result<PublicKey, NodeError> {
        self.local_member
            .clone()
            .ok_or_else(|| NodeError::Config("local_member is not set".into()))
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            sync_batch_size: self.sync_batch_size.max(1),
            finality_depth: self.finality_depth,
            first_mature_height: self.first_mature_height,
            payout_fee: self.payout_fee,
        }
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        match self.log_format.as_str() {
            "human" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(NodeError::Config(format!("unknown log format '{}'", other))),
        }
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn boss_slot(&self) -> Duration {
        Duration::from_secs(self.boss_slot_secs.max(1))
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            lmdb_map_size: default_lmdb_map_size(),
            members: Vec::new(),
            quorum: default_quorum(),
            local_member: None,
            sync_interval_secs: default_sync_interval_secs(),
            sync_batch_size: default_sync_batch_size(),
            matured_batch_size: default_matured_batch_size(),
            boss_slot_secs: default_boss_slot_secs(),
            payout_fee: Amount::ZERO,
            min_deposit: default_min_deposit(),
            finality_depth: default_finality_depth(),
            first_mature_height: default_first_mature_height(),
            min_deposit_confirmations: default_min_deposit_confirmations(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
