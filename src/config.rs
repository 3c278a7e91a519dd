use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{PaymentError, PaymentResult};
use crate::types::OutPoint;

pub const SNAPSHOT_FILE_NAME: &str = "mnpayments.dat";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentsConfig {
    pub data_dir: PathBuf,
    /// Four-byte network message start; baked into the snapshot header so a
    /// testnet file cannot be loaded on mainnet.
    pub network_magic: [u8; 4],
    pub active_protocol_version: u32,
    #[serde(default = "default_pre_enforcement_protocol")]
    pub min_protocol_pre_enforcement: u32,
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,
    /// Disables all masternode processing (wallet-only peers).
    #[serde(default)]
    pub lite_mode: bool,
    #[serde(default)]
    pub operator: Option<OperatorConfig>,
}

fn default_pre_enforcement_protocol() -> u32 {
    70_910
}

fn default_snapshot_interval_ms() -> u64 {
    600_000
}

/// Present when this node runs as a masternode operator and produces votes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OperatorConfig {
    pub key_path: PathBuf,
    pub collateral_txid: String,
    pub collateral_index: u32,
}

impl OperatorConfig {
    pub fn collateral_outpoint(&self) -> PaymentResult<OutPoint> {
        let bytes = hex::decode(&self.collateral_txid)
            .map_err(|err| PaymentError::Config(format!("invalid collateral txid: {err}")))?;
        let txid: [u8; 32] = bytes
            .try_into()
            .map_err(|_| PaymentError::Config("collateral txid must be 32 bytes".into()))?;
        Ok(OutPoint::new(txid, self.collateral_index))
    }
}

impl PaymentsConfig {
    pub fn load(path: &Path) -> PaymentResult<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|err| PaymentError::Config(format!("unable to parse config: {err}")))
    }

    pub fn save(&self, path: &Path) -> PaymentResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let encoded = toml::to_string_pretty(self)
            .map_err(|err| PaymentError::Config(format!("unable to encode config: {err}")))?;
        fs::write(path, encoded)?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> PaymentResult<()> {
        fs::create_dir_all(&self.data_dir)?;
        if let Some(operator) = &self.operator {
            if let Some(parent) = operator.key_path.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE_NAME)
    }
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            network_magic: [0x91, 0xc4, 0xfd, 0xe9],
            active_protocol_version: 70_912,
            min_protocol_pre_enforcement: default_pre_enforcement_protocol(),
            snapshot_interval_ms: default_snapshot_interval_ms(),
            lite_mode: false,
            operator: None,
        }
    }
}
